//! Plain-text views of the store

use annotator_schema::{ExperimentEntry, JsonObject, ToolCall};
use annotator_store::{ExperimentStore, Position, SnapshotBackend};

/// One-line summary: name and progress
pub(crate) fn header<B: SnapshotBackend>(store: &ExperimentStore<B>) -> String {
    let progress = store.progress();
    format!(
        "{} | {} annotated ({:.0}%)",
        store.name(),
        progress,
        progress.percent()
    )
}

/// Full view of the entry under the cursor
pub(crate) fn current<B: SnapshotBackend>(store: &ExperimentStore<B>) -> String {
    let Some(entry) = store.current_entry() else {
        return "No Data Loaded. Use :import PATH to load an experiment.".to_string();
    };
    let marker = match store.cursor().position() {
        Position::AtStart if store.len() > 1 => " (first)",
        Position::AtEnd => " (last)",
        _ => "",
    };
    let mut lines = vec![format!(
        "Entry {} of {}{} - {} [{}]",
        store.current_index() + 1,
        store.len(),
        marker,
        entry.id,
        entry.annotation.map_or("unset", |a| a.as_str())
    )];
    lines.extend(entry_body(entry));
    lines.join("\n")
}

fn entry_body(entry: &ExperimentEntry) -> Vec<String> {
    let mut lines = Vec::new();

    lines.push("Conversation:".to_string());
    if entry.messages.is_empty() {
        lines.push("  (no messages)".to_string());
    }
    for message in &entry.messages {
        lines.push(indented(&format!("{}: {}", message.role, message.content)));
    }

    lines.push("Baseline:".to_string());
    lines.push(indented(&entry.baseline_answer));
    lines.push("Candidate:".to_string());
    lines.push(indented(&entry.candidate_answer));

    if let Some(calls) = &entry.expected_tool_calls {
        lines.push("Expected tool calls:".to_string());
        lines.extend(calls.iter().map(tool_call));
    }
    if let Some(calls) = &entry.actual_tool_calls {
        lines.push("Actual tool calls:".to_string());
        lines.extend(calls.iter().map(tool_call));
    }
    if let Some(context) = &entry.context {
        lines.push(format!("Context: {}", compact(context)));
    }
    if let Some(link) = &entry.span_link {
        lines.push(format!("Span: {link}"));
    }
    match entry.notes.as_deref() {
        Some(notes) if !notes.is_empty() => {
            lines.push("Notes:".to_string());
            lines.push(indented(notes));
        }
        _ => {}
    }
    lines
}

fn tool_call(call: &ToolCall) -> String {
    format!("  {}({})", call.name, compact(&call.arguments))
}

fn compact(object: &JsonObject) -> String {
    serde_json::to_string(object).unwrap_or_else(|_| "{..}".to_string())
}

fn indented(text: &str) -> String {
    text.lines()
        .map(|line| format!("  {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use annotator_schema::Annotation;
    use annotator_test_utils::{create_two_entry_experiment, memory_store, memory_store_with};

    #[test]
    fn header_on_empty_store() {
        let (store, _) = memory_store();
        assert_eq!(header(&store), "No Dataset | 0/0 annotated (0%)");
        assert!(current(&store).starts_with("No Data Loaded"));
    }

    #[test]
    fn current_entry_view() {
        let (mut store, _) = memory_store_with(create_two_entry_experiment());
        store.toggle_annotation(Annotation::Pass);
        store.update_notes("looks right");
        let view = current(&store);
        assert!(view.starts_with("Entry 1 of 2 (first) - e0 [pass]"));
        assert!(view.contains("  user: question e0"));
        assert!(view.contains("Notes:\n  looks right"));
        assert_eq!(header(&store), "test experiment | 1/2 annotated (50%)");
    }

    #[test]
    fn last_entry_marker() {
        let (mut store, _) = memory_store_with(create_two_entry_experiment());
        store.next();
        assert!(current(&store).starts_with("Entry 2 of 2 (last) - e1 [unset]"));
    }
}
