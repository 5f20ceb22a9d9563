//! Interactive annotation session
//!
//! Reads one token per line. Key tokens go through the store's key table;
//! lines starting with `:` are session commands. `:notes` switches to a
//! free-text surface whose lines are fed to the dispatcher as text-field
//! input (and so never act as shortcuts) until a single `.` line.

use crate::render;
use annotator_store::{
    dispatch, export_today, read_source, write_export, Dispatch, ExperimentStore, ImportGate,
    ImportOutcome, Key, KeyEvent, SnapshotBackend, SuppressReason,
};
use std::io::{BufRead, Write};
use std::path::PathBuf;

pub(crate) const HELP: &str = "\
Keys:      left/h  previous    right/l  next    y  toggle pass    n  toggle fail
Commands:  :notes  edit notes (end with a line containing only '.')
           :import PATH    :export    :status    :clear    :help    :quit";

/// Whether the session keeps reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Quit,
}

#[derive(Debug)]
enum Mode {
    Keys,
    Notes(Vec<String>),
    ConfirmClear,
}

/// Token to key identifier
pub(crate) fn parse_key(token: &str) -> Key {
    match token {
        "left" | "h" | "\u{2190}" => Key::ArrowLeft,
        "right" | "l" | "\u{2192}" => Key::ArrowRight,
        _ => {
            let mut chars = token.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Key::Char(c),
                _ => Key::Other(token.to_string()),
            }
        }
    }
}

pub(crate) struct Session<B: SnapshotBackend> {
    store: ExperimentStore<B>,
    gate: ImportGate,
    export_dir: PathBuf,
    mode: Mode,
}

impl<B: SnapshotBackend> Session<B> {
    pub(crate) fn new(store: ExperimentStore<B>, export_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            gate: ImportGate::new(),
            export_dir: export_dir.into(),
            mode: Mode::Keys,
        }
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &ExperimentStore<B> {
        &self.store
    }

    /// Drive the session until `:quit` or end of input
    pub(crate) async fn run<R: BufRead, W: Write>(
        &mut self,
        input: R,
        out: &mut W,
    ) -> anyhow::Result<()> {
        writeln!(out, "{HELP}")?;
        writeln!(out, "{}", render::header(&self.store))?;
        writeln!(out, "{}", render::current(&self.store))?;
        for line in input.lines() {
            if self.handle_line(&line?, out).await? == Flow::Quit {
                break;
            }
        }
        self.finish(out)
    }

    /// Settle any unterminated notes when input ends
    fn finish<W: Write>(&mut self, out: &mut W) -> anyhow::Result<()> {
        if let Mode::Notes(buffer) = std::mem::replace(&mut self.mode, Mode::Keys) {
            self.store.update_notes(buffer.join("\n"));
            writeln!(out, "Input ended before '.'; notes saved.")?;
        }
        Ok(())
    }

    pub(crate) async fn handle_line<W: Write>(
        &mut self,
        line: &str,
        out: &mut W,
    ) -> anyhow::Result<Flow> {
        match std::mem::replace(&mut self.mode, Mode::Keys) {
            Mode::Notes(buffer) => self.notes_line(buffer, line, out)?,
            Mode::ConfirmClear => {
                if matches!(line.trim(), "y" | "Y" | "yes") {
                    self.store.clear();
                    writeln!(out, "Cleared.")?;
                } else {
                    writeln!(out, "Clear cancelled.")?;
                }
            }
            Mode::Keys => {
                let token = line.trim();
                if let Some(command) = token.strip_prefix(':') {
                    return self.command(command, out).await;
                }
                if !token.is_empty() {
                    self.key(token, out)?;
                }
            }
        }
        Ok(Flow::Continue)
    }

    fn notes_line<W: Write>(
        &mut self,
        mut buffer: Vec<String>,
        line: &str,
        out: &mut W,
    ) -> anyhow::Result<()> {
        if line == "." {
            self.store.update_notes(buffer.join("\n"));
            writeln!(out, "Notes saved.")?;
            return Ok(());
        }
        let intercepted = line
            .chars()
            .map(|c| dispatch(&mut self.store, &KeyEvent::in_text_field(Key::Char(c))))
            .filter(|d| *d != Dispatch::Suppressed(SuppressReason::TextInput))
            .count();
        if intercepted > 0 {
            tracing::warn!("{} keystrokes of note text reached the key table", intercepted);
        }
        buffer.push(line.to_string());
        self.mode = Mode::Notes(buffer);
        Ok(())
    }

    fn key<W: Write>(&mut self, token: &str, out: &mut W) -> anyhow::Result<()> {
        match dispatch(&mut self.store, &KeyEvent::global(parse_key(token))) {
            Dispatch::Applied(_) => {
                writeln!(out, "{}", render::header(&self.store))?;
                writeln!(out, "{}", render::current(&self.store))?;
            }
            Dispatch::Suppressed(SuppressReason::NoData) => {
                writeln!(out, "No data loaded. Use :import PATH.")?;
            }
            Dispatch::Suppressed(SuppressReason::TextInput) => {}
            Dispatch::Unbound => writeln!(out, "Unbound key '{token}'. Type :help.")?,
        }
        Ok(())
    }

    async fn command<W: Write>(&mut self, command: &str, out: &mut W) -> anyhow::Result<Flow> {
        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command, ""),
        };
        match name {
            "quit" | "q" => return Ok(Flow::Quit),
            "help" => writeln!(out, "{HELP}")?,
            "status" => {
                writeln!(out, "{}", render::header(&self.store))?;
                writeln!(out, "{}", render::current(&self.store))?;
            }
            "notes" => match self.store.current_entry() {
                Some(entry) => {
                    if let Some(notes) = entry.notes.as_deref().filter(|n| !n.is_empty()) {
                        writeln!(out, "Current notes:\n{notes}")?;
                    }
                    writeln!(out, "Enter notes, end with a line containing only '.'")?;
                    self.mode = Mode::Notes(Vec::new());
                }
                None => writeln!(out, "No entry selected.")?,
            },
            "import" if arg.is_empty() => writeln!(out, "Usage: :import PATH")?,
            "import" => self.import(arg, out).await?,
            "export" => match export_today(&self.store) {
                Ok(file) => match write_export(&self.export_dir, &file) {
                    Ok(path) => writeln!(out, "Exported to {}", path.display())?,
                    Err(e) => writeln!(out, "Export failed: {e}")?,
                },
                Err(e) => writeln!(out, "Export failed: {e}")?,
            },
            "clear" => {
                writeln!(out, "Clear all annotations and stored data? [y/N]")?;
                self.mode = Mode::ConfirmClear;
            }
            _ => writeln!(out, "Unknown command ':{name}'. Type :help.")?,
        }
        Ok(Flow::Continue)
    }

    async fn import<W: Write>(&mut self, path: &str, out: &mut W) -> anyhow::Result<()> {
        let ticket = self.gate.begin();
        let read = read_source(path).await;
        match self.gate.complete(&mut self.store, ticket, read) {
            Ok(ImportOutcome::Applied(report)) => {
                writeln!(
                    out,
                    "Imported '{}' ({} entries, {} annotated)",
                    report.name, report.entries, report.annotated
                )?;
                writeln!(out, "{}", render::current(&self.store))?;
            }
            Ok(ImportOutcome::Superseded) => writeln!(out, "Import superseded by a newer one.")?,
            Err(e) => {
                writeln!(out, "Import failed:")?;
                for line in e.diagnostics() {
                    writeln!(out, "  {line}")?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use annotator_schema::Annotation;
    use annotator_test_utils::{
        create_two_entry_experiment, memory_store, memory_store_with, system_role_bytes,
    };
    use std::io::Cursor;

    async fn feed<B: SnapshotBackend>(session: &mut Session<B>, script: &str) -> String {
        let mut out = Vec::new();
        session.run(Cursor::new(script), &mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn key_tokens() {
        assert_eq!(parse_key("left"), Key::ArrowLeft);
        assert_eq!(parse_key("l"), Key::ArrowRight);
        assert_eq!(parse_key("Y"), Key::Char('Y'));
        assert_eq!(parse_key("enter"), Key::Other("enter".into()));
    }

    #[tokio::test]
    async fn annotate_and_navigate() {
        let (store, _) = memory_store_with(create_two_entry_experiment());
        let mut session = Session::new(store, ".");
        feed(&mut session, "y\nright\nn\nright\n:quit\ny\n").await;

        let store = session.store();
        assert_eq!(store.current_index(), 1);
        assert_eq!(store.annotated_count(), 2);
        assert_eq!(
            store.snapshot().entries()[0].annotation,
            Some(Annotation::Pass)
        );
    }

    #[tokio::test]
    async fn notes_lines_never_trigger_shortcuts() {
        let (store, _) = memory_store_with(create_two_entry_experiment());
        let mut session = Session::new(store, ".");
        feed(&mut session, ":notes\ny\nright\nn\n.\n").await;

        let store = session.store();
        assert_eq!(store.current_index(), 0);
        assert_eq!(store.annotated_count(), 0);
        assert_eq!(
            store.current_entry().unwrap().notes.as_deref(),
            Some("y\nright\nn")
        );
    }

    #[tokio::test]
    async fn unterminated_notes_are_kept_at_end_of_input() {
        let (store, _) = memory_store_with(create_two_entry_experiment());
        let mut session = Session::new(store, ".");
        let output = feed(&mut session, ":notes
first
second
").await;

        assert!(output.contains("notes saved"));
        assert_eq!(
            session.store().current_entry().unwrap().notes.as_deref(),
            Some("first\nsecond")
        );
    }

    #[tokio::test]
    async fn clear_requires_confirmation() {
        let (store, _) = memory_store_with(create_two_entry_experiment());
        let mut session = Session::new(store, ".");
        let output = feed(&mut session, ":clear\nno\n").await;
        assert!(output.contains("Clear cancelled."));
        assert!(session.store().is_loaded());

        feed(&mut session, ":clear\nyes\n").await;
        assert!(!session.store().is_loaded());
    }

    #[tokio::test]
    async fn rejected_import_prints_diagnostics_and_keeps_state() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, system_role_bytes()).unwrap();

        let (store, _) = memory_store_with(create_two_entry_experiment());
        let mut session = Session::new(store, dir.path());
        let output = feed(&mut session, &format!("y\n:import {}\n", bad.display())).await;

        assert!(output.contains("  entries.0.messages.0.role: expected one of"));
        assert_eq!(session.store().name(), "test experiment");
        assert_eq!(session.store().annotated_count(), 1);
    }

    #[tokio::test]
    async fn export_writes_dated_file() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = memory_store_with(create_two_entry_experiment());
        let mut session = Session::new(store, dir.path());
        let output = feed(&mut session, ":export\n").await;
        assert!(output.contains("Exported to"));

        let written: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(written.len(), 1);
        assert!(written[0].starts_with("experiment_") && written[0].ends_with(".json"));
    }

    #[tokio::test]
    async fn keys_without_data_are_suppressed() {
        let (store, _) = memory_store();
        let mut session = Session::new(store, ".");
        let output = feed(&mut session, "y\n:notes\n").await;
        assert!(output.contains("No data loaded."));
        assert!(output.contains("No entry selected."));
    }
}
