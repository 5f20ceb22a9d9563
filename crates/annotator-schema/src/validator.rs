//! Structural validation of untrusted experiment JSON
//!
//! The validator walks the whole document and records every violation rather
//! than stopping at the first one. Nothing typed leaves this module unless the
//! walk finished with zero violations.

use crate::error::{FieldError, SchemaError, SchemaResult, ValidationErrors};
use crate::model::{Annotation, Experiment, ExperimentEntry, JsonObject, Message, Role, ToolCall};
use crate::path::FieldPath;
use serde_json::Value;
use std::collections::HashMap;

/// Validate a decoded JSON value against the experiment schema
///
/// # Returns
/// - `Ok(Experiment)` with optional fields normalized to `None`
/// - `Err(ValidationErrors)` listing all violations, each tagged with its path
///
/// Unknown members are ignored and do not survive into the typed value.
///
/// # Examples
/// ```
/// use annotator_schema::validate;
/// use serde_json::json;
///
/// let raw = json!({
///     "name": "demo",
///     "entries": [{
///         "id": "1",
///         "messages": [{ "role": "system", "content": "hi" }],
///         "baseline_answer": "a",
///         "candidate_answer": "b"
///     }]
/// });
/// let errors = validate(&raw).unwrap_err();
/// assert_eq!(errors.len(), 1);
/// assert!(errors.at("entries.0.messages.0.role").is_some());
/// ```
pub fn validate(raw: &Value) -> Result<Experiment, ValidationErrors> {
    let mut walker = Walker::default();
    let experiment = walker.experiment(raw, &FieldPath::root());
    match experiment {
        Some(experiment) if walker.errors.is_empty() => Ok(experiment),
        _ => Err(ValidationErrors::new(walker.errors)),
    }
}

/// Decode JSON text and validate it
///
/// # Errors
/// - [`SchemaError::Parse`] if `text` is not JSON
/// - [`SchemaError::Invalid`] if it is JSON but not an experiment
pub fn parse_experiment(text: &str) -> SchemaResult<Experiment> {
    let raw: Value = serde_json::from_str(text)?;
    Ok(validate(&raw)?)
}

/// Decode raw bytes as UTF-8 JSON and validate
///
/// Non-UTF-8 input falls into the same generic parse class as broken JSON.
///
/// # Errors
/// See [`parse_experiment`].
pub fn parse_experiment_bytes(bytes: &[u8]) -> SchemaResult<Experiment> {
    let text = std::str::from_utf8(bytes).map_err(|e| SchemaError::parse(e.to_string()))?;
    parse_experiment(text)
}

/// JSON type name as reported in diagnostics
#[must_use]
pub fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Accumulates violations while descending the document
#[derive(Debug, Default)]
struct Walker {
    errors: Vec<FieldError>,
}

impl Walker {
    fn report(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    fn experiment(&mut self, raw: &Value, path: &FieldPath) -> Option<Experiment> {
        let obj = self.object(raw, path)?;

        let name = self
            .required(obj, "name", path)
            .and_then(|v| self.string(v, &path.key("name")));

        let entries_path = path.key("entries");
        let entries = self
            .required(obj, "entries", path)
            .and_then(|v| self.array(v, &entries_path))
            .and_then(|items| self.entries(items, &entries_path));

        Some(Experiment {
            name: name?,
            entries: entries?,
        })
    }

    fn entries(&mut self, items: &[Value], path: &FieldPath) -> Option<Vec<ExperimentEntry>> {
        let mut out = Vec::with_capacity(items.len());
        let mut complete = true;
        let mut seen: HashMap<String, usize> = HashMap::new();

        for (idx, item) in items.iter().enumerate() {
            let entry_path = path.index(idx);
            match self.entry(item, &entry_path) {
                Some(entry) => out.push(entry),
                None => complete = false,
            }

            // Ids count even when the rest of their entry is invalid
            if let Some(id) = item.get("id").and_then(Value::as_str) {
                if let Some(&first) = seen.get(id) {
                    self.report(FieldError::duplicate_id(entry_path.key("id"), id, first));
                } else {
                    seen.insert(id.to_string(), idx);
                }
            }
        }

        complete.then_some(out)
    }

    fn entry(&mut self, raw: &Value, path: &FieldPath) -> Option<ExperimentEntry> {
        let obj = self.object(raw, path)?;

        let id = self
            .required(obj, "id", path)
            .and_then(|v| self.string(v, &path.key("id")));

        let messages_path = path.key("messages");
        let messages = self
            .required(obj, "messages", path)
            .and_then(|v| self.array(v, &messages_path))
            .and_then(|items| self.all(items, &messages_path, Self::message));

        let baseline_answer = self
            .required(obj, "baseline_answer", path)
            .and_then(|v| self.string(v, &path.key("baseline_answer")));

        let candidate_answer = self
            .required(obj, "candidate_answer", path)
            .and_then(|v| self.string(v, &path.key("candidate_answer")));

        let context = self.optional(obj, "context", path, |w, v, p| w.object(v, p).cloned());
        let span_link = self.optional(obj, "span_link", path, Self::string);
        let expected_tool_calls = self.optional(obj, "expected_tool_calls", path, Self::tool_calls);
        let actual_tool_calls = self.optional(obj, "actual_tool_calls", path, Self::tool_calls);
        let notes = self.optional(obj, "notes", path, Self::string);
        let annotation = self.optional(obj, "annotation", path, |w, v, p| {
            w.choice(v, p, &Annotation::ALL.map(Annotation::as_str), Annotation::from_wire)
        });

        Some(ExperimentEntry {
            id: id?,
            messages: messages?,
            baseline_answer: baseline_answer?,
            candidate_answer: candidate_answer?,
            context: context?,
            span_link: span_link?,
            expected_tool_calls: expected_tool_calls?,
            actual_tool_calls: actual_tool_calls?,
            notes: notes?,
            annotation: annotation?,
        })
    }

    fn message(&mut self, raw: &Value, path: &FieldPath) -> Option<Message> {
        let obj = self.object(raw, path)?;

        let role = self.required(obj, "role", path).and_then(|v| {
            self.choice(v, &path.key("role"), &Role::ALL.map(Role::as_str), Role::from_wire)
        });
        let content = self
            .required(obj, "content", path)
            .and_then(|v| self.string(v, &path.key("content")));

        Some(Message {
            role: role?,
            content: content?,
        })
    }

    fn tool_calls(&mut self, raw: &Value, path: &FieldPath) -> Option<Vec<ToolCall>> {
        let items = self.array(raw, path)?;
        self.all(items, path, Self::tool_call)
    }

    fn tool_call(&mut self, raw: &Value, path: &FieldPath) -> Option<ToolCall> {
        let obj = self.object(raw, path)?;

        let name = self
            .required(obj, "name", path)
            .and_then(|v| self.string(v, &path.key("name")));
        let arguments = self
            .required(obj, "arguments", path)
            .and_then(|v| self.object(v, &path.key("arguments")).cloned());

        Some(ToolCall {
            name: name?,
            arguments: arguments?,
        })
    }

    /// Validate every element; `None` if any element failed
    fn all<T>(
        &mut self,
        items: &[Value],
        path: &FieldPath,
        mut each: impl FnMut(&mut Self, &Value, &FieldPath) -> Option<T>,
    ) -> Option<Vec<T>> {
        let mut out = Vec::with_capacity(items.len());
        let mut complete = true;
        for (idx, item) in items.iter().enumerate() {
            match each(self, item, &path.index(idx)) {
                Some(v) => out.push(v),
                None => complete = false,
            }
        }
        complete.then_some(out)
    }

    fn required<'a>(&mut self, obj: &'a JsonObject, key: &str, path: &FieldPath) -> Option<&'a Value> {
        let value = obj.get(key);
        if value.is_none() {
            self.report(FieldError::missing(path.key(key)));
        }
        value
    }

    /// Absent and `null` both mean "not present".
    ///
    /// Outer `None` = invalid, `Some(None)` = absent, `Some(Some(v))` = present and valid.
    fn optional<T>(
        &mut self,
        obj: &JsonObject,
        key: &str,
        path: &FieldPath,
        check: impl FnOnce(&mut Self, &Value, &FieldPath) -> Option<T>,
    ) -> Option<Option<T>> {
        match obj.get(key) {
            None | Some(Value::Null) => Some(None),
            Some(value) => check(self, value, &path.key(key)).map(Some),
        }
    }

    fn object<'a>(&mut self, value: &'a Value, path: &FieldPath) -> Option<&'a JsonObject> {
        match value {
            Value::Object(map) => Some(map),
            other => {
                self.report(FieldError::wrong_type(path.clone(), "object", value_type_name(other)));
                None
            }
        }
    }

    fn array<'a>(&mut self, value: &'a Value, path: &FieldPath) -> Option<&'a Vec<Value>> {
        match value {
            Value::Array(items) => Some(items),
            other => {
                self.report(FieldError::wrong_type(path.clone(), "array", value_type_name(other)));
                None
            }
        }
    }

    fn string(&mut self, value: &Value, path: &FieldPath) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            other => {
                self.report(FieldError::wrong_type(path.clone(), "string", value_type_name(other)));
                None
            }
        }
    }

    fn choice<T>(
        &mut self,
        value: &Value,
        path: &FieldPath,
        allowed: &[&str],
        from_wire: impl Fn(&str) -> Option<T>,
    ) -> Option<T> {
        let s = self.string(value, path)?;
        let parsed = from_wire(&s);
        if parsed.is_none() {
            self.report(FieldError::not_one_of(path.clone(), allowed, &s));
        }
        parsed
    }
}
