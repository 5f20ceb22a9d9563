//! Experiment data model
//!
//! Typed form of the experiment file format. Values of these types only come
//! out of [`crate::validate`] (or are built in code), never straight from an
//! untrusted decoder.
//!
//! Field declaration order is the serialization order, so exported files keep
//! a stable key layout: `id, messages, baseline_answer, candidate_answer,
//! context, span_link, expected_tool_calls, actual_tool_calls, notes,
//! annotation`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{self, Display, Formatter};

/// Free-form JSON object (entry context, tool call arguments)
pub type JsonObject = Map<String, Value>;

/// Speaker of a conversation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Human turn
    User,
    /// Model turn
    Assistant,
}

impl Role {
    /// All accepted roles, in schema order
    pub const ALL: [Role; 2] = [Role::User, Role::Assistant];

    /// Wire name
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Parse wire name
    #[must_use]
    pub fn from_wire(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == s)
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Human verdict on an entry
///
/// Absence (`Option::None` on the entry) is the third, "unset" state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Annotation {
    /// Candidate answer is acceptable
    Pass,
    /// Candidate answer is not acceptable
    Fail,
}

impl Annotation {
    /// All accepted verdicts, in schema order
    pub const ALL: [Annotation; 2] = [Annotation::Pass, Annotation::Fail];

    /// Wire name
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
        }
    }

    /// Parse wire name
    #[must_use]
    pub fn from_wire(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == s)
    }
}

impl Display for Annotation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One conversation turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Message {
    /// Speaker
    pub role: Role,
    /// Message text
    pub content: String,
}

impl Message {
    /// Create a message
    #[inline]
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// User message
    #[inline]
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Assistant message
    #[inline]
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Tool invocation recorded alongside an entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ToolCall {
    /// Tool name
    pub name: String,
    /// Call arguments
    pub arguments: JsonObject,
}

impl ToolCall {
    /// Create a tool call
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, arguments: JsonObject) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// The atomic annotatable unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExperimentEntry {
    /// Stable identifier, unique within the experiment
    pub id: String,
    /// Ground-truth conversation prefix
    pub messages: Vec<Message>,
    /// Reference response
    pub baseline_answer: String,
    /// Response under evaluation
    pub candidate_answer: String,
    /// Opaque display-only metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<JsonObject>,
    /// External trace URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span_link: Option<String>,
    /// Tool calls the candidate should have made
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_tool_calls: Option<Vec<ToolCall>>,
    /// Tool calls the candidate did make
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_tool_calls: Option<Vec<ToolCall>>,
    /// Annotator notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Verdict (absent = unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<Annotation>,
}

impl ExperimentEntry {
    /// Create an entry with only the required fields
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        messages: Vec<Message>,
        baseline_answer: impl Into<String>,
        candidate_answer: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            messages,
            baseline_answer: baseline_answer.into(),
            candidate_answer: candidate_answer.into(),
            context: None,
            span_link: None,
            expected_tool_calls: None,
            actual_tool_calls: None,
            notes: None,
            annotation: None,
        }
    }

    /// With annotation
    #[inline]
    #[must_use]
    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotation = Some(annotation);
        self
    }

    /// With notes
    #[inline]
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// With context object
    #[inline]
    #[must_use]
    pub fn with_context(mut self, context: JsonObject) -> Self {
        self.context = Some(context);
        self
    }

    /// With span link
    #[inline]
    #[must_use]
    pub fn with_span_link(mut self, link: impl Into<String>) -> Self {
        self.span_link = Some(link.into());
        self
    }

    /// With expected and actual tool calls
    #[inline]
    #[must_use]
    pub fn with_tool_calls(mut self, expected: Vec<ToolCall>, actual: Vec<ToolCall>) -> Self {
        self.expected_tool_calls = Some(expected);
        self.actual_tool_calls = Some(actual);
        self
    }

    /// Whether a verdict has been recorded
    #[inline]
    #[must_use]
    pub fn is_annotated(&self) -> bool {
        self.annotation.is_some()
    }
}

/// A named, ordered collection of entries
///
/// Entry order is navigation order and survives import/export untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Experiment {
    /// Display name
    pub name: String,
    /// Entries in navigation order
    pub entries: Vec<ExperimentEntry>,
}

impl Experiment {
    /// Create an experiment
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, entries: Vec<ExperimentEntry>) -> Self {
        Self {
            name: name.into(),
            entries,
        }
    }

    /// Nameless experiment without entries
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check for zero entries
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Count of entries carrying a verdict
    #[must_use]
    pub fn annotated_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_annotated()).count()
    }
}
