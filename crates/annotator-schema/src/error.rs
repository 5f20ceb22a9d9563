//! Error types for experiment decoding
//!
//! Two failure classes are kept apart:
//! - [`SchemaError::Parse`]: the input is not JSON at all (one generic diagnostic)
//! - [`SchemaError::Invalid`]: the input is JSON but does not match the schema
//!   (every violation, each with its field path)

use crate::path::FieldPath;
use std::fmt::{self, Display, Formatter};

/// Single schema violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Location of the offending value
    pub path: FieldPath,
    /// Human-readable description
    pub message: String,
}

impl FieldError {
    /// Create error at path
    #[inline]
    #[must_use]
    pub fn new(path: FieldPath, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }

    /// Required member is absent
    #[must_use]
    pub fn missing(path: FieldPath) -> Self {
        Self::new(path, "missing required field")
    }

    /// Value has the wrong JSON type
    #[must_use]
    pub fn wrong_type(path: FieldPath, expected: &str, received: &str) -> Self {
        Self::new(path, format!("expected {expected}, received {received}"))
    }

    /// String is outside an enumerated set
    #[must_use]
    pub fn not_one_of(path: FieldPath, allowed: &[&str], received: &str) -> Self {
        let allowed = allowed
            .iter()
            .map(|a| format!("\"{a}\""))
            .collect::<Vec<_>>()
            .join(", ");
        Self::new(path, format!("expected one of {allowed}, received \"{received}\""))
    }

    /// Entry id already used by an earlier entry
    #[must_use]
    pub fn duplicate_id(path: FieldPath, id: &str, first_index: usize) -> Self {
        Self::new(
            path,
            format!("duplicate id \"{id}\" (first used by entry {first_index})"),
        )
    }
}

impl Display for FieldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.path.is_root() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

impl std::error::Error for FieldError {}

/// Every violation found in one document, in discovery order
///
/// Never empty when returned from [`crate::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    /// Create from collected errors
    #[inline]
    #[must_use]
    pub fn new(errors: Vec<FieldError>) -> Self {
        Self(errors)
    }

    /// Borrow errors
    #[inline]
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    /// Number of violations
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check for no violations
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// One display line per violation
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }

    /// Find the first violation at an exact dotted path
    #[must_use]
    pub fn at(&self, path: &str) -> Option<&FieldError> {
        let path = FieldPath::from(path);
        self.0.iter().find(|e| e.path == path)
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} schema violation(s): {}", self.0.len(), self.lines().join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

impl IntoIterator for ValidationErrors {
    type Item = FieldError;
    type IntoIter = std::vec::IntoIter<FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Failure to turn text into an [`crate::Experiment`]
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// Input is not well-formed JSON (or not UTF-8)
    #[error("invalid JSON: {0}")]
    Parse(String),

    /// Input is JSON but violates the schema
    #[error("{0}")]
    Invalid(#[from] ValidationErrors),
}

impl SchemaError {
    /// Create parse error from any decoder message
    #[inline]
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// Check for the generic parse class
    #[inline]
    #[must_use]
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse(_))
    }

    /// Schema violations, if this is a validation failure
    #[inline]
    #[must_use]
    pub fn violations(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Invalid(errors) => Some(errors),
            Self::Parse(_) => None,
        }
    }
}

impl From<serde_json::Error> for SchemaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Result type alias for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_error_display_includes_path() {
        let err = FieldError::wrong_type(FieldPath::from("entries.0.id"), "string", "number");
        assert_eq!(err.to_string(), "entries.0.id: expected string, received number");
    }

    #[test]
    fn root_error_has_no_prefix() {
        let err = FieldError::wrong_type(FieldPath::root(), "object", "array");
        assert_eq!(err.to_string(), "expected object, received array");
    }

    #[test]
    fn not_one_of_lists_choices() {
        let err = FieldError::not_one_of(FieldPath::from("r"), &["user", "assistant"], "system");
        assert_eq!(
            err.message,
            "expected one of \"user\", \"assistant\", received \"system\""
        );
    }

    #[test]
    fn validation_errors_lookup_by_path() {
        let errors = ValidationErrors::new(vec![
            FieldError::missing(FieldPath::from("name")),
            FieldError::missing(FieldPath::from("entries.1.id")),
        ]);
        assert_eq!(errors.len(), 2);
        assert!(errors.at("entries.1.id").is_some());
        assert!(errors.at("entries.0.id").is_none());
        assert!(errors.to_string().starts_with("2 schema violation(s)"));
    }

    #[test]
    fn error_conversions() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: SchemaError = json_err.into();
        assert!(err.is_parse());
        assert!(err.violations().is_none());

        let err: SchemaError = ValidationErrors::default().into();
        assert!(!err.is_parse());
    }
}
