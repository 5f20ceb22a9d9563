//! Eval Annotator Schema
//!
//! Typed experiment model and the strict gate between untrusted JSON and it.
//!
//! # Core Concepts
//!
//! - [`Experiment`] / [`ExperimentEntry`]: the labeled dataset
//! - [`validate`]: structural + type check of a decoded value, all-or-nothing
//! - [`FieldError`] / [`FieldPath`]: one violation at a dotted path such as
//!   `entries.3.messages.1.role`
//! - [`SchemaError`]: separates "not JSON" from "JSON of the wrong shape"
//!
//! # Example
//!
//! ```rust
//! use annotator_schema::{parse_experiment, SchemaError};
//!
//! let text = r#"{ "name": "demo", "entries": [] }"#;
//! let experiment = parse_experiment(text).unwrap();
//! assert!(experiment.is_empty());
//!
//! let err = parse_experiment("{").unwrap_err();
//! assert!(matches!(err, SchemaError::Parse(_)));
//! ```

#![warn(unreachable_pub)]

pub mod error;
pub mod model;
pub mod path;
pub mod validator;

// Re-exports
pub use error::{FieldError, SchemaError, SchemaResult, ValidationErrors};
pub use model::{Annotation, Experiment, ExperimentEntry, JsonObject, Message, Role, ToolCall};
pub use path::{FieldPath, PathSegment};
pub use validator::{parse_experiment, parse_experiment_bytes, validate, value_type_name};

/// JSON Schema document describing the experiment file format
#[must_use]
pub fn experiment_json_schema() -> schemars::schema::RootSchema {
    schemars::schema_for!(Experiment)
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with experiments
    pub use crate::{
        parse_experiment, validate, Annotation, Experiment, ExperimentEntry, FieldError, Message,
        Role, SchemaError, ToolCall, ValidationErrors,
    };
}
