//! Eval Annotator Store
//!
//! The experiment state engine: everything between a file on disk and the
//! verdicts a reviewer assigns.
//!
//! # Core Operations
//!
//! - **Import**: bytes → validated [`Experiment`](annotator_schema::Experiment) → store
//! - **Annotate**: cursor movement, pass/fail toggles, notes
//! - **Persist**: write-through snapshot after every mutation
//! - **Export**: current state → `experiment_YYYY-MM-DD.json`
//!
//! # Architecture
//!
//! ```text
//! File ─▶ pipeline::import ─▶ validator ─▶ ExperimentStore ─▶ pipeline::export ─▶ File
//!                                             ▲      │
//!                      navigation::dispatch ──┘      ▼
//!                                           Persistence<SnapshotBackend>
//! ```
//!
//! # Example
//!
//! ```rust
//! use annotator_store::prelude::*;
//!
//! let persistence = Persistence::with_default_key(MemoryBackend::new());
//! let (mut store, source) = ExperimentStore::boot(persistence, sample_experiment());
//! assert_eq!(source, BootSource::Fallback);
//!
//! dispatch(&mut store, &KeyEvent::global(Key::Char('y')));
//! assert_eq!(store.progress().to_string(), "1/3");
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

// Core modules
pub mod config;
pub mod drop_zone;
pub mod error;
pub mod navigation;
pub mod persistence;
pub mod pipeline;
pub mod sample;
pub mod store;

// Re-exports for convenience
pub use config::AnnotatorConfig;
pub use drop_zone::{DragKind, DropZone, DroppedFile};
pub use error::{
    AnnotatorError, AnnotatorResult, ConfigError, ExportError, ImportError, PersistenceError,
};
pub use navigation::{
    command_for, dispatch, Command, Cursor, Dispatch, InputSource, Key, KeyEvent, Position,
    SuppressReason,
};
pub use persistence::{
    FileBackend, MemoryBackend, Persistence, SaveOutcome, SnapshotBackend, DEFAULT_STORAGE_KEY,
};
pub use pipeline::{
    export, export_today, import_bytes, import_file, read_source, write_export, ExportFile,
    ImportGate, ImportOutcome, ImportReport, ImportTicket,
};
pub use sample::sample_experiment;
pub use store::{BootSource, ExperimentStore, Progress, StoreSnapshot};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving an annotation session
    pub use crate::navigation::{dispatch, Dispatch, Key, KeyEvent};
    pub use crate::persistence::{FileBackend, MemoryBackend, Persistence, SnapshotBackend};
    pub use crate::pipeline::{export, import_bytes, ImportGate};
    pub use crate::sample::sample_experiment;
    pub use crate::store::{BootSource, ExperimentStore};
    pub use annotator_schema::{Annotation, Experiment, ExperimentEntry};
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use annotator_schema::Annotation;

    #[test]
    fn corrupt_snapshot_boots_sample_and_purges() {
        let backend = MemoryBackend::with_blob(DEFAULT_STORAGE_KEY, r#"{"name": "broken"}"#);
        let (store, source) =
            ExperimentStore::boot(Persistence::with_default_key(backend.clone()), sample_experiment());
        assert_eq!(source, BootSource::Fallback);
        assert_eq!(store.name(), "Sample Experiment");
        assert!(!backend.contains(DEFAULT_STORAGE_KEY));
    }

    #[test]
    fn keyboard_session_round_trip() {
        let backend = MemoryBackend::new();
        let (mut store, _) =
            ExperimentStore::boot(Persistence::with_default_key(backend.clone()), sample_experiment());

        dispatch(&mut store, &KeyEvent::global(Key::Char('Y')));
        dispatch(&mut store, &KeyEvent::global(Key::ArrowRight));
        dispatch(&mut store, &KeyEvent::global(Key::Char('n')));
        dispatch(&mut store, &KeyEvent::in_text_field(Key::Char('y')));

        assert_eq!(store.annotated_count(), 2);

        let (restored, source) = ExperimentStore::boot(
            Persistence::with_default_key(backend),
            annotator_schema::Experiment::empty(),
        );
        assert_eq!(source, BootSource::Restored);
        assert_eq!(restored.annotated_count(), 2);
        assert_eq!(restored.current_index(), 0);
        assert_eq!(
            restored.snapshot().entries()[1].annotation,
            Some(Annotation::Fail)
        );
    }

    #[test]
    fn dispatch_on_empty_store_is_suppressed() {
        let mut store = ExperimentStore::new(Persistence::with_default_key(MemoryBackend::new()));
        assert_eq!(
            dispatch(&mut store, &KeyEvent::global(Key::ArrowRight)),
            Dispatch::Suppressed(SuppressReason::NoData)
        );
    }
}
