//! Import/Export Pipeline
//!
//! Ingress: bytes → UTF-8 → JSON → validator → [`ExperimentStore::replace`].
//! Any failure before the last step leaves the store exactly as it was.
//!
//! Egress: current store state → pretty JSON → `experiment_YYYY-MM-DD.json`.
//! Export is a pure read; it neither mutates the store nor persists.
//!
//! Reading the source file is the only suspension point. When imports
//! overlap, an [`ImportGate`] makes the most recently started one the only
//! one allowed to apply its result.

use crate::error::{ExportError, ImportError};
use crate::persistence::{atomic_write, SnapshotBackend};
use crate::store::ExperimentStore;
use annotator_schema::{parse_experiment_bytes, Experiment};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// What a successful import loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    /// Experiment name
    pub name: String,
    /// Number of entries
    pub entries: usize,
    /// Entries that already carried a verdict
    pub annotated: usize,
}

impl ImportReport {
    fn of(experiment: &Experiment) -> Self {
        Self {
            name: experiment.name.clone(),
            entries: experiment.len(),
            annotated: experiment.annotated_count(),
        }
    }
}

/// Read raw bytes from `path`
///
/// # Errors
/// Returns [`ImportError::Read`] if the file cannot be read.
pub async fn read_source(path: impl AsRef<Path>) -> Result<Vec<u8>, ImportError> {
    let path = path.as_ref();
    tokio::fs::read(path)
        .await
        .map_err(|e| ImportError::read_error(path, e))
}

/// Decode and validate without touching any store
///
/// # Errors
/// Returns [`ImportError::InvalidJson`] for bytes that are not UTF-8 JSON and
/// [`ImportError::Schema`] with every violation otherwise.
pub fn decode(bytes: &[u8]) -> Result<Experiment, ImportError> {
    parse_experiment_bytes(bytes).map_err(ImportError::from)
}

/// Validate `bytes` and, only on success, replace the store's experiment
///
/// # Errors
/// See [`decode`]. On error the store is untouched.
pub fn import_bytes<B: SnapshotBackend>(
    store: &mut ExperimentStore<B>,
    bytes: &[u8],
) -> Result<ImportReport, ImportError> {
    let experiment = match decode(bytes) {
        Ok(experiment) => experiment,
        Err(e) => {
            tracing::warn!("Import rejected: {}", e);
            return Err(e);
        }
    };
    let report = ImportReport::of(&experiment);
    store.replace(experiment);
    Ok(report)
}

/// Read `path` and import it
///
/// # Errors
/// Returns [`ImportError::Read`] if the file cannot be read, otherwise as
/// [`import_bytes`].
pub async fn import_file<B: SnapshotBackend>(
    store: &mut ExperimentStore<B>,
    path: impl AsRef<Path>,
) -> Result<ImportReport, ImportError> {
    let bytes = read_source(path).await?;
    import_bytes(store, &bytes)
}

/// Token identifying one started import
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImportTicket(u64);

impl ImportTicket {
    /// Sequence number (starts at 1)
    #[inline]
    #[must_use]
    pub fn sequence(self) -> u64 {
        self.0
    }
}

/// Result of completing a gated import
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// Store now holds the imported experiment
    Applied(ImportReport),
    /// A later import was started first; result discarded
    Superseded,
}

/// Latest-started-wins arbitration between overlapping imports
#[derive(Debug, Default)]
pub struct ImportGate {
    latest: AtomicU64,
}

impl ImportGate {
    /// Create gate with no imports started
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new import; every earlier ticket becomes stale
    pub fn begin(&self) -> ImportTicket {
        ImportTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Check whether `ticket` is still the most recent one
    #[must_use]
    pub fn is_current(&self, ticket: ImportTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    /// Apply the read result for `ticket` if it is still current
    ///
    /// A stale ticket yields [`ImportOutcome::Superseded`] whatever the read
    /// produced, and the store is left alone.
    ///
    /// # Errors
    /// Returns the read or validation error of a current ticket.
    pub fn complete<B: SnapshotBackend>(
        &self,
        store: &mut ExperimentStore<B>,
        ticket: ImportTicket,
        read: Result<Vec<u8>, ImportError>,
    ) -> Result<ImportOutcome, ImportError> {
        if !self.is_current(ticket) {
            tracing::debug!("Discarding superseded import #{}", ticket.0);
            return Ok(ImportOutcome::Superseded);
        }
        let bytes = read?;
        import_bytes(store, &bytes).map(ImportOutcome::Applied)
    }

    /// Start, read and complete one import of `path`
    ///
    /// # Errors
    /// As [`ImportGate::complete`].
    pub async fn import_file<B: SnapshotBackend>(
        &self,
        store: &mut ExperimentStore<B>,
        path: impl AsRef<Path>,
    ) -> Result<ImportOutcome, ImportError> {
        let ticket = self.begin();
        let read = read_source(path).await;
        self.complete(store, ticket, read)
    }
}

/// Serialized experiment ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    /// `experiment_YYYY-MM-DD.json`
    pub file_name: String,
    /// Pretty JSON with a trailing newline
    pub contents: String,
}

/// Download name for an export made on `date`
#[must_use]
pub fn export_file_name(date: NaiveDate) -> String {
    format!("experiment_{}.json", date.format("%Y-%m-%d"))
}

/// Serialize the current experiment
///
/// # Errors
/// Returns [`ExportError::NothingLoaded`] when the store has no entries.
pub fn export<B: SnapshotBackend>(
    store: &ExperimentStore<B>,
    date: NaiveDate,
) -> Result<ExportFile, ExportError> {
    let experiment = store
        .to_experiment()
        .filter(|e| !e.is_empty())
        .ok_or(ExportError::NothingLoaded)?;
    let mut contents = serde_json::to_string_pretty(&experiment)?;
    contents.push('\n');
    Ok(ExportFile {
        file_name: export_file_name(date),
        contents,
    })
}

/// [`export`] dated with the current UTC calendar day
///
/// # Errors
/// As [`export`].
pub fn export_today<B: SnapshotBackend>(store: &ExperimentStore<B>) -> Result<ExportFile, ExportError> {
    export(store, chrono::Utc::now().date_naive())
}

/// Write `file` into `dir`; returns the full path
///
/// # Errors
/// Returns [`ExportError::Io`] if the file cannot be written.
pub fn write_export(dir: impl AsRef<Path>, file: &ExportFile) -> Result<PathBuf, ExportError> {
    let path = dir.as_ref().join(&file.file_name);
    atomic_write(&path, file.contents.as_bytes()).map_err(|e| ExportError::io_error(&path, e))?;
    tracing::info!("Exported {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{MemoryBackend, MockSnapshotBackend, Persistence};
    use annotator_schema::Annotation;

    const TWO_ENTRIES: &str = r#"{
        "name": "pair",
        "entries": [
            {"id": "a", "messages": [], "baseline_answer": "b", "candidate_answer": "c"},
            {"id": "b", "messages": [], "baseline_answer": "b", "candidate_answer": "c"}
        ]
    }"#;

    fn store() -> ExperimentStore<MemoryBackend> {
        ExperimentStore::new(Persistence::with_default_key(MemoryBackend::new()))
    }

    #[test]
    fn import_reports_counts() {
        let mut store = store();
        let report = import_bytes(&mut store, TWO_ENTRIES.as_bytes()).unwrap();
        assert_eq!(
            report,
            ImportReport {
                name: "pair".into(),
                entries: 2,
                annotated: 0
            }
        );
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn invalid_json_keeps_prior_state() {
        let mut store = store();
        import_bytes(&mut store, TWO_ENTRIES.as_bytes()).unwrap();
        store.next();
        store.toggle_annotation(Annotation::Pass);

        let err = import_bytes(&mut store, b"{ nope").unwrap_err();
        assert!(matches!(err, ImportError::InvalidJson(_)));
        assert_eq!(store.current_index(), 1);
        assert_eq!(store.annotated_count(), 1);
    }

    #[test]
    fn export_file_name_format() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(export_file_name(date), "experiment_2024-03-07.json");
    }

    #[test]
    fn export_of_empty_store_is_refused() {
        let store = store();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(matches!(export(&store, date), Err(ExportError::NothingLoaded)));
    }

    #[test]
    fn export_is_two_space_pretty_with_newline() {
        let mut store = store();
        import_bytes(&mut store, TWO_ENTRIES.as_bytes()).unwrap();
        let file = export(&store, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()).unwrap();
        assert!(file.contents.starts_with("{\n  \"name\": \"pair\",\n  \"entries\": ["));
        assert!(file.contents.ends_with("}\n"));
        assert!(!file.contents.contains("null"));
    }

    #[test]
    fn export_does_not_persist() {
        let mut backend = MockSnapshotBackend::new();
        backend.expect_write().times(1).returning(|_, _| Ok(()));
        let mut store = ExperimentStore::new(Persistence::with_default_key(backend));
        import_bytes(&mut store, TWO_ENTRIES.as_bytes()).unwrap();
        let before = store.snapshot();
        export_today(&store).unwrap();
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn stale_ticket_is_superseded() {
        let gate = ImportGate::new();
        let mut store = store();
        let first = gate.begin();
        let second = gate.begin();
        assert!(second > first);
        assert!(!gate.is_current(first));

        let outcome = gate
            .complete(&mut store, first, Ok(TWO_ENTRIES.as_bytes().to_vec()))
            .unwrap();
        assert_eq!(outcome, ImportOutcome::Superseded);
        assert!(!store.is_loaded());

        let outcome = gate
            .complete(&mut store, second, Ok(TWO_ENTRIES.as_bytes().to_vec()))
            .unwrap();
        assert!(matches!(outcome, ImportOutcome::Applied(_)));
        assert_eq!(store.name(), "pair");
    }

    #[test]
    fn stale_read_error_is_not_surfaced() {
        let gate = ImportGate::new();
        let mut store = store();
        let first = gate.begin();
        let _second = gate.begin();
        let read = Err(ImportError::read_error(
            "gone.json",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        ));
        assert_eq!(gate.complete(&mut store, first, read).unwrap(), ImportOutcome::Superseded);
    }

    #[test]
    fn write_export_lands_in_dir() {
        let dir = tempfile::tempdir().unwrap();
        let file = ExportFile {
            file_name: "experiment_2024-01-01.json".into(),
            contents: "{}\n".into(),
        };
        let path = write_export(dir.path(), &file).unwrap();
        assert_eq!(path, dir.path().join("experiment_2024-01-01.json"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "{}\n");
    }
}
