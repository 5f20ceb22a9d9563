//! Experiment Store
//!
//! Owns the current experiment (or nothing), the cursor, and every mutation.
//!
//! # Snapshots
//!
//! Entries live in an [`im::Vector`]. A mutation touches only the chunk
//! holding the current entry, and every [`StoreSnapshot`] taken earlier keeps
//! seeing the entries exactly as they were when it was taken.
//!
//! # Persistence
//!
//! Each successful mutation (`replace`, `toggle_annotation`, `update_notes`)
//! is written through to the [`Persistence`] adapter. Navigation does not
//! change the experiment and is not persisted. `clear` purges the snapshot.

use crate::navigation::Cursor;
use crate::persistence::{Persistence, SnapshotBackend};
use annotator_schema::{Annotation, Experiment, ExperimentEntry};
use std::fmt::{self, Display, Formatter};

/// Name shown when nothing is loaded
pub const NO_DATASET_NAME: &str = "No Dataset";

/// Where the booted experiment came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootSource {
    /// Valid snapshot found in storage
    Restored,
    /// No usable snapshot; fallback experiment loaded
    Fallback,
}

#[derive(Debug, Clone)]
struct Loaded {
    name: String,
    entries: im::Vector<ExperimentEntry>,
}

impl Loaded {
    fn from_experiment(experiment: Experiment) -> Self {
        Self {
            name: experiment.name,
            entries: experiment.entries.into_iter().collect(),
        }
    }

    fn to_experiment(&self) -> Experiment {
        Experiment::new(self.name.clone(), self.entries.iter().cloned().collect())
    }
}

/// Immutable view of the store at one instant
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSnapshot {
    name: Option<String>,
    entries: im::Vector<ExperimentEntry>,
    current_index: usize,
}

impl StoreSnapshot {
    /// Experiment name; `None` when nothing was loaded
    #[inline]
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Entries at snapshot time
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &im::Vector<ExperimentEntry> {
        &self.entries
    }

    /// Cursor at snapshot time
    #[inline]
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Count of annotated entries at snapshot time
    #[must_use]
    pub fn annotated_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_annotated()).count()
    }

    /// Materialize as a plain experiment
    #[must_use]
    pub fn to_experiment(&self) -> Option<Experiment> {
        self.name
            .as_ref()
            .map(|name| Experiment::new(name.clone(), self.entries.iter().cloned().collect()))
    }
}

/// Annotation progress (`annotated/total`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    /// Entries with a verdict
    pub annotated: usize,
    /// All entries
    pub total: usize,
}

impl Progress {
    /// Completed share in percent; `0.0` when there are no entries
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.annotated as f64 / self.total as f64 * 100.0
        }
    }

    /// Every entry has a verdict (and there is at least one)
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.annotated == self.total
    }
}

impl Display for Progress {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.annotated, self.total)
    }
}

/// The experiment state engine
#[derive(Debug)]
pub struct ExperimentStore<B: SnapshotBackend> {
    state: Option<Loaded>,
    cursor: Cursor,
    persistence: Persistence<B>,
}

impl<B: SnapshotBackend> ExperimentStore<B> {
    /// Create store with nothing loaded
    #[inline]
    #[must_use]
    pub fn new(persistence: Persistence<B>) -> Self {
        Self {
            state: None,
            cursor: Cursor::default(),
            persistence,
        }
    }

    /// Create store from the stored snapshot, or `fallback` when there is none
    ///
    /// This is the only place [`Persistence::load`] runs. Booting is not a
    /// mutation and does not write the snapshot back.
    #[must_use]
    pub fn boot(persistence: Persistence<B>, fallback: Experiment) -> (Self, BootSource) {
        let (experiment, source) = match persistence.load() {
            Some(restored) => (restored, BootSource::Restored),
            None => {
                tracing::info!("Using fallback experiment '{}'", fallback.name);
                (fallback, BootSource::Fallback)
            }
        };
        let mut store = Self::new(persistence);
        store.install(experiment);
        (store, source)
    }

    /// Swap in a whole new experiment and reset the cursor
    pub fn replace(&mut self, experiment: Experiment) {
        tracing::info!(
            "Loaded experiment '{}' with {} entries",
            experiment.name,
            experiment.len()
        );
        self.install(experiment);
        self.persist();
    }

    fn install(&mut self, experiment: Experiment) {
        let loaded = Loaded::from_experiment(experiment);
        self.cursor = Cursor::new(loaded.entries.len());
        self.state = Some(loaded);
    }

    /// Drop the experiment, reset the cursor, and purge the stored snapshot
    pub fn clear(&mut self) {
        tracing::info!("Clearing experiment and stored snapshot");
        self.state = None;
        self.cursor = Cursor::default();
        self.persistence.purge();
    }

    /// Toggle the verdict on the current entry
    ///
    /// Same verdict as stored → unset; anything else → `verdict`.
    /// Returns `false` (and does nothing) when no entry is current.
    pub fn toggle_annotation(&mut self, verdict: Annotation) -> bool {
        let updated = self.update_current(|entry| {
            entry.annotation = if entry.annotation == Some(verdict) {
                None
            } else {
                Some(verdict)
            };
            tracing::debug!(
                "Entry '{}' annotation -> {}",
                entry.id,
                entry.annotation.map_or("unset", Annotation::as_str)
            );
        });
        if updated {
            self.persist();
        }
        updated
    }

    /// Replace the current entry's notes verbatim
    ///
    /// Returns `false` (and does nothing) when no entry is current.
    pub fn update_notes(&mut self, text: impl Into<String>) -> bool {
        let text = text.into();
        let updated = self.update_current(move |entry| entry.notes = Some(text));
        if updated {
            self.persist();
        }
        updated
    }

    fn update_current(&mut self, f: impl FnOnce(&mut ExperimentEntry)) -> bool {
        let index = self.cursor.index();
        match self
            .state
            .as_mut()
            .and_then(|loaded| loaded.entries.get_mut(index))
        {
            Some(entry) => {
                f(entry);
                true
            }
            None => false,
        }
    }

    fn persist(&self) {
        if let Some(loaded) = &self.state {
            self.persistence.save(&loaded.to_experiment());
        }
    }

    /// Move to the previous entry; returns whether the cursor moved
    pub fn previous(&mut self) -> bool {
        let moved = self.cursor.previous();
        if moved {
            tracing::debug!("Cursor -> {}", self.cursor.index());
        }
        moved
    }

    /// Move to the next entry; returns whether the cursor moved
    pub fn next(&mut self) -> bool {
        let moved = self.cursor.next();
        if moved {
            tracing::debug!("Cursor -> {}", self.cursor.index());
        }
        moved
    }

    /// Count of entries carrying a verdict, recomputed on every call
    #[must_use]
    pub fn annotated_count(&self) -> usize {
        self.state.as_ref().map_or(0, |loaded| {
            loaded.entries.iter().filter(|e| e.is_annotated()).count()
        })
    }

    /// Annotated vs total entries
    #[must_use]
    pub fn progress(&self) -> Progress {
        Progress {
            annotated: self.annotated_count(),
            total: self.len(),
        }
    }

    /// Cursor state
    #[inline]
    #[must_use]
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Current index
    #[inline]
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.cursor.index()
    }

    /// Entry under the cursor
    #[must_use]
    pub fn current_entry(&self) -> Option<&ExperimentEntry> {
        self.state
            .as_ref()
            .and_then(|loaded| loaded.entries.get(self.cursor.index()))
    }

    /// Experiment name, or [`NO_DATASET_NAME`]
    #[must_use]
    pub fn name(&self) -> &str {
        self.state
            .as_ref()
            .map_or(NO_DATASET_NAME, |loaded| loaded.name.as_str())
    }

    /// Number of entries (0 when nothing is loaded)
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.as_ref().map_or(0, |loaded| loaded.entries.len())
    }

    /// No entries to annotate (nothing loaded, or zero entries)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// An experiment is loaded (possibly with zero entries)
    #[inline]
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.state.is_some()
    }

    /// Consistent point-in-time view
    #[must_use]
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            name: self.state.as_ref().map(|loaded| loaded.name.clone()),
            entries: self
                .state
                .as_ref()
                .map(|loaded| loaded.entries.clone())
                .unwrap_or_default(),
            current_index: self.cursor.index(),
        }
    }

    /// Current experiment as a plain value
    #[must_use]
    pub fn to_experiment(&self) -> Option<Experiment> {
        self.state.as_ref().map(Loaded::to_experiment)
    }

    /// Persistence adapter
    #[inline]
    #[must_use]
    pub fn persistence(&self) -> &Persistence<B> {
        &self.persistence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{MemoryBackend, MockSnapshotBackend, DEFAULT_STORAGE_KEY};
    use annotator_schema::Message;

    fn two_entries() -> Experiment {
        Experiment::new(
            "pair",
            vec![
                ExperimentEntry::new("a", vec![Message::user("1")], "x", "y"),
                ExperimentEntry::new("b", vec![Message::user("2")], "x", "y"),
            ],
        )
    }

    fn store() -> (ExperimentStore<MemoryBackend>, MemoryBackend) {
        let backend = MemoryBackend::new();
        let store = ExperimentStore::new(Persistence::with_default_key(backend.clone()));
        (store, backend)
    }

    #[test]
    fn mutations_on_empty_store_are_noops() {
        let (mut store, backend) = store();
        assert!(!store.toggle_annotation(Annotation::Pass));
        assert!(!store.update_notes("x"));
        assert!(!store.next());
        assert!(!store.previous());
        assert_eq!(store.annotated_count(), 0);
        assert_eq!(store.name(), NO_DATASET_NAME);
        assert_eq!(store.progress().to_string(), "0/0");
        assert!(!backend.contains(DEFAULT_STORAGE_KEY));
    }

    #[test]
    fn toggle_semantics() {
        let (mut store, _) = store();
        store.replace(two_entries());

        store.toggle_annotation(Annotation::Pass);
        assert_eq!(store.current_entry().unwrap().annotation, Some(Annotation::Pass));
        store.toggle_annotation(Annotation::Pass);
        assert_eq!(store.current_entry().unwrap().annotation, None);

        store.toggle_annotation(Annotation::Pass);
        store.toggle_annotation(Annotation::Fail);
        assert_eq!(store.current_entry().unwrap().annotation, Some(Annotation::Fail));
    }

    #[test]
    fn notes_are_stored_verbatim() {
        let (mut store, _) = store();
        store.replace(two_entries());
        store.update_notes("  spaced \n");
        assert_eq!(store.current_entry().unwrap().notes.as_deref(), Some("  spaced \n"));
        store.update_notes("");
        assert_eq!(store.current_entry().unwrap().notes.as_deref(), Some(""));
    }

    #[test]
    fn replace_resets_cursor() {
        let (mut store, _) = store();
        store.replace(two_entries());
        store.next();
        assert_eq!(store.current_index(), 1);
        store.replace(two_entries());
        assert_eq!(store.current_index(), 0);
    }

    #[test]
    fn snapshots_are_not_torn_by_later_mutations() {
        let (mut store, _) = store();
        store.replace(two_entries());
        let before = store.snapshot();
        store.toggle_annotation(Annotation::Fail);
        store.update_notes("after");
        let after = store.snapshot();

        assert_eq!(before.annotated_count(), 0);
        assert_eq!(before.entries()[0].notes, None);
        assert_eq!(after.annotated_count(), 1);
        assert_eq!(after.entries()[0].notes.as_deref(), Some("after"));
        assert_eq!(before.entries()[1], after.entries()[1]);
    }

    #[test]
    fn every_mutation_writes_through() {
        let mut backend = MockSnapshotBackend::new();
        backend.expect_write().times(3).returning(|_, _| Ok(()));
        let mut store = ExperimentStore::new(Persistence::with_default_key(backend));
        store.replace(two_entries());
        store.toggle_annotation(Annotation::Pass);
        store.next();
        store.previous();
        store.update_notes("n");
    }

    #[test]
    fn clear_purges_and_empties() {
        let (mut store, backend) = store();
        store.replace(two_entries());
        store.next();
        assert!(backend.contains(DEFAULT_STORAGE_KEY));

        store.clear();
        assert!(!store.is_loaded());
        assert!(store.is_empty());
        assert_eq!(store.current_index(), 0);
        assert!(!backend.contains(DEFAULT_STORAGE_KEY));
    }

    #[test]
    fn zero_entry_experiment_is_loaded_but_empty() {
        let (mut store, backend) = store();
        store.replace(Experiment::new("blank", vec![]));
        assert!(store.is_loaded());
        assert!(store.is_empty());
        assert_eq!(store.name(), "blank");
        assert!(store.current_entry().is_none());
        assert!(!backend.contains(DEFAULT_STORAGE_KEY));
    }

    #[test]
    fn boot_prefers_stored_snapshot() {
        let blob = serde_json::to_string(&two_entries()).unwrap();
        let backend = MemoryBackend::with_blob(DEFAULT_STORAGE_KEY, blob);
        let fallback = Experiment::new("fallback", vec![]);
        let (store, source) = ExperimentStore::boot(Persistence::with_default_key(backend), fallback);
        assert_eq!(source, BootSource::Restored);
        assert_eq!(store.name(), "pair");
    }

    #[test]
    fn progress_percent() {
        let (mut store, _) = store();
        store.replace(two_entries());
        store.toggle_annotation(Annotation::Pass);
        let progress = store.progress();
        assert_eq!(progress.to_string(), "1/2");
        assert!((progress.percent() - 50.0).abs() < f64::EPSILON);
        assert!(!progress.is_complete());
    }
}
