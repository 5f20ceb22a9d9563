//! Testing utilities for the Eval Annotator workspace
//!
//! Shared fixtures for experiments, raw entry JSON, and memory-backed stores.

#![allow(missing_docs)]

use annotator_schema::{Annotation, Experiment, ExperimentEntry, Message};
use annotator_store::{ExperimentStore, MemoryBackend, Persistence};
use serde_json::{json, Value};

pub fn create_test_entry(id: &str) -> ExperimentEntry {
    ExperimentEntry::new(
        id,
        vec![Message::user(format!("question {id}"))],
        "baseline",
        "candidate",
    )
}

pub fn create_test_experiment(entries: usize) -> Experiment {
    let entries = (0..entries)
        .map(|i| create_test_entry(&format!("e{i}")))
        .collect();
    Experiment::new("test experiment", entries)
}

/// Two unannotated entries, as in the walkthrough scenario
pub fn create_two_entry_experiment() -> Experiment {
    create_test_experiment(2)
}

pub fn create_annotated_experiment(verdicts: &[Option<Annotation>]) -> Experiment {
    let entries = verdicts
        .iter()
        .enumerate()
        .map(|(i, verdict)| {
            let entry = create_test_entry(&format!("e{i}"));
            match verdict {
                Some(v) => entry.with_annotation(*v),
                None => entry,
            }
        })
        .collect();
    Experiment::new("annotated", entries)
}

pub fn entry_json(id: &str) -> Value {
    json!({
        "id": id,
        "messages": [{ "role": "user", "content": "hi" }],
        "baseline_answer": "baseline",
        "candidate_answer": "candidate"
    })
}

pub fn experiment_json(name: &str, entries: Vec<Value>) -> Value {
    json!({ "name": name, "entries": entries })
}

pub fn experiment_bytes(value: &Value) -> Vec<u8> {
    serde_json::to_vec(value).unwrap()
}

/// File whose first message has a role outside the allowed set
pub fn system_role_bytes() -> Vec<u8> {
    let mut entry = entry_json("bad");
    entry["messages"][0]["role"] = json!("system");
    experiment_bytes(&experiment_json("bad", vec![entry]))
}

pub fn memory_store() -> (ExperimentStore<MemoryBackend>, MemoryBackend) {
    let backend = MemoryBackend::new();
    let store = ExperimentStore::new(Persistence::with_default_key(backend.clone()));
    (store, backend)
}

pub fn memory_store_with(experiment: Experiment) -> (ExperimentStore<MemoryBackend>, MemoryBackend) {
    let (mut store, backend) = memory_store();
    store.replace(experiment);
    (store, backend)
}
