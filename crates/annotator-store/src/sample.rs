//! Bundled sample experiment
//!
//! Shipped inside the binary and used whenever storage holds nothing usable.

use annotator_schema::{parse_experiment, Experiment};

/// Raw sample file
pub const SAMPLE_JSON: &str = include_str!("../assets/sample-experiment.json");

/// Validated sample experiment
///
/// The sample goes through the same validator as any import. Should it ever
/// fail, an empty experiment is returned and the failure logged.
#[must_use]
pub fn sample_experiment() -> Experiment {
    match parse_experiment(SAMPLE_JSON) {
        Ok(experiment) => experiment,
        Err(e) => {
            tracing::error!("Bundled sample is invalid: {}", e);
            Experiment::empty()
        }
    }
}
