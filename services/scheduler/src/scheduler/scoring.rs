//! Dock scoring.
//!
//! Lower weight is better. A dock pays the history penalty unless it is the
//! caller's previous dock, which gives requests affinity to where they ran last.

use crate::registry::DockRecord;

use super::{SchedulerError, SchedulerResult, SelectionHint};

/// Scoring coefficients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    pub build: f64,
    pub container: f64,
    pub history: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            build: 1.0,
            container: 1.0,
            history: 0.5,
        }
    }
}

impl Weights {
    /// Every coefficient must be finite and non-negative.
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("build", self.build),
            ("container", self.container),
            ("history", self.history),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{name} weight must be a non-negative number, got {value}"));
            }
        }
        Ok(())
    }
}

/// Weight of `record` for `hint`.
pub fn weight(weights: &Weights, hint: &SelectionHint, record: &DockRecord) -> f64 {
    let history = if hint.prev_dock.as_deref() == Some(record.host.as_str()) {
        0.0
    } else {
        weights.history
    };

    record.num_builds as f64 * weights.build
        + record.num_containers as f64 * weights.container
        + history
}

/// The lowest weighted record. Ties keep the record seen first.
pub fn select_optimal<'a>(
    weights: &Weights,
    hint: &SelectionHint,
    records: &'a [DockRecord],
) -> SchedulerResult<&'a DockRecord> {
    let mut best: Option<(&DockRecord, f64)> = None;
    for record in records {
        let score = weight(weights, hint, record);
        match best {
            Some((_, best_score)) if score >= best_score => {}
            _ => best = Some((record, score)),
        }
    }
    best.map(|(record, _)| record)
        .ok_or(SchedulerError::NoDocksAvailable)
}
