//! Per-row results for bulk stock operations

use serde::{Deserialize, Serialize};

use super::stock::{StockMovement, StockState};

/// Why a single row in a batch was not applied
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RowFailureReason {
    NotFound,
    AlreadyInTargetState,
    /// Row is in a state the movement does not start from (e.g. returned)
    InvalidState,
    /// Row matched the required state on re-read but the conditional write missed it
    ConcurrentlyModified,
    /// Row belongs to a different cabinet than the request named
    WrongCabinet,
    /// Row input failed validation
    Invalid,
}

impl RowFailureReason {
    pub fn message(&self) -> &'static str {
        match self {
            RowFailureReason::NotFound => "row not found",
            RowFailureReason::AlreadyInTargetState => "row already in target state",
            RowFailureReason::InvalidState => "row is not in a state this operation applies to",
            RowFailureReason::ConcurrentlyModified => "row was modified concurrently",
            RowFailureReason::WrongCabinet => "row belongs to another cabinet",
            RowFailureReason::Invalid => "row input is invalid",
        }
    }
}

/// Classify a row whose conditional update touched nothing, from a fresh read
pub fn classify_unapplied(movement: StockMovement, current: Option<StockState>) -> RowFailureReason {
    match current {
        None => RowFailureReason::NotFound,
        Some(state) if state == movement.target_state() => RowFailureReason::AlreadyInTargetState,
        Some(state) if state == movement.required_state() => RowFailureReason::ConcurrentlyModified,
        Some(_) => RowFailureReason::InvalidState,
    }
}

/// A rejected row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RowFailure<K> {
    pub row_id: K,
    pub reason: RowFailureReason,
    pub message: String,
}

/// Successes and failures collected over a batch, in request order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchReport<K, S> {
    pub succeeded: Vec<S>,
    pub failed: Vec<RowFailure<K>>,
}

impl<K, S> Default for BatchReport<K, S> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<K, S> BatchReport<K, S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, row_id: K, outcome: Result<S, RowFailureReason>) {
        match outcome {
            Ok(success) => self.succeeded.push(success),
            Err(reason) => self.reject(row_id, reason, reason.message()),
        }
    }

    pub fn reject(&mut self, row_id: K, reason: RowFailureReason, message: impl Into<String>) {
        self.failed.push(RowFailure {
            row_id,
            reason,
            message: message.into(),
        });
    }

    /// Fold per-row outcomes into a report
    pub fn from_outcomes<I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = (K, Result<S, RowFailureReason>)>,
    {
        outcomes.into_iter().fold(Self::new(), |mut report, (id, outcome)| {
            report.record(id, outcome);
            report
        })
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}
