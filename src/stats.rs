//! Timing records and per-trial aggregation
//!
//! Raw per-iteration timings are aggregated per trial into a median
//! record and a sum record. The median is the duration at sorted
//! position `len / 2` — for even counts this is the upper of the two
//! middle elements, never an average. Downstream comparability depends
//! on that exact tie-break, so do not "fix" it. The sum accumulates raw
//! durations in declared iteration order, independent of the sort.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::run::Run;
use crate::verify::Correctness;

/// What a timing record measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordKind {
    /// One kernel launch within a trial
    Raw,
    /// Synthetic per-trial median of the raw durations
    Median,
    /// Synthetic per-trial sum of the raw durations
    TrialSum,
}

/// One timing measurement, immutable once created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingRecord {
    /// Measured or aggregated duration
    pub duration: Duration,
    /// Correctness verdict attached to this record
    pub verdict: Correctness,
    /// Global work size of the run
    pub global: [usize; 3],
    /// Local work size of the run
    pub local: [usize; 3],
    /// Record kind
    pub kind: RecordKind,
    /// Trial index
    pub trial: u32,
    /// Iteration index; `None` for synthetic records
    pub iteration: Option<u32>,
}

impl TimingRecord {
    /// A raw per-iteration measurement
    #[must_use]
    pub fn raw(duration: Duration, run: &Run, trial: u32, iteration: u32) -> Self {
        Self {
            duration,
            verdict: Correctness::NotChecked,
            global: run.global,
            local: run.local,
            kind: RecordKind::Raw,
            trial,
            iteration: Some(iteration),
        }
    }

    /// The synthetic per-trial median record
    #[must_use]
    pub fn median(duration: Duration, verdict: Correctness, run: &Run, trial: u32) -> Self {
        Self {
            duration,
            verdict,
            global: run.global,
            local: run.local,
            kind: RecordKind::Median,
            trial,
            iteration: None,
        }
    }

    /// The synthetic per-trial sum record
    #[must_use]
    pub fn trial_sum(duration: Duration, verdict: Correctness, run: &Run, trial: u32) -> Self {
        Self {
            duration,
            verdict,
            global: run.global,
            local: run.local,
            kind: RecordKind::TrialSum,
            trial,
            iteration: None,
        }
    }
}

/// Median of the raw durations at sorted position `len / 2`
///
/// Returns zero for an empty slice (a trial always has at least one
/// launch, so this only arises in synthetic inputs).
#[must_use]
pub fn median_duration(records: &[TimingRecord]) -> Duration {
    let mut sorted: Vec<Duration> = records
        .iter()
        .filter(|r| r.kind == RecordKind::Raw)
        .map(|r| r.duration)
        .collect();
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    sorted.sort_unstable();
    sorted[sorted.len() / 2]
}

/// Sum of the raw durations in declared iteration order
#[must_use]
pub fn total_duration(records: &[TimingRecord]) -> Duration {
    records
        .iter()
        .filter(|r| r.kind == RecordKind::Raw)
        .map(|r| r.duration)
        .sum()
}
