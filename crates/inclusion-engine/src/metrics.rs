//! Per-step metrics and division records.

use inclusion_core::{AbsolutePath, StepId};

/// Timing and structural counters collected during a single step.
///
/// All durations are in microseconds.
#[derive(Clone, Debug, Default)]
pub struct StepMetrics {
    /// Wall-clock time for the entire step, in microseconds.
    pub total_us: u64,
    /// Per-process execution times: `(location, microseconds)`.
    pub process_us: Vec<(String, u64)>,
    /// Number of leaf values written by process updates.
    pub updates_applied: usize,
    /// Number of divisions applied.
    pub divisions: usize,
    /// Number of agent nodes created by divisions.
    pub agents_added: usize,
    /// Number of agent nodes removed by divisions.
    pub agents_removed: usize,
}

/// One applied division.
#[derive(Clone, Debug, PartialEq)]
pub struct DivisionEvent {
    /// The step the division was applied in.
    pub step: StepId,
    /// Simulated time at the end of that step.
    pub time: f64,
    /// The removed agent node.
    pub mother: AbsolutePath,
    /// The created agent nodes.
    pub daughters: Vec<AbsolutePath>,
}
