//! Timestamped trajectory of full-tree snapshots.

use inclusion_core::{AbsolutePath, StepId, Tree, TreeExt, Value};

/// One emitted snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    /// Simulated time of the snapshot.
    pub time: f64,
    /// Steps completed at the snapshot.
    pub step: StepId,
    /// The full state tree.
    pub state: Tree,
}

/// Snapshots in emission order.
#[derive(Clone, Debug, Default)]
pub struct Trajectory {
    records: Vec<Record>,
}

impl Trajectory {
    /// An empty trajectory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a snapshot.
    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    /// All snapshots.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of snapshots.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing was emitted.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The most recent snapshot.
    pub fn last(&self) -> Option<&Record> {
        self.records.last()
    }

    /// Emission times.
    pub fn times(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.time).collect()
    }

    /// `(time, value)` for every snapshot holding a float at `path`.
    pub fn series(&self, path: &AbsolutePath) -> Vec<(f64, f64)> {
        self.records
            .iter()
            .filter_map(|r| r.state.lookup(path).and_then(Value::as_f64).map(|v| (r.time, v)))
            .collect()
    }
}
