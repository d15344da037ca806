//! Process output: port updates plus structural requests.

use indexmap::IndexMap;
use inclusion_core::{Path, Value};

use crate::composer::CompositeFactory;

/// What a process wants changed after one step.
#[derive(Debug, Default)]
pub struct Update {
    ports: IndexMap<String, Value>,
    structural: Vec<Structural>,
}

impl Update {
    /// An empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style port value.
    ///
    /// Branch ports take a [`Value::Map`] of variable deltas; glob ports
    /// take a map that is merged leaf by leaf.
    pub fn with(mut self, port: impl Into<String>, value: impl Into<Value>) -> Self {
        self.ports.insert(port.into(), value.into());
        self
    }

    /// Builder-style structural request.
    pub fn with_structural(mut self, request: Structural) -> Self {
        self.structural.push(request);
        self
    }

    /// Port values in insertion order.
    pub fn ports(&self) -> &IndexMap<String, Value> {
        &self.ports
    }

    /// Structural requests in insertion order.
    pub fn structural(&self) -> &[Structural] {
        &self.structural
    }

    /// Whether the update changes nothing.
    pub fn is_empty(&self) -> bool {
        self.ports.is_empty() && self.structural.is_empty()
    }

    /// Split into port values and structural requests.
    pub fn into_parts(self) -> (IndexMap<String, Value>, Vec<Structural>) {
        (self.ports, self.structural)
    }
}

/// A change to the tree's shape rather than its values.
#[derive(Debug)]
pub enum Structural {
    /// Replace one agent with freshly generated daughters.
    Divide(DivideRequest),
}

/// Remove `mother` from the collection behind `port` and add `daughters`.
#[derive(Debug)]
pub struct DivideRequest {
    /// The requesting process's port that points at the agents collection.
    pub port: String,
    /// Key of the dividing agent within that collection.
    pub mother: String,
    /// Agents to create in its place.
    pub daughters: Vec<Daughter>,
}

/// One daughter of a division.
#[derive(Debug)]
pub struct Daughter {
    /// Key within the agents collection.
    pub key: String,
    /// Generator for the daughter's processes and topology.
    pub factory: CompositeFactory,
    /// Where inside the daughter node the generated composite is placed.
    pub path: Path,
}
