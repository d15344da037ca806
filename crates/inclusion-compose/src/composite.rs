//! Composites: processes placed in the tree together with their wiring.
//!
//! A [`Composite`] keys every process by its absolute location (containing
//! node plus process name), so the process map and topology map always
//! share the same key set. Port paths stay relative to the containing node;
//! attaching a composite under a prefix moves the containing node, which
//! moves every resolved port path by the same prefix.

use std::fmt;

use indexmap::IndexMap;
use inclusion_core::{AbsolutePath, Config, Path, StateError, Tree, TreeExt, Value};
use tracing::debug;

use crate::error::ComposeError;
use crate::process::Process;
use crate::schema::{fill_defaults, PortSchema};
use crate::topology::{validate_wiring, Topology, Wiring};

/// Process name → process, as produced by a composer.
pub type Processes = IndexMap<String, Box<dyn Process>>;

/// Process location → resolved port paths.
pub type ResolvedTopology = IndexMap<AbsolutePath, IndexMap<String, AbsolutePath>>;

/// Process location → (process kind, wiring). Compares order-insensitively.
pub type Signature = IndexMap<AbsolutePath, (String, Wiring)>;

/// A process and the wiring of its ports.
pub struct Placement {
    process: Box<dyn Process>,
    wiring: Wiring,
}

impl Placement {
    /// Pair a process with its wiring.
    pub fn new(process: Box<dyn Process>, wiring: Wiring) -> Self {
        Self { process, wiring }
    }

    /// The process.
    pub fn process(&self) -> &dyn Process {
        self.process.as_ref()
    }

    /// Port name → relative path.
    pub fn wiring(&self) -> &Wiring {
        &self.wiring
    }
}

/// Processes and topology, keyed by location.
#[derive(Default)]
pub struct Composite {
    placements: IndexMap<AbsolutePath, Placement>,
}

impl Composite {
    /// An empty composite.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair a composer's processes with its topology at the root.
    ///
    /// Fails if the key sets differ or any process's wiring does not cover
    /// exactly its declared ports.
    pub fn from_parts(processes: Processes, mut topology: Topology) -> Result<Self, ComposeError> {
        if let Some(name) = topology.keys().find(|n| !processes.contains_key(*n)) {
            return Err(ComposeError::TopologyMismatch {
                process: name.clone(),
            });
        }
        let mut out = Self::new();
        for (name, process) in processes {
            let schema = process.ports_schema();
            let wiring = match topology.shift_remove(&name) {
                Some(w) => w,
                None => {
                    return Err(match schema.keys().next() {
                        Some(port) => ComposeError::MissingPortPath {
                            process: name,
                            port: port.clone(),
                        },
                        None => ComposeError::TopologyMismatch { process: name },
                    })
                }
            };
            validate_wiring(&name, &schema, &wiring)?;
            out.placements
                .insert(AbsolutePath::root().child(name), Placement::new(process, wiring));
        }
        Ok(out)
    }

    /// Add one placement.
    pub fn insert(&mut self, location: AbsolutePath, placement: Placement) -> Result<(), ComposeError> {
        if self.placements.contains_key(&location) {
            return Err(ComposeError::NameCollision { location });
        }
        self.placements.insert(location, placement);
        Ok(())
    }

    /// Remove and return the placement at `location`.
    pub fn remove(&mut self, location: &AbsolutePath) -> Option<Placement> {
        self.placements.shift_remove(location)
    }

    /// Number of processes.
    pub fn len(&self) -> usize {
        self.placements.len()
    }

    /// Whether there are no processes.
    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// Whether a process sits at `location`.
    pub fn contains(&self, location: &AbsolutePath) -> bool {
        self.placements.contains_key(location)
    }

    /// Process locations in insertion order.
    pub fn locations(&self) -> impl Iterator<Item = &AbsolutePath> {
        self.placements.keys()
    }

    /// `(location, placement)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&AbsolutePath, &Placement)> {
        self.placements.iter()
    }

    /// The placement at `location`.
    pub fn placement(&self, location: &AbsolutePath) -> Option<&Placement> {
        self.placements.get(location)
    }

    /// Location → process, in insertion order.
    pub fn processes(&self) -> impl Iterator<Item = (&AbsolutePath, &dyn Process)> {
        self.placements.iter().map(|(k, p)| (k, p.process()))
    }

    /// Process location → wiring.
    pub fn topology(&self) -> impl Iterator<Item = (&AbsolutePath, &Wiring)> {
        self.placements.iter().map(|(k, p)| (k, p.wiring()))
    }

    /// Absolute path bound to `port` of the process at `location`.
    pub fn port_path(&self, location: &AbsolutePath, port: &str) -> Result<AbsolutePath, ComposeError> {
        let placement = self
            .placements
            .get(location)
            .ok_or_else(|| ComposeError::UnknownProcess {
                location: location.clone(),
            })?;
        let relative = placement
            .wiring
            .get(port)
            .ok_or_else(|| ComposeError::MissingPortPath {
                process: location.to_string(),
                port: port.to_string(),
            })?;
        resolve_port(location, port, relative)
    }

    /// Every port of every process, resolved to an absolute path.
    pub fn resolved_topology(&self) -> Result<ResolvedTopology, ComposeError> {
        let mut out = ResolvedTopology::with_capacity(self.placements.len());
        for (location, placement) in &self.placements {
            let mut ports = IndexMap::with_capacity(placement.wiring.len());
            for (port, relative) in &placement.wiring {
                ports.insert(port.clone(), resolve_port(location, port, relative)?);
            }
            out.insert(location.clone(), ports);
        }
        Ok(out)
    }

    /// Fail with [`ComposeError::PathEscape`] if any port path climbs above
    /// the root.
    pub fn validate_paths(&self) -> Result<(), ComposeError> {
        self.resolved_topology().map(|_| ())
    }

    /// Move every process under `prefix`.
    pub fn rebased(self, prefix: &AbsolutePath) -> Self {
        if prefix.is_root() {
            return self;
        }
        Self {
            placements: self
                .placements
                .into_iter()
                .map(|(location, p)| (prefix.join(&location), p))
                .collect(),
        }
    }

    /// Attach `other` under `path`.
    ///
    /// Nothing is inserted unless every incoming location is free and every
    /// incoming port path resolves inside the tree.
    pub fn merge(&mut self, other: Composite, path: &AbsolutePath) -> Result<(), ComposeError> {
        let incoming = other.rebased(path);
        if let Some(location) = incoming.locations().find(|l| self.contains(l)) {
            return Err(ComposeError::NameCollision {
                location: location.clone(),
            });
        }
        incoming.validate_paths()?;
        debug!(at = %path, processes = incoming.len(), "merging composite");
        self.placements.extend(incoming.placements);
        Ok(())
    }

    /// Remove every process located under `prefix` and return them.
    pub fn detach(&mut self, prefix: &AbsolutePath) -> Composite {
        let (taken, kept): (IndexMap<_, _>, IndexMap<_, _>) = std::mem::take(&mut self.placements)
            .into_iter()
            .partition(|(location, _)| location.starts_with(prefix));
        self.placements = kept;
        Composite { placements: taken }
    }

    /// Assemble a state tree from each process's initial state.
    ///
    /// `config` is keyed by process name (the last segment of its location);
    /// each process receives its own section. Port values are written at the
    /// resolved port path, and branch values merge with whatever sibling
    /// processes already wrote there. Schema defaults then fill every
    /// variable no process chose a value for.
    pub fn initial_state(&self, config: &Config) -> Result<Tree, ComposeError> {
        let mut state = Tree::new();
        for (location, placement) in &self.placements {
            let name = location.last().unwrap_or_default();
            let section = config.section(name)?;
            let values = placement.process.initial_state(&section)?;
            for (port, value) in values {
                let relative =
                    placement
                        .wiring
                        .get(&port)
                        .ok_or_else(|| ComposeError::MissingPortPath {
                            process: name.to_string(),
                            port: port.clone(),
                        })?;
                let target = resolve_port(location, &port, relative)?;
                overlay(&mut state, &target, value)?;
            }
        }

        for (location, placement) in &self.placements {
            let schema = placement.process.ports_schema();
            let mut ports = IndexMap::with_capacity(schema.len());
            for (port, port_schema) in &schema {
                if matches!(port_schema, PortSchema::Glob) {
                    continue;
                }
                if let Some(relative) = placement.wiring.get(port) {
                    ports.insert(port.clone(), resolve_port(location, port, relative)?);
                }
            }
            fill_defaults(&mut state, &schema, &ports)?;
        }
        Ok(state)
    }

    /// Locations with process kind and wiring, for structural comparison.
    pub fn signature(&self) -> Signature {
        self.placements
            .iter()
            .map(|(location, p)| {
                (
                    location.clone(),
                    (p.process.name().to_string(), p.wiring.clone()),
                )
            })
            .collect()
    }

    /// Consume into the placement map.
    pub fn into_placements(self) -> IndexMap<AbsolutePath, Placement> {
        self.placements
    }
}

impl fmt::Debug for Composite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (location, p) in &self.placements {
            map.entry(&format_args!("{location}"), &p.process.name());
        }
        map.finish()
    }
}

/// Write `value` at `target`, merging maps into an existing branch.
pub(crate) fn overlay(state: &mut Tree, target: &AbsolutePath, value: Value) -> Result<(), ComposeError> {
    match value {
        Value::Map(branch) => {
            if target.is_root() {
                state.merge_deep(branch);
                return Ok(());
            }
            let mut patch = Tree::new();
            patch.place(target, Value::Map(branch))?;
            if let Some(blocking) = blocking_leaf(state, target) {
                return Err(StateError::NotABranch { path: blocking }.into());
            }
            state.merge_deep(patch);
        }
        leaf => {
            state.place(target, leaf)?;
        }
    }
    Ok(())
}

fn blocking_leaf(state: &Tree, target: &AbsolutePath) -> Option<AbsolutePath> {
    let mut at = AbsolutePath::root();
    for key in &target.segments()[..target.len().saturating_sub(1)] {
        at = at.child(key.clone());
        match state.lookup(&at) {
            Some(Value::Map(_)) => {}
            Some(_) => return Some(at),
            None => return None,
        }
    }
    None
}

fn resolve_port(location: &AbsolutePath, port: &str, relative: &Path) -> Result<AbsolutePath, ComposeError> {
    let base = location.parent().unwrap_or_default();
    base.resolve(relative)
        .map_err(|source| ComposeError::PathEscape {
            process: location.clone(),
            port: port.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{schema, PortSchema, Schema, Variable};
    use crate::topology::wiring;
    use crate::{StepContext, Update};
    use inclusion_core::{tree, ProcessError};

    struct Watcher {
        ports: Vec<&'static str>,
    }

    impl Process for Watcher {
        fn name(&self) -> &str {
            "watcher"
        }
        fn ports_schema(&self) -> Schema {
            schema(
                self.ports
                    .iter()
                    .map(|p| (*p, PortSchema::branch([("x", Variable::new(1.0))]))),
            )
        }
        fn next_update(&self, _ctx: &StepContext<'_>) -> Result<Update, ProcessError> {
            Ok(Update::new())
        }
    }

    fn watcher(ports: &[&'static str]) -> Box<dyn Process> {
        Box::new(Watcher {
            ports: ports.to_vec(),
        })
    }

    fn single(port_path: &[&str]) -> Composite {
        let mut processes = Processes::new();
        processes.insert("p".into(), watcher(&["a"]));
        let mut topology = Topology::new();
        topology.insert("p".into(), wiring([("a", Path::new(port_path.iter().copied()))]));
        Composite::from_parts(processes, topology).unwrap()
    }

    #[test]
    fn from_parts_rejects_mismatched_keys() {
        let mut processes = Processes::new();
        processes.insert("p".into(), watcher(&["a"]));
        let mut topology = Topology::new();
        topology.insert("q".into(), wiring([("a", Path::new(["x"]))]));
        assert_eq!(
            Composite::from_parts(processes, topology).unwrap_err(),
            ComposeError::TopologyMismatch {
                process: "q".into()
            }
        );

        let mut processes = Processes::new();
        processes.insert("p".into(), watcher(&["a"]));
        assert_eq!(
            Composite::from_parts(processes, Topology::new()).unwrap_err(),
            ComposeError::MissingPortPath {
                process: "p".into(),
                port: "a".into()
            }
        );
    }

    #[test]
    fn merge_prefixes_resolved_paths() {
        let mut root = Composite::new();
        root.merge(single(&["boundary"]), &AbsolutePath::new(["agents", "1"]))
            .unwrap();
        let loc = AbsolutePath::new(["agents", "1", "p"]);
        assert_eq!(
            root.port_path(&loc, "a").unwrap(),
            AbsolutePath::new(["agents", "1", "boundary"])
        );
    }

    #[test]
    fn merge_rejects_escape_and_collision_atomically() {
        let mut root = Composite::new();
        let err = root
            .merge(single(&["..", "..", "agents"]), &AbsolutePath::new(["x"]))
            .unwrap_err();
        assert!(matches!(err, ComposeError::PathEscape { .. }));
        assert!(root.is_empty());

        let at = AbsolutePath::new(["agents", "0"]);
        root.merge(single(&["boundary"]), &at).unwrap();
        assert_eq!(
            root.merge(single(&["boundary"]), &at).unwrap_err(),
            ComposeError::NameCollision {
                location: AbsolutePath::new(["agents", "0", "p"])
            }
        );
        assert_eq!(root.len(), 1);
    }

    #[test]
    fn detach_takes_subtree_only() {
        let mut root = Composite::new();
        root.merge(single(&["b"]), &AbsolutePath::new(["agents", "0"]))
            .unwrap();
        root.merge(single(&["b"]), &AbsolutePath::new(["agents", "1"]))
            .unwrap();
        let taken = root.detach(&AbsolutePath::new(["agents", "0"]));
        assert_eq!(taken.len(), 1);
        assert_eq!(root.len(), 1);
        assert!(root.contains(&AbsolutePath::new(["agents", "1", "p"])));
    }

    #[test]
    fn initial_state_merges_shared_branches() {
        let mut processes = Processes::new();
        processes.insert("p".into(), watcher(&["a"]));
        processes.insert("q".into(), watcher(&["a"]));
        let mut topology = Topology::new();
        topology.insert("p".into(), wiring([("a", Path::new(["shared"]))]));
        topology.insert("q".into(), wiring([("a", Path::new(["shared"]))]));
        let c = Composite::from_parts(processes, topology).unwrap();
        let state = c.initial_state(&Config::new()).unwrap();
        assert_eq!(state, tree([("shared", Value::Map(tree([("x", Value::from(1.0))])))]));
    }

    struct Seeded;

    impl Process for Seeded {
        fn name(&self) -> &str {
            "seeded"
        }
        fn ports_schema(&self) -> Schema {
            schema([("a", PortSchema::branch([("x", Variable::new(0.0))]))])
        }
        fn initial_state(&self, _config: &Config) -> Result<Tree, inclusion_core::ConfigError> {
            Ok(tree([("a", Value::Map(tree([("x", Value::from(5.0))])))]))
        }
        fn next_update(&self, _ctx: &StepContext<'_>) -> Result<Update, ProcessError> {
            Ok(Update::new())
        }
    }

    #[test]
    fn later_schema_defaults_do_not_overwrite_chosen_values() {
        let mut processes = Processes::new();
        processes.insert("seeded".into(), Box::new(Seeded));
        processes.insert("p".into(), watcher(&["a"]));
        let mut topology = Topology::new();
        topology.insert("seeded".into(), wiring([("a", Path::new(["shared"]))]));
        topology.insert("p".into(), wiring([("a", Path::new(["shared"]))]));
        let c = Composite::from_parts(processes, topology).unwrap();
        let state = c.initial_state(&Config::new()).unwrap();
        assert_eq!(state, tree([("shared", Value::Map(tree([("x", Value::from(5.0))])))]));
    }

    #[test]
    fn signature_ignores_order() {
        let mut a = Composite::new();
        a.merge(single(&["b"]), &AbsolutePath::new(["x"])).unwrap();
        a.merge(single(&["b"]), &AbsolutePath::new(["y"])).unwrap();
        let mut b = Composite::new();
        b.merge(single(&["b"]), &AbsolutePath::new(["y"])).unwrap();
        b.merge(single(&["b"]), &AbsolutePath::new(["x"])).unwrap();
        assert_eq!(a.signature(), b.signature());
    }
}
