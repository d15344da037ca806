//! Lockstep engine: the single-threaded simulation loop.
//!
//! [`Engine`] owns a composite and its state tree and executes steps
//! synchronously with rollback atomicity. Each step:
//!
//! 1. runs every non-deriver against the committed state,
//! 2. applies their port updates to a working copy,
//! 3. applies structural updates (division),
//! 4. runs derivers in order against the working copy,
//! 5. commits, advances time, and emits a snapshot.
//!
//! If any phase fails, the committed state, clock, and process set are
//! restored and the error is returned.

use std::fmt;
use std::time::Instant;

use indexmap::IndexMap;
use inclusion_compose::{
    schema, ComposeError, Composite, DivideRequest, PortSchema, Process, Schema, StepContext,
    Structural, Update,
};
use inclusion_core::{AbsolutePath, StateError, StepId, Tree, TreeExt, Value};
use tracing::{debug, info, warn};

use crate::config::{ConfigError, EngineConfig, StepError};
use crate::division::{collect_dividers, divide_state, Dividers};
use crate::emitter::{Record, Trajectory};
use crate::metrics::{DivisionEvent, StepMetrics};

// ── Slot ─────────────────────────────────────────────────────────

/// Per-process data the engine precomputes from the composite.
struct Slot {
    location: AbsolutePath,
    ports: IndexMap<String, AbsolutePath>,
    schema: Schema,
    deriver: bool,
}

fn index(composite: &Composite) -> Result<Vec<Slot>, ComposeError> {
    let mut resolved = composite.resolved_topology()?;
    Ok(composite
        .processes()
        .map(|(location, process)| Slot {
            location: location.clone(),
            ports: resolved.shift_remove(location).unwrap_or_default(),
            schema: process.ports_schema(),
            deriver: process.is_deriver(),
        })
        .collect())
}

// ── Undo log ─────────────────────────────────────────────────────

/// Composite changes made during a step, for rollback.
#[derive(Default)]
struct Undo {
    removed: Vec<Composite>,
    added: Vec<AbsolutePath>,
}

// ── StepReport ───────────────────────────────────────────────────

/// Result of a successful step.
#[derive(Debug)]
pub struct StepReport {
    /// Steps completed after this one.
    pub step: StepId,
    /// Simulated time after this step.
    pub time: f64,
    /// Divisions applied during this step.
    pub divisions: Vec<DivisionEvent>,
    /// Metrics for this step.
    pub metrics: StepMetrics,
}

// ── Engine ───────────────────────────────────────────────────────

/// Single-threaded lockstep engine.
pub struct Engine {
    composite: Composite,
    slots: Vec<Slot>,
    state: Tree,
    step: StepId,
    time: f64,
    timestep: f64,
    emit_every: u64,
    trajectory: Trajectory,
    divisions: Vec<DivisionEvent>,
    last_metrics: StepMetrics,
}

impl Engine {
    /// Construct an engine from an [`EngineConfig`].
    ///
    /// Validates the configuration, fills missing schema variables with
    /// their defaults, runs derivers once, and emits the initial snapshot
    /// at time 0.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let EngineConfig {
            composite,
            initial_state,
            timestep,
            emit_every,
        } = config;
        let slots = index(&composite)?;
        let mut state = initial_state;
        for slot in &slots {
            fill_defaults(&mut state, slot)?;
        }

        let mut engine = Self {
            composite,
            slots,
            state,
            step: StepId(0),
            time: 0.0,
            timestep,
            emit_every,
            trajectory: Trajectory::new(),
            divisions: Vec::new(),
            last_metrics: StepMetrics::default(),
        };

        let mut working = engine.state.clone();
        let mut metrics = StepMetrics::default();
        engine
            .run_derivers(&mut working, &mut metrics)
            .map_err(ConfigError::InitialDerivers)?;
        engine.state = working;
        engine.emit();
        debug!(
            processes = engine.slots.len(),
            timestep, emit_every, "engine constructed"
        );
        Ok(engine)
    }

    /// Execute one step.
    pub fn step(&mut self) -> Result<StepReport, StepError> {
        let start = Instant::now();
        let next = self.step.next();
        let mut metrics = StepMetrics::default();
        let mut undo = Undo::default();

        let result = self.execute(next, &mut metrics, &mut undo);
        let (working, divisions) = match result {
            Ok(done) => done,
            Err(e) => {
                warn!(step = %next, error = %e, "step failed, rolling back");
                self.rollback(undo);
                for (_, process) in self.composite.processes() {
                    process.rollback(next);
                }
                return Err(e);
            }
        };

        self.state = working;
        self.step = next;
        self.time += self.timestep;
        if self.step.0 % self.emit_every == 0 {
            self.emit();
        }
        metrics.divisions = divisions.len();
        metrics.total_us = start.elapsed().as_micros() as u64;
        self.divisions.extend(divisions.iter().cloned());
        self.last_metrics = metrics.clone();
        Ok(StepReport {
            step: self.step,
            time: self.time,
            divisions,
            metrics,
        })
    }

    /// Run `ceil(duration / timestep)` steps.
    pub fn update(&mut self, duration: f64) -> Result<(), StepError> {
        let steps = (duration / self.timestep).ceil().max(0.0) as u64;
        for _ in 0..steps {
            self.step()?;
        }
        Ok(())
    }

    /// The committed state tree.
    pub fn state(&self) -> &Tree {
        &self.state
    }

    /// Simulated time.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Steps completed.
    pub fn current_step(&self) -> StepId {
        self.step
    }

    /// The processes currently running.
    pub fn composite(&self) -> &Composite {
        &self.composite
    }

    /// Emitted snapshots.
    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    /// Consume the engine, keeping its trajectory.
    pub fn into_trajectory(self) -> Trajectory {
        self.trajectory
    }

    /// Every division applied so far.
    pub fn divisions(&self) -> &[DivisionEvent] {
        &self.divisions
    }

    /// Metrics from the most recent step.
    pub fn last_metrics(&self) -> &StepMetrics {
        &self.last_metrics
    }

    /// Keys of the branch at `path` (e.g. the agent ids under `/agents`).
    pub fn children(&self, path: &AbsolutePath) -> Vec<String> {
        self.state
            .subtree(path)
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default()
    }

    // ── Step phases ──────────────────────────────────────────────

    fn execute(
        &mut self,
        next: StepId,
        metrics: &mut StepMetrics,
        undo: &mut Undo,
    ) -> Result<(Tree, Vec<DivisionEvent>), StepError> {
        // 1. Collect updates against the committed state.
        let mut updates: Vec<(usize, Update)> = Vec::new();
        for (i, slot) in self.slots.iter().enumerate() {
            if slot.deriver {
                continue;
            }
            let process = self.process(slot)?;
            let view = port_view(&self.state, slot);
            let proc_start = Instant::now();
            let ctx = StepContext::new(&slot.location, &view, next, self.time, self.timestep);
            let update = process
                .next_update(&ctx)
                .map_err(|source| StepError::ProcessFailed {
                    location: slot.location.clone(),
                    source,
                })?;
            metrics
                .process_us
                .push((slot.location.to_string(), proc_start.elapsed().as_micros() as u64));
            updates.push((i, update));
        }

        // 2. Apply port updates to a working copy.
        let mut working = self.state.clone();
        let mut structural: Vec<(AbsolutePath, IndexMap<String, AbsolutePath>, Structural)> =
            Vec::new();
        for (i, update) in updates {
            let slot = &self.slots[i];
            let (ports, requests) = update.into_parts();
            metrics.updates_applied += apply_update(&mut working, slot, ports)?;
            for request in requests {
                structural.push((slot.location.clone(), slot.ports.clone(), request));
            }
        }

        // 3. Structural updates.
        let mut divisions = Vec::new();
        if !structural.is_empty() {
            for (requester, ports, request) in structural {
                match request {
                    Structural::Divide(req) => {
                        let event = self.apply_divide(
                            &mut working,
                            &requester,
                            &ports,
                            req,
                            next,
                            metrics,
                            undo,
                        )?;
                        divisions.push(event);
                    }
                }
            }
            self.slots = index(&self.composite)?;
            for slot in &self.slots {
                fill_defaults(&mut working, slot)?;
            }
        }

        // 4. Derivers, sequentially, against the working copy.
        self.run_derivers_at(&mut working, next, metrics)?;
        Ok((working, divisions))
    }

    fn run_derivers(&self, working: &mut Tree, metrics: &mut StepMetrics) -> Result<(), StepError> {
        self.run_derivers_at(working, self.step, metrics)
    }

    fn run_derivers_at(
        &self,
        working: &mut Tree,
        step: StepId,
        metrics: &mut StepMetrics,
    ) -> Result<(), StepError> {
        for slot in self.slots.iter().filter(|s| s.deriver) {
            let process = self.process(slot)?;
            let view = port_view(working, slot);
            let proc_start = Instant::now();
            let ctx = StepContext::new(&slot.location, &view, step, self.time, self.timestep);
            let update = process
                .next_update(&ctx)
                .map_err(|source| StepError::ProcessFailed {
                    location: slot.location.clone(),
                    source,
                })?;
            metrics
                .process_us
                .push((slot.location.to_string(), proc_start.elapsed().as_micros() as u64));
            let (ports, _) = update.into_parts();
            metrics.updates_applied += apply_update(working, slot, ports)?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_divide(
        &mut self,
        working: &mut Tree,
        requester: &AbsolutePath,
        ports: &IndexMap<String, AbsolutePath>,
        req: DivideRequest,
        step: StepId,
        metrics: &mut StepMetrics,
        undo: &mut Undo,
    ) -> Result<DivisionEvent, StepError> {
        let agents = ports
            .get(&req.port)
            .cloned()
            .ok_or_else(|| StepError::UnknownPort {
                location: requester.clone(),
                port: req.port.clone(),
            })?;
        let mother = agents.child(req.mother.clone());

        // The unit must live inside the agent it was generated for.
        if !requester.starts_with(&mother) {
            let actual = requester
                .strip_prefix(&agents)
                .and_then(|rest| rest.segments().first().cloned())
                .unwrap_or_else(|| requester.to_string());
            return Err(ComposeError::StaleDivisionConfig {
                captured: req.mother,
                actual,
            }
            .into());
        }

        let mut dividers = Dividers::new();
        for slot in self.slots.iter().filter(|s| s.location.starts_with(&mother)) {
            collect_dividers(&mut dividers, &mother, &slot.schema, &slot.ports);
        }
        let mother_state = working.subtree(&mother).cloned().unwrap_or_default();
        let daughter_state = divide_state(&mother_state, &dividers)?;

        // Generate every daughter before touching anything.
        let mut generated = Vec::with_capacity(req.daughters.len());
        for daughter in &req.daughters {
            let node = agents.child(daughter.key.clone());
            let inner = AbsolutePath::try_from(&daughter.path).map_err(|source| {
                ComposeError::PathEscape {
                    process: requester.clone(),
                    port: "daughter_path".into(),
                    source,
                }
            })?;
            let composite = daughter.factory.generate(&node.join(&inner))?;
            generated.push((node, composite));
        }

        // Collisions: with surviving processes, existing nodes, and each other.
        for (i, (node, composite)) in generated.iter().enumerate() {
            if *node != mother && working.lookup(node).is_some() {
                return Err(ComposeError::NameCollision {
                    location: node.clone(),
                }
                .into());
            }
            if generated[..i].iter().any(|(other, _)| other == node) {
                return Err(ComposeError::NameCollision {
                    location: node.clone(),
                }
                .into());
            }
            if let Some(taken) = composite
                .locations()
                .find(|l| self.composite.contains(l) && !l.starts_with(&mother))
            {
                return Err(ComposeError::NameCollision {
                    location: taken.clone(),
                }
                .into());
            }
        }

        // Apply.
        undo.removed.push(self.composite.detach(&mother));
        working.take(&mother);
        let mut daughters = Vec::with_capacity(generated.len());
        for (node, composite) in generated {
            self.composite.merge(composite, &AbsolutePath::root())?;
            undo.added.push(node.clone());
            working.place(&node, Value::Map(daughter_state.clone()))?;
            daughters.push(node);
        }

        metrics.agents_removed += 1;
        metrics.agents_added += daughters.len();
        info!(
            mother = %mother,
            daughters = ?daughters.iter().map(ToString::to_string).collect::<Vec<_>>(),
            step = %step,
            "agent divided"
        );
        Ok(DivisionEvent {
            step,
            time: self.time + self.timestep,
            mother,
            daughters,
        })
    }

    fn rollback(&mut self, undo: Undo) {
        if undo.removed.is_empty() && undo.added.is_empty() {
            return;
        }
        for node in &undo.added {
            self.composite.detach(node);
        }
        for removed in undo.removed {
            // Restored processes were valid before this step.
            if let Err(e) = self.composite.merge(removed, &AbsolutePath::root()) {
                warn!(error = %e, "rollback could not restore processes");
            }
        }
        match index(&self.composite) {
            Ok(slots) => self.slots = slots,
            Err(e) => warn!(error = %e, "rollback could not re-index processes"),
        }
    }

    fn process(&self, slot: &Slot) -> Result<&dyn Process, StepError> {
        self.composite
            .placement(&slot.location)
            .map(|p| p.process())
            .ok_or_else(|| {
                ComposeError::UnknownProcess {
                    location: slot.location.clone(),
                }
                .into()
            })
    }

    fn emit(&mut self) {
        self.trajectory.push(Record {
            time: self.time,
            step: self.step,
            state: self.state.clone(),
        });
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("step", &self.step)
            .field("time", &self.time)
            .field("timestep", &self.timestep)
            .field("processes", &self.slots.len())
            .field("divisions", &self.divisions.len())
            .finish()
    }
}

// ── State helpers ────────────────────────────────────────────────

/// Values at each port's resolved path. Missing globs read as empty.
fn port_view(state: &Tree, slot: &Slot) -> Tree {
    let mut view = Tree::with_capacity(slot.ports.len());
    for (port, path) in &slot.ports {
        let value = if path.is_root() {
            Some(Value::Map(state.clone()))
        } else {
            state.lookup(path).cloned()
        };
        match (value, slot.schema.get(port)) {
            (Some(v), _) => {
                view.insert(port.clone(), v);
            }
            (None, Some(PortSchema::Glob)) => {
                view.insert(port.clone(), Value::map());
            }
            (None, _) => {}
        }
    }
    view
}

/// Write schema defaults wherever the state has nothing.
fn fill_defaults(state: &mut Tree, slot: &Slot) -> Result<(), StateError> {
    schema::fill_defaults(state, &slot.schema, &slot.ports)?;
    for (port, port_schema) in &slot.schema {
        if !matches!(port_schema, PortSchema::Glob) {
            continue;
        }
        if let Some(path) = slot.ports.get(port) {
            if !path.is_root() && state.lookup(path).is_none() {
                state.place(path, Value::map())?;
            }
        }
    }
    Ok(())
}

/// Merge one process's port values into `state`; returns leaves written.
fn apply_update(
    state: &mut Tree,
    slot: &Slot,
    ports: IndexMap<String, Value>,
) -> Result<usize, StepError> {
    let mut written = 0;
    for (port, value) in ports {
        let (Some(path), Some(schema)) = (slot.ports.get(&port), slot.schema.get(&port)) else {
            return Err(StepError::UnknownPort {
                location: slot.location.clone(),
                port,
            });
        };
        match (schema, value) {
            (PortSchema::Leaf(var), value) => {
                let merged = var.updater.apply(state.lookup(path), value);
                state.place(path, merged)?;
                written += 1;
            }
            (PortSchema::Branch(vars), Value::Map(deltas)) => {
                for (name, delta) in deltas {
                    let at = path.child(name.clone());
                    let updater = vars.get(&name).map(|v| v.updater).unwrap_or_default();
                    let merged = updater.apply(state.lookup(&at), delta);
                    state.place(&at, merged)?;
                    written += 1;
                }
            }
            (PortSchema::Branch(_), other) => {
                state.place(path, other)?;
                written += 1;
            }
            (PortSchema::Glob, value) => {
                written += set_leaves(state, path, value)?;
            }
        }
    }
    Ok(written)
}

/// Set every leaf of `value` beneath `at`, keeping untouched siblings.
fn set_leaves(state: &mut Tree, at: &AbsolutePath, value: Value) -> Result<usize, StateError> {
    match value {
        Value::Map(branch) => {
            let mut written = 0;
            for (key, v) in branch {
                written += set_leaves(state, &at.child(key), v)?;
            }
            Ok(written)
        }
        leaf => {
            state.place(at, leaf)?;
            Ok(1)
        }
    }
}
