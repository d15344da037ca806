//! Reusable process and composer fixtures.
//!
//! - [`ConstProcess`]: sets a leaf port to a constant every step.
//! - [`CounterProcess`]: adds a fixed increment to a leaf port every step.
//! - [`FailingProcess`]: fails deterministically after N calls.
//! - [`PairComposer`]: a counter and a constant, wired by config.

use std::sync::atomic::{AtomicUsize, Ordering};

use inclusion_compose::schema::schema;
use inclusion_compose::{
    ComposeContext, ComposeError, Composer, PortSchema, Process, Processes, Schema, StepContext,
    Topology, Update, Variable,
};
use inclusion_compose::topology::wiring;
use inclusion_core::{Config, Path, ProcessError, Value};

/// Writes `value` to its `out` port each step (set updater).
pub struct ConstProcess {
    pub value: f64,
    pub deriver: bool,
}

impl ConstProcess {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            deriver: false,
        }
    }

    /// Run in the deriver phase instead.
    pub fn deriver(mut self) -> Self {
        self.deriver = true;
        self
    }
}

impl Process for ConstProcess {
    fn name(&self) -> &str {
        "const"
    }

    fn ports_schema(&self) -> Schema {
        schema([("out", PortSchema::Leaf(Variable::new(0.0).set()))])
    }

    fn is_deriver(&self) -> bool {
        self.deriver
    }

    fn next_update(&self, _ctx: &StepContext<'_>) -> Result<Update, ProcessError> {
        Ok(Update::new().with("out", self.value))
    }
}

/// Adds `increment` to its `count` port each step (accumulate updater,
/// split on division).
pub struct CounterProcess {
    pub increment: f64,
}

impl CounterProcess {
    pub fn new(increment: f64) -> Self {
        Self { increment }
    }
}

impl Process for CounterProcess {
    fn name(&self) -> &str {
        "counter"
    }

    fn ports_schema(&self) -> Schema {
        schema([("count", PortSchema::Leaf(Variable::new(0.0).split()))])
    }

    fn next_update(&self, ctx: &StepContext<'_>) -> Result<Update, ProcessError> {
        Ok(Update::new().with("count", self.increment * ctx.dt()))
    }
}

/// Succeeds `succeed_count` times, then fails every call.
///
/// Uses `AtomicUsize` for the call counter so it satisfies `Send`.
pub struct FailingProcess {
    pub succeed_count: usize,
    call_count: AtomicUsize,
}

impl FailingProcess {
    pub fn new(succeed_count: usize) -> Self {
        Self {
            succeed_count,
            call_count: AtomicUsize::new(0),
        }
    }

    /// How many times `next_update()` has been called.
    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }
}

impl Process for FailingProcess {
    fn name(&self) -> &str {
        "failing"
    }

    fn ports_schema(&self) -> Schema {
        schema([("out", PortSchema::Leaf(Variable::new(0.0)))])
    }

    fn next_update(&self, _ctx: &StepContext<'_>) -> Result<Update, ProcessError> {
        let n = self.call_count.fetch_add(1, Ordering::Relaxed);
        if n >= self.succeed_count {
            return Err(ProcessError::ExecutionFailed {
                reason: format!(
                    "deliberate failure after {} successful calls",
                    self.succeed_count
                ),
            });
        }
        Ok(Update::new().with("out", 1.0))
    }
}

/// A `counter` and a `const` process.
///
/// Config:
/// - `counter_path` (default `('count',)`), `const_path` (default
///   `('level',)`): where each port is wired.
/// - `increment` (default 1.0), `value` (default 5.0).
/// - `fail_after`: replace the constant with a [`FailingProcess`].
pub struct PairComposer;

impl Composer for PairComposer {
    fn name(&self) -> &str {
        "pair"
    }

    fn defaults(&self) -> Config {
        Config::new()
            .with("counter_path", Path::new(["count"]))
            .with("const_path", Path::new(["level"]))
            .with("increment", 1.0)
            .with("value", 5.0)
    }

    fn generate_processes(&self, ctx: &ComposeContext<'_>) -> Result<Processes, ComposeError> {
        let config = ctx.config();
        let mut out = Processes::new();
        out.insert(
            "counter".into(),
            Box::new(CounterProcess::new(config.f64("increment")?)),
        );
        let second: Box<dyn Process> = match config.get("fail_after").and_then(Value::as_f64) {
            Some(n) => Box::new(FailingProcess::new(n as usize)),
            None => Box::new(ConstProcess::new(config.f64("value")?)),
        };
        out.insert("const".into(), second);
        Ok(out)
    }

    fn generate_topology(&self, config: &Config) -> Result<Topology, ComposeError> {
        let mut out = Topology::new();
        out.insert(
            "counter".into(),
            wiring([("count", config.path("counter_path")?)]),
        );
        out.insert("const".into(), wiring([("out", config.path("const_path")?)]));
        Ok(out)
    }
}
