//! Lattice placement and jitter for agent locations.
//!
//! Respects the determinism contract: the RNG is a ChaCha8 seeded from
//! `seed XOR step` each step, so identical seeds replay identically.
//!
//! Constructed via the builder pattern: [`Multibody::builder`].

use inclusion_compose::schema::schema;
use inclusion_compose::{PortSchema, Process, Schema, StepContext, Update};
use inclusion_core::{tree, Config, ConfigError, ProcessError, Tree, Value};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// Default lattice extent.
pub const DEFAULT_BOUNDS: [f64; 2] = [10.0, 10.0];
/// Default per-unit-time jitter amplitude.
pub const DEFAULT_JITTER_FORCE: f64 = 1e-4;

/// Places and jitters every agent under its `agents` port.
///
/// Each agent's location lives at `<agent>/boundary/location` as a
/// two-element list. Agents without one are placed uniformly at random.
#[derive(Clone, Debug)]
pub struct Multibody {
    bounds: [f64; 2],
    jitter_force: f64,
    seed: u64,
}

/// Builder for [`Multibody`].
pub struct MultibodyBuilder {
    bounds: [f64; 2],
    jitter_force: f64,
    seed: u64,
}

impl Multibody {
    /// Create a new builder.
    pub fn builder() -> MultibodyBuilder {
        MultibodyBuilder {
            bounds: DEFAULT_BOUNDS,
            jitter_force: DEFAULT_JITTER_FORCE,
            seed: 0,
        }
    }

    /// Read `bounds`, `jitter_force`, and `seed`.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let bounds = config.floats_or("bounds", &DEFAULT_BOUNDS)?;
        let [x, y] = bounds[..] else {
            return Err(ConfigError::Invalid {
                key: "bounds".into(),
                reason: format!("expected two values, got {}", bounds.len()),
            });
        };
        let seed = config.f64_or("seed", 0.0)?;
        if !(0.0..=u64::MAX as f64).contains(&seed) || seed.fract() != 0.0 {
            return Err(ConfigError::Invalid {
                key: "seed".into(),
                reason: format!("must be a non-negative integer, got {seed}"),
            });
        }
        Self::builder()
            .bounds([x, y])
            .jitter_force(config.f64_or("jitter_force", DEFAULT_JITTER_FORCE)?)
            .seed(seed as u64)
            .build()
    }

    /// Lattice extent.
    pub fn bounds(&self) -> [f64; 2] {
        self.bounds
    }

    fn clamp(&self, location: [f64; 2]) -> [f64; 2] {
        [
            location[0].clamp(0.0, self.bounds[0]),
            location[1].clamp(0.0, self.bounds[1]),
        ]
    }
}

impl MultibodyBuilder {
    /// Lattice extent (default `[10, 10]`). Both must be positive.
    pub fn bounds(mut self, bounds: [f64; 2]) -> Self {
        self.bounds = bounds;
        self
    }

    /// Jitter amplitude (default 1e-4). Must be >= 0.
    pub fn jitter_force(mut self, jitter_force: f64) -> Self {
        self.jitter_force = jitter_force;
        self
    }

    /// RNG seed (default 0).
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Build, validating all configuration.
    pub fn build(self) -> Result<Multibody, ConfigError> {
        if self.bounds.iter().any(|b| !b.is_finite() || *b <= 0.0) {
            return Err(ConfigError::Invalid {
                key: "bounds".into(),
                reason: format!("must be finite and > 0, got {:?}", self.bounds),
            });
        }
        if !self.jitter_force.is_finite() || self.jitter_force < 0.0 {
            return Err(ConfigError::Invalid {
                key: "jitter_force".into(),
                reason: format!("must be finite and >= 0, got {}", self.jitter_force),
            });
        }
        Ok(Multibody {
            bounds: self.bounds,
            jitter_force: self.jitter_force,
            seed: self.seed,
        })
    }
}

fn location_of(agent: &Value) -> Option<[f64; 2]> {
    let loc = agent
        .as_map()?
        .get("boundary")?
        .as_map()?
        .get("location")?
        .as_f64_list()?;
    match loc[..] {
        [x, y] => Some([x, y]),
        _ => None,
    }
}

impl Process for Multibody {
    fn name(&self) -> &str {
        "Multibody"
    }

    fn ports_schema(&self) -> Schema {
        schema([("agents", PortSchema::Glob)])
    }

    fn initial_state(&self, _config: &Config) -> Result<Tree, ConfigError> {
        Ok(Tree::new())
    }

    fn next_update(&self, ctx: &StepContext<'_>) -> Result<Update, ProcessError> {
        let agents = ctx.branch("agents")?;
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed ^ ctx.step_id().0);
        let amplitude = self.jitter_force * ctx.dt();

        let mut moved = Tree::with_capacity(agents.len());
        for (id, agent) in agents {
            let current = match location_of(agent) {
                Some(loc) => loc,
                None => [
                    rng.gen::<f64>() * self.bounds[0],
                    rng.gen::<f64>() * self.bounds[1],
                ],
            };
            let jittered = self.clamp([
                current[0] + amplitude * rng.gen_range(-1.0..=1.0),
                current[1] + amplitude * rng.gen_range(-1.0..=1.0),
            ]);
            let boundary = tree([("location", Value::from(jittered.to_vec()))]);
            moved.insert(id.clone(), Value::Map(tree([("boundary", Value::Map(boundary))])));
        }
        Ok(Update::new().with("agents", moved))
    }
}
