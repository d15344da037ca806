//! Composers and the factories that capture them with configuration.
//!
//! A [`Composer`] is a recipe: given configuration it instantiates a set of
//! named processes and a topology wiring their ports. A
//! [`CompositeFactory`] binds a composer to one merged configuration and is
//! what callers (and division units) hold on to.

use std::fmt;
use std::sync::Arc;

use inclusion_core::{AbsolutePath, Config, Tree};
use tracing::debug;

use crate::composite::{overlay, Composite, Processes};
use crate::error::ComposeError;
use crate::topology::Topology;

/// Config key holding per-process initial state defaults.
pub const INITIAL_STATE_CONFIG: &str = "initial_state_config";

/// A recipe for a group of processes and their wiring.
///
/// Implementations must be deterministic: the same configuration always
/// yields the same process names, kinds, and topology.
pub trait Composer: Send + Sync + 'static {
    /// Human-readable name.
    fn name(&self) -> &str;

    /// Defaults merged (shallowly) beneath caller configuration.
    fn defaults(&self) -> Config {
        Config::new()
    }

    /// Instantiate processes. Names must be unique within the composer.
    fn generate_processes(&self, ctx: &ComposeContext<'_>) -> Result<Processes, ComposeError>;

    /// Wire every port of every process named by `generate_processes`.
    fn generate_topology(&self, config: &Config) -> Result<Topology, ComposeError>;
}

/// What a composer sees while generating processes.
pub struct ComposeContext<'a> {
    config: &'a Config,
    factory: &'a CompositeFactory,
}

impl<'a> ComposeContext<'a> {
    /// Merged configuration.
    pub fn config(&self) -> &'a Config {
        self.config
    }

    /// The factory doing the generating, for processes that must re-create
    /// the composite later (division).
    pub fn factory(&self) -> &'a CompositeFactory {
        self.factory
    }
}

/// A composer bound to a merged configuration.
///
/// Cheap to clone; the composer itself is shared.
#[derive(Clone)]
pub struct CompositeFactory {
    composer: Arc<dyn Composer>,
    config: Arc<Config>,
}

impl CompositeFactory {
    /// Bind `composer` to `config` merged over its defaults.
    pub fn new<C: Composer>(composer: C, config: &Config) -> Self {
        Self::from_shared(Arc::new(composer), config)
    }

    /// Bind an already shared composer.
    pub fn from_shared(composer: Arc<dyn Composer>, config: &Config) -> Self {
        let merged = Config::merged(&composer.defaults(), config);
        Self {
            composer,
            config: Arc::new(merged),
        }
    }

    /// A factory for the same composer with `overrides` merged on top.
    pub fn with_overrides(&self, overrides: &Config) -> Self {
        Self {
            composer: Arc::clone(&self.composer),
            config: Arc::new(Config::merged(&self.config, overrides)),
        }
    }

    /// The composer's name.
    pub fn composer_name(&self) -> &str {
        self.composer.name()
    }

    /// The merged configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Processes keyed by name.
    pub fn generate_processes(&self) -> Result<Processes, ComposeError> {
        let ctx = ComposeContext {
            config: &self.config,
            factory: self,
        };
        self.composer.generate_processes(&ctx)
    }

    /// Topology keyed by process name.
    pub fn generate_topology(&self) -> Result<Topology, ComposeError> {
        self.composer.generate_topology(&self.config)
    }

    /// Processes and topology together, placed under `path`.
    ///
    /// At the root, relative paths that climb above the composite are left
    /// alone: they only become meaningful once the composite is merged into
    /// a larger tree. Under a non-root `path` they are checked.
    pub fn generate(&self, path: &AbsolutePath) -> Result<Composite, ComposeError> {
        let composite =
            Composite::from_parts(self.generate_processes()?, self.generate_topology()?)?;
        debug!(
            composer = self.composer.name(),
            at = %path,
            processes = composite.len(),
            "generated composite"
        );
        if path.is_root() {
            return Ok(composite);
        }
        let placed = composite.rebased(path);
        placed.validate_paths()?;
        Ok(placed)
    }

    /// [`generate`](Self::generate) with extra overrides.
    pub fn generate_with(&self, overrides: &Config, path: &AbsolutePath) -> Result<Composite, ComposeError> {
        self.with_overrides(overrides).generate(path)
    }

    /// Initial state for a freshly generated composite at the root.
    ///
    /// Each process gets `initial_state_config[name]` shallow-merged with
    /// `overrides[name]`. Override keys that name no process are written
    /// into the state tree directly, merging into existing branches.
    pub fn initial_state(&self, overrides: &Config) -> Result<Tree, ComposeError> {
        let defaults = self.config.section(INITIAL_STATE_CONFIG)?;
        let composite = self.generate(&AbsolutePath::root())?;
        let names: Vec<&str> = composite
            .locations()
            .filter_map(AbsolutePath::last)
            .collect();

        let mut per_process = Config::new();
        for name in &names {
            let merged = Config::merged(&defaults.section(name)?, &overrides.section(name)?);
            per_process = per_process.with(*name, merged);
        }
        let mut state = composite.initial_state(&per_process)?;

        for (key, value) in overrides.iter().filter(|(k, _)| !names.contains(k)) {
            overlay(&mut state, &AbsolutePath::root().child(key), value.clone())?;
        }
        Ok(state)
    }
}

impl fmt::Debug for CompositeFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeFactory")
            .field("composer", &self.composer.name())
            .field("config", &self.config)
            .finish()
    }
}
