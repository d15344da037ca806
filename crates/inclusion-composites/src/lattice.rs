//! Spatial environment holding an `agents` collection.

use inclusion_compose::topology::wiring;
use inclusion_compose::{ComposeContext, ComposeError, Composer, Processes, Topology};
use inclusion_core::{tree, Config, Path, Value};
use inclusion_processes::multibody::{DEFAULT_BOUNDS, DEFAULT_JITTER_FORCE};
use inclusion_processes::Multibody;

/// Composer name.
pub const NAME: &str = "lattice";

/// The single environment process.
pub const MULTIBODY: &str = "multibody";

/// A `multibody` process over `('agents',)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Lattice;

/// Lattice config with the given jitter and bounds.
pub fn make_lattice_config(jitter_force: f64, bounds: [f64; 2]) -> Config {
    Config::new().with(
        MULTIBODY,
        tree([
            ("jitter_force", Value::from(jitter_force)),
            ("bounds", Value::from(bounds.to_vec())),
        ]),
    )
}

impl Composer for Lattice {
    fn name(&self) -> &str {
        NAME
    }

    fn defaults(&self) -> Config {
        make_lattice_config(DEFAULT_JITTER_FORCE, DEFAULT_BOUNDS)
    }

    fn generate_processes(&self, ctx: &ComposeContext<'_>) -> Result<Processes, ComposeError> {
        let mut out = Processes::new();
        out.insert(
            MULTIBODY.into(),
            Box::new(Multibody::from_config(&ctx.config().section(MULTIBODY)?)?),
        );
        Ok(out)
    }

    fn generate_topology(&self, _config: &Config) -> Result<Topology, ComposeError> {
        let mut out = Topology::new();
        out.insert(MULTIBODY.into(), wiring([("agents", Path::new(["agents"]))]));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inclusion_compose::CompositeFactory;
    use inclusion_core::AbsolutePath;

    #[test]
    fn multibody_sees_agents() {
        let f = CompositeFactory::new(Lattice, &make_lattice_config(1e-4, [30.0, 30.0]));
        let c = f.generate(&AbsolutePath::root()).unwrap();
        assert_eq!(
            c.port_path(&AbsolutePath::new([MULTIBODY]), "agents").unwrap(),
            AbsolutePath::new(["agents"])
        );
    }

    #[test]
    fn bad_bounds_fail_generation() {
        let f = CompositeFactory::new(Lattice, &make_lattice_config(1e-4, [0.0, 30.0]));
        assert!(f.generate(&AbsolutePath::root()).is_err());
    }
}
