//! Splitting a mother's state between daughters.

use indexmap::IndexMap;
use inclusion_compose::{Divider, PortSchema, Schema};
use inclusion_core::{AbsolutePath, StateError, Tree, TreeExt};

/// Leaf path (relative to the mother node) → divider.
pub type Dividers = IndexMap<AbsolutePath, Divider>;

/// Record the dividers one process declares for paths under `mother`.
///
/// The first declaration of a path wins; glob ports declare nothing.
pub fn collect_dividers(
    out: &mut Dividers,
    mother: &AbsolutePath,
    schema: &Schema,
    ports: &IndexMap<String, AbsolutePath>,
) {
    for (port, port_schema) in schema {
        let Some(relative) = ports.get(port).and_then(|p| p.strip_prefix(mother)) else {
            continue;
        };
        match port_schema {
            PortSchema::Leaf(var) => {
                out.entry(relative).or_insert(var.divider);
            }
            PortSchema::Branch(vars) => {
                for (name, var) in vars {
                    out.entry(relative.child(name.clone())).or_insert(var.divider);
                }
            }
            PortSchema::Glob => {}
        }
    }
}

/// The state one daughter receives.
///
/// Every leaf of `mother` is passed through its declared divider; leaves
/// with no declaration are copied.
pub fn divide_state(mother: &Tree, dividers: &Dividers) -> Result<Tree, StateError> {
    let mut out = Tree::new();
    for leaf in mother.leaf_paths() {
        if let Some(value) = mother.lookup(&leaf) {
            let divider = dividers.get(&leaf).copied().unwrap_or_default();
            out.place(&leaf, divider.apply(value))?;
        }
    }
    Ok(out)
}
