//! Declarative multi-scale composition.
//!
//! A [`Hierarchy`] describes which composer sits at which node. Composing it
//! generates each composer at the root and merges the result at its node,
//! which is equivalent to doing the same merges by hand.
//!
//! ```
//! use inclusion_compose::Hierarchy;
//!
//! let empty = Hierarchy::subtree();
//! let composite = empty.compose().unwrap();
//! assert!(composite.is_empty());
//! ```

use indexmap::IndexMap;
use inclusion_core::AbsolutePath;

use crate::composer::CompositeFactory;
use crate::composite::Composite;
use crate::error::ComposeError;

/// A tree of composer placements.
#[derive(Clone, Debug)]
pub enum Hierarchy {
    /// One composer at this node.
    Leaf(CompositeFactory),
    /// An optional composer at this node plus named children below it.
    Subtree {
        /// Composer placed at this node itself.
        composer: Option<CompositeFactory>,
        /// Child nodes, composed in order.
        children: IndexMap<String, Hierarchy>,
    },
}

impl Hierarchy {
    /// A node holding only `factory`.
    pub fn leaf(factory: CompositeFactory) -> Self {
        Self::Leaf(factory)
    }

    /// An empty interior node.
    pub fn subtree() -> Self {
        Self::Subtree {
            composer: None,
            children: IndexMap::new(),
        }
    }

    /// Place `factory` at this node.
    pub fn with_composer(self, factory: CompositeFactory) -> Self {
        match self {
            Self::Leaf(_) => Self::Leaf(factory),
            Self::Subtree { children, .. } => Self::Subtree {
                composer: Some(factory),
                children,
            },
        }
    }

    /// Add a child node under `key`.
    pub fn with_child(self, key: impl Into<String>, child: Hierarchy) -> Self {
        let (composer, mut children) = match self {
            Self::Leaf(f) => (Some(f), IndexMap::new()),
            Self::Subtree { composer, children } => (composer, children),
        };
        children.insert(key.into(), child);
        Self::Subtree { composer, children }
    }

    /// Build the composite this hierarchy describes.
    pub fn compose(&self) -> Result<Composite, ComposeError> {
        compose_hierarchy(self)
    }
}

/// Walk `hierarchy` depth-first, generating and merging at each node.
pub fn compose_hierarchy(hierarchy: &Hierarchy) -> Result<Composite, ComposeError> {
    let mut out = Composite::new();
    place(hierarchy, &AbsolutePath::root(), &mut out)?;
    out.validate_paths()?;
    Ok(out)
}

fn place(node: &Hierarchy, at: &AbsolutePath, out: &mut Composite) -> Result<(), ComposeError> {
    match node {
        Hierarchy::Leaf(factory) => out.merge(factory.generate(&AbsolutePath::root())?, at),
        Hierarchy::Subtree { composer, children } => {
            if let Some(factory) = composer {
                out.merge(factory.generate(&AbsolutePath::root())?, at)?;
            }
            for (key, child) in children {
                place(child, &at.child(key.clone()), out)?;
            }
            Ok(())
        }
    }
}
