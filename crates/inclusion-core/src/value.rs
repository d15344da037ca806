//! State tree values.
//!
//! A state tree is a [`Tree`]: an insertion-ordered map of names to
//! [`Value`]s, where [`Value::Map`] nests further trees. The same
//! representation carries configuration sections, process port views, and
//! update payloads.

use indexmap::IndexMap;

use crate::error::StateError;
use crate::path::{AbsolutePath, Path};

/// A branch of the state tree.
pub type Tree = IndexMap<String, Value>;

/// A node of the state tree, or a configuration value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Boolean flag (e.g. the divide signal).
    Bool(bool),
    /// Scalar quantity (masses, concentrations, rates).
    Float(f64),
    /// Free text (ids, names).
    Text(String),
    /// A relative path, used by configuration (`boundary_path` etc.).
    Path(Path),
    /// Ordered values (locations, bounds, variable lists).
    List(Vec<Value>),
    /// A nested branch.
    Map(Tree),
}

impl Value {
    /// An empty branch.
    pub fn map() -> Self {
        Self::Map(Tree::new())
    }

    /// The float, if this is [`Value::Float`].
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// The flag, if this is [`Value::Bool`].
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The text, if this is [`Value::Text`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Interpret as a relative path.
    ///
    /// Accepts [`Value::Path`] directly and a [`Value::List`] of text
    /// segments, so configuration can spell paths either way.
    pub fn as_path(&self) -> Option<Path> {
        match self {
            Self::Path(p) => Some(p.clone()),
            Self::List(items) => {
                let segments: Option<Vec<&str>> = items.iter().map(Value::as_str).collect();
                segments.map(Path::new)
            }
            _ => None,
        }
    }

    /// The items, if this is [`Value::List`].
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// The branch, if this is [`Value::Map`].
    pub fn as_map(&self) -> Option<&Tree> {
        match self {
            Self::Map(t) => Some(t),
            _ => None,
        }
    }

    /// The branch mutably, if this is [`Value::Map`].
    pub fn as_map_mut(&mut self) -> Option<&mut Tree> {
        match self {
            Self::Map(t) => Some(t),
            _ => None,
        }
    }

    /// Whether this node is a branch.
    pub fn is_map(&self) -> bool {
        matches!(self, Self::Map(_))
    }

    /// A list of floats, if every item is a float.
    pub fn as_f64_list(&self) -> Option<Vec<f64>> {
        self.as_list()?.iter().map(Value::as_f64).collect()
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Path> for Value {
    fn from(v: Path) -> Self {
        Self::Path(v)
    }
}

impl From<Tree> for Value {
    fn from(v: Tree) -> Self {
        Self::Map(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::List(v)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Self::List(v.into_iter().map(Value::Float).collect())
    }
}

/// Build a [`Tree`] from `(key, value)` pairs.
///
/// ```
/// use inclusion_core::{tree, Value};
///
/// let t = tree([("biomass", Value::from(1000.0))]);
/// assert_eq!(t["biomass"].as_f64(), Some(1000.0));
/// ```
pub fn tree<I, K>(entries: I) -> Tree
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    entries.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

/// Path-addressed access to a [`Tree`].
pub trait TreeExt {
    /// The node at `path`; the root path has no node of its own.
    fn lookup(&self, path: &AbsolutePath) -> Option<&Value>;

    /// The node at `path`, mutably.
    fn lookup_mut(&mut self, path: &AbsolutePath) -> Option<&mut Value>;

    /// The subtree at `path`, treating the root path as the whole tree.
    fn subtree(&self, path: &AbsolutePath) -> Option<&Tree>;

    /// Store `value` at `path`, creating intermediate branches.
    ///
    /// Returns the previous value. Fails if an intermediate node is a leaf.
    /// Placing a map at the root replaces the whole tree.
    fn place(&mut self, path: &AbsolutePath, value: Value) -> Result<Option<Value>, StateError>;

    /// Remove and return the node at `path`.
    fn take(&mut self, path: &AbsolutePath) -> Option<Value>;

    /// Recursively merge `other` into `self`; leaves in `other` win.
    fn merge_deep(&mut self, other: Tree);

    /// Paths of every non-map node.
    fn leaf_paths(&self) -> Vec<AbsolutePath>;
}

impl TreeExt for Tree {
    fn lookup(&self, path: &AbsolutePath) -> Option<&Value> {
        let (first, rest) = path.segments().split_first()?;
        let mut node = self.get(first)?;
        for key in rest {
            node = node.as_map()?.get(key)?;
        }
        Some(node)
    }

    fn lookup_mut(&mut self, path: &AbsolutePath) -> Option<&mut Value> {
        let (first, rest) = path.segments().split_first()?;
        let mut node = self.get_mut(first)?;
        for key in rest {
            node = node.as_map_mut()?.get_mut(key)?;
        }
        Some(node)
    }

    fn subtree(&self, path: &AbsolutePath) -> Option<&Tree> {
        if path.is_root() {
            return Some(self);
        }
        self.lookup(path)?.as_map()
    }

    fn place(&mut self, path: &AbsolutePath, value: Value) -> Result<Option<Value>, StateError> {
        let Some((last, parents)) = path.segments().split_last() else {
            return match value {
                Value::Map(t) => Ok(Some(Value::Map(std::mem::replace(self, t)))),
                _ => Err(StateError::RootAssignment),
            };
        };
        let mut branch: &mut Tree = self;
        for (depth, key) in parents.iter().enumerate() {
            let node = branch.entry(key.clone()).or_insert_with(Value::map);
            branch = node.as_map_mut().ok_or_else(|| StateError::NotABranch {
                path: AbsolutePath::new(path.segments()[..=depth].iter().cloned()),
            })?;
        }
        Ok(branch.insert(last.clone(), value))
    }

    fn take(&mut self, path: &AbsolutePath) -> Option<Value> {
        let (last, parents) = path.segments().split_last()?;
        let mut branch: &mut Tree = self;
        for key in parents {
            branch = branch.get_mut(key)?.as_map_mut()?;
        }
        branch.shift_remove(last)
    }

    fn merge_deep(&mut self, other: Tree) {
        for (key, incoming) in other {
            if let Value::Map(sub) = incoming {
                if let Some(Value::Map(existing)) = self.get_mut(&key) {
                    existing.merge_deep(sub);
                    continue;
                }
                self.insert(key, Value::Map(sub));
            } else {
                self.insert(key, incoming);
            }
        }
    }

    fn leaf_paths(&self) -> Vec<AbsolutePath> {
        fn walk(tree: &Tree, at: &AbsolutePath, out: &mut Vec<AbsolutePath>) {
            for (key, value) in tree {
                let here = at.child(key.clone());
                match value {
                    Value::Map(sub) => walk(sub, &here, out),
                    _ => out.push(here),
                }
            }
        }
        let mut out = Vec::new();
        walk(self, &AbsolutePath::root(), &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent_state() -> Tree {
        tree([
            (
                "molecules",
                Value::Map(tree([("biomass", Value::from(1000.0))])),
            ),
            ("inclusion_body", Value::from(10.0)),
        ])
    }

    #[test]
    fn lookup_descends_through_maps() {
        let t = agent_state();
        let p = AbsolutePath::new(["molecules", "biomass"]);
        assert_eq!(t.lookup(&p).and_then(Value::as_f64), Some(1000.0));
        assert!(t.lookup(&AbsolutePath::new(["missing"])).is_none());
        assert!(t.lookup(&AbsolutePath::root()).is_none());
        assert!(t.subtree(&AbsolutePath::root()).is_some());
    }

    #[test]
    fn place_creates_intermediate_branches() {
        let mut t = Tree::new();
        t.place(&AbsolutePath::new(["agents", "0", "boundary", "divide"]), false.into())
            .unwrap();
        let b = t
            .lookup(&AbsolutePath::new(["agents", "0", "boundary", "divide"]))
            .unwrap();
        assert_eq!(b.as_bool(), Some(false));
    }

    #[test]
    fn place_through_leaf_fails() {
        let mut t = agent_state();
        let err = t
            .place(&AbsolutePath::new(["inclusion_body", "x"]), 1.0_f64.into())
            .unwrap_err();
        assert_eq!(
            err,
            StateError::NotABranch {
                path: AbsolutePath::new(["inclusion_body"])
            }
        );
    }

    #[test]
    fn place_at_root_requires_map() {
        let mut t = agent_state();
        assert_eq!(
            t.place(&AbsolutePath::root(), 1.0_f64.into()),
            Err(StateError::RootAssignment)
        );
        t.place(&AbsolutePath::root(), Value::map()).unwrap();
        assert!(t.is_empty());
    }

    #[test]
    fn take_removes_subtree() {
        let mut t = agent_state();
        let m = t.take(&AbsolutePath::new(["molecules"])).unwrap();
        assert!(m.is_map());
        assert!(!t.contains_key("molecules"));
        assert!(t.take(&AbsolutePath::new(["molecules"])).is_none());
    }

    #[test]
    fn merge_deep_keeps_siblings() {
        let mut t = agent_state();
        t.merge_deep(tree([(
            "molecules",
            Value::Map(tree([("glucose", Value::from(2.0))])),
        )]));
        let m = t["molecules"].as_map().unwrap();
        assert_eq!(m["biomass"].as_f64(), Some(1000.0));
        assert_eq!(m["glucose"].as_f64(), Some(2.0));
    }

    #[test]
    fn leaf_paths_lists_every_leaf() {
        let paths = agent_state().leaf_paths();
        assert_eq!(
            paths,
            vec![
                AbsolutePath::new(["molecules", "biomass"]),
                AbsolutePath::new(["inclusion_body"]),
            ]
        );
    }

    #[test]
    fn list_of_text_reads_as_path() {
        let v = Value::List(vec!["..".into(), "agents".into()]);
        assert_eq!(v.as_path(), Some(Path::new(["..", "agents"])));
        assert_eq!(Value::from(1.0).as_path(), None);
    }
}
