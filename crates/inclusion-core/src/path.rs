//! Path algebra for the hierarchical state tree.
//!
//! Two types keep relative and resolved paths apart:
//!
//! - [`Path`] is what topologies and configuration hold. Segments are either
//!   store names or [`Segment::Parent`] back-references (`..`), and the path is
//!   only meaningful relative to some base node.
//! - [`AbsolutePath`] is a root-anchored sequence of store names. It never
//!   contains back-references.
//!
//! [`resolve`] is the only bridge between them. It fails with
//! [`PathError::Escape`] when a back-reference would climb above the root,
//! rather than clamping at the root.

use smallvec::SmallVec;
use std::fmt;

use crate::error::PathError;

/// Spelling of a parent back-reference in textual paths.
pub const PARENT: &str = "..";

/// One step of a relative [`Path`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    /// Move to the parent node (`..`).
    Parent,
    /// Descend into the named child.
    Key(String),
}

impl Segment {
    /// Parse a textual segment, mapping `".."` to [`Segment::Parent`].
    pub fn parse(raw: &str) -> Self {
        if raw == PARENT {
            Self::Parent
        } else {
            Self::Key(raw.to_string())
        }
    }

    /// The store name, or `None` for a back-reference.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Parent => None,
            Self::Key(k) => Some(k),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parent => f.write_str(PARENT),
            Self::Key(k) => f.write_str(k),
        }
    }
}

/// A path relative to some base node, possibly containing `..` segments.
///
/// Stored in a `SmallVec` so the common topology entries (one to four
/// segments) never allocate for the segment list itself.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Path(SmallVec<[Segment; 4]>);

impl Path {
    /// Build a path from textual segments; `".."` becomes a back-reference.
    ///
    /// ```
    /// use inclusion_core::{Path, Segment};
    ///
    /// let agents = Path::new(["..", "..", "agents"]);
    /// assert_eq!(agents.len(), 3);
    /// assert_eq!(agents.segments()[0], Segment::Parent);
    /// ```
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(segments.into_iter().map(|s| Segment::parse(s.as_ref())).collect())
    }

    /// The empty path, which resolves to its base.
    pub fn here() -> Self {
        Self(SmallVec::new())
    }

    /// Segments in order.
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the path has no segments.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether any segment is a back-reference.
    pub fn has_parent_refs(&self) -> bool {
        self.0.iter().any(|s| *s == Segment::Parent)
    }

    /// Concatenate `other` after `self` without resolving anything.
    pub fn join(&self, other: &Path) -> Path {
        let mut out = self.clone();
        out.0.extend(other.0.iter().cloned());
        out
    }

    /// Append a single named segment.
    pub fn child(&self, key: impl Into<String>) -> Path {
        let mut out = self.clone();
        out.0.push(Segment::Key(key.into()));
        out
    }

    /// Prepend an absolute prefix to this relative path.
    pub fn prefixed(&self, prefix: &AbsolutePath) -> Path {
        let mut out: SmallVec<[Segment; 4]> =
            prefix.segments().iter().cloned().map(Segment::Key).collect();
        out.extend(self.0.iter().cloned());
        Path(out)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, s) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "'{s}'")?;
        }
        write!(f, ")")
    }
}

impl<S: AsRef<str>> FromIterator<S> for Path {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self::new(iter)
    }
}

impl From<&AbsolutePath> for Path {
    fn from(abs: &AbsolutePath) -> Self {
        Path(abs.segments().iter().cloned().map(Segment::Key).collect())
    }
}

/// A root-anchored path of store names.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AbsolutePath(SmallVec<[String; 4]>);

impl AbsolutePath {
    /// Build from store names. Every segment is taken literally.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// The root of the tree.
    pub fn root() -> Self {
        Self(SmallVec::new())
    }

    /// Store names in order.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Depth below the root.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether this is the root.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Final store name, `None` at the root.
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// The containing node, `None` at the root.
    pub fn parent(&self) -> Option<AbsolutePath> {
        if self.0.is_empty() {
            return None;
        }
        let mut out = self.clone();
        out.0.pop();
        Some(out)
    }

    /// Descend into a named child.
    pub fn child(&self, key: impl Into<String>) -> AbsolutePath {
        let mut out = self.clone();
        out.0.push(key.into());
        out
    }

    /// Concatenate another absolute path beneath this one.
    pub fn join(&self, other: &AbsolutePath) -> AbsolutePath {
        let mut out = self.clone();
        out.0.extend(other.0.iter().cloned());
        out
    }

    /// Whether `prefix` is an ancestor of (or equal to) this path.
    pub fn starts_with(&self, prefix: &AbsolutePath) -> bool {
        self.0.len() >= prefix.0.len() && self.0[..prefix.0.len()] == prefix.0[..]
    }

    /// The remainder after `prefix`, if `prefix` is an ancestor.
    pub fn strip_prefix(&self, prefix: &AbsolutePath) -> Option<AbsolutePath> {
        if self.starts_with(prefix) {
            Some(Self(self.0[prefix.0.len()..].iter().cloned().collect()))
        } else {
            None
        }
    }

    /// Resolve a relative path against this node.
    ///
    /// Shorthand for [`resolve(self, relative)`](resolve).
    pub fn resolve(&self, relative: &Path) -> Result<AbsolutePath, PathError> {
        resolve(self, relative)
    }
}

impl fmt::Display for AbsolutePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for s in &self.0 {
            write!(f, "/{s}")?;
        }
        Ok(())
    }
}

impl TryFrom<&Path> for AbsolutePath {
    type Error = PathError;

    /// Succeeds when the path contains no back-references.
    fn try_from(path: &Path) -> Result<Self, Self::Error> {
        resolve(&AbsolutePath::root(), path)
    }
}

/// Resolve `relative` against `base`.
///
/// Walks segments left to right: `..` pops one level, a name pushes one.
/// Popping past the root is an error, even if later segments would descend
/// again, since the intermediate node does not exist.
///
/// ```
/// use inclusion_core::{resolve, AbsolutePath, Path};
///
/// let base = AbsolutePath::new(["agents", "1"]);
/// let agents = resolve(&base, &Path::new(["..", "..", "agents"])).unwrap();
/// assert_eq!(agents, AbsolutePath::new(["agents"]));
///
/// let escaped = resolve(&AbsolutePath::root(), &Path::new(["..", "agents"]));
/// assert!(escaped.is_err());
/// ```
pub fn resolve(base: &AbsolutePath, relative: &Path) -> Result<AbsolutePath, PathError> {
    let mut out = base.0.clone();
    for segment in relative.segments() {
        match segment {
            Segment::Parent => {
                if out.pop().is_none() {
                    return Err(PathError::Escape {
                        base: base.clone(),
                        path: relative.clone(),
                    });
                }
            }
            Segment::Key(k) => out.push(k.clone()),
        }
    }
    Ok(AbsolutePath(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_path_resolves_to_base() {
        let base = AbsolutePath::new(["agents", "0"]);
        assert_eq!(resolve(&base, &Path::here()).unwrap(), base);
    }

    #[test]
    fn back_references_climb_then_descend() {
        let base = AbsolutePath::new(["agents", "0"]);
        let rel = Path::new(["..", "1", "boundary"]);
        assert_eq!(
            resolve(&base, &rel).unwrap(),
            AbsolutePath::new(["agents", "1", "boundary"])
        );
    }

    #[test]
    fn escape_is_an_error_not_a_clamp() {
        let base = AbsolutePath::new(["agents"]);
        let rel = Path::new(["..", "..", "agents"]);
        match resolve(&base, &rel) {
            Err(PathError::Escape { base: b, path }) => {
                assert_eq!(b, base);
                assert_eq!(path, rel);
            }
            other => panic!("expected escape, got {other:?}"),
        }
    }

    #[test]
    fn escape_mid_path_is_detected() {
        // Net depth is fine, but the walk leaves the tree on the way.
        let rel = Path::new(["..", "a", "b"]);
        assert!(resolve(&AbsolutePath::root(), &rel).is_err());
    }

    #[test]
    fn try_from_rejects_back_references() {
        assert!(AbsolutePath::try_from(&Path::new([".."])).is_err());
        assert_eq!(
            AbsolutePath::try_from(&Path::new(["a", "b"])).unwrap(),
            AbsolutePath::new(["a", "b"])
        );
    }

    #[test]
    fn prefixed_then_resolved_equals_join() {
        let prefix = AbsolutePath::new(["agents", "1"]);
        let rel = Path::new(["boundary"]);
        let p = rel.prefixed(&prefix);
        assert_eq!(
            AbsolutePath::try_from(&p).unwrap(),
            AbsolutePath::new(["agents", "1", "boundary"])
        );
    }

    #[test]
    fn strip_prefix_and_starts_with() {
        let p = AbsolutePath::new(["agents", "1", "molecules"]);
        let prefix = AbsolutePath::new(["agents", "1"]);
        assert!(p.starts_with(&prefix));
        assert!(p.starts_with(&AbsolutePath::root()));
        assert!(!prefix.starts_with(&p));
        assert_eq!(
            p.strip_prefix(&prefix).unwrap(),
            AbsolutePath::new(["molecules"])
        );
        assert!(prefix.strip_prefix(&AbsolutePath::new(["x"])).is_none());
    }

    #[test]
    fn display_forms() {
        assert_eq!(AbsolutePath::root().to_string(), "/");
        assert_eq!(AbsolutePath::new(["a", "b"]).to_string(), "/a/b");
        assert_eq!(Path::new(["..", "x"]).to_string(), "('..', 'x')");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_key() -> impl Strategy<Value = String> {
            "[a-z0-9]{1,4}"
        }

        fn arb_abs() -> impl Strategy<Value = AbsolutePath> {
            prop::collection::vec(arb_key(), 0..6).prop_map(AbsolutePath::new)
        }

        fn arb_rel() -> impl Strategy<Value = Path> {
            prop::collection::vec(
                prop_oneof![Just(PARENT.to_string()), arb_key()],
                0..8,
            )
            .prop_map(Path::new)
        }

        proptest! {
            #[test]
            fn resolving_an_absolute_path_joins(base in arb_abs(), tail in arb_abs()) {
                let rel = Path::from(&tail);
                prop_assert_eq!(resolve(&base, &rel).unwrap(), base.join(&tail));
            }

            #[test]
            fn escape_iff_walk_leaves_root(base in arb_abs(), rel in arb_rel()) {
                let mut depth = base.len() as i64;
                let mut escaped = false;
                for s in rel.segments() {
                    match s {
                        Segment::Parent => depth -= 1,
                        Segment::Key(_) => depth += 1,
                    }
                    if depth < 0 {
                        escaped = true;
                        break;
                    }
                }
                prop_assert_eq!(resolve(&base, &rel).is_err(), escaped);
            }

            #[test]
            fn resolution_is_prefix_stable(
                prefix in arb_abs(),
                base in arb_abs(),
                rel in arb_rel(),
            ) {
                // Moving a base deeper never turns a valid resolution into an
                // escape, and the result moves by the same prefix.
                if let Ok(r) = resolve(&base, &rel) {
                    let moved = resolve(&prefix.join(&base), &rel).unwrap();
                    prop_assert_eq!(moved, prefix.join(&r));
                }
            }
        }
    }
}
