//! Immutable configuration maps and the defaults merge policy.
//!
//! A [`Config`] is an ordered map of [`Value`]s. Composers declare defaults
//! as a `Config` and callers supply overrides; [`Config::merged`] combines
//! them with a shallow, override-wins policy: a key present in the overrides
//! replaces the default value wholesale, including entire sub-maps.
//!
//! Typed accessors never fail on a missing key when a fallback is given, and
//! fail with [`ConfigError::WrongType`] when the key holds the wrong kind of
//! value.

use indexmap::IndexMap;

use crate::error::ConfigError;
use crate::path::Path;
use crate::value::{Tree, Value};

/// An immutable, insertion-ordered configuration map.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Config(Tree);

impl Config {
    /// An empty configuration.
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Wrap an existing tree.
    pub fn from_tree(tree: Tree) -> Self {
        Self(tree)
    }

    /// Builder-style insert.
    ///
    /// ```
    /// use inclusion_core::Config;
    ///
    /// let c = Config::new().with("agent_id", "0").with("threshold", 3000.0);
    /// assert_eq!(c.str("agent_id").unwrap(), "0");
    /// ```
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Shallow merge: every key in `overrides` replaces the key in `defaults`.
    ///
    /// Sub-maps are *not* merged recursively. Given defaults
    /// `{a: {x: 1, y: 2}}` and overrides `{a: {y: 3}}`, the result is
    /// `{a: {y: 3}}`.
    pub fn merged(defaults: &Config, overrides: &Config) -> Config {
        let mut out = defaults.0.clone();
        for (key, value) in &overrides.0 {
            out.insert(key.clone(), value.clone());
        }
        Config(out)
    }

    /// Shorthand for `Config::merged(self, overrides)`.
    pub fn overridden_by(&self, overrides: &Config) -> Config {
        Config::merged(self, overrides)
    }

    /// Raw value for `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no keys.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the underlying tree.
    pub fn as_tree(&self) -> &Tree {
        &self.0
    }

    /// Consume into the underlying tree.
    pub fn into_tree(self) -> Tree {
        self.0
    }

    /// The sub-map under `key`, or an empty config when absent.
    pub fn section(&self, key: &str) -> Result<Config, ConfigError> {
        match self.0.get(key) {
            None => Ok(Config::new()),
            Some(Value::Map(t)) => Ok(Config(t.clone())),
            Some(_) => Err(wrong_type(key, "map")),
        }
    }

    /// Required float.
    pub fn f64(&self, key: &str) -> Result<f64, ConfigError> {
        self.required(key)?
            .as_f64()
            .ok_or_else(|| wrong_type(key, "float"))
    }

    /// Float with a fallback for a missing key.
    pub fn f64_or(&self, key: &str, default: f64) -> Result<f64, ConfigError> {
        match self.0.get(key) {
            None => Ok(default),
            Some(v) => v.as_f64().ok_or_else(|| wrong_type(key, "float")),
        }
    }

    /// Boolean with a fallback for a missing key.
    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.0.get(key) {
            None => Ok(default),
            Some(v) => v.as_bool().ok_or_else(|| wrong_type(key, "bool")),
        }
    }

    /// Required text.
    pub fn str(&self, key: &str) -> Result<&str, ConfigError> {
        self.required(key)?
            .as_str()
            .ok_or_else(|| wrong_type(key, "string"))
    }

    /// Required path.
    pub fn path(&self, key: &str) -> Result<Path, ConfigError> {
        self.required(key)?
            .as_path()
            .ok_or_else(|| wrong_type(key, "path"))
    }

    /// Path with a fallback for a missing key.
    pub fn path_or(&self, key: &str, default: Path) -> Result<Path, ConfigError> {
        match self.0.get(key) {
            None => Ok(default),
            Some(v) => v.as_path().ok_or_else(|| wrong_type(key, "path")),
        }
    }

    /// List of strings with a fallback for a missing key.
    pub fn strings_or(&self, key: &str, default: &[&str]) -> Result<Vec<String>, ConfigError> {
        match self.0.get(key) {
            None => Ok(default.iter().map(|s| s.to_string()).collect()),
            Some(v) => v
                .as_list()
                .and_then(|items| {
                    items
                        .iter()
                        .map(|i| i.as_str().map(str::to_string))
                        .collect::<Option<Vec<_>>>()
                })
                .ok_or_else(|| wrong_type(key, "list of strings")),
        }
    }

    /// List of floats with a fallback for a missing key.
    pub fn floats_or(&self, key: &str, default: &[f64]) -> Result<Vec<f64>, ConfigError> {
        match self.0.get(key) {
            None => Ok(default.to_vec()),
            Some(v) => v
                .as_f64_list()
                .ok_or_else(|| wrong_type(key, "list of floats")),
        }
    }

    fn required(&self, key: &str) -> Result<&Value, ConfigError> {
        self.0.get(key).ok_or_else(|| ConfigError::Missing {
            key: key.to_string(),
        })
    }
}

impl From<Tree> for Config {
    fn from(tree: Tree) -> Self {
        Self(tree)
    }
}

impl From<Config> for Value {
    fn from(config: Config) -> Self {
        Value::Map(config.0)
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Config {
    fn from_iter<T: IntoIterator<Item = (K, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

fn wrong_type(key: &str, expected: &'static str) -> ConfigError {
    ConfigError::WrongType {
        key: key.to_string(),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::tree;

    #[test]
    fn override_replaces_submap_wholesale() {
        let defaults = Config::new().with(
            "a",
            tree([("x", Value::from(1.0)), ("y", Value::from(2.0))]),
        );
        let overrides = Config::new().with("a", tree([("y", Value::from(3.0))]));
        let merged = Config::merged(&defaults, &overrides);
        let a = merged.section("a").unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a.f64("y").unwrap(), 3.0);
        assert!(a.get("x").is_none());
    }

    #[test]
    fn untouched_defaults_survive() {
        let defaults = Config::new().with("a", 1.0).with("b", 2.0);
        let merged = defaults.overridden_by(&Config::new().with("b", 5.0).with("c", 7.0));
        assert_eq!(merged.f64("a").unwrap(), 1.0);
        assert_eq!(merged.f64("b").unwrap(), 5.0);
        assert_eq!(merged.f64("c").unwrap(), 7.0);
        // Default key order is kept, new keys append.
        assert_eq!(merged.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn missing_section_is_empty() {
        assert!(Config::new().section("growth_rate").unwrap().is_empty());
    }

    #[test]
    fn typed_accessors_report_wrong_types() {
        let c = Config::new().with("threshold", "high").with("s", 1.0);
        assert_eq!(
            c.f64_or("threshold", 1.0),
            Err(ConfigError::WrongType {
                key: "threshold".into(),
                expected: "float"
            })
        );
        assert!(c.section("s").is_err());
        assert_eq!(c.f64_or("absent", 4.0).unwrap(), 4.0);
        assert_eq!(
            c.str("agent_id"),
            Err(ConfigError::Missing {
                key: "agent_id".into()
            })
        );
    }

    #[test]
    fn paths_accept_lists_and_paths() {
        let c = Config::new()
            .with("a", Path::new(["boundary"]))
            .with("b", Value::List(vec!["..".into(), "agents".into()]));
        assert_eq!(c.path("a").unwrap(), Path::new(["boundary"]));
        assert_eq!(c.path("b").unwrap(), Path::new(["..", "agents"]));
        assert_eq!(c.path_or("c", Path::here()).unwrap(), Path::here());
    }

    #[test]
    fn string_and_float_lists() {
        let c = Config::new()
            .with("variables", Value::List(vec!["biomass".into()]))
            .with("bounds", vec![30.0, 30.0]);
        assert_eq!(c.strings_or("variables", &[]).unwrap(), vec!["biomass"]);
        assert_eq!(c.floats_or("bounds", &[]).unwrap(), vec![30.0, 30.0]);
        assert_eq!(c.strings_or("none", &["x"]).unwrap(), vec!["x"]);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_config() -> impl Strategy<Value = Config> {
            prop::collection::vec(("[a-d]", -10.0f64..10.0), 0..6).prop_map(|pairs| {
                pairs
                    .into_iter()
                    .map(|(k, v)| (k, Value::Float(v)))
                    .collect::<Config>()
            })
        }

        proptest! {
            #[test]
            fn override_keys_always_win(d in arb_config(), o in arb_config()) {
                let m = Config::merged(&d, &o);
                for (k, v) in o.iter() {
                    prop_assert_eq!(m.get(k), Some(v));
                }
                for (k, v) in d.iter() {
                    if !o.contains_key(k) {
                        prop_assert_eq!(m.get(k), Some(v));
                    }
                }
            }

            #[test]
            fn merge_with_empty_is_identity(d in arb_config()) {
                prop_assert_eq!(Config::merged(&d, &Config::new()), d.clone());
                prop_assert_eq!(Config::merged(&Config::new(), &d), d);
            }
        }
    }
}
