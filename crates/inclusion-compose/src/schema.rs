//! Port schemas: what each port holds, how updates merge, how state divides.
//!
//! A process declares one [`PortSchema`] per port. The engine uses the
//! schema three ways:
//!
//! - fill missing state with each [`Variable`]'s default,
//! - merge returned updates with the variable's [`Updater`],
//! - seed daughter state with the variable's [`Divider`] on division.

use indexmap::IndexMap;
use inclusion_core::{AbsolutePath, StateError, Tree, TreeExt, Value};

/// How an update value combines with the current value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Updater {
    /// Add floats; anything else is replaced.
    #[default]
    Accumulate,
    /// Replace the current value.
    Set,
}

impl Updater {
    /// Combine `current` with `delta`.
    pub fn apply(self, current: Option<&Value>, delta: Value) -> Value {
        match (self, current, delta) {
            (Self::Accumulate, Some(Value::Float(a)), Value::Float(b)) => Value::Float(a + b),
            (_, _, delta) => delta,
        }
    }
}

/// How a mother's value is handed to each daughter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Divider {
    /// Each daughter gets a copy.
    #[default]
    Set,
    /// Extensive quantity: each daughter gets half.
    Split,
    /// Each daughter starts from zero / `false`.
    Zero,
}

impl Divider {
    /// The value one daughter receives.
    pub fn apply(self, value: &Value) -> Value {
        match (self, value) {
            (Self::Split, Value::Float(v)) => Value::Float(v / 2.0),
            (Self::Split, Value::List(items)) => {
                Value::List(items.iter().map(|i| Self::Split.apply(i)).collect())
            }
            (Self::Zero, Value::Float(_)) => Value::Float(0.0),
            (Self::Zero, Value::Bool(_)) => Value::Bool(false),
            (Self::Zero, Value::List(items)) => {
                Value::List(items.iter().map(|i| Self::Zero.apply(i)).collect())
            }
            (_, v) => v.clone(),
        }
    }
}

/// One declared state variable.
#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    /// Value used when the state tree has nothing at this variable.
    pub default: Value,
    /// Update merge rule.
    pub updater: Updater,
    /// Division rule.
    pub divider: Divider,
}

impl Variable {
    /// A variable with `default`, accumulating and copied on division.
    pub fn new(default: impl Into<Value>) -> Self {
        Self {
            default: default.into(),
            updater: Updater::Accumulate,
            divider: Divider::Set,
        }
    }

    /// Replace rather than accumulate.
    pub fn set(mut self) -> Self {
        self.updater = Updater::Set;
        self
    }

    /// Halve on division.
    pub fn split(mut self) -> Self {
        self.divider = Divider::Split;
        self
    }

    /// Reset on division.
    pub fn zero(mut self) -> Self {
        self.divider = Divider::Zero;
        self
    }
}

/// Shape of one port.
#[derive(Clone, Debug, PartialEq)]
pub enum PortSchema {
    /// The port path points at a single value.
    Leaf(Variable),
    /// The port path points at a branch with these named variables.
    Branch(IndexMap<String, Variable>),
    /// The port sees an arbitrary subtree (e.g. all agents). No defaults,
    /// updates are set leaf by leaf.
    Glob,
}

impl PortSchema {
    /// Build a [`PortSchema::Branch`] from `(name, variable)` pairs.
    pub fn branch<I, K>(variables: I) -> Self
    where
        I: IntoIterator<Item = (K, Variable)>,
        K: Into<String>,
    {
        Self::Branch(variables.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// The default value a fresh store at this port should hold.
    pub fn default_value(&self) -> Option<Value> {
        match self {
            Self::Leaf(v) => Some(v.default.clone()),
            Self::Branch(vars) => Some(Value::Map(
                vars.iter()
                    .map(|(k, v)| (k.clone(), v.default.clone()))
                    .collect(),
            )),
            Self::Glob => None,
        }
    }
}

/// Port name → schema, in declaration order.
pub type Schema = IndexMap<String, PortSchema>;

/// Build a [`Schema`] from `(port, schema)` pairs.
pub fn schema<I, K>(ports: I) -> Schema
where
    I: IntoIterator<Item = (K, PortSchema)>,
    K: Into<String>,
{
    ports.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

/// Write each declared variable's default at its resolved port path
/// wherever nothing is stored yet. Glob ports and ports missing from
/// `ports` are skipped.
pub fn fill_defaults(
    state: &mut Tree,
    schema: &Schema,
    ports: &IndexMap<String, AbsolutePath>,
) -> Result<(), StateError> {
    for (port, port_schema) in schema {
        let Some(path) = ports.get(port) else {
            continue;
        };
        match port_schema {
            PortSchema::Leaf(var) => {
                if !path.is_root() && state.lookup(path).is_none() {
                    state.place(path, var.default.clone())?;
                }
            }
            PortSchema::Branch(vars) => {
                for (name, var) in vars {
                    let at = path.child(name.clone());
                    if state.lookup(&at).is_none() {
                        state.place(&at, var.default.clone())?;
                    }
                }
            }
            PortSchema::Glob => {}
        }
    }
    Ok(())
}
