use crate::value::Value;
use std::fmt;

///
/// PropertyAccess
///
/// Named-property lookup an entity type exposes so key components can read
/// their source values without reflection.
///

pub trait PropertyAccess {
    /// Current value of `name`, or `None` when the entity has no such
    /// property. Absent values are reported as `Some(Value::Null)`.
    fn property(&self, name: &str) -> Option<Value>;
}

///
/// Identifier
///
/// Ordered key values addressing one row within a view: partition
/// components first, then clustering components. Owns its values, so it is a
/// snapshot of the entity at derivation time.
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Identifier {
    components: Vec<Value>,
}

impl Identifier {
    #[must_use]
    pub const fn new(components: Vec<Value>) -> Self {
        Self { components }
    }

    #[must_use]
    pub fn components(&self) -> &[Value] {
        &self.components
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.components.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    #[must_use]
    pub fn into_components(self) -> Vec<Value> {
        self.components
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, component) in self.components.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{component}")?;
        }
        f.write_str(")")
    }
}

impl From<Vec<Value>> for Identifier {
    fn from(components: Vec<Value>) -> Self {
        Self::new(components)
    }
}

impl<V: Into<Value>> FromIterator<V> for Identifier {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}
