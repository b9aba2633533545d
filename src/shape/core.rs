use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Separator that nests a key inside its parent (`a.b` → `{a: {b}}`).
pub const KEY_SEPARATOR: char = '.';

/// Decoded request variables prior to typed deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Shape {
    #[default]
    Null,
    String(String),
    List(Vec<Shape>),
    Map(BTreeMap<String, Shape>),
}

/// Failure to build or decode a [`Shape`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    /// The same key was used both as a value and as a parent, or two merged
    /// sources provided the same key.
    #[error("conflicting values for key '{key}'")]
    Conflict { key: String },
    /// A key with an empty component, e.g. `a..b` or `.a`.
    #[error("invalid key '{key}'")]
    InvalidKey { key: String },
    /// A string leaf could not be parsed as the requested primitive.
    #[error("value '{value}' is not a valid {expected}")]
    Parse { value: String, expected: &'static str },
    /// Raised by the target type's `Deserialize` impl (missing field, unknown variant, ...).
    #[error("{0}")]
    Custom(String),
}

impl serde::de::Error for ShapeError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        ShapeError::Custom(msg.to_string())
    }
}

impl Shape {
    /// An empty map, the shape of a source with no variables.
    #[must_use]
    pub fn empty() -> Self {
        Shape::Map(BTreeMap::new())
    }

    /// Fold `(key, value)` pairs into a map shape.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError::InvalidKey`] for keys with empty components and
    /// [`ShapeError::Conflict`] when a key is used both as a leaf and a parent.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, ShapeError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut root = BTreeMap::new();
        for (key, value) in pairs {
            let key = key.as_ref();
            let path: Vec<&str> = key.split(KEY_SEPARATOR).collect();
            if path.iter().any(|part| part.is_empty()) {
                return Err(ShapeError::InvalidKey {
                    key: key.to_string(),
                });
            }
            insert(&mut root, &path, key, value.as_ref().to_string())?;
        }
        Ok(Shape::Map(root))
    }

    /// Convert a JSON document into a shape with string leaves.
    ///
    /// Numbers and booleans keep their textual form, so they decode back into
    /// the same primitive types.
    #[must_use]
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => Shape::Null,
            Value::Bool(b) => Shape::String(b.to_string()),
            Value::Number(n) => Shape::String(n.to_string()),
            Value::String(s) => Shape::String(s),
            Value::Array(items) => Shape::List(items.into_iter().map(Shape::from_json).collect()),
            Value::Object(map) => Shape::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Shape::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Union of two map shapes.
    ///
    /// `Null` is the identity. Keys present in both sides are rejected rather
    /// than letting one source silently override another.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError::Conflict`] on a duplicate key or when either side
    /// is a non-map value.
    pub fn merge(self, other: Shape) -> Result<Shape, ShapeError> {
        match (self, other) {
            (Shape::Null, other) => Ok(other),
            (this, Shape::Null) => Ok(this),
            (Shape::Map(mut left), Shape::Map(right)) => {
                for (key, value) in right {
                    match left.entry(key) {
                        Entry::Vacant(slot) => {
                            slot.insert(value);
                        }
                        Entry::Occupied(slot) => {
                            return Err(ShapeError::Conflict {
                                key: slot.key().clone(),
                            });
                        }
                    }
                }
                Ok(Shape::Map(left))
            }
            _ => Err(ShapeError::Conflict {
                key: String::new(),
            }),
        }
    }

    /// Add the keys of `other` that `self` does not already have.
    ///
    /// Keys compare ignoring ASCII case, matching how decoding resolves field
    /// names. Never fails: colliding keys from `other` are dropped. A non-map
    /// `other` contributes nothing.
    #[must_use]
    pub fn fill_missing(self, other: Shape) -> Shape {
        let Shape::Map(extra) = other else {
            return self;
        };
        let mut base = match self {
            Shape::Map(base) => base,
            Shape::Null => BTreeMap::new(),
            leaf => return leaf,
        };
        for (key, value) in extra {
            if !base.keys().any(|existing| existing.eq_ignore_ascii_case(&key)) {
                base.insert(key, value);
            }
        }
        Shape::Map(base)
    }

    /// Look up a direct child of a map shape.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Shape> {
        match self {
            Shape::Map(map) => map.get(key),
            _ => None,
        }
    }

    /// The string value of a leaf.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Shape::String(s) => Some(s),
            _ => None,
        }
    }

    /// Deserialize the shape into `T`.
    ///
    /// # Errors
    ///
    /// Returns the deserializer's [`ShapeError`] when the shape does not fit `T`.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, ShapeError> {
        T::deserialize(self)
    }
}

fn insert(
    map: &mut BTreeMap<String, Shape>,
    path: &[&str],
    full_key: &str,
    value: String,
) -> Result<(), ShapeError> {
    let conflict = || ShapeError::Conflict {
        key: full_key.to_string(),
    };
    let Some((head, rest)) = path.split_first() else {
        return Err(ShapeError::InvalidKey {
            key: full_key.to_string(),
        });
    };

    if rest.is_empty() {
        match map.entry((*head).to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(Shape::String(value));
            }
            Entry::Occupied(mut slot) => {
                let existing = slot.get_mut();
                match existing {
                    Shape::List(items) => items.push(Shape::String(value)),
                    Shape::String(_) => {
                        let first = std::mem::take(existing);
                        *existing = Shape::List(vec![first, Shape::String(value)]);
                    }
                    Shape::Null => *existing = Shape::String(value),
                    Shape::Map(_) => return Err(conflict()),
                }
            }
        }
        return Ok(());
    }

    match map
        .entry((*head).to_string())
        .or_insert_with(|| Shape::Map(BTreeMap::new()))
    {
        Shape::Map(child) => insert(child, rest, full_key, value),
        _ => Err(conflict()),
    }
}
