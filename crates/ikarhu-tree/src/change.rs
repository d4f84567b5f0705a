//! The change-description tree.

use indexmap::map::{IntoIter, Iter};
use indexmap::IndexMap;
use serde_json::Value;

// ── Shape ─────────────────────────────────────────────────────────────────

/// Whether a structured value is a keyed mapping or an ordered sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Shape {
    #[default]
    Mapping,
    Sequence,
}

impl Shape {
    pub fn is_sequence(self) -> bool {
        self == Shape::Sequence
    }
}

// ── Change ────────────────────────────────────────────────────────────────

/// What happened to a single key.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// The key was removed (for sequences: the element was spliced out).
    Deleted,
    /// The key was explicitly set to null (diff mode's null marker).
    Null,
    /// The key now holds this scalar.
    Value(Value),
    /// Something below the key changed.
    Tree(ChangeTree),
    /// The key now holds a new structure with exactly these contents,
    /// whatever it held before.
    Replace(ChangeTree),
}

impl Change {
    pub fn is_deleted(&self) -> bool {
        matches!(self, Change::Deleted)
    }

    pub fn is_tree(&self) -> bool {
        matches!(self, Change::Tree(_))
    }

    pub fn as_tree(&self) -> Option<&ChangeTree> {
        match self {
            Change::Tree(tree) => Some(tree),
            _ => None,
        }
    }

    pub fn is_replace(&self) -> bool {
        matches!(self, Change::Replace(_))
    }

    pub fn as_tree_mut(&mut self) -> Option<&mut ChangeTree> {
        match self {
            Change::Tree(tree) => Some(tree),
            _ => None,
        }
    }

    /// The tree of a [`Change::Tree`] or a [`Change::Replace`].
    pub fn contents(&self) -> Option<&ChangeTree> {
        match self {
            Change::Tree(tree) | Change::Replace(tree) => Some(tree),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Change::Value(v) => Some(v),
            _ => None,
        }
    }
}

/// Plain JSON converts structurally: objects and arrays become trees, every
/// scalar (including `null`) becomes [`Change::Value`]. Sentinel strings are
/// only recognised by [`crate::codec::from_json`].
impl From<Value> for Change {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Change::Tree(map.into_iter().map(|(k, v)| (k, Change::from(v))).collect()),
            Value::Array(arr) => {
                let mut tree = ChangeTree::with_shape(Shape::Sequence);
                for (i, v) in arr.into_iter().enumerate() {
                    tree.insert(i.to_string(), Change::from(v));
                }
                Change::Tree(tree)
            }
            scalar => Change::Value(scalar),
        }
    }
}

impl From<ChangeTree> for Change {
    fn from(tree: ChangeTree) -> Self {
        Change::Tree(tree)
    }
}

// ── ChangeTree ────────────────────────────────────────────────────────────

/// A keyed description of what changed, shaped like the changed part of the
/// graph. A key that is absent means "unchanged".
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChangeTree {
    shape: Shape,
    entries: IndexMap<String, Change>,
}

impl ChangeTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shape(shape: Shape) -> Self {
        Self {
            shape,
            entries: IndexMap::new(),
        }
    }

    /// A tree holding exactly one entry.
    pub fn single(key: impl Into<String>, change: Change) -> Self {
        let mut tree = Self::new();
        tree.insert(key, change);
        tree
    }

    /// Builds `{k_n: … {k_1: {key: change}}}` from an innermost-first list of
    /// ancestor keys.
    pub fn fold<'a, I>(ancestors: I, key: impl Into<String>, change: Change) -> Self
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut tree = Self::single(key, change);
        for parent in ancestors {
            tree = Self::single(parent.clone(), Change::Tree(tree));
        }
        tree
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn set_shape(&mut self, shape: Shape) {
        self.shape = shape;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Change> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Change> {
        self.entries.get_mut(key)
    }

    /// Inserts or overwrites an entry, returning the previous change.
    pub fn insert(&mut self, key: impl Into<String>, change: Change) -> Option<Change> {
        self.entries.insert(key.into(), change)
    }

    /// Removes an entry, keeping the order of the remaining ones.
    pub fn remove(&mut self, key: &str) -> Option<Change> {
        self.entries.shift_remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn iter(&self) -> Iter<'_, String, Change> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl FromIterator<(String, Change)> for ChangeTree {
    fn from_iter<T: IntoIterator<Item = (String, Change)>>(iter: T) -> Self {
        Self {
            shape: Shape::Mapping,
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ChangeTree {
    type Item = (String, Change);
    type IntoIter = IntoIter<String, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a ChangeTree {
    type Item = (&'a String, &'a Change);
    type IntoIter = Iter<'a, String, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
