//! Generic bidirectional maps used for storage indexes.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

/// Reverse slot of a [`BidirectionalMap`]: one key inline, or a shared list.
#[derive(Clone)]
enum KeySlot<K> {
    Single(K),
    Many(Arc<Vec<K>>),
}

impl<K: Clone + Eq> KeySlot<K> {
    fn as_slice(&self) -> &[K] {
        match self {
            Self::Single(key) => std::slice::from_ref(key),
            Self::Many(keys) => keys,
        }
    }

    fn push(&mut self, key: K) {
        match self {
            Self::Single(existing) => {
                *self = Self::Many(Arc::new(vec![existing.clone(), key]));
            }
            Self::Many(keys) => Arc::make_mut(keys).push(key),
        }
    }

    /// Removes `key`; returns true if the slot is now empty.
    fn remove(&mut self, key: &K) -> bool {
        match self {
            Self::Single(existing) => existing == key,
            Self::Many(keys) => {
                if let Some(pos) = keys.iter().position(|k| k == key) {
                    Arc::make_mut(keys).remove(pos);
                }
                let remaining = keys.len();
                if remaining == 1 {
                    let only = keys[0].clone();
                    *self = Self::Single(only);
                }
                remaining == 0
            }
        }
    }
}

/// Map from unique keys to values, with a reverse `value -> keys` index.
///
/// Many keys may share a value. Reverse slots holding a single key are
/// stored inline; slots holding several keys are shared lists that a clone
/// copies only when one side writes to them.
#[derive(Clone)]
pub struct BidirectionalMap<K, V> {
    key_to_value: HashMap<K, V>,
    value_to_keys: HashMap<V, KeySlot<K>>,
}

impl<K, V> Default for BidirectionalMap<K, V> {
    fn default() -> Self {
        Self {
            key_to_value: HashMap::new(),
            value_to_keys: HashMap::new(),
        }
    }
}

impl<K, V> BidirectionalMap<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone + Eq + Hash,
{
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps `key` to `value`, returning the value it replaced.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let previous = self.remove(&key);
        self.value_to_keys
            .entry(value.clone())
            .and_modify(|slot| slot.push(key.clone()))
            .or_insert_with(|| KeySlot::Single(key.clone()));
        self.key_to_value.insert(key, value);
        previous
    }

    /// Value stored for `key`.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.key_to_value.get(key)
    }

    /// Keys mapped to `value`.
    #[must_use]
    pub fn get_keys(&self, value: &V) -> &[K] {
        self.value_to_keys.get(value).map(KeySlot::as_slice).unwrap_or(&[])
    }

    /// Removes `key`, returning its value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let value = self.key_to_value.remove(key)?;
        if let Some(slot) = self.value_to_keys.get_mut(&value) {
            if slot.remove(key) {
                self.value_to_keys.remove(&value);
            }
        }
        Some(value)
    }

    /// Removes every key mapped to `value`, returning them.
    pub fn remove_value(&mut self, value: &V) -> Vec<K> {
        let Some(slot) = self.value_to_keys.remove(value) else {
            return Vec::new();
        };
        let keys = slot.as_slice().to_vec();
        for key in &keys {
            self.key_to_value.remove(key);
        }
        keys
    }

    /// Returns true if `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.key_to_value.contains_key(key)
    }

    /// Returns true if some key maps to `value`.
    #[must_use]
    pub fn contains_value(&self, value: &V) -> bool {
        self.value_to_keys.contains_key(value)
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.key_to_value.len()
    }

    /// Returns true if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.key_to_value.is_empty()
    }

    /// Iterates over keys.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.key_to_value.keys()
    }

    /// Iterates over distinct values.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.value_to_keys.keys()
    }

    /// Iterates over `(key, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.key_to_value.iter()
    }

    /// Removes everything.
    pub fn clear(&mut self) {
        self.key_to_value.clear();
        self.value_to_keys.clear();
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for BidirectionalMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.key_to_value.iter()).finish()
    }
}

/// Many-to-many relation kept indexed from both sides.
#[derive(Clone)]
pub struct BidirectionalMultiMap<K, V> {
    key_to_values: HashMap<K, HashSet<V>>,
    value_to_keys: HashMap<V, HashSet<K>>,
}

impl<K, V> Default for BidirectionalMultiMap<K, V> {
    fn default() -> Self {
        Self {
            key_to_values: HashMap::new(),
            value_to_keys: HashMap::new(),
        }
    }
}

impl<K, V> BidirectionalMultiMap<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone + Eq + Hash,
{
    /// Creates an empty multimap.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the pair, returning false if it was already present.
    pub fn put(&mut self, key: K, value: V) -> bool {
        if !self.key_to_values.entry(key.clone()).or_default().insert(value.clone()) {
            return false;
        }
        self.value_to_keys.entry(value).or_default().insert(key);
        true
    }

    /// Removes the pair, returning false if it was absent.
    pub fn remove(&mut self, key: &K, value: &V) -> bool {
        let Some(values) = self.key_to_values.get_mut(key) else {
            return false;
        };
        if !values.remove(value) {
            return false;
        }
        if values.is_empty() {
            self.key_to_values.remove(key);
        }
        if let Some(keys) = self.value_to_keys.get_mut(value) {
            keys.remove(key);
            if keys.is_empty() {
                self.value_to_keys.remove(value);
            }
        }
        true
    }

    /// Removes every pair with `key`, returning the values it had.
    pub fn remove_key(&mut self, key: &K) -> HashSet<V> {
        let values = self.key_to_values.remove(key).unwrap_or_default();
        for value in &values {
            if let Some(keys) = self.value_to_keys.get_mut(value) {
                keys.remove(key);
                if keys.is_empty() {
                    self.value_to_keys.remove(value);
                }
            }
        }
        values
    }

    /// Removes every pair with `value`, returning the keys it had.
    pub fn remove_value(&mut self, value: &V) -> HashSet<K> {
        let keys = self.value_to_keys.remove(value).unwrap_or_default();
        for key in &keys {
            if let Some(values) = self.key_to_values.get_mut(key) {
                values.remove(value);
                if values.is_empty() {
                    self.key_to_values.remove(key);
                }
            }
        }
        keys
    }

    /// Values paired with `key`.
    pub fn get_values(&self, key: &K) -> impl Iterator<Item = &V> {
        self.key_to_values.get(key).into_iter().flatten()
    }

    /// Keys paired with `value`.
    pub fn get_keys(&self, value: &V) -> impl Iterator<Item = &K> {
        self.value_to_keys.get(value).into_iter().flatten()
    }

    /// Returns true if the pair is present.
    #[must_use]
    pub fn contains(&self, key: &K, value: &V) -> bool {
        self.key_to_values.get(key).is_some_and(|values| values.contains(value))
    }

    /// Returns true if `key` has any value.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.key_to_values.contains_key(key)
    }

    /// Returns true if `value` has any key.
    #[must_use]
    pub fn contains_value(&self, value: &V) -> bool {
        self.value_to_keys.contains_key(value)
    }

    /// Iterates over keys with at least one value.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.key_to_values.keys()
    }

    /// Iterates over values with at least one key.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.value_to_keys.keys()
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.key_to_values.len()
    }

    /// Returns true if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.key_to_values.is_empty()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for BidirectionalMultiMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.key_to_values.iter()).finish()
    }
}
