//! Unique bidirectional map on persistent hash maps.
//!
//! Unlike the `Arc` based containers, clones here share structure even
//! after both sides start writing, so many builders can branch from one
//! base cheaply.

use std::fmt;
use std::hash::Hash;

use crate::error::{Error, Result};

/// Frozen unique `K <-> V` map.
#[derive(Clone)]
pub struct PersistentBiMap<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone + Eq + Hash,
{
    forward: im::HashMap<K, V>,
    backward: im::HashMap<V, K>,
}

impl<K, V> Default for PersistentBiMap<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone + Eq + Hash,
{
    fn default() -> Self {
        Self {
            forward: im::HashMap::new(),
            backward: im::HashMap::new(),
        }
    }
}

impl<K, V> PersistentBiMap<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone + Eq + Hash,
{
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Value stored for `key`.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.forward.get(key)
    }

    /// Key stored for `value`.
    #[must_use]
    pub fn get_key(&self, value: &V) -> Option<&K> {
        self.backward.get(value)
    }

    /// Returns true if `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.forward.contains_key(key)
    }

    /// Returns true if `value` is present.
    #[must_use]
    pub fn contains_value(&self, value: &V) -> bool {
        self.backward.contains_key(value)
    }

    /// Number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// Returns true if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Iterates over `(key, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.forward.iter()
    }

    /// Starts a mutation session sharing this map's structure.
    #[must_use]
    pub fn builder(&self) -> PersistentBiMapBuilder<K, V> {
        PersistentBiMapBuilder { map: self.clone() }
    }
}

impl<K, V> fmt::Debug for PersistentBiMap<K, V>
where
    K: Clone + Eq + Hash + fmt::Debug,
    V: Clone + Eq + Hash + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.forward.iter()).finish()
    }
}

/// Writable form of [`PersistentBiMap`].
#[derive(Clone)]
pub struct PersistentBiMapBuilder<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone + Eq + Hash,
{
    map: PersistentBiMap<K, V>,
}

impl<K, V> Default for PersistentBiMapBuilder<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone + Eq + Hash,
{
    fn default() -> Self {
        Self {
            map: PersistentBiMap::default(),
        }
    }
}

impl<K, V> fmt::Debug for PersistentBiMapBuilder<K, V>
where
    K: Clone + Eq + Hash + fmt::Debug,
    V: Clone + Eq + Hash + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.map, f)
    }
}

impl<K, V> PersistentBiMapBuilder<K, V>
where
    K: Clone + Eq + Hash + fmt::Debug,
    V: Clone + Eq + Hash + fmt::Debug,
{
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new pair.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateKey` or `DuplicateValue` if either side is already
    /// mapped. Nothing changes.
    pub fn put(&mut self, key: K, value: V) -> Result<()> {
        if self.map.forward.contains_key(&key) {
            return Err(Error::duplicate_key(&key));
        }
        if self.map.backward.contains_key(&value) {
            return Err(Error::duplicate_value(&value));
        }
        self.map.forward.insert(key.clone(), value.clone());
        self.map.backward.insert(value, key);
        Ok(())
    }

    /// Removes `key`, returning its value.
    pub fn remove_key(&mut self, key: &K) -> Option<V> {
        let value = self.map.forward.remove(key)?;
        self.map.backward.remove(&value);
        Some(value)
    }

    /// Removes `value`, returning its key.
    pub fn remove_value(&mut self, value: &V) -> Option<K> {
        let key = self.map.backward.remove(value)?;
        self.map.forward.remove(&key);
        Some(key)
    }

    /// Value stored for `key`.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.map.get(key)
    }

    /// Key stored for `value`.
    #[must_use]
    pub fn get_key(&self, value: &V) -> Option<&K> {
        self.map.get_key(value)
    }

    /// Returns true if `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Returns true if `value` is present.
    #[must_use]
    pub fn contains_value(&self, value: &V) -> bool {
        self.map.contains_value(value)
    }

    /// Number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns true if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterates over `(key, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.map.iter()
    }

    /// Ends the mutation session.
    #[must_use]
    pub fn build(self) -> PersistentBiMap<K, V> {
        self.map
    }
}
