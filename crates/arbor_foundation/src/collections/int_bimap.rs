//! Int bimaps backing parent/child edge tables.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::int_map::IntIntDefaultMap;
use super::multimap::{IntSequence, NonNegativeIntIntMultiMap, NonNegativeIntIntMultiMapBuilder};
use crate::error::{Error, ErrorKind, Result};

// =============================================================================
// Unique int <-> int
// =============================================================================

/// Frozen unique `int <-> int` bimap, used for one-to-one edges.
#[derive(Clone, Default)]
pub struct IntIntUniqueBiMap {
    key_to_value: Arc<HashMap<i32, i32>>,
    value_to_key: Arc<HashMap<i32, i32>>,
}

impl IntIntUniqueBiMap {
    /// Creates an empty bimap.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Value stored for `key`.
    #[must_use]
    pub fn get_value(&self, key: i32) -> Option<i32> {
        self.key_to_value.get(&key).copied()
    }

    /// Key stored for `value`.
    #[must_use]
    pub fn get_key(&self, value: i32) -> Option<i32> {
        self.value_to_key.get(&value).copied()
    }

    /// Returns true if `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: i32) -> bool {
        self.key_to_value.contains_key(&key)
    }

    /// Returns true if `value` is present.
    #[must_use]
    pub fn contains_value(&self, value: i32) -> bool {
        self.value_to_key.contains_key(&value)
    }

    /// Number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.key_to_value.len()
    }

    /// Returns true if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.key_to_value.is_empty()
    }

    /// Iterates over `(key, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.key_to_value.iter().map(|(&k, &v)| (k, v))
    }

    /// Returns a builder sharing this bimap's storage until first write.
    #[must_use]
    pub fn to_builder(&self) -> IntIntUniqueBiMapBuilder {
        IntIntUniqueBiMapBuilder { map: self.clone() }
    }
}

impl fmt::Debug for IntIntUniqueBiMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Writable form of [`IntIntUniqueBiMap`].
#[derive(Clone, Debug, Default)]
pub struct IntIntUniqueBiMapBuilder {
    map: IntIntUniqueBiMap,
}

impl IntIntUniqueBiMapBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new pair.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateKey` if `key` is already mapped and
    /// `DuplicateValue` if `value` is already mapped. Nothing changes.
    pub fn put(&mut self, key: i32, value: i32) -> Result<()> {
        if self.map.contains_key(key) {
            return Err(Error::duplicate_key(key));
        }
        if self.map.contains_value(value) {
            return Err(Error::duplicate_value(value));
        }
        Arc::make_mut(&mut self.map.key_to_value).insert(key, value);
        Arc::make_mut(&mut self.map.value_to_key).insert(value, key);
        Ok(())
    }

    /// Inserts a pair, first removing whatever `key` and `value` were
    /// mapped to.
    pub fn put_forced(&mut self, key: i32, value: i32) {
        self.remove_key(key);
        self.remove_value(value);
        Arc::make_mut(&mut self.map.key_to_value).insert(key, value);
        Arc::make_mut(&mut self.map.value_to_key).insert(value, key);
    }

    /// Removes `key`, returning its value.
    pub fn remove_key(&mut self, key: i32) -> Option<i32> {
        if !self.map.contains_key(key) {
            return None;
        }
        let value = Arc::make_mut(&mut self.map.key_to_value).remove(&key)?;
        Arc::make_mut(&mut self.map.value_to_key).remove(&value);
        Some(value)
    }

    /// Removes `value`, returning its key.
    pub fn remove_value(&mut self, value: i32) -> Option<i32> {
        if !self.map.contains_value(value) {
            return None;
        }
        let key = Arc::make_mut(&mut self.map.value_to_key).remove(&value)?;
        Arc::make_mut(&mut self.map.key_to_value).remove(&key);
        Some(key)
    }

    /// Value stored for `key`.
    #[must_use]
    pub fn get_value(&self, key: i32) -> Option<i32> {
        self.map.get_value(key)
    }

    /// Key stored for `value`.
    #[must_use]
    pub fn get_key(&self, value: i32) -> Option<i32> {
        self.map.get_key(value)
    }

    /// Returns true if `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: i32) -> bool {
        self.map.contains_key(key)
    }

    /// Returns true if `value` is present.
    #[must_use]
    pub fn contains_value(&self, value: i32) -> bool {
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
    pub fn iter(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.map.iter()
    }

    /// Freezes the builder.
    #[must_use]
    pub fn build(self) -> IntIntUniqueBiMap {
        self.map
    }
}

// =============================================================================
// Non-negative int -> int with many keys per value
// =============================================================================

/// Frozen `key -> value` map with a `value -> {keys}` index.
///
/// Used for one-to-many edges: keys are children, values are parents.
#[derive(Clone, Default)]
pub struct NonNegativeIntIntBiMap {
    key_to_value: Arc<IntIntDefaultMap>,
    value_to_keys: NonNegativeIntIntMultiMap,
}

impl NonNegativeIntIntBiMap {
    /// Creates an empty bimap.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Value stored for `key`.
    #[must_use]
    pub fn get_value(&self, key: i32) -> Option<i32> {
        self.key_to_value.get_opt(key)
    }

    /// Keys mapped to `value`, in insertion order.
    #[must_use]
    pub fn get_keys(&self, value: i32) -> IntSequence<'_> {
        self.value_to_keys.get(value)
    }

    /// Returns true if `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: i32) -> bool {
        self.key_to_value.contains_key(key)
    }

    /// Returns true if at least one key maps to `value`.
    #[must_use]
    pub fn contains_value(&self, value: i32) -> bool {
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

    /// Iterates over `(key, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.key_to_value.iter()
    }

    /// Returns a builder sharing this bimap's storage until first write.
    #[must_use]
    pub fn to_builder(&self) -> NonNegativeIntIntBiMapBuilder {
        NonNegativeIntIntBiMapBuilder {
            key_to_value: Arc::clone(&self.key_to_value),
            value_to_keys: self.value_to_keys.to_builder(),
        }
    }
}

impl fmt::Debug for NonNegativeIntIntBiMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Writable form of [`NonNegativeIntIntBiMap`].
#[derive(Clone, Debug, Default)]
pub struct NonNegativeIntIntBiMapBuilder {
    key_to_value: Arc<IntIntDefaultMap>,
    value_to_keys: NonNegativeIntIntMultiMapBuilder,
}

impl NonNegativeIntIntBiMapBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps `key` to `value`, replacing any previous value of `key`.
    ///
    /// # Errors
    ///
    /// Returns `SentinelValue` if either side is negative. Nothing changes.
    pub fn put(&mut self, key: i32, value: i32) -> Result<()> {
        if self.key_to_value.get_opt(key) == Some(value) {
            return Ok(());
        }
        // Validate both sides before touching either index
        if key < 0 || value < 0 {
            return Err(Error::new(ErrorKind::SentinelValue(key.min(value))));
        }
        self.remove_key(key);
        Arc::make_mut(&mut self.key_to_value).put(key, value)?;
        self.value_to_keys.add(value, key)
    }

    /// Maps every key in `keys` to `value`.
    ///
    /// # Errors
    ///
    /// Returns `SentinelValue` on the first negative entry; keys before it
    /// stay mapped.
    pub fn put_all(&mut self, keys: &[i32], value: i32) -> Result<()> {
        for &key in keys {
            self.put(key, value)?;
        }
        Ok(())
    }

    /// Removes `key`, returning its value.
    pub fn remove_key(&mut self, key: i32) -> Option<i32> {
        let value = self.key_to_value.get_opt(key)?;
        Arc::make_mut(&mut self.key_to_value).remove(key);
        self.value_to_keys.remove(value, key);
        Some(value)
    }

    /// Removes the pair `key -> value` if present.
    pub fn remove(&mut self, key: i32, value: i32) -> bool {
        if self.key_to_value.get_opt(key) != Some(value) {
            return false;
        }
        self.remove_key(key).is_some()
    }

    /// Removes every key mapped to `value`, returning them.
    pub fn remove_value(&mut self, value: i32) -> Vec<i32> {
        let keys: Vec<i32> = self.value_to_keys.get(value).collect();
        if keys.is_empty() {
            return keys;
        }
        let key_to_value = Arc::make_mut(&mut self.key_to_value);
        for &key in &keys {
            key_to_value.remove(key);
        }
        self.value_to_keys.remove_key(value);
        keys
    }

    /// Value stored for `key`.
    #[must_use]
    pub fn get_value(&self, key: i32) -> Option<i32> {
        self.key_to_value.get_opt(key)
    }

    /// Keys mapped to `value`.
    #[must_use]
    pub fn get_keys(&self, value: i32) -> IntSequence<'_> {
        self.value_to_keys.get(value)
    }

    /// Returns true if `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: i32) -> bool {
        self.key_to_value.contains_key(key)
    }

    /// Returns true if at least one key maps to `value`.
    #[must_use]
    pub fn contains_value(&self, value: i32) -> bool {
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

    /// Iterates over `(key, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.key_to_value.iter()
    }

    /// Freezes the builder, compacting the reverse index.
    #[must_use]
    pub fn build(self) -> NonNegativeIntIntBiMap {
        NonNegativeIntIntBiMap {
            key_to_value: self.key_to_value,
            value_to_keys: self.value_to_keys.build(),
        }
    }
}
