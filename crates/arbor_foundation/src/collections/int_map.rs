//! Int map with a reserved absent sentinel.

use std::collections::HashMap;

use crate::error::{Error, ErrorKind, Result};

/// `i32 -> i32` map that answers [`IntIntDefaultMap::DEFAULT`] for absent
/// keys.
///
/// The sentinel can never be stored, so a lookup result of `-1` always
/// means "absent". Keys must be non-negative.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IntIntDefaultMap {
    map: HashMap<i32, i32>,
}

impl IntIntDefaultMap {
    /// Value returned for absent keys.
    pub const DEFAULT: i32 = -1;

    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value for `key`, or [`Self::DEFAULT`].
    #[must_use]
    pub fn get(&self, key: i32) -> i32 {
        self.map.get(&key).copied().unwrap_or(Self::DEFAULT)
    }

    /// Returns the value for `key`, treating the sentinel as absence.
    #[must_use]
    pub fn get_opt(&self, key: i32) -> Option<i32> {
        self.map.get(&key).copied()
    }

    /// Stores `value` for `key`, returning the previous value or the
    /// sentinel.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::SentinelValue`] if `value` is the sentinel or
    /// `key` is negative. The map is left unchanged.
    pub fn put(&mut self, key: i32, value: i32) -> Result<i32> {
        if value == Self::DEFAULT {
            return Err(Error::new(ErrorKind::SentinelValue(value)));
        }
        if key < 0 {
            return Err(Error::new(ErrorKind::SentinelValue(key)));
        }
        Ok(self.map.insert(key, value).unwrap_or(Self::DEFAULT))
    }

    /// Removes `key`, returning its value or the sentinel.
    pub fn remove(&mut self, key: i32) -> i32 {
        self.map.remove(&key).unwrap_or(Self::DEFAULT)
    }

    /// Returns true if `key` has a value.
    #[must_use]
    pub fn contains_key(&self, key: i32) -> bool {
        self.map.contains_key(&key)
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns true if no keys are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterates over `(key, value)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.map.iter().map(|(&k, &v)| (k, v))
    }

    /// Iterates over stored keys.
    pub fn keys(&self) -> impl Iterator<Item = i32> + '_ {
        self.map.keys().copied()
    }
}
