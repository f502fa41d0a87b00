//! Non-negative `int -> {int}` multimap with inline single values.
//!
//! # Layout
//!
//! `links` maps each key to one slot:
//! - a non-negative slot is the key's only value
//! - a negative slot is a [`pack`]ed offset into `values`, where the key's
//!   run starts
//!
//! Inside `values`, every element of a run is stored plain except the
//! last, which is packed to mark the end. A key with one value therefore
//! costs no entry in `values` at all.
//!
//! The builder keeps edited keys in a plain working set and leaves their old
//! runs orphaned in `values`. [`NonNegativeIntIntMultiMapBuilder::build`]
//! rewrites everything into a fresh compact array.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::Arc;

use super::packing::{is_packed, offset_of, pack, unpack};
use crate::error::{Error, ErrorKind, Result};

/// Lazy, single-pass iterator over one key's values.
///
/// Borrows the container it came from, so the container cannot change while
/// the sequence is alive. Collect it if the values are needed again.
pub struct IntSequence<'a> {
    inner: SequenceInner<'a>,
}

enum SequenceInner<'a> {
    Empty,
    Single(Option<i32>),
    Packed { values: &'a [i32], pos: usize },
    Plain(std::slice::Iter<'a, i32>),
}

impl<'a> IntSequence<'a> {
    /// An empty sequence.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            inner: SequenceInner::Empty,
        }
    }

    fn single(value: i32) -> Self {
        Self {
            inner: SequenceInner::Single(Some(value)),
        }
    }

    fn packed(values: &'a [i32]) -> Self {
        Self {
            inner: SequenceInner::Packed { values, pos: 0 },
        }
    }

    fn plain(values: &'a [i32]) -> Self {
        Self {
            inner: SequenceInner::Plain(values.iter()),
        }
    }
}

impl Iterator for IntSequence<'_> {
    type Item = i32;

    fn next(&mut self) -> Option<i32> {
        match &mut self.inner {
            SequenceInner::Empty => None,
            SequenceInner::Single(value) => value.take(),
            SequenceInner::Packed { values, pos } => {
                let Some(&slot) = values.get(*pos) else {
                    self.inner = SequenceInner::Empty;
                    return None;
                };
                if is_packed(slot) {
                    self.inner = SequenceInner::Empty;
                    Some(unpack(slot))
                } else {
                    *pos += 1;
                    Some(slot)
                }
            }
            SequenceInner::Plain(iter) => iter.next().copied(),
        }
    }
}

impl fmt::Debug for IntSequence<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IntSequence")
    }
}

fn lookup<'a>(links: &HashMap<i32, i32>, values: &'a [i32], key: i32) -> IntSequence<'a> {
    match links.get(&key) {
        None => IntSequence::empty(),
        Some(&slot) if !is_packed(slot) => IntSequence::single(slot),
        Some(&slot) => IntSequence::packed(values.get(offset_of(slot)..).unwrap_or(&[])),
    }
}

fn check_entry(key: i32, value: i32) -> Result<()> {
    if key < 0 {
        return Err(Error::new(ErrorKind::SentinelValue(key)));
    }
    if value < 0 {
        return Err(Error::new(ErrorKind::SentinelValue(value)));
    }
    Ok(())
}

/// Frozen non-negative multimap. Cloning shares the backing storage.
#[derive(Clone, Default)]
pub struct NonNegativeIntIntMultiMap {
    links: Arc<HashMap<i32, i32>>,
    values: Arc<Vec<i32>>,
}

impl NonNegativeIntIntMultiMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the values stored for `key`.
    #[must_use]
    pub fn get(&self, key: i32) -> IntSequence<'_> {
        lookup(&self.links, &self.values, key)
    }

    /// Returns true if `value` is stored for `key`. Scans the run.
    #[must_use]
    pub fn contains(&self, key: i32, value: i32) -> bool {
        self.get(key).any(|v| v == value)
    }

    /// Returns true if `key` has at least one value.
    #[must_use]
    pub fn contains_key(&self, key: i32) -> bool {
        self.links.contains_key(&key)
    }

    /// Iterates over keys with at least one value.
    pub fn keys(&self) -> impl Iterator<Item = i32> + '_ {
        self.links.keys().copied()
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Returns true if no key has a value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Length of the packed value array, including the single-run tails.
    #[must_use]
    pub fn packed_len(&self) -> usize {
        self.values.len()
    }

    /// Returns a builder that shares this map's storage until first write.
    #[must_use]
    pub fn to_builder(&self) -> NonNegativeIntIntMultiMapBuilder {
        NonNegativeIntIntMultiMapBuilder {
            links: Arc::clone(&self.links),
            values: Arc::clone(&self.values),
            modifiable: HashMap::new(),
            dirty: false,
        }
    }
}

impl fmt::Debug for NonNegativeIntIntMultiMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.keys().map(|k| (k, self.get(k).collect::<Vec<_>>())))
            .finish()
    }
}

/// Writable form of [`NonNegativeIntIntMultiMap`].
#[derive(Clone, Default)]
pub struct NonNegativeIntIntMultiMapBuilder {
    links: Arc<HashMap<i32, i32>>,
    values: Arc<Vec<i32>>,
    /// Keys edited since the last build. Disjoint from `links`.
    modifiable: HashMap<i32, Vec<i32>>,
    dirty: bool,
}

impl NonNegativeIntIntMultiMapBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves `key`'s values into the working set and returns them.
    fn working_values(&mut self, key: i32) -> &mut Vec<i32> {
        self.dirty = true;
        match self.modifiable.entry(key) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => {
                let existing: Vec<i32> = lookup(&self.links, &self.values, key).collect();
                if !existing.is_empty() {
                    Arc::make_mut(&mut self.links).remove(&key);
                }
                e.insert(existing)
            }
        }
    }

    fn drop_if_empty(&mut self, key: i32) {
        if self.modifiable.get(&key).is_some_and(Vec::is_empty) {
            self.modifiable.remove(&key);
        }
    }

    /// Appends `values` to `key`'s sequence.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::SentinelValue`] if `key` or any value is
    /// negative. The builder is left unchanged.
    pub fn add_all(&mut self, key: i32, values: &[i32]) -> Result<()> {
        for &value in values {
            check_entry(key, value)?;
        }
        if values.is_empty() {
            return Ok(());
        }
        self.working_values(key).extend_from_slice(values);
        Ok(())
    }

    /// Appends one value to `key`'s sequence.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::SentinelValue`] if `key` or `value` is negative.
    pub fn add(&mut self, key: i32, value: i32) -> Result<()> {
        self.add_all(key, &[value])
    }

    /// Removes one occurrence of `value` from `key`'s sequence.
    pub fn remove(&mut self, key: i32, value: i32) -> bool {
        if !self.contains(key, value) {
            return false;
        }
        let working = self.working_values(key);
        if let Some(pos) = working.iter().position(|&v| v == value) {
            working.remove(pos);
        }
        self.drop_if_empty(key);
        true
    }

    /// Removes every value of `key`.
    pub fn remove_key(&mut self, key: i32) -> bool {
        let in_links = self.links.contains_key(&key);
        if in_links {
            Arc::make_mut(&mut self.links).remove(&key);
        }
        let in_working = self.modifiable.remove(&key).is_some();
        self.dirty |= in_links;
        in_links || in_working
    }

    /// Returns the values stored for `key`.
    #[must_use]
    pub fn get(&self, key: i32) -> IntSequence<'_> {
        match self.modifiable.get(&key) {
            Some(values) => IntSequence::plain(values),
            None => lookup(&self.links, &self.values, key),
        }
    }

    /// Returns true if `value` is stored for `key`.
    #[must_use]
    pub fn contains(&self, key: i32, value: i32) -> bool {
        self.get(key).any(|v| v == value)
    }

    /// Returns true if `key` has at least one value.
    #[must_use]
    pub fn contains_key(&self, key: i32) -> bool {
        self.modifiable.contains_key(&key) || self.links.contains_key(&key)
    }

    /// Iterates over keys with at least one value.
    pub fn keys(&self) -> impl Iterator<Item = i32> + '_ {
        self.links.keys().chain(self.modifiable.keys()).copied()
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len() + self.modifiable.len()
    }

    /// Returns true if no key has a value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Freezes the builder, compacting all runs into a fresh array.
    ///
    /// An untouched builder hands back the storage it was created from.
    ///
    /// # Panics
    ///
    /// Panics if the packed array would exceed `i32::MAX` elements.
    #[must_use]
    pub fn build(self) -> NonNegativeIntIntMultiMap {
        if !self.dirty {
            return NonNegativeIntIntMultiMap {
                links: self.links,
                values: self.values,
            };
        }

        let mut links = HashMap::with_capacity(self.len());
        let mut values = Vec::new();
        let mut push_run = |key: i32, run: &mut dyn Iterator<Item = i32>| {
            let collected: Vec<i32> = run.collect();
            match collected.as_slice() {
                [] => {}
                [single] => {
                    links.insert(key, *single);
                }
                [body @ .., last] => {
                    let offset = i32::try_from(values.len()).expect("packed multimap overflow");
                    values.extend_from_slice(body);
                    values.push(pack(*last));
                    links.insert(key, pack(offset));
                }
            }
        };

        for &key in self.links.keys() {
            push_run(key, &mut lookup(&self.links, &self.values, key));
        }
        for (&key, run) in &self.modifiable {
            push_run(key, &mut run.iter().copied());
        }

        NonNegativeIntIntMultiMap {
            links: Arc::new(links),
            values: Arc::new(values),
        }
    }
}

impl fmt::Debug for NonNegativeIntIntMultiMapBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.keys().map(|k| (k, self.get(k).collect::<Vec<_>>())))
            .finish()
    }
}
