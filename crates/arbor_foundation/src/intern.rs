//! Process-wide interning of entity type names and connection descriptors.
//!
//! Type names are interned to small [`ClassId`]s so that entity ids stay
//! compact and comparisons are integer compares. Connection descriptors are
//! interned so that two equal descriptors are the same `&'static` value and
//! [`ConnectionId`](crate::ConnectionId) equality is pointer identity.
//!
//! The table is created on first use and entries are never evicted. All
//! access goes through one mutex.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::connection::{ConnectionData, ConnectionKey};
use crate::ids::ClassId;

/// Interning table for class names and connection descriptors.
#[derive(Default)]
struct IdentityTable {
    /// Class names, indexed by `ClassId`.
    class_names: Vec<Arc<str>>,
    /// Map from class name to `ClassId`.
    class_index: HashMap<Arc<str>, ClassId>,
    /// Canonical connection descriptors.
    connections: HashMap<ConnectionKey, &'static ConnectionData>,
}

impl IdentityTable {
    fn intern_class(&mut self, name: &str) -> ClassId {
        if let Some(&id) = self.class_index.get(name) {
            return id;
        }

        let idx = u32::try_from(self.class_names.len()).expect("too many interned classes");
        let arc: Arc<str> = name.into();
        self.class_names.push(arc.clone());
        let id = ClassId(idx);
        self.class_index.insert(arc, id);
        id
    }

    fn intern_connection(&mut self, key: ConnectionKey) -> &'static ConnectionData {
        *self
            .connections
            .entry(key)
            .or_insert_with(|| &*Box::leak(Box::new(ConnectionData::from_key(key))))
    }
}

static IDENTITY_TABLE: Lazy<Mutex<IdentityTable>> =
    Lazy::new(|| Mutex::new(IdentityTable::default()));

/// Interns a type name, returning its [`ClassId`].
///
/// The same name always yields the same id within one process.
///
/// # Panics
///
/// Panics if more than `u32::MAX` classes are interned.
#[must_use]
pub fn class_id(name: &str) -> ClassId {
    IDENTITY_TABLE.lock().intern_class(name)
}

/// Looks up an already interned type name without interning it.
#[must_use]
pub fn find_class_id(name: &str) -> Option<ClassId> {
    IDENTITY_TABLE.lock().class_index.get(name).copied()
}

/// Returns the name a [`ClassId`] was interned from.
#[must_use]
pub fn class_name(id: ClassId) -> Option<Arc<str>> {
    IDENTITY_TABLE.lock().class_names.get(id.0 as usize).cloned()
}

/// Returns the number of interned classes.
#[must_use]
pub fn class_count() -> usize {
    IDENTITY_TABLE.lock().class_names.len()
}

/// Returns the canonical descriptor for `key`, creating it on first use.
pub(crate) fn connection(key: ConnectionKey) -> &'static ConnectionData {
    IDENTITY_TABLE.lock().intern_connection(key)
}
