//! Field payloads and symbolic identities.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::ids::ClassId;
use crate::intern;

/// A single field payload of an entity.
///
/// Values are immutable and cheaply cloneable. Lists use a persistent
/// vector so copying a large list field shares structure.
#[derive(Clone)]
pub enum Value {
    /// Absent value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit floating point.
    Float(f64),
    /// String value.
    String(Arc<str>),
    /// Persistent list of values.
    List(im::Vector<Value>),
    /// Soft link to another entity by its symbolic identity.
    Symbolic(SymbolicEntityId),
}

impl Value {
    /// Returns true if this value is null.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Attempts to extract a boolean value.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Attempts to extract an integer value.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Attempts to extract a float value.
    #[must_use]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Attempts to extract a string reference.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Attempts to extract a list reference.
    #[must_use]
    pub const fn as_list(&self) -> Option<&im::Vector<Value>> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Attempts to extract a symbolic link.
    #[must_use]
    pub const fn as_symbolic(&self) -> Option<&SymbolicEntityId> {
        match self {
            Self::Symbolic(id) => Some(id),
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Symbolic(_) => "symbolic",
        }
    }

    /// Visits every symbolic link contained in this value, including
    /// links nested in lists and in the parts of other symbolic ids.
    pub fn for_each_symbolic(&self, visit: &mut impl FnMut(&SymbolicEntityId)) {
        match self {
            Self::List(items) => {
                for item in items {
                    item.for_each_symbolic(visit);
                }
            }
            Self::Symbolic(id) => visit(id),
            _ => {}
        }
    }

    /// Returns a copy of this value with every occurrence of `old` replaced
    /// by `new`, or `None` if `old` does not occur.
    #[must_use]
    pub fn replace_symbolic(&self, old: &SymbolicEntityId, new: &SymbolicEntityId) -> Option<Self> {
        match self {
            Self::Symbolic(id) if id == old => Some(Self::Symbolic(new.clone())),
            Self::List(items) => {
                let mut changed = false;
                let replaced: im::Vector<Value> = items
                    .iter()
                    .map(|item| match item.replace_symbolic(old, new) {
                        Some(v) => {
                            changed = true;
                            v
                        }
                        None => item.clone(),
                    })
                    .collect();
                changed.then_some(Self::List(replaced))
            }
            _ => None,
        }
    }
}

// Floats compare by bit pattern so that Eq and Hash agree
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::String(a), Self::String(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Symbolic(a), Self::Symbolic(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Bool(b) => b.hash(state),
            Self::Int(n) => n.hash(state),
            Self::Float(n) => n.to_bits().hash(state),
            Self::String(s) => s.hash(state),
            Self::List(items) => {
                for item in items {
                    item.hash(state);
                }
            }
            Self::Symbolic(id) => id.hash(state),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::List(items) => f.debug_list().entries(items.iter()).finish(),
            Self::Symbolic(id) => write!(f, "{id:?}"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Symbolic(id) => write!(f, "{id}"),
            other => fmt::Debug::fmt(other, f),
        }
    }
}

// Convenience From implementations

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s.into())
    }
}

impl From<SymbolicEntityId> for Value {
    fn from(id: SymbolicEntityId) -> Self {
        Self::Symbolic(id)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

/// Stable, content-derived identity of an entity.
///
/// Built from the entity's class and the values of the fields its type
/// declares as symbolic identity. Two entities with equal symbolic ids are
/// "the same logical entity" across snapshots even when their internal ids
/// differ.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SymbolicEntityId {
    /// Class of the identified entity.
    pub class: ClassId,
    /// Identity field values, in declaration order.
    pub parts: Vec<Value>,
}

impl SymbolicEntityId {
    /// Creates a symbolic id from its parts.
    #[must_use]
    pub fn new(class: ClassId, parts: Vec<Value>) -> Self {
        Self { class, parts }
    }

    /// Creates a symbolic id consisting of a single name.
    #[must_use]
    pub fn named(class: ClassId, name: impl Into<Value>) -> Self {
        Self {
            class,
            parts: vec![name.into()],
        }
    }

    /// Human readable presentation, e.g. `Module(core)`.
    #[must_use]
    pub fn presentable_name(&self) -> String {
        let class = intern::class_name(self.class)
            .map_or_else(|| format!("#{}", self.class.index()), |n| n.to_string());
        let parts: Vec<String> = self.parts.iter().map(ToString::to_string).collect();
        format!("{class}({})", parts.join(", "))
    }
}

impl fmt::Debug for SymbolicEntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbolic{:?}{:?}", self.class, self.parts)
    }
}

impl fmt::Display for SymbolicEntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.presentable_name())
    }
}
