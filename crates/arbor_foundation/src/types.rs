//! Field kinds for entity layout validation.

use std::fmt;

use crate::ids::ClassId;
use crate::value::Value;

/// Declared kind of one entity field.
///
/// Used by the type registry to validate values written through
/// `add_entity` and `modify_entity`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Boolean field.
    Bool,
    /// Integer field.
    Int,
    /// Float field (also accepts integers).
    Float,
    /// String field.
    String,
    /// Homogeneous list field.
    List(Box<FieldKind>),
    /// Soft link, optionally restricted to one target class.
    Symbolic(Option<ClassId>),
    /// Value or null.
    Optional(Box<FieldKind>),
    /// Accepts any value.
    Any,
}

impl FieldKind {
    /// Creates a list kind with the given element kind.
    #[must_use]
    pub fn list(element: FieldKind) -> Self {
        Self::List(Box::new(element))
    }

    /// Creates an optional kind.
    #[must_use]
    pub fn optional(inner: FieldKind) -> Self {
        Self::Optional(Box::new(inner))
    }

    /// Returns true if null is an acceptable value.
    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        matches!(self, Self::Optional(_) | Self::Any)
    }

    /// Checks whether `value` fits this kind.
    ///
    /// - `Any` accepts all values
    /// - `Optional(K)` accepts null and anything `K` accepts
    /// - `Float` accepts integers
    /// - lists check every element
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Any, _) | (Self::Optional(_), Value::Null) => true,
            (Self::Optional(inner), v) => inner.accepts(v),
            (Self::Bool, Value::Bool(_))
            | (Self::Int | Self::Float, Value::Int(_))
            | (Self::Float, Value::Float(_))
            | (Self::String, Value::String(_)) => true,
            (Self::List(element), Value::List(items)) => items.iter().all(|v| element.accepts(v)),
            (Self::Symbolic(None), Value::Symbolic(_)) => true,
            (Self::Symbolic(Some(class)), Value::Symbolic(id)) => id.class == *class,
            _ => false,
        }
    }

    /// Default value for a freshly created entity that omits this field.
    ///
    /// Returns `None` if the field is mandatory.
    #[must_use]
    pub fn default_value(&self) -> Option<Value> {
        match self {
            Self::Optional(_) | Self::Any => Some(Value::Null),
            Self::List(_) => Some(Value::List(im::Vector::new())),
            _ => None,
        }
    }
}

impl fmt::Debug for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
            Self::String => write!(f, "string"),
            Self::List(element) => write!(f, "[{element:?}]"),
            Self::Symbolic(None) => write!(f, "symbolic"),
            Self::Symbolic(Some(class)) => write!(f, "symbolic<{}>", class.index()),
            Self::Optional(inner) => write!(f, "{inner:?}?"),
            Self::Any => write!(f, "any"),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
