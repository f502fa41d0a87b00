//! Error types for the Arbor entity store.
//!
//! Uses `thiserror` for ergonomic error definition with rich context.

use std::fmt;

use thiserror::Error;

use crate::ids::{ClassId, EntityId};

/// Result type alias used throughout Arbor.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Arbor operations.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Names the operation that failed, creating a context if needed.
    #[must_use]
    pub fn in_operation(mut self, operation: impl Into<String>) -> Self {
        let context = self.context.take().unwrap_or_default();
        self.context = Some(context.with_operation(operation));
        self
    }

    /// Creates an entity not found error.
    #[must_use]
    pub fn entity_not_found(id: EntityId) -> Self {
        Self::new(ErrorKind::EntityNotFound(id))
    }

    /// Creates a foreign entity error.
    #[must_use]
    pub fn foreign_entity(id: EntityId) -> Self {
        Self::new(ErrorKind::ForeignEntity(id))
    }

    /// Creates an unknown type error.
    #[must_use]
    pub fn unknown_type(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownType(name.into()))
    }

    /// Creates a duplicate key error.
    #[must_use]
    pub fn duplicate_key(key: impl fmt::Debug) -> Self {
        Self::new(ErrorKind::DuplicateKey(format!("{key:?}")))
    }

    /// Creates a duplicate value error.
    #[must_use]
    pub fn duplicate_value(value: impl fmt::Debug) -> Self {
        Self::new(ErrorKind::DuplicateValue(format!("{value:?}")))
    }

    /// Creates an invalid connection error.
    #[must_use]
    pub fn invalid_connection(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidConnection(message.into()))
    }

    /// Creates a replace-by-source failure.
    #[must_use]
    pub fn replace_by_source(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ReplaceBySource(message.into()))
    }

    /// Creates a store inconsistency error.
    #[must_use]
    pub fn inconsistent(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Inconsistent(message.into()))
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal(message.into()))
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// Entity is not present in the storage it was used with.
    #[error("entity not found: {0:?}")]
    EntityNotFound(EntityId),

    /// Entity handle belongs to an unrelated storage lineage.
    #[error("entity {0:?} belongs to a foreign storage")]
    ForeignEntity(EntityId),

    /// Type name or class id is not registered.
    #[error("unknown entity type: {0}")]
    UnknownType(String),

    /// Field is not part of the entity type's layout.
    #[error("unknown field {field} on {class:?}")]
    UnknownField {
        /// The entity type.
        class: ClassId,
        /// The field that was requested.
        field: String,
    },

    /// Field value does not fit the declared field kind.
    #[error("field {field} expects {expected}, got {actual}")]
    FieldTypeMismatch {
        /// The field that was written.
        field: String,
        /// Description of the expected kind.
        expected: String,
        /// Description of the supplied value.
        actual: String,
    },

    /// Connection does not fit the entities it was used with.
    #[error("invalid connection: {0}")]
    InvalidConnection(String),

    /// A child was left without its mandatory parent.
    #[error("{child} requires a parent through {connection}")]
    MandatoryParentMissing {
        /// Description of the orphaned child.
        child: String,
        /// Debug description of the connection.
        connection: String,
    },

    /// A one-to-one edge was given more than one child.
    #[error("cardinality violation: {0}")]
    CardinalityViolation(String),

    /// Unique key inserted twice.
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// Unique value inserted twice.
    #[error("duplicate value: {0}")]
    DuplicateValue(String),

    /// The reserved absent sentinel was used as data.
    #[error("reserved sentinel used as data: {0}")]
    SentinelValue(i32),

    /// Symbolic identity is already taken by another entity.
    #[error("symbolic id already exists: {0}")]
    SymbolicIdConflict(String),

    /// Source builder of `apply_changes_from` is not based on the target.
    #[error("cannot apply changes: {0}")]
    ReconciliationPrecondition(String),

    /// Replace-by-source could not restore a mandatory edge.
    #[error("replace by source failed: {0}")]
    ReplaceBySource(String),

    /// Consistency check failed.
    #[error("storage is inconsistent: {0}")]
    Inconsistent(String),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// File system error.
    #[error("i/o error: {0}")]
    Io(String),

    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Context about where an error occurred.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Operation that was running.
    pub operation: Option<String>,
    /// Entities involved, outermost first.
    pub entities: Vec<EntityId>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the operation name.
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Adds an entity to the context.
    #[must_use]
    pub fn with_entity(mut self, id: EntityId) -> Self {
        self.entities.push(id);
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(operation) = &self.operation {
            write!(f, "in {operation}")?;
        }
        for id in &self.entities {
            write!(f, " [{id:?}]")?;
        }
        Ok(())
    }
}
