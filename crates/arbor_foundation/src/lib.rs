//! Arbor Foundation - ids, values, interning, and packed containers.
//!
//! This crate provides the building blocks shared by every other Arbor
//! crate:
//! - [`EntityId`], [`ClassId`] and [`Lineage`]
//! - [`Value`] field payloads and [`SymbolicEntityId`]
//! - [`EntitySource`] provenance markers
//! - process-wide interning of class names and [`ConnectionId`]s
//! - copy-on-write containers in [`collections`]
//! - the [`Error`] type used throughout

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod collections;
pub mod connection;
pub mod error;
pub mod ids;
pub mod intern;
pub mod source;
pub mod types;
pub mod value;

pub use connection::{ConnectionId, ConnectionType};
pub use error::{Error, ErrorContext, ErrorKind, Result};
pub use ids::{ClassId, EntityId, Lineage};
pub use source::EntitySource;
pub use types::FieldKind;
pub use value::{SymbolicEntityId, Value};
