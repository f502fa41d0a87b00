//! Entity provenance.

use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Where an entity's data originated.
///
/// Every entity carries exactly one source. Sources are plain values used
/// in filter predicates, most importantly by `replace_by_source`.
#[derive(Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EntitySource {
    /// Loaded from a configuration file at the given path.
    ConfigFile(Arc<str>),
    /// Created by code rather than loaded from anywhere.
    Synthetic(Arc<str>),
    /// Placeholder parent that provenance-scoped replacement must keep.
    DummyParent(Arc<str>),
    /// Any other provenance, named by tag.
    Custom(Arc<str>),
}

impl EntitySource {
    /// Creates a config file source.
    #[must_use]
    pub fn config_file(path: impl Into<Arc<str>>) -> Self {
        Self::ConfigFile(path.into())
    }

    /// Creates a synthetic source.
    #[must_use]
    pub fn synthetic(tag: impl Into<Arc<str>>) -> Self {
        Self::Synthetic(tag.into())
    }

    /// Creates a dummy parent source.
    #[must_use]
    pub fn dummy_parent(tag: impl Into<Arc<str>>) -> Self {
        Self::DummyParent(tag.into())
    }

    /// Creates a custom source.
    #[must_use]
    pub fn custom(tag: impl Into<Arc<str>>) -> Self {
        Self::Custom(tag.into())
    }

    /// Returns the path or tag carried by this source.
    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            Self::ConfigFile(s) | Self::Synthetic(s) | Self::DummyParent(s) | Self::Custom(s) => s,
        }
    }

    /// Returns true for dummy parent placeholders.
    #[must_use]
    pub const fn is_dummy_parent(&self) -> bool {
        matches!(self, Self::DummyParent(_))
    }

    /// Returns the config file path, if this source is one.
    #[must_use]
    pub fn config_path(&self) -> Option<&str> {
        match self {
            Self::ConfigFile(path) => Some(path),
            _ => None,
        }
    }
}

impl fmt::Debug for EntitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigFile(path) => write!(f, "ConfigFile({path})"),
            Self::Synthetic(tag) => write!(f, "Synthetic({tag})"),
            Self::DummyParent(tag) => write!(f, "DummyParent({tag})"),
            Self::Custom(tag) => write!(f, "Custom({tag})"),
        }
    }
}
