//! Store configuration.

/// What to do when a new or modified entity claims a symbolic id that
/// another entity already holds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SymbolicIdConflict {
    /// Remove the entity currently holding the id and log an error.
    #[default]
    Replace,
    /// Fail the mutation with `SymbolicIdConflict`.
    Reject,
}

/// Configuration carried by every storage.
///
/// Builders derived from a snapshot inherit the snapshot's configuration.
#[derive(Clone, Debug, Default)]
pub struct StoreConfig {
    /// Run `assert_consistency` after every reconciliation.
    pub strict_consistency: bool,

    /// Policy for symbolic id collisions on add and modify.
    pub symbolic_id_conflict: SymbolicIdConflict,
}

impl StoreConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration for tests and tooling: strict checks and
    /// rejected collisions.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            strict_consistency: true,
            symbolic_id_conflict: SymbolicIdConflict::Reject,
        }
    }

    /// Builder method to enable/disable post-reconciliation checks.
    #[must_use]
    pub fn with_strict_consistency(mut self, strict: bool) -> Self {
        self.strict_consistency = strict;
        self
    }

    /// Builder method to set the symbolic id conflict policy.
    #[must_use]
    pub fn with_symbolic_id_conflict(mut self, policy: SymbolicIdConflict) -> Self {
        self.symbolic_id_conflict = policy;
        self
    }
}
