//! Error types for the migration engine
//!
//! Three failure classes: configuration problems the engine cannot reconcile
//! (bad direction, registry/ledger drift), database-level failures (ledger
//! access, transaction begin/commit), and change-set execution failures (the
//! up/down SQL itself was rejected).

use crate::changeset::Direction;

/// Result type alias for migration operations
pub type MigrateResult<T> = Result<T, MigrateError>;

/// Error types for migration operations
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// The registry and the ledger disagree in a way the engine cannot
    /// reconcile, or an invalid direction was requested
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Connectivity or statement failure outside a change-set body
    #[error("Database error while trying to {operation}: {source}")]
    Database {
        operation: String,
        #[source]
        source: sqlx::Error,
    },

    /// The change-set's own up/down block failed; the enclosing transaction
    /// has already been rolled back when this surfaces
    #[error("Change-set v{version} ({name}) failed going {direction}: {source}")]
    ChangeSet {
        version: i64,
        name: String,
        direction: Direction,
        #[source]
        source: sqlx::Error,
    },
}

impl MigrateError {
    pub(crate) fn database(operation: impl Into<String>, source: sqlx::Error) -> Self {
        MigrateError::Database {
            operation: operation.into(),
            source,
        }
    }

    /// The version this error concerns, when it concerns one
    pub fn version(&self) -> Option<i64> {
        match self {
            MigrateError::ChangeSet { version, .. } => Some(*version),
            _ => None,
        }
    }
}
