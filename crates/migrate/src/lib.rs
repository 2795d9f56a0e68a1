//! # notes-migrate: Schema migration engine for the notes service
//!
//! Evolves the notes service's Postgres schema through an ordered sequence of
//! immutable, versioned change-sets. Applied versions are tracked in a ledger
//! table inside the target database; each change-set is executed together with
//! its ledger write in a single transaction, so a failed step leaves the
//! database exactly as it was before that step started.
//!
//! Two operations are exposed: [`MigrationRunner::apply_pending`] advances
//! through every not-yet-applied change-set in ascending version order, and
//! [`MigrationRunner::rollback_one`] reverses exactly the most recently
//! applied one.

pub mod changeset;
pub mod database;
pub mod error;
pub mod ledger;
pub mod reporter;
pub mod runner;
pub mod schema;

// Re-export core types
pub use changeset::{ChangeSet, Direction, Registry};
pub use database::connect;
pub use error::{MigrateError, MigrateResult};
pub use ledger::{Ledger, LedgerEntry, DEFAULT_LEDGER_TABLE};
pub use reporter::{Reporter, TracingReporter};
pub use runner::{ApplyReport, MigrationRunner, RollbackReport};
pub use schema::notes_registry;
