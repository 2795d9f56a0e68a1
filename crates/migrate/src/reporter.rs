//! Outcome reporter - structured progress events from the runner
//!
//! The runner reports each step's start, success and failure through this
//! trait and knows nothing about the destination; the surrounding program
//! decides whether events land on the console, in a log sink, or in a test
//! double.

use crate::error::MigrateError;

/// Receiver for migration progress events
pub trait Reporter: Send + Sync {
    /// A change-set's execution is about to start
    fn started(&self, version: i64, name: &str);

    /// The change-set's transaction committed
    fn succeeded(&self, version: i64, name: &str);

    /// The change-set failed; its transaction has been rolled back
    fn failed(&self, version: i64, name: &str, cause: &MigrateError);

    /// The run found no pending work
    fn nothing_to_do(&self);
}

/// Default reporter emitting `tracing` events
#[derive(Debug, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn started(&self, version: i64, name: &str) {
        tracing::info!("Running change-set v{} ({})", version, name);
    }

    fn succeeded(&self, version: i64, name: &str) {
        tracing::info!("Change-set v{} ({}) completed successfully", version, name);
    }

    fn failed(&self, version: i64, name: &str, cause: &MigrateError) {
        tracing::error!("Change-set v{} ({}) failed: {}", version, name, cause);
    }

    fn nothing_to_do(&self) {
        tracing::info!("Schema is up to date, nothing to migrate");
    }
}
