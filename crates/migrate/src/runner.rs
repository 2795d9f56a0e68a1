//! Migration runner - drives transactional application and rollback
//!
//! Compares the registry against the ledger, selects the pending work, and
//! executes it one change-set at a time. Each change-set's SQL block and its
//! ledger write share a single transaction; the transaction is the unit of
//! atomicity, so an interrupted run can always be retried from the top and
//! resumes at the first uncommitted version.

use std::sync::Arc;
use std::time::Instant;

use sqlx::{Executor, PgPool, Postgres, Transaction};
use tracing::{debug, warn};

use crate::changeset::{ChangeSet, Direction, Registry};
use crate::error::{MigrateError, MigrateResult};
use crate::ledger::Ledger;
use crate::reporter::{Reporter, TracingReporter};

/// Result of an advance run
#[derive(Debug)]
pub struct ApplyReport {
    /// Versions applied by this run, in application order
    pub applied: Vec<i64>,
    /// Number of registry change-sets that were already in the ledger
    pub skipped: usize,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

/// Result of a rollback run
#[derive(Debug)]
pub struct RollbackReport {
    /// The version that was reversed, or `None` when the ledger was empty
    pub rolled_back: Option<i64>,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

/// Orchestrates schema migration against a live database
pub struct MigrationRunner {
    pool: PgPool,
    registry: Registry,
    ledger: Ledger,
    reporter: Arc<dyn Reporter>,
}

impl MigrationRunner {
    /// Create a runner over `pool` with the default ledger table and a
    /// tracing-backed reporter
    pub fn new(pool: PgPool, registry: Registry) -> Self {
        Self {
            pool,
            registry,
            ledger: Ledger::default(),
            reporter: Arc::new(TracingReporter),
        }
    }

    pub fn with_ledger(mut self, ledger: Ledger) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Apply every registered change-set with a version above the ledger's
    /// current one, in ascending order.
    ///
    /// The first failure aborts the whole run: later pending change-sets are
    /// not attempted, because schema evolution is strictly sequential and a
    /// failed step invalidates what later steps depend on. Calling this when
    /// nothing is pending is a no-op success.
    pub async fn apply_pending(&self) -> MigrateResult<ApplyReport> {
        let start_time = Instant::now();

        self.ledger.ensure_table(&self.pool).await?;
        let current = self.ledger.current_version(&self.pool).await?;
        debug!("Current ledger version: {}", current);

        let pending = self.registry.pending_after(current);
        if pending.is_empty() {
            self.reporter.nothing_to_do();
            return Ok(ApplyReport {
                applied: Vec::new(),
                skipped: self.registry.len(),
                execution_time_ms: start_time.elapsed().as_millis(),
            });
        }

        let mut applied = Vec::new();
        for changeset in pending {
            self.reporter.started(changeset.version, &changeset.name);
            match self.apply_one(changeset).await {
                Ok(()) => {
                    self.reporter.succeeded(changeset.version, &changeset.name);
                    applied.push(changeset.version);
                }
                Err(err) => {
                    self.reporter.failed(changeset.version, &changeset.name, &err);
                    return Err(err);
                }
            }
        }

        Ok(ApplyReport {
            skipped: self.registry.len() - applied.len(),
            applied,
            execution_time_ms: start_time.elapsed().as_millis(),
        })
    }

    /// Reverse exactly the most recently applied change-set.
    ///
    /// A ledger at version 0 makes this a no-op success. A ledger version
    /// with no matching registry entry (a deployed ledger ahead of the
    /// current build) is a configuration error and leaves the ledger
    /// untouched. Repeated calls are required to unwind further versions.
    pub async fn rollback_one(&self) -> MigrateResult<RollbackReport> {
        let start_time = Instant::now();

        self.ledger.ensure_table(&self.pool).await?;
        let current = self.ledger.current_version(&self.pool).await?;

        if current == 0 {
            self.reporter.nothing_to_do();
            return Ok(RollbackReport {
                rolled_back: None,
                execution_time_ms: start_time.elapsed().as_millis(),
            });
        }

        let changeset = self.registry.get(current).ok_or_else(|| {
            MigrateError::Configuration(format!(
                "ledger is at v{} but no change-set with that version is registered \
                 (ledger drift; rebuild with the full change-set catalog)",
                current
            ))
        })?;

        self.reporter.started(changeset.version, &changeset.name);
        match self.rollback_step(changeset).await {
            Ok(()) => {
                self.reporter.succeeded(changeset.version, &changeset.name);
                Ok(RollbackReport {
                    rolled_back: Some(changeset.version),
                    execution_time_ms: start_time.elapsed().as_millis(),
                })
            }
            Err(err) => {
                self.reporter.failed(changeset.version, &changeset.name, &err);
                Err(err)
            }
        }
    }

    /// Run one change-set's `up` block plus its ledger insert in a single
    /// transaction
    async fn apply_one(&self, changeset: &ChangeSet) -> MigrateResult<()> {
        debug!(
            "Applying change-set v{} ({})",
            changeset.version, changeset.name
        );

        let mut tx = self.begin().await?;

        // The block is handed to the database verbatim over the simple query
        // protocol; a change-set may contain multiple statements.
        if let Err(e) = (&mut *tx).execute(changeset.up.as_str()).await {
            roll_back(tx).await;
            return Err(MigrateError::ChangeSet {
                version: changeset.version,
                name: changeset.name.clone(),
                direction: Direction::Up,
                source: e,
            });
        }

        if let Err(e) = self
            .ledger
            .record_applied(&mut tx, changeset.version, &changeset.name)
            .await
        {
            roll_back(tx).await;
            return Err(e);
        }

        self.commit(tx, changeset.version).await
    }

    /// Run one change-set's `down` block plus its ledger delete in a single
    /// transaction
    async fn rollback_step(&self, changeset: &ChangeSet) -> MigrateResult<()> {
        debug!(
            "Rolling back change-set v{} ({})",
            changeset.version, changeset.name
        );

        let mut tx = self.begin().await?;

        if let Err(e) = (&mut *tx).execute(changeset.down.as_str()).await {
            roll_back(tx).await;
            return Err(MigrateError::ChangeSet {
                version: changeset.version,
                name: changeset.name.clone(),
                direction: Direction::Down,
                source: e,
            });
        }

        if let Err(e) = self
            .ledger
            .record_rolled_back(&mut tx, changeset.version)
            .await
        {
            roll_back(tx).await;
            return Err(e);
        }

        self.commit(tx, changeset.version).await
    }

    async fn begin(&self) -> MigrateResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| MigrateError::database("begin transaction", e))
    }

    async fn commit(&self, tx: Transaction<'_, Postgres>, version: i64) -> MigrateResult<()> {
        tx.commit()
            .await
            .map_err(|e| MigrateError::database(format!("commit change-set v{}", version), e))
    }
}

/// Explicitly roll back a failed change-set's transaction before surfacing
/// the error, so the ledger can never reference an uncommitted schema change
async fn roll_back(tx: Transaction<'_, Postgres>) {
    if let Err(err) = tx.rollback().await {
        warn!("Transaction rollback failed: {}", err);
    }
}
