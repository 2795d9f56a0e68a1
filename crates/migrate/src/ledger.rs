//! Ledger accessor - the persistent record of applied versions
//!
//! The ledger lives inside the target database as a small table holding one
//! row per applied change-set. Row inserts and deletes are only ever executed
//! inside a transaction owned by the runner, so they commit atomically with
//! the schema change they describe; this module never opens a transaction of
//! its own for them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Row, Transaction};

use crate::error::{MigrateError, MigrateResult};

/// Default name of the ledger table
pub const DEFAULT_LEDGER_TABLE: &str = "schema_migrations";

/// One applied change-set as recorded in the target database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Version of the change-set that was applied
    pub version: i64,
    /// Change-set name at time of application (audit only, not re-validated)
    pub name: String,
    /// When the applying transaction committed
    pub applied_at: DateTime<Utc>,
}

/// Reads and writes the applied-versions table.
///
/// The row layout is fixed (`version` bigint primary key, `name` text,
/// `applied_at` timestamptz defaulting to insertion time); only the table
/// name is configurable, so tests can isolate their state.
#[derive(Debug, Clone)]
pub struct Ledger {
    table: String,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(DEFAULT_LEDGER_TABLE)
    }
}

impl Ledger {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Idempotently create the ledger table; safe to call on every run
    pub async fn ensure_table(&self, pool: &PgPool) -> MigrateResult<()> {
        sqlx::query(&self.create_table_sql())
            .execute(pool)
            .await
            .map_err(|e| MigrateError::database("create ledger table", e))?;
        Ok(())
    }

    /// Highest recorded version, or 0 when the ledger is empty
    pub async fn current_version(&self, pool: &PgPool) -> MigrateResult<i64> {
        let version: i64 = sqlx::query_scalar(&self.current_version_sql())
            .fetch_one(pool)
            .await
            .map_err(|e| MigrateError::database("read current ledger version", e))?;
        Ok(version)
    }

    /// Insert one ledger row inside the caller's transaction
    pub async fn record_applied(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        version: i64,
        name: &str,
    ) -> MigrateResult<()> {
        sqlx::query(&self.insert_sql())
            .bind(version)
            .bind(name)
            .execute(&mut **tx)
            .await
            .map_err(|e| {
                MigrateError::database(format!("record change-set v{} in ledger", version), e)
            })?;
        Ok(())
    }

    /// Delete one ledger row inside the caller's transaction
    pub async fn record_rolled_back(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        version: i64,
    ) -> MigrateResult<()> {
        sqlx::query(&self.delete_sql())
            .bind(version)
            .execute(&mut **tx)
            .await
            .map_err(|e| {
                MigrateError::database(format!("remove change-set v{} from ledger", version), e)
            })?;
        Ok(())
    }

    /// All ledger rows in ascending version order, for audit and assertions
    pub async fn entries(&self, pool: &PgPool) -> MigrateResult<Vec<LedgerEntry>> {
        let rows = sqlx::query(&self.select_entries_sql())
            .fetch_all(pool)
            .await
            .map_err(|e| MigrateError::database("list ledger entries", e))?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let version: i64 = row
                .try_get("version")
                .map_err(|e| MigrateError::database("decode ledger version", e))?;
            let name: String = row
                .try_get("name")
                .map_err(|e| MigrateError::database("decode ledger name", e))?;
            let applied_at: DateTime<Utc> = row
                .try_get("applied_at")
                .map_err(|e| MigrateError::database("decode ledger applied_at", e))?;

            entries.push(LedgerEntry {
                version,
                name,
                applied_at,
            });
        }

        Ok(entries)
    }

    fn create_table_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    \
                version BIGINT PRIMARY KEY,\n    \
                name TEXT NOT NULL,\n    \
                applied_at TIMESTAMPTZ NOT NULL DEFAULT now()\n\
            );",
            self.table
        )
    }

    fn current_version_sql(&self) -> String {
        format!("SELECT COALESCE(MAX(version), 0) FROM {}", self.table)
    }

    fn insert_sql(&self) -> String {
        format!("INSERT INTO {} (version, name) VALUES ($1, $2)", self.table)
    }

    fn delete_sql(&self) -> String {
        format!("DELETE FROM {} WHERE version = $1", self.table)
    }

    fn select_entries_sql(&self) -> String {
        format!(
            "SELECT version, name, applied_at FROM {} ORDER BY version ASC",
            self.table
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_name() {
        let ledger = Ledger::default();
        assert_eq!(ledger.table(), "schema_migrations");
    }

    #[test]
    fn test_create_table_sql() {
        let sql = Ledger::default().create_table_sql();
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS schema_migrations"));
        assert!(sql.contains("version BIGINT PRIMARY KEY"));
        assert!(sql.contains("name TEXT NOT NULL"));
        assert!(sql.contains("applied_at TIMESTAMPTZ NOT NULL DEFAULT now()"));
    }

    #[test]
    fn test_version_and_row_sql() {
        let ledger = Ledger::new("audit_migrations");

        assert_eq!(
            ledger.current_version_sql(),
            "SELECT COALESCE(MAX(version), 0) FROM audit_migrations"
        );
        assert_eq!(
            ledger.insert_sql(),
            "INSERT INTO audit_migrations (version, name) VALUES ($1, $2)"
        );
        assert_eq!(
            ledger.delete_sql(),
            "DELETE FROM audit_migrations WHERE version = $1"
        );
        assert!(ledger.select_entries_sql().contains("ORDER BY version ASC"));
    }
}
