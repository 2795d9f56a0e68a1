//! Change-set definitions - Core types for the migration catalog
//!
//! A [`ChangeSet`] is an immutable, versioned pair of forward (`up`) and
//! reverse (`down`) SQL blocks. The [`Registry`] is the ordered catalog of
//! every change-set known to the build; it is constructed explicitly and
//! handed to the runner, never kept as a process-wide global.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, MigrateResult};

/// An immutable schema change, created once per release and never modified.
///
/// The `up` and `down` bodies are opaque SQL text: the engine hands them to
/// the database verbatim and never parses or splits them, so a change-set may
/// contain multiple statements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Positive integer defining the total order; unique across the registry
    pub version: i64,
    /// Human-readable identifier, used for logging and ledger annotation only
    pub name: String,
    /// SQL block that moves the schema forward one version
    pub up: String,
    /// SQL block that exactly reverses `up`
    pub down: String,
}

impl ChangeSet {
    pub fn new(
        version: i64,
        name: impl Into<String>,
        up: impl Into<String>,
        down: impl Into<String>,
    ) -> Self {
        Self {
            version,
            name: name.into(),
            up: up.into(),
            down: down.into(),
        }
    }
}

/// Migration direction selected by the invoking process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Apply all pending change-sets
    Up,
    /// Roll back the single most recently applied change-set
    Down,
}

impl FromStr for Direction {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            other => Err(MigrateError::Configuration(format!(
                "unknown direction '{}' (use up|down)",
                other
            ))),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// Ordered, read-only catalog of change-sets.
///
/// Construction validates the ordering invariants; there is no mutation API
/// afterwards.
#[derive(Debug, Clone)]
pub struct Registry {
    changesets: Vec<ChangeSet>,
}

impl Registry {
    /// Build a registry, validating that versions are positive, strictly
    /// increasing and unique, and that names are unique.
    pub fn new(changesets: Vec<ChangeSet>) -> MigrateResult<Self> {
        let mut previous: Option<&ChangeSet> = None;
        for changeset in &changesets {
            if changeset.version <= 0 {
                return Err(MigrateError::Configuration(format!(
                    "change-set '{}' has non-positive version {}",
                    changeset.name, changeset.version
                )));
            }
            if let Some(prev) = previous {
                if changeset.version <= prev.version {
                    return Err(MigrateError::Configuration(format!(
                        "change-set versions must be strictly increasing: v{} ({}) follows v{} ({})",
                        changeset.version, changeset.name, prev.version, prev.name
                    )));
                }
            }
            previous = Some(changeset);
        }

        for (i, changeset) in changesets.iter().enumerate() {
            if changesets[..i].iter().any(|c| c.name == changeset.name) {
                return Err(MigrateError::Configuration(format!(
                    "duplicate change-set name '{}'",
                    changeset.name
                )));
            }
        }

        Ok(Self { changesets })
    }

    pub fn len(&self) -> usize {
        self.changesets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changesets.is_empty()
    }

    /// All change-sets in ascending version order
    pub fn iter(&self) -> impl Iterator<Item = &ChangeSet> {
        self.changesets.iter()
    }

    /// Lookup by exact version
    pub fn get(&self, version: i64) -> Option<&ChangeSet> {
        self.changesets.iter().find(|c| c.version == version)
    }

    /// Highest registered version, or 0 for an empty registry
    pub fn latest_version(&self) -> i64 {
        self.changesets.last().map(|c| c.version).unwrap_or(0)
    }

    /// The ordered work set for an advance: every change-set with a version
    /// strictly greater than `version`, ascending
    pub fn pending_after(&self, version: i64) -> &[ChangeSet] {
        let start = self.changesets.partition_point(|c| c.version <= version);
        &self.changesets[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn changeset(version: i64, name: &str) -> ChangeSet {
        ChangeSet::new(version, name, "SELECT 1;", "SELECT 1;")
    }

    #[test]
    fn test_registry_accepts_sparse_ascending_versions() {
        let registry = Registry::new(vec![
            changeset(1, "first"),
            changeset(3, "second"),
            changeset(10, "third"),
        ])
        .unwrap();

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.latest_version(), 10);
    }

    #[test]
    fn test_registry_rejects_duplicate_versions() {
        let result = Registry::new(vec![changeset(1, "first"), changeset(1, "second")]);
        assert!(matches!(result, Err(MigrateError::Configuration(_))));
    }

    #[test]
    fn test_registry_rejects_descending_versions() {
        let result = Registry::new(vec![changeset(2, "first"), changeset(1, "second")]);
        assert!(matches!(result, Err(MigrateError::Configuration(_))));
    }

    #[test]
    fn test_registry_rejects_non_positive_versions() {
        let result = Registry::new(vec![changeset(0, "zeroth")]);
        assert!(matches!(result, Err(MigrateError::Configuration(_))));

        let result = Registry::new(vec![changeset(-3, "negative")]);
        assert!(matches!(result, Err(MigrateError::Configuration(_))));
    }

    #[test]
    fn test_registry_rejects_duplicate_names() {
        let result = Registry::new(vec![changeset(1, "same"), changeset(2, "same")]);
        assert!(matches!(result, Err(MigrateError::Configuration(_))));
    }

    #[test]
    fn test_lookup_by_version() {
        let registry = Registry::new(vec![changeset(1, "first"), changeset(2, "second")]).unwrap();

        assert_eq!(registry.get(2).unwrap().name, "second");
        assert!(registry.get(5).is_none());
    }

    #[test]
    fn test_pending_after_selects_ascending_suffix() {
        let registry = Registry::new(vec![
            changeset(1, "first"),
            changeset(2, "second"),
            changeset(3, "third"),
        ])
        .unwrap();

        let all: Vec<i64> = registry.pending_after(0).iter().map(|c| c.version).collect();
        assert_eq!(all, vec![1, 2, 3]);

        let tail: Vec<i64> = registry.pending_after(1).iter().map(|c| c.version).collect();
        assert_eq!(tail, vec![2, 3]);

        assert!(registry.pending_after(3).is_empty());
        assert!(registry.pending_after(99).is_empty());
    }

    #[test]
    fn test_empty_registry() {
        let registry = Registry::new(Vec::new()).unwrap();
        assert!(registry.is_empty());
        assert_eq!(registry.latest_version(), 0);
        assert!(registry.pending_after(0).is_empty());
    }

    #[test]
    fn test_direction_parsing() {
        assert_eq!("up".parse::<Direction>().unwrap(), Direction::Up);
        assert_eq!("down".parse::<Direction>().unwrap(), Direction::Down);

        let err = "sideways".parse::<Direction>().unwrap_err();
        assert!(matches!(err, MigrateError::Configuration(_)));
        assert!(err.to_string().contains("sideways"));
    }

    #[test]
    fn test_direction_display() {
        assert_eq!(Direction::Up.to_string(), "up");
        assert_eq!(Direction::Down.to_string(), "down");
    }
}
