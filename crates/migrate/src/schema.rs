//! Compiled-in change-sets for the notes service schema
//!
//! Versions are immutable once released: a new schema change gets a new
//! version appended here, never an edit to an existing block.

use crate::changeset::{ChangeSet, Registry};
use crate::error::MigrateResult;

/// The notes service's change-set catalog, validated and ready to hand to a
/// runner
pub fn notes_registry() -> MigrateResult<Registry> {
    Registry::new(vec![
        ChangeSet::new(
            1,
            "create_users_table",
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGSERIAL PRIMARY KEY,
                email VARCHAR(255) NOT NULL,
                username VARCHAR(255) NOT NULL,
                password TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                deleted_at TIMESTAMPTZ
            );

            CREATE UNIQUE INDEX IF NOT EXISTS uq_users_email_active
                ON users(email) WHERE deleted_at IS NULL;

            CREATE UNIQUE INDEX IF NOT EXISTS uq_users_username_active
                ON users(username) WHERE deleted_at IS NULL;

            CREATE INDEX IF NOT EXISTS idx_users_deleted_at ON users(deleted_at);

            CREATE OR REPLACE FUNCTION set_updated_at()
            RETURNS TRIGGER AS $$
            BEGIN
                NEW.updated_at = now();
                RETURN NEW;
            END;
            $$ LANGUAGE plpgsql;

            DROP TRIGGER IF EXISTS trg_users_set_updated_at ON users;
            CREATE TRIGGER trg_users_set_updated_at
                BEFORE UPDATE ON users
                FOR EACH ROW
                EXECUTE FUNCTION set_updated_at();
            "#,
            r#"
            DROP TRIGGER IF EXISTS trg_users_set_updated_at ON users;
            DROP FUNCTION IF EXISTS set_updated_at;

            DROP INDEX IF EXISTS idx_users_deleted_at;
            DROP INDEX IF EXISTS uq_users_email_active;
            DROP INDEX IF EXISTS uq_users_username_active;

            DROP TABLE IF EXISTS users CASCADE;
            "#,
        ),
        ChangeSet::new(
            2,
            "create_notes_table",
            r#"
            CREATE TABLE IF NOT EXISTS notes (
                id BIGSERIAL PRIMARY KEY,
                user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                title VARCHAR(255) NOT NULL,
                content TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                deleted_at TIMESTAMPTZ
            );

            CREATE INDEX IF NOT EXISTS idx_notes_user_id ON notes(user_id);
            CREATE INDEX IF NOT EXISTS idx_notes_created_at ON notes(created_at DESC);
            CREATE INDEX IF NOT EXISTS idx_notes_deleted_at ON notes(deleted_at);

            CREATE INDEX IF NOT EXISTS idx_notes_user_created_active
                ON notes(user_id, created_at DESC)
                WHERE deleted_at IS NULL;

            DROP TRIGGER IF EXISTS trg_notes_set_updated_at ON notes;
            CREATE TRIGGER trg_notes_set_updated_at
                BEFORE UPDATE ON notes
                FOR EACH ROW
                EXECUTE FUNCTION set_updated_at();
            "#,
            r#"
            DROP TRIGGER IF EXISTS trg_notes_set_updated_at ON notes;

            DROP INDEX IF EXISTS idx_notes_user_created_active;
            DROP INDEX IF EXISTS idx_notes_user_id;
            DROP INDEX IF EXISTS idx_notes_created_at;
            DROP INDEX IF EXISTS idx_notes_deleted_at;

            DROP TABLE IF EXISTS notes CASCADE;
            "#,
        ),
        ChangeSet::new(
            3,
            "create_tags_table",
            r#"
            CREATE TABLE IF NOT EXISTS tags (
                id BIGSERIAL PRIMARY KEY,
                name VARCHAR(100) NOT NULL UNIQUE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            );

            CREATE TABLE IF NOT EXISTS note_tags (
                note_id BIGINT NOT NULL REFERENCES notes(id) ON DELETE CASCADE,
                tag_id BIGINT NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
                PRIMARY KEY (note_id, tag_id)
            );

            CREATE INDEX IF NOT EXISTS idx_note_tags_note_id ON note_tags(note_id);
            CREATE INDEX IF NOT EXISTS idx_note_tags_tag_id ON note_tags(tag_id);
            CREATE INDEX IF NOT EXISTS idx_tags_name ON tags(name);
            "#,
            r#"
            DROP INDEX IF EXISTS idx_tags_name;
            DROP INDEX IF EXISTS idx_note_tags_note_id;
            DROP INDEX IF EXISTS idx_note_tags_tag_id;

            DROP TABLE IF EXISTS note_tags;
            DROP TABLE IF EXISTS tags CASCADE;
            "#,
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notes_registry_is_valid() {
        let registry = notes_registry().unwrap();

        let versions: Vec<i64> = registry.iter().map(|c| c.version).collect();
        assert_eq!(versions, vec![1, 2, 3]);
        assert_eq!(registry.latest_version(), 3);
    }

    #[test]
    fn test_notes_registry_names_and_bodies() {
        let registry = notes_registry().unwrap();

        let v1 = registry.get(1).unwrap();
        assert_eq!(v1.name, "create_users_table");
        assert!(v1.up.contains("CREATE TABLE IF NOT EXISTS users"));
        assert!(v1.down.contains("DROP TABLE IF EXISTS users"));

        let v2 = registry.get(2).unwrap();
        assert_eq!(v2.name, "create_notes_table");
        assert!(v2.up.contains("REFERENCES users(id)"));

        let v3 = registry.get(3).unwrap();
        assert_eq!(v3.name, "create_tags_table");
        assert!(v3.up.contains("note_tags"));
    }
}
