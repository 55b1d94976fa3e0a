//! SQLite persistence for the user directory and summaries.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::models::summary::Summary;
use crate::models::user::{Role, User};

/// SQLite-backed store. A single connection behind a mutex; every call
/// acquires and releases its own scope, there is no cross-request locking.
pub struct Database {
    conn: Mutex<Connection>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("IO error: {0}")]
    Io(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        external_subject: row.get(1)?,
        email: row.get(2)?,
        role: Role::parse(&row.get::<_, String>(3)?).unwrap_or(Role::Reader),
        created_at: timestamp_column(row, 4)?,
        last_login: timestamp_column(row, 5)?,
    })
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc))
}

/// Surface a corrupt stored timestamp as a column conversion failure
/// instead of silently substituting the current time.
fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

const USER_COLUMNS: &str = "id, external_subject, email, role, created_at, last_login";
const SUMMARY_COLUMNS: &str = "id, url, summary, user_id, created_at";

impl Database {
    /// Open (or create) the database at the given URL and ensure the schema.
    pub fn open(database_url: &str) -> Result<Self, StoreError> {
        // Parse sqlite: prefix if present
        let path = database_url.strip_prefix("sqlite:").unwrap_or(database_url);

        let conn = if path == ":memory:" || path == "memory" {
            Connection::open_in_memory()?
        } else {
            if let Some(parent) = Path::new(path).parent() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
            }
            Connection::open(path)?
        };

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                external_subject TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'reader',
                created_at TEXT NOT NULL,
                last_login TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS summaries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL,
                summary TEXT NOT NULL,
                user_id INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id)
            );
            CREATE INDEX IF NOT EXISTS idx_summaries_user_id ON summaries(user_id);",
        )?;

        tracing::info!("Database initialized: {}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    // ---- user directory ----

    /// Insert-or-update a user on login. Email and role are always
    /// re-synced from the freshly resolved claims; last_login is bumped.
    /// Exactly one read and one write.
    pub fn upsert_login(
        &self,
        external_subject: &str,
        email: &str,
        role: Role,
    ) -> Result<User, StoreError> {
        let conn = self.lock()?;
        let now = Utc::now();

        let existing: Option<(i64, String)> = conn
            .query_row(
                "SELECT id, created_at FROM users WHERE external_subject = ?1",
                params![external_subject],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match existing {
            Some((id, created_at)) => {
                conn.execute(
                    "UPDATE users SET email = ?1, role = ?2, last_login = ?3 WHERE id = ?4",
                    params![email, role.as_str(), now.to_rfc3339(), id],
                )?;
                let created_at = parse_timestamp(&created_at)
                    .map_err(|e| StoreError::Database(format!("Corrupt timestamp: {}", e)))?;
                Ok(User {
                    id,
                    external_subject: external_subject.to_string(),
                    email: email.to_string(),
                    role,
                    created_at,
                    last_login: now,
                })
            }
            None => {
                conn.execute(
                    "INSERT INTO users (external_subject, email, role, created_at, last_login)
                     VALUES (?1, ?2, ?3, ?4, ?4)",
                    params![external_subject, email, role.as_str(), now.to_rfc3339()],
                )?;
                let id = conn.last_insert_rowid();
                tracing::info!("Created user {} ({}, {})", id, email, role);
                Ok(User {
                    id,
                    external_subject: external_subject.to_string(),
                    email: email.to_string(),
                    role,
                    created_at: now,
                    last_login: now,
                })
            }
        }
    }

    /// Look up a user by external subject without touching it.
    pub fn find_user_by_subject(&self, external_subject: &str) -> Result<Option<User>, StoreError> {
        let conn = self.lock()?;
        let found = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE external_subject = ?1"),
                params![external_subject],
                user_from_row,
            )
            .optional()?;
        Ok(found)
    }

    pub fn get_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        let conn = self.lock()?;
        let found = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id],
                user_from_row,
            )
            .optional()?;
        Ok(found)
    }

    /// All users, insertion order.
    pub fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))?;
        let rows = stmt.query_map([], user_from_row)?;
        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }

    /// Set a user's role. Returns false if the user does not exist.
    pub fn set_user_role(&self, id: i64, role: Role) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE users SET role = ?1 WHERE id = ?2",
            params![role.as_str(), id],
        )?;
        Ok(changed > 0)
    }

    /// Hard-delete a user and their summaries. Returns false if the user
    /// does not exist. Dependent rows go first, in one transaction, so
    /// the FK from summaries to users holds at every point.
    pub fn delete_user(&self, id: i64) -> Result<bool, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM summaries WHERE user_id = ?1", params![id])?;
        let changed = tx.execute("DELETE FROM users WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(changed > 0)
    }

    // ---- summaries ----

    /// Insert a summary owned by `owner_id`. Returns the new row id.
    pub fn create_summary(
        &self,
        owner_id: i64,
        url: &str,
        summary: &str,
    ) -> Result<i64, StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO summaries (url, summary, user_id, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![url, summary, owner_id, Utc::now().to_rfc3339()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get_summary(&self, id: i64) -> Result<Option<Summary>, StoreError> {
        let conn = self.lock()?;
        let found = conn
            .query_row(
                &format!("SELECT {SUMMARY_COLUMNS} FROM summaries WHERE id = ?1"),
                params![id],
                summary_from_row,
            )
            .optional()?;
        Ok(found)
    }

    /// List summaries, oldest first (insertion order by rowid). With an
    /// owner filter only that owner's rows are returned.
    pub fn list_summaries(&self, owner: Option<i64>) -> Result<Vec<Summary>, StoreError> {
        let conn = self.lock()?;
        let mut summaries = Vec::new();
        match owner {
            Some(owner_id) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {SUMMARY_COLUMNS} FROM summaries WHERE user_id = ?1 ORDER BY id"
                ))?;
                let rows = stmt.query_map(params![owner_id], summary_from_row)?;
                for row in rows {
                    summaries.push(row?);
                }
            }
            None => {
                let mut stmt = conn
                    .prepare(&format!("SELECT {SUMMARY_COLUMNS} FROM summaries ORDER BY id"))?;
                let rows = stmt.query_map([], summary_from_row)?;
                for row in rows {
                    summaries.push(row?);
                }
            }
        }
        Ok(summaries)
    }

    /// Update url and summary text. Owner and created_at are immutable.
    /// Returns false if the row does not exist.
    pub fn update_summary(&self, id: i64, url: &str, summary: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE summaries SET url = ?1, summary = ?2 WHERE id = ?3",
            params![url, summary, id],
        )?;
        Ok(changed > 0)
    }

    /// Hard-delete a summary. Returns false if the row does not exist.
    pub fn delete_summary(&self, id: i64) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM summaries WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }
}

fn summary_from_row(row: &Row<'_>) -> rusqlite::Result<Summary> {
    Ok(Summary {
        id: row.get(0)?,
        url: row.get(1)?,
        summary: row.get(2)?,
        user_id: row.get(3)?,
        created_at: timestamp_column(row, 4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        Database::open(":memory:").unwrap()
    }

    #[test]
    fn test_upsert_login_creates_then_updates() {
        let db = db();
        let created = db
            .upsert_login("oid-1", "a@example.com", Role::Reader)
            .unwrap();
        assert_eq!(created.email, "a@example.com");
        assert_eq!(created.role, Role::Reader);

        let updated = db
            .upsert_login("oid-1", "new@example.com", Role::Writer)
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.email, "new@example.com");
        assert_eq!(updated.role, Role::Writer);
        assert!(updated.last_login >= created.last_login);

        // Still one row.
        assert_eq!(db.list_users().unwrap().len(), 1);
    }

    #[test]
    fn test_upsert_login_resyncs_role_over_local_change() {
        let db = db();
        let user = db
            .upsert_login("oid-1", "a@example.com", Role::Reader)
            .unwrap();
        assert!(db.set_user_role(user.id, Role::Admin).unwrap());

        // Next login with provider claims still saying reader reverts it.
        let relogged = db
            .upsert_login("oid-1", "a@example.com", Role::Reader)
            .unwrap();
        assert_eq!(relogged.role, Role::Reader);
    }

    #[test]
    fn test_find_user_by_subject() {
        let db = db();
        assert!(db.find_user_by_subject("oid-1").unwrap().is_none());
        db.upsert_login("oid-1", "a@example.com", Role::Writer)
            .unwrap();
        let found = db.find_user_by_subject("oid-1").unwrap().unwrap();
        assert_eq!(found.email, "a@example.com");
        assert_eq!(found.role, Role::Writer);
    }

    #[test]
    fn test_set_role_and_delete_missing_user() {
        let db = db();
        assert!(!db.set_user_role(42, Role::Admin).unwrap());
        assert!(!db.delete_user(42).unwrap());
    }

    #[test]
    fn test_summary_create_get_roundtrip() {
        let db = db();
        let owner = db
            .upsert_login("oid-1", "a@example.com", Role::Writer)
            .unwrap();
        let id = db
            .create_summary(owner.id, "https://x", "dummy summary")
            .unwrap();
        let row = db.get_summary(id).unwrap().unwrap();
        assert_eq!(row.url, "https://x");
        assert_eq!(row.summary, "dummy summary");
        assert_eq!(row.user_id, owner.id);
    }

    #[test]
    fn test_list_summaries_filters_by_owner_in_insertion_order() {
        let db = db();
        let a = db.upsert_login("oid-a", "a@x.com", Role::Writer).unwrap();
        let b = db.upsert_login("oid-b", "b@x.com", Role::Writer).unwrap();
        db.create_summary(a.id, "https://a/1", "s").unwrap();
        db.create_summary(b.id, "https://b/1", "s").unwrap();
        db.create_summary(a.id, "https://a/2", "s").unwrap();

        let all = db.list_summaries(None).unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0].id < w[1].id));

        let only_a = db.list_summaries(Some(a.id)).unwrap();
        assert_eq!(only_a.len(), 2);
        assert!(only_a.iter().all(|s| s.user_id == a.id));
    }

    #[test]
    fn test_update_summary_preserves_owner() {
        let db = db();
        let owner = db.upsert_login("oid-a", "a@x.com", Role::Writer).unwrap();
        let id = db.create_summary(owner.id, "https://a", "old").unwrap();
        assert!(db.update_summary(id, "https://b", "new").unwrap());
        let row = db.get_summary(id).unwrap().unwrap();
        assert_eq!(row.url, "https://b");
        assert_eq!(row.summary, "new");
        assert_eq!(row.user_id, owner.id);
    }

    #[test]
    fn test_update_and_delete_missing_summary() {
        let db = db();
        assert!(!db.update_summary(99, "https://x", "s").unwrap());
        assert!(!db.delete_summary(99).unwrap());
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("2024-11-21T00:00:00Z").is_ok());
        assert!(parse_timestamp("garbage").is_err());
        assert!(parse_timestamp("").is_err());
    }

    #[test]
    fn test_corrupt_stored_timestamp_surfaces_as_error() {
        let db = db();
        let owner = db.upsert_login("oid-a", "a@x.com", Role::Writer).unwrap();
        let id = db.create_summary(owner.id, "https://a", "s").unwrap();

        db.conn
            .lock()
            .unwrap()
            .execute(
                "UPDATE summaries SET created_at = 'garbage' WHERE id = ?1",
                params![id],
            )
            .unwrap();

        assert!(db.get_summary(id).is_err());
    }

    #[test]
    fn test_delete_user_removes_their_summaries() {
        let db = db();
        let owner = db.upsert_login("oid-a", "a@x.com", Role::Writer).unwrap();
        db.create_summary(owner.id, "https://a", "s").unwrap();
        assert!(db.delete_user(owner.id).unwrap());
        assert!(db.list_summaries(None).unwrap().is_empty());
    }

    #[test]
    fn test_delete_summary_is_gone() {
        let db = db();
        let owner = db.upsert_login("oid-a", "a@x.com", Role::Writer).unwrap();
        let id = db.create_summary(owner.id, "https://a", "s").unwrap();
        assert!(db.delete_summary(id).unwrap());
        assert!(db.get_summary(id).unwrap().is_none());
        // Repeat delete reports missing, not an error.
        assert!(!db.delete_summary(id).unwrap());
    }
}
