use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection};
use tracing::info;

use crate::error::{LocationError, StoreError};
use crate::locations::normalize_location_name;
use crate::types::{ChatId, UserId};

pub trait UserRegistry: Send + Sync {
    /// Idempotent upsert.
    fn record_user(&self, user: UserId) -> Result<(), StoreError>;
    fn list_all_users(&self) -> Result<Vec<UserId>, StoreError>;
}

/// Per-chat custom locations. Uniqueness is case-insensitive within a chat.
pub trait LocationStore: Send + Sync {
    fn list(&self, chat: ChatId) -> Result<Vec<String>, StoreError>;
    /// Returns the stored (trimmed) name.
    fn add(&self, chat: ChatId, name: &str) -> Result<String, LocationError>;
    fn remove(&self, chat: ChatId, name: &str) -> Result<(), LocationError>;
    fn reset_all(&self, chat: ChatId) -> Result<(), StoreError>;
}

/// SQLite-backed users and custom locations.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path`. `":memory:"` gives an
    /// ephemeral database.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        if path != ":memory:" {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                user_id INTEGER PRIMARY KEY
            );

            CREATE TABLE IF NOT EXISTS locations (
                chat_id  INTEGER NOT NULL,
                location TEXT NOT NULL,
                PRIMARY KEY (chat_id, location)
            );
            ",
        )?;
        info!(path, "opened sqlite store");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl UserRegistry for SqliteStore {
    fn record_user(&self, user: UserId) -> Result<(), StoreError> {
        self.conn()?.execute(
            "INSERT INTO users (user_id) VALUES (?1) ON CONFLICT DO NOTHING",
            params![user.0],
        )?;
        Ok(())
    }

    fn list_all_users(&self) -> Result<Vec<UserId>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT user_id FROM users ORDER BY user_id ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, i64>(0))?;
        let mut users = Vec::new();
        for row in rows {
            users.push(UserId(row?));
        }
        Ok(users)
    }
}

impl LocationStore for SqliteStore {
    fn list(&self, chat: ChatId) -> Result<Vec<String>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT location FROM locations WHERE chat_id = ?1 ORDER BY location ASC")?;
        let rows = stmt.query_map(params![chat.0], |row| row.get::<_, String>(0))?;
        let mut names = Vec::new();
        for row in rows {
            names.push(row?);
        }
        Ok(names)
    }

    fn add(&self, chat: ChatId, name: &str) -> Result<String, LocationError> {
        let name = normalize_location_name(name).ok_or(LocationError::EmptyName)?;
        let conn = self.conn()?;
        // SQLite's lower() only folds ASCII, so compare case-insensitively here.
        let folded = name.to_lowercase();
        let mut stmt = conn
            .prepare("SELECT location FROM locations WHERE chat_id = ?1")
            .map_err(StoreError::from)?;
        let existing = stmt
            .query_map(params![chat.0], |row| row.get::<_, String>(0))
            .map_err(StoreError::from)?;
        for row in existing {
            if row.map_err(StoreError::from)?.to_lowercase() == folded {
                return Err(LocationError::AlreadyAdded);
            }
        }
        conn.execute(
            "INSERT INTO locations (chat_id, location) VALUES (?1, ?2)",
            params![chat.0, name],
        )
        .map_err(StoreError::from)?;
        Ok(name)
    }

    fn remove(&self, chat: ChatId, name: &str) -> Result<(), LocationError> {
        let folded = name.trim().to_lowercase();
        let conn = self.conn()?;
        let stored = {
            let mut stmt = conn
                .prepare("SELECT location FROM locations WHERE chat_id = ?1")
                .map_err(StoreError::from)?;
            let rows = stmt
                .query_map(params![chat.0], |row| row.get::<_, String>(0))
                .map_err(StoreError::from)?;
            let mut found = None;
            for row in rows {
                let location = row.map_err(StoreError::from)?;
                if location.to_lowercase() == folded {
                    found = Some(location);
                    break;
                }
            }
            found
        };
        let Some(stored) = stored else {
            return Err(LocationError::NotFound);
        };
        conn.execute(
            "DELETE FROM locations WHERE chat_id = ?1 AND location = ?2",
            params![chat.0, stored],
        )
        .map_err(StoreError::from)?;
        Ok(())
    }

    fn reset_all(&self, chat: ChatId) -> Result<(), StoreError> {
        self.conn()?
            .execute("DELETE FROM locations WHERE chat_id = ?1", params![chat.0])?;
        Ok(())
    }
}
