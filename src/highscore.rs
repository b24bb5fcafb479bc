use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Local};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

const HIGH_SCORE_KEY: &str = "highscore";

/// Best cumulative score seen by this installation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighScoreRecord {
    pub name: String,
    pub score: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub achieved_at: Option<DateTime<Local>>,
}

/// Minimal persisted string key-value interface
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// Key-value table in a SQLite database
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database, creating parent directories as needed
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;
        Ok(Self { conn })
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            r#"
            INSERT INTO kv (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

/// In-process store, used in tests and when the database cannot be opened
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// The persisted high score. Share it behind an `Arc`.
///
/// Every read-compare-write runs under one lock, so concurrent
/// `write_if_higher` calls never lose an update.
pub struct HighScoreStore {
    store: Mutex<Box<dyn KeyValueStore>>,
}

impl HighScoreStore {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self {
            store: Mutex::new(store),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::new()))
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn KeyValueStore>> {
        // The guarded value is a store handle, nothing half-written to recover
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn decode(raw: Option<String>) -> HighScoreRecord {
        match raw {
            None => HighScoreRecord::default(),
            Some(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                log::warn!("ignoring unreadable high score record: {}", e);
                HighScoreRecord::default()
            }),
        }
    }

    pub fn read(&self) -> Result<HighScoreRecord, StoreError> {
        let store = self.lock();
        Ok(Self::decode(store.get(HIGH_SCORE_KEY)?))
    }

    /// Store `(name, score)` if it beats the current record. Returns true if it did.
    pub fn write_if_higher(&self, name: &str, score: u32) -> Result<bool, StoreError> {
        let mut store = self.lock();
        let current = Self::decode(store.get(HIGH_SCORE_KEY)?);
        if score <= current.score {
            return Ok(false);
        }

        let record = HighScoreRecord {
            name: name.to_string(),
            score,
            achieved_at: Some(Local::now()),
        };
        store.set(HIGH_SCORE_KEY, &serde_json::to_string(&record)?)?;
        log::info!(
            "new high score {} by {} (previous {} by {:?})",
            score,
            name,
            current.score,
            current.name
        );
        Ok(true)
    }

    pub fn reset(&self) -> Result<(), StoreError> {
        self.lock().remove(HIGH_SCORE_KEY)
    }
}
