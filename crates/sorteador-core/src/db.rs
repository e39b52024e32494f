// SQLite persistence for the roster.

use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::store::RosterStore;

/// Storage key used when none is configured.
pub const DEFAULT_ROSTER_KEY: &str = "sorteador-pessoas";

/// SQLite-backed key-value store. Each key holds one JSON value.
pub struct Database {
    conn: Mutex<Connection>,
    roster_key: String,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure the schema
    /// exists. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS app_state (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
            roster_key: DEFAULT_ROSTER_KEY.to_string(),
        })
    }

    /// Store the roster under `key` instead of the default key.
    pub fn with_roster_key(mut self, key: impl Into<String>) -> Self {
        self.roster_key = key.into();
        self
    }

    pub fn roster_key(&self) -> &str {
        &self.roster_key
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database mutex poisoned"))
    }

    /// Persist an arbitrary JSON value under `key`. Uses INSERT OR REPLACE so
    /// repeated saves overwrite the previous value.
    pub fn save_state(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        let conn = self.conn()?;
        let json_str =
            serde_json::to_string(value).context("failed to serialize state value")?;
        conn.execute(
            "INSERT OR REPLACE INTO app_state (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![key, json_str, Utc::now().to_rfc3339()],
        )
        .context("failed to save state")?;
        Ok(())
    }

    /// Load a previously saved JSON value by `key`. Returns `None` if the key
    /// does not exist.
    pub fn load_state(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let conn = self.conn()?;
        let json_str: Option<String> = conn
            .query_row(
                "SELECT value FROM app_state WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .context("failed to query app state")?;

        match json_str {
            Some(json_str) => {
                let value: serde_json::Value = serde_json::from_str(&json_str)
                    .context("failed to deserialize state value")?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }
}

impl RosterStore for Database {
    fn save(&self, names: &[String]) -> Result<()> {
        let value = serde_json::to_value(names).context("failed to serialize roster")?;
        self.save_state(&self.roster_key, &value)
    }

    fn load(&self) -> Result<Option<Vec<String>>> {
        let Some(value) = self.load_state(&self.roster_key)? else {
            return Ok(None);
        };
        let names: Vec<String> =
            serde_json::from_value(value).context("stored roster is not a list of names")?;
        Ok(Some(names))
    }
}
