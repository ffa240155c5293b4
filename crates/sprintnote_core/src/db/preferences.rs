//! Key/value preference store.
//!
//! # Responsibility
//! - Persist small scalar settings that must survive process restarts.
//! - Provide typed access to the owned-zone setup state.
//!
//! # Invariants
//! - Writes are upserts; last write wins per key.
//! - An absent setup-state key reads as `ZoneSetupState::NotStarted`.

use super::{open_db, open_db_in_memory, DbError, DbResult};
use crate::model::zone::ZoneSetupState;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Storage key of the owned-zone setup state.
pub const ZONE_SETUP_STATE_KEY: &str = "zone_setup_state";

/// Preference storage over one SQLite connection.
pub struct PreferenceStore {
    conn: Connection,
}

impl PreferenceStore {
    /// Opens the preference database at `path`.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Ok(Self {
            conn: open_db(path)?,
        })
    }

    /// Opens a throwaway in-memory store.
    pub fn in_memory() -> DbResult<Self> {
        Ok(Self {
            conn: open_db_in_memory()?,
        })
    }

    pub fn get(&self, key: &str) -> DbResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM preferences WHERE key = ?1",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set(&self, key: &str, value: &str) -> DbResult<()> {
        self.conn.execute(
            "INSERT INTO preferences (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now_epoch_ms()],
        )?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> DbResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM preferences WHERE key = ?1", [key])?;
        Ok(changed > 0)
    }

    /// Reads the owned-zone setup state.
    pub fn zone_setup_state(&self) -> DbResult<ZoneSetupState> {
        match self.get(ZONE_SETUP_STATE_KEY)? {
            None => Ok(ZoneSetupState::NotStarted),
            Some(raw) => ZoneSetupState::parse(&raw).map_err(|err| DbError::InvalidValue {
                key: ZONE_SETUP_STATE_KEY.to_string(),
                message: err.to_string(),
            }),
        }
    }

    pub fn set_zone_setup_state(&self, state: ZoneSetupState) -> DbResult<()> {
        self.set(ZONE_SETUP_STATE_KEY, state.as_str())
    }
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}
