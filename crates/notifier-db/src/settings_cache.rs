//! Local mirror of remotely stored settings.
//!
//! Payloads are opaque JSON strings owned by the caller. The cache is only
//! read when the remote copy cannot be fetched.

use crate::{Database, DbError, OptionalExt};

impl Database {
    pub fn save_cached_settings(&self, key: &str, payload: &str) -> Result<(), DbError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO settings_cache (key, payload, cached_at) VALUES (?1, ?2, CURRENT_TIMESTAMP)
                 ON CONFLICT(key) DO UPDATE SET payload = ?2, cached_at = CURRENT_TIMESTAMP",
                rusqlite::params![key, payload],
            )?;
            Ok(())
        })
    }

    pub fn load_cached_settings(&self, key: &str) -> Result<Option<String>, DbError> {
        self.with_conn(|conn| {
            let payload = conn
                .query_row(
                    "SELECT payload FROM settings_cache WHERE key = ?1",
                    [key],
                    |row| row.get::<_, String>(0),
                )
                .optional()?;
            Ok(payload)
        })
    }

    pub fn clear_cached_settings(&self, key: &str) -> Result<(), DbError> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM settings_cache WHERE key = ?1", [key])?;
            Ok(())
        })
    }
}
