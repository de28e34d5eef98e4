//! Durable device identifier.

use crate::{Database, DbError, OptionalExt};

impl Database {
    pub fn get_device_id(&self) -> Result<Option<String>, DbError> {
        self.with_conn(|conn| {
            let id = conn
                .query_row("SELECT device_id FROM device_identity WHERE id = 1", [], |row| {
                    row.get::<_, String>(0)
                })
                .optional()?;
            Ok(id)
        })
    }

    /// Return the stored device id, generating and persisting one on first use.
    pub fn get_or_create_device_id(&self) -> Result<String, DbError> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let existing = tx
                .query_row("SELECT device_id FROM device_identity WHERE id = 1", [], |row| {
                    row.get::<_, String>(0)
                })
                .optional()?;
            if let Some(id) = existing {
                return Ok(id);
            }

            let id = uuid::Uuid::new_v4().to_string();
            tx.execute(
                "INSERT INTO device_identity (id, device_id) VALUES (1, ?1)",
                [&id],
            )?;
            tx.commit()?;
            tracing::info!(device_id = %id, "Generated new device identifier");
            Ok(id)
        })
    }
}
