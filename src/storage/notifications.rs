//! Notification dedup log for the expiry scanner.

use super::Storage;
use anyhow::Result;
use chrono::{NaiveDate, Utc};

pub const KIND_EXPIRING: &str = "expiring";
pub const KIND_EXPIRED: &str = "expired";

impl Storage {
    /// Record that a notification was emitted for this membership today.
    ///
    /// Returns `false` when an identical (membership, kind, day) row already
    /// exists — the caller must then skip the broadcast.
    pub async fn log_notification(
        &self,
        membership_id: &str,
        kind: &str,
        day: NaiveDate,
    ) -> Result<bool> {
        let id = ulid::Ulid::new().to_string();
        let result = sqlx::query(
            "INSERT OR IGNORE INTO notification_log (id, membership_id, kind, notified_on, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(membership_id)
        .bind(kind)
        .bind(day.to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(self.pool_ref())
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
