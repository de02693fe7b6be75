//! Attendance records — at most one per member per calendar day.

use super::Storage;
use crate::error::GymError;
use anyhow::Result;
use chrono::{NaiveDate, Utc};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CheckinRow {
    pub id: String,
    pub member_id: String,
    pub membership_id: String,
    pub checkin_date: String,
    pub recorded_at: String,
}

impl Storage {
    /// Record a check-in for `date` (normally today).
    ///
    /// Requires a non-cancelled membership covering the date; for quota
    /// plans also a positive remaining-check-ins count. The quota decrement
    /// and the insert commit together or not at all.
    pub async fn record_checkin(&self, member_id: &str, date: NaiveDate) -> Result<CheckinRow> {
        self.require_member(member_id).await?;

        let membership = self
            .membership_covering(member_id, date)
            .await?
            .ok_or_else(|| {
                GymError::MembershipNotFound(format!("no membership covers {date}"))
            })?;

        let mut tx = self.pool_ref().begin().await?;

        if membership.remaining_checkins.is_some() {
            // Guarded decrement: the WHERE clause refuses to go below zero
            // even if the row changed since we read it.
            let updated = sqlx::query(
                "UPDATE memberships
                 SET remaining_checkins = remaining_checkins - 1, updated_at = ?
                 WHERE id = ? AND remaining_checkins > 0",
            )
            .bind(Utc::now().to_rfc3339())
            .bind(&membership.id)
            .execute(&mut *tx)
            .await?;
            if updated.rows_affected() == 0 {
                return Err(GymError::QuotaExhausted(format!(
                    "membership {} has no remaining check-ins",
                    membership.id
                ))
                .into());
            }
        }

        let id = ulid::Ulid::new().to_string();
        let now = Utc::now().to_rfc3339();
        let insert = sqlx::query(
            "INSERT INTO checkins (id, member_id, membership_id, checkin_date, recorded_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(member_id)
        .bind(&membership.id)
        .bind(date.to_string())
        .bind(&now)
        .execute(&mut *tx)
        .await;

        if let Err(e) = insert {
            // UNIQUE(member_id, checkin_date) — one visit per day.
            if e.to_string().contains("UNIQUE constraint failed") {
                return Err(GymError::DuplicateCheckin(date.to_string()).into());
            }
            return Err(e.into());
        }

        tx.commit().await?;

        Ok(CheckinRow {
            id,
            member_id: member_id.to_string(),
            membership_id: membership.id,
            checkin_date: date.to_string(),
            recorded_at: now,
        })
    }

    /// Paginated history for one member, newest first. `before` is a
    /// check-in ID cursor; ULIDs sort by creation time so `id <` pages
    /// cleanly even within a day.
    pub async fn list_checkins_for_member(
        &self,
        member_id: &str,
        limit: i64,
        before: Option<&str>,
    ) -> Result<Vec<CheckinRow>> {
        let rows = if let Some(cursor) = before {
            sqlx::query_as(
                "SELECT * FROM checkins WHERE member_id = ? AND id < ?
                 ORDER BY id DESC LIMIT ?",
            )
            .bind(member_id)
            .bind(cursor)
            .bind(limit)
            .fetch_all(self.pool_ref())
            .await?
        } else {
            sqlx::query_as(
                "SELECT * FROM checkins WHERE member_id = ? ORDER BY id DESC LIMIT ?",
            )
            .bind(member_id)
            .bind(limit)
            .fetch_all(self.pool_ref())
            .await?
        };
        Ok(rows)
    }

    /// Everyone who visited on one calendar day, in arrival order.
    pub async fn list_checkins_for_day(&self, date: NaiveDate) -> Result<Vec<CheckinRow>> {
        Ok(
            sqlx::query_as("SELECT * FROM checkins WHERE checkin_date = ? ORDER BY recorded_at ASC")
                .bind(date.to_string())
                .fetch_all(self.pool_ref())
                .await?,
        )
    }

    pub async fn count_checkins_on(&self, date: NaiveDate) -> Result<u64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM checkins WHERE checkin_date = ?")
            .bind(date.to_string())
            .fetch_one(self.pool_ref())
            .await?;
        Ok(row.0 as u64)
    }
}
