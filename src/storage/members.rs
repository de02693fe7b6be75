//! Member records.

use super::{with_timeout, Storage};
use crate::error::GymError;
use anyhow::Result;
use chrono::Utc;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MemberRow {
    pub id: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// Calendar date `YYYY-MM-DD`.
    pub birth_date: Option<String>,
    pub note: Option<String>,
    pub archived: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Storage {
    pub async fn create_member(
        &self,
        full_name: &str,
        phone: Option<&str>,
        email: Option<&str>,
        birth_date: Option<&str>,
        note: Option<&str>,
    ) -> Result<MemberRow> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO members (id, full_name, phone, email, birth_date, note, archived, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?)",
        )
        .bind(&id)
        .bind(full_name)
        .bind(phone)
        .bind(email)
        .bind(birth_date)
        .bind(note)
        .bind(&now)
        .bind(&now)
        .execute(self.pool_ref())
        .await?;
        self.get_member(&id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("member not found after insert"))
    }

    pub async fn get_member(&self, id: &str) -> Result<Option<MemberRow>> {
        Ok(sqlx::query_as("SELECT * FROM members WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool_ref())
            .await?)
    }

    /// Fetch a member or fail with the domain error handlers map to -32001.
    pub async fn require_member(&self, id: &str) -> Result<MemberRow> {
        self.get_member(id)
            .await?
            .ok_or_else(|| GymError::MemberNotFound(id.to_string()).into())
    }

    pub async fn list_members(&self, include_archived: bool) -> Result<Vec<MemberRow>> {
        with_timeout(async {
            let rows = if include_archived {
                sqlx::query_as("SELECT * FROM members ORDER BY full_name COLLATE NOCASE ASC")
                    .fetch_all(self.pool_ref())
                    .await?
            } else {
                sqlx::query_as(
                    "SELECT * FROM members WHERE archived = 0 ORDER BY full_name COLLATE NOCASE ASC",
                )
                .fetch_all(self.pool_ref())
                .await?
            };
            Ok(rows)
        })
        .await
    }

    /// Case-insensitive substring search over name, phone, and email.
    pub async fn search_members(&self, query: &str, limit: i64) -> Result<Vec<MemberRow>> {
        // Escape LIKE metacharacters so a literal "%" in the query
        // doesn't match everything.
        let escaped = query.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
        let pattern = format!("%{escaped}%");
        Ok(sqlx::query_as(
            "SELECT * FROM members
             WHERE archived = 0
               AND (full_name LIKE ? ESCAPE '\\' COLLATE NOCASE
                    OR phone LIKE ? ESCAPE '\\'
                    OR email LIKE ? ESCAPE '\\' COLLATE NOCASE)
             ORDER BY full_name COLLATE NOCASE ASC LIMIT ?",
        )
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .bind(limit)
        .fetch_all(self.pool_ref())
        .await?)
    }

    pub async fn update_member(
        &self,
        id: &str,
        full_name: &str,
        phone: Option<&str>,
        email: Option<&str>,
        birth_date: Option<&str>,
        note: Option<&str>,
    ) -> Result<MemberRow> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE members SET full_name = ?, phone = ?, email = ?, birth_date = ?, note = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(full_name)
        .bind(phone)
        .bind(email)
        .bind(birth_date)
        .bind(note)
        .bind(&now)
        .bind(id)
        .execute(self.pool_ref())
        .await?;
        if result.rows_affected() == 0 {
            return Err(GymError::MemberNotFound(id.to_string()).into());
        }
        self.require_member(id).await
    }

    pub async fn set_member_archived(&self, id: &str, archived: bool) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query("UPDATE members SET archived = ?, updated_at = ? WHERE id = ?")
            .bind(archived)
            .bind(&now)
            .bind(id)
            .execute(self.pool_ref())
            .await?;
        if result.rows_affected() == 0 {
            return Err(GymError::MemberNotFound(id.to_string()).into());
        }
        Ok(())
    }

    /// Hard delete. Refused when the member has any membership or check-in
    /// history — archive instead, so reports stay consistent.
    pub async fn delete_member(&self, id: &str) -> Result<()> {
        self.require_member(id).await?;
        let (memberships,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM memberships WHERE member_id = ?")
                .bind(id)
                .fetch_one(self.pool_ref())
                .await?;
        let (checkins,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM checkins WHERE member_id = ?")
                .bind(id)
                .fetch_one(self.pool_ref())
                .await?;
        if memberships > 0 || checkins > 0 {
            return Err(GymError::Refused(format!(
                "member has history ({memberships} memberships, {checkins} check-ins) — archive instead"
            ))
            .into());
        }
        sqlx::query("DELETE FROM members WHERE id = ?")
            .bind(id)
            .execute(self.pool_ref())
            .await?;
        Ok(())
    }

    pub async fn count_members(&self, include_archived: bool) -> Result<u64> {
        let sql = if include_archived {
            "SELECT COUNT(*) FROM members"
        } else {
            "SELECT COUNT(*) FROM members WHERE archived = 0"
        };
        let row: (i64,) = sqlx::query_as(sql).fetch_one(self.pool_ref()).await?;
        Ok(row.0 as u64)
    }
}
