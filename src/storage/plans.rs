//! Subscription plan templates.

use super::Storage;
use crate::error::GymError;
use anyhow::Result;
use chrono::Utc;
use uuid::Uuid;

/// Plan kinds. `duration` covers a calendar span; `quota` grants a fixed
/// number of check-ins inside a validity window.
pub const KIND_DURATION: &str = "duration";
pub const KIND_QUOTA: &str = "quota";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PlanRow {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub price_cents: i64,
    pub duration_days: Option<i64>,
    pub checkin_quota: Option<i64>,
    pub validity_days: Option<i64>,
    pub archived: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl PlanRow {
    /// Calendar days a membership on this plan covers.
    pub fn coverage_days(&self) -> u32 {
        match self.kind.as_str() {
            KIND_QUOTA => self.validity_days.unwrap_or(1).max(1) as u32,
            _ => self.duration_days.unwrap_or(1).max(1) as u32,
        }
    }

    pub fn is_quota(&self) -> bool {
        self.kind == KIND_QUOTA
    }
}

/// Validate the kind/field combination before insert or update.
fn validate_plan_shape(
    kind: &str,
    price_cents: i64,
    duration_days: Option<i64>,
    checkin_quota: Option<i64>,
    validity_days: Option<i64>,
) -> Result<()> {
    if price_cents < 0 {
        return Err(GymError::InvalidParams("price must not be negative".into()).into());
    }
    match kind {
        KIND_DURATION => {
            if duration_days.is_none_or(|d| d < 1) {
                return Err(GymError::InvalidParams(
                    "duration plans require durationDays >= 1".into(),
                )
                .into());
            }
        }
        KIND_QUOTA => {
            if checkin_quota.is_none_or(|q| q < 1) {
                return Err(GymError::InvalidParams(
                    "quota plans require checkinQuota >= 1".into(),
                )
                .into());
            }
            if validity_days.is_none_or(|v| v < 1) {
                return Err(GymError::InvalidParams(
                    "quota plans require validityDays >= 1".into(),
                )
                .into());
            }
        }
        other => {
            return Err(GymError::InvalidParams(format!(
                "unknown plan kind '{other}' (expected 'duration' or 'quota')"
            ))
            .into());
        }
    }
    Ok(())
}

impl Storage {
    #[allow(clippy::too_many_arguments)]
    pub async fn create_plan(
        &self,
        name: &str,
        kind: &str,
        price_cents: i64,
        duration_days: Option<i64>,
        checkin_quota: Option<i64>,
        validity_days: Option<i64>,
    ) -> Result<PlanRow> {
        validate_plan_shape(kind, price_cents, duration_days, checkin_quota, validity_days)?;
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO plans (id, name, kind, price_cents, duration_days, checkin_quota, validity_days, archived, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?, ?)",
        )
        .bind(&id)
        .bind(name)
        .bind(kind)
        .bind(price_cents)
        .bind(duration_days)
        .bind(checkin_quota)
        .bind(validity_days)
        .bind(&now)
        .bind(&now)
        .execute(self.pool_ref())
        .await?;
        self.require_plan(&id).await
    }

    pub async fn get_plan(&self, id: &str) -> Result<Option<PlanRow>> {
        Ok(sqlx::query_as("SELECT * FROM plans WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool_ref())
            .await?)
    }

    pub async fn require_plan(&self, id: &str) -> Result<PlanRow> {
        self.get_plan(id)
            .await?
            .ok_or_else(|| GymError::PlanNotFound(id.to_string()).into())
    }

    pub async fn list_plans(&self, include_archived: bool) -> Result<Vec<PlanRow>> {
        let rows = if include_archived {
            sqlx::query_as("SELECT * FROM plans ORDER BY name COLLATE NOCASE ASC")
                .fetch_all(self.pool_ref())
                .await?
        } else {
            sqlx::query_as("SELECT * FROM plans WHERE archived = 0 ORDER BY name COLLATE NOCASE ASC")
                .fetch_all(self.pool_ref())
                .await?
        };
        Ok(rows)
    }

    /// Update the template. Existing memberships keep their copied price
    /// and coverage — this only affects memberships created afterwards.
    #[allow(clippy::too_many_arguments)]
    pub async fn update_plan(
        &self,
        id: &str,
        name: &str,
        price_cents: i64,
        duration_days: Option<i64>,
        checkin_quota: Option<i64>,
        validity_days: Option<i64>,
    ) -> Result<PlanRow> {
        let existing = self.require_plan(id).await?;
        validate_plan_shape(
            &existing.kind,
            price_cents,
            duration_days,
            checkin_quota,
            validity_days,
        )?;
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "UPDATE plans SET name = ?, price_cents = ?, duration_days = ?, checkin_quota = ?, validity_days = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(name)
        .bind(price_cents)
        .bind(duration_days)
        .bind(checkin_quota)
        .bind(validity_days)
        .bind(&now)
        .bind(id)
        .execute(self.pool_ref())
        .await?;
        self.require_plan(id).await
    }

    pub async fn set_plan_archived(&self, id: &str, archived: bool) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query("UPDATE plans SET archived = ?, updated_at = ? WHERE id = ?")
            .bind(archived)
            .bind(&now)
            .bind(id)
            .execute(self.pool_ref())
            .await?;
        if result.rows_affected() == 0 {
            return Err(GymError::PlanNotFound(id.to_string()).into());
        }
        Ok(())
    }
}
