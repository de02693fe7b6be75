//! Membership periods — the core table.
//!
//! All writes enforce the overlap rule; all reads surface the settled-payment
//! total so callers can derive payment status with `crate::lifecycle`.

use super::{with_timeout, Storage};
use crate::error::GymError;
use crate::lifecycle;
use anyhow::Result;
use chrono::{Days, NaiveDate, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MembershipRow {
    pub id: String,
    pub member_id: String,
    pub plan_id: String,
    /// Inclusive calendar range `YYYY-MM-DD`.
    pub start_date: String,
    pub end_date: String,
    /// Copied from the plan at creation, minus any discount.
    pub price_cents: i64,
    /// NULL for duration plans.
    pub remaining_checkins: Option<i64>,
    pub cancelled: bool,
    pub cancelled_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl MembershipRow {
    pub fn start(&self) -> Result<NaiveDate> {
        parse_date(&self.start_date)
    }

    pub fn end(&self) -> Result<NaiveDate> {
        parse_date(&self.end_date)
    }
}

/// A membership row plus its settled-payment total, as produced by the
/// list/get queries. Everything the lifecycle derivation needs in one fetch.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MembershipWithPaid {
    #[sqlx(flatten)]
    pub row: MembershipRow,
    pub paid_cents: i64,
}

pub(crate) fn parse_date(s: &str) -> Result<NaiveDate> {
    s.parse::<NaiveDate>()
        .map_err(|_| GymError::InvalidParams(format!("bad date '{s}' (expected YYYY-MM-DD)")).into())
}

const SELECT_WITH_PAID: &str = "SELECT m.*, COALESCE(SUM(CASE WHEN p.status = 'settled' THEN p.amount_cents ELSE 0 END), 0) AS paid_cents
     FROM memberships m
     LEFT JOIN payments p ON p.membership_id = m.id";

impl Storage {
    /// Insert a membership after checking the overlap rule.
    ///
    /// `price_cents` is the final price (plan price minus discount, floored
    /// at zero by the handler). `remaining_checkins` is `Some(quota)` for
    /// quota plans, `None` for duration plans.
    pub async fn create_membership(
        &self,
        member_id: &str,
        plan_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        price_cents: i64,
        remaining_checkins: Option<i64>,
    ) -> Result<MembershipRow> {
        // SQLite is single-writer, so check-then-insert inside one
        // transaction cannot race another creation.
        let mut tx = self.pool_ref().begin().await?;

        let conflict: Option<(String, String, String)> = sqlx::query_as(
            "SELECT id, start_date, end_date FROM memberships
             WHERE member_id = ? AND cancelled = 0
               AND start_date <= ? AND end_date >= ?
             LIMIT 1",
        )
        .bind(member_id)
        .bind(end.to_string())
        .bind(start.to_string())
        .fetch_optional(&mut *tx)
        .await?;

        if let Some((existing_id, cs, ce)) = conflict {
            return Err(GymError::MembershipOverlap {
                existing_id,
                start: cs,
                end: ce,
            }
            .into());
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO memberships (id, member_id, plan_id, start_date, end_date, price_cents, remaining_checkins, cancelled, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?, ?)",
        )
        .bind(&id)
        .bind(member_id)
        .bind(plan_id)
        .bind(start.to_string())
        .bind(end.to_string())
        .bind(price_cents)
        .bind(remaining_checkins)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        self.require_membership(&id).await.map(|m| m.row)
    }

    pub async fn get_membership(&self, id: &str) -> Result<Option<MembershipWithPaid>> {
        Ok(sqlx::query_as(&format!(
            "{SELECT_WITH_PAID} WHERE m.id = ? GROUP BY m.id"
        ))
        .bind(id)
        .fetch_optional(self.pool_ref())
        .await?)
    }

    pub async fn require_membership(&self, id: &str) -> Result<MembershipWithPaid> {
        self.get_membership(id)
            .await?
            .ok_or_else(|| GymError::MembershipNotFound(id.to_string()).into())
    }

    /// All memberships for one member, newest range first.
    pub async fn list_memberships_for_member(
        &self,
        member_id: &str,
    ) -> Result<Vec<MembershipWithPaid>> {
        Ok(sqlx::query_as(&format!(
            "{SELECT_WITH_PAID} WHERE m.member_id = ? GROUP BY m.id ORDER BY m.start_date DESC"
        ))
        .bind(member_id)
        .fetch_all(self.pool_ref())
        .await?)
    }

    pub async fn list_memberships(&self) -> Result<Vec<MembershipWithPaid>> {
        with_timeout(async {
            Ok(sqlx::query_as(&format!(
                "{SELECT_WITH_PAID} GROUP BY m.id ORDER BY m.start_date DESC"
            ))
            .fetch_all(self.pool_ref())
            .await?)
        })
        .await
    }

    /// The non-cancelled membership covering `date` for a member, if any.
    ///
    /// Overlap enforcement guarantees at most one exists.
    pub async fn membership_covering(
        &self,
        member_id: &str,
        date: NaiveDate,
    ) -> Result<Option<MembershipRow>> {
        Ok(sqlx::query_as(
            "SELECT * FROM memberships
             WHERE member_id = ? AND cancelled = 0
               AND start_date <= ? AND end_date >= ?
             LIMIT 1",
        )
        .bind(member_id)
        .bind(date.to_string())
        .bind(date.to_string())
        .fetch_optional(self.pool_ref())
        .await?)
    }

    pub async fn cancel_membership(&self, id: &str) -> Result<MembershipRow> {
        let existing = self.require_membership(id).await?.row;
        if existing.cancelled {
            return Err(GymError::Refused(format!("membership {id} is already cancelled")).into());
        }
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "UPDATE memberships SET cancelled = 1, cancelled_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&now)
        .bind(&now)
        .bind(id)
        .execute(self.pool_ref())
        .await?;
        self.require_membership(id).await.map(|m| m.row)
    }

    /// Create a follow-on membership starting the day after `previous` ends.
    ///
    /// Same plan, plan price re-read from the template (a renewal is a new
    /// sale, not a copy of an old price). Overlap-checked like `create`.
    pub async fn renew_membership(&self, previous_id: &str) -> Result<MembershipRow> {
        let previous = self.require_membership(previous_id).await?.row;
        if previous.cancelled {
            return Err(
                GymError::Refused(format!("membership {previous_id} is cancelled")).into(),
            );
        }
        let plan = self.require_plan(&previous.plan_id).await?;
        if plan.archived {
            return Err(GymError::Refused(format!(
                "plan '{}' is archived — pick a current plan",
                plan.name
            ))
            .into());
        }
        let start = previous.end()? + Days::new(1);
        let end = lifecycle::end_date(start, plan.coverage_days());
        let remaining = plan.is_quota().then(|| plan.checkin_quota.unwrap_or(0));
        self.create_membership(
            &previous.member_id,
            &plan.id,
            start,
            end,
            plan.price_cents,
            remaining,
        )
        .await
    }

    /// Non-cancelled memberships whose end date falls inside
    /// `[today, today + days]` — the expiry-warning read path.
    pub async fn list_expiring(
        &self,
        today: NaiveDate,
        days: u32,
    ) -> Result<Vec<MembershipWithPaid>> {
        let until = today + Days::new(u64::from(days));
        Ok(sqlx::query_as(&format!(
            "{SELECT_WITH_PAID}
             WHERE m.cancelled = 0 AND m.end_date >= ? AND m.end_date <= ?
             GROUP BY m.id ORDER BY m.end_date ASC"
        ))
        .bind(today.to_string())
        .bind(until.to_string())
        .fetch_all(self.pool_ref())
        .await?)
    }

    /// Non-cancelled memberships that have ended — past their end date or
    /// out of check-ins — and not yet logged as expired by the scanner.
    pub async fn list_newly_expired(&self, today: NaiveDate) -> Result<Vec<MembershipWithPaid>> {
        Ok(sqlx::query_as(&format!(
            "{SELECT_WITH_PAID}
             WHERE m.cancelled = 0
               AND (m.end_date < ? OR m.remaining_checkins = 0)
               AND NOT EXISTS (
                   SELECT 1 FROM notification_log n
                   WHERE n.membership_id = m.id AND n.kind = 'expired'
               )
             GROUP BY m.id ORDER BY m.end_date ASC"
        ))
        .bind(today.to_string())
        .fetch_all(self.pool_ref())
        .await?)
    }
}
