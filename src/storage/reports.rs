//! Read-only reporting queries. Status fields are still derived in the
//! handlers through `crate::lifecycle` — these queries only aggregate.

use super::Storage;
use anyhow::Result;
use chrono::NaiveDate;

/// One day of settled revenue.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RevenueDayRow {
    pub day: String,
    pub total_cents: i64,
    pub payment_count: i64,
}

/// Settled totals for one payment method over a range.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RevenueMethodRow {
    pub method: String,
    pub total_cents: i64,
}

/// One day of attendance.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AttendanceDayRow {
    pub day: String,
    pub checkin_count: i64,
}

/// A membership with an outstanding balance, joined with its member.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DebtorRow {
    pub membership_id: String,
    pub member_id: String,
    pub member_name: String,
    pub price_cents: i64,
    pub paid_cents: i64,
    pub end_date: String,
    pub cancelled: bool,
    /// Earliest due date among unsettled scheduled payments, if any.
    pub next_due_date: Option<String>,
}

impl Storage {
    /// Settled revenue per day over an inclusive date range.
    pub async fn revenue_by_day(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<RevenueDayRow>> {
        Ok(sqlx::query_as(
            "SELECT date(paid_at) AS day,
                    SUM(amount_cents) AS total_cents,
                    COUNT(*) AS payment_count
             FROM payments
             WHERE status = 'settled' AND date(paid_at) BETWEEN ? AND ?
             GROUP BY date(paid_at)
             ORDER BY day ASC",
        )
        .bind(from.to_string())
        .bind(to.to_string())
        .fetch_all(self.pool_ref())
        .await?)
    }

    /// Settled revenue per method over an inclusive date range.
    pub async fn revenue_by_method(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<RevenueMethodRow>> {
        Ok(sqlx::query_as(
            "SELECT method, SUM(amount_cents) AS total_cents
             FROM payments
             WHERE status = 'settled' AND date(paid_at) BETWEEN ? AND ?
             GROUP BY method
             ORDER BY method ASC",
        )
        .bind(from.to_string())
        .bind(to.to_string())
        .fetch_all(self.pool_ref())
        .await?)
    }

    /// Total settled revenue in an inclusive date range.
    pub async fn revenue_total(&self, from: NaiveDate, to: NaiveDate) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(amount_cents), 0)
             FROM payments
             WHERE status = 'settled' AND date(paid_at) BETWEEN ? AND ?",
        )
        .bind(from.to_string())
        .bind(to.to_string())
        .fetch_one(self.pool_ref())
        .await?;
        Ok(row.0)
    }

    /// Check-in counts per day over an inclusive date range.
    pub async fn attendance_by_day(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AttendanceDayRow>> {
        Ok(sqlx::query_as(
            "SELECT checkin_date AS day, COUNT(*) AS checkin_count
             FROM checkins
             WHERE checkin_date BETWEEN ? AND ?
             GROUP BY checkin_date
             ORDER BY day ASC",
        )
        .bind(from.to_string())
        .bind(to.to_string())
        .fetch_all(self.pool_ref())
        .await?)
    }

    /// Non-cancelled memberships whose settled payments fall short of the
    /// price, with the member's name and the earliest unsettled due date.
    pub async fn list_debtors(&self) -> Result<Vec<DebtorRow>> {
        Ok(sqlx::query_as(
            "SELECT m.id AS membership_id,
                    m.member_id,
                    mem.full_name AS member_name,
                    m.price_cents,
                    COALESCE(SUM(CASE WHEN p.status = 'settled' THEN p.amount_cents ELSE 0 END), 0) AS paid_cents,
                    m.end_date,
                    m.cancelled,
                    MIN(CASE WHEN p.status = 'scheduled' THEN p.due_date END) AS next_due_date
             FROM memberships m
             JOIN members mem ON mem.id = m.member_id
             LEFT JOIN payments p ON p.membership_id = m.id
             WHERE m.cancelled = 0
             GROUP BY m.id
             HAVING paid_cents < m.price_cents
             ORDER BY m.end_date ASC",
        )
        .fetch_all(self.pool_ref())
        .await?)
    }

    /// Sum of outstanding balances across all non-cancelled memberships.
    pub async fn total_outstanding_cents(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(balance), 0) FROM (
                 SELECT m.price_cents - COALESCE(SUM(CASE WHEN p.status = 'settled' THEN p.amount_cents ELSE 0 END), 0) AS balance
                 FROM memberships m
                 LEFT JOIN payments p ON p.membership_id = m.id
                 WHERE m.cancelled = 0
                 GROUP BY m.id
                 HAVING balance > 0
             )",
        )
        .fetch_one(self.pool_ref())
        .await?;
        Ok(row.0)
    }
}
