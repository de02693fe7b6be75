//! Payments against memberships — settled and scheduled.

use super::Storage;
use crate::error::GymError;
use anyhow::Result;
use chrono::{NaiveDate, Utc};
use tracing::warn;

pub const STATUS_SETTLED: &str = "settled";
pub const STATUS_SCHEDULED: &str = "scheduled";

const METHODS: [&str; 3] = ["cash", "card", "transfer"];

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PaymentRow {
    pub id: String,
    pub membership_id: String,
    pub amount_cents: i64,
    pub method: String,
    /// `settled` counts toward the paid total; `scheduled` does not.
    pub status: String,
    pub paid_at: Option<String>,
    pub due_date: Option<String>,
    pub note: Option<String>,
    pub created_at: String,
}

fn validate_amount_and_method(amount_cents: i64, method: &str) -> Result<()> {
    if amount_cents < 1 {
        return Err(GymError::InvalidParams("amount must be at least 1 cent".into()).into());
    }
    if !METHODS.contains(&method) {
        return Err(GymError::InvalidParams(format!(
            "unknown payment method '{method}' (expected cash, card, or transfer)"
        ))
        .into());
    }
    Ok(())
}

impl Storage {
    /// Record a settled payment. Overpayment is allowed (front desk takes
    /// the money first, fixes bookkeeping later) but logged.
    pub async fn record_payment(
        &self,
        membership_id: &str,
        amount_cents: i64,
        method: &str,
        note: Option<&str>,
    ) -> Result<PaymentRow> {
        validate_amount_and_method(amount_cents, method)?;
        let membership = self.require_membership(membership_id).await?;

        let balance = membership.row.price_cents - membership.paid_cents;
        if amount_cents > balance {
            warn!(
                membership_id = %membership_id,
                amount_cents,
                balance_cents = balance,
                "payment exceeds outstanding balance"
            );
        }

        let id = ulid::Ulid::new().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO payments (id, membership_id, amount_cents, method, status, paid_at, note, created_at)
             VALUES (?, ?, ?, ?, 'settled', ?, ?, ?)",
        )
        .bind(&id)
        .bind(membership_id)
        .bind(amount_cents)
        .bind(method)
        .bind(&now)
        .bind(note)
        .bind(&now)
        .execute(self.pool_ref())
        .await?;
        self.require_payment(&id).await
    }

    /// Schedule a future payment with a due date. Does not affect the paid
    /// total until settled.
    pub async fn schedule_payment(
        &self,
        membership_id: &str,
        amount_cents: i64,
        method: &str,
        due_date: NaiveDate,
        note: Option<&str>,
    ) -> Result<PaymentRow> {
        validate_amount_and_method(amount_cents, method)?;
        self.require_membership(membership_id).await?;

        let id = ulid::Ulid::new().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO payments (id, membership_id, amount_cents, method, status, due_date, note, created_at)
             VALUES (?, ?, ?, ?, 'scheduled', ?, ?, ?)",
        )
        .bind(&id)
        .bind(membership_id)
        .bind(amount_cents)
        .bind(method)
        .bind(due_date.to_string())
        .bind(note)
        .bind(&now)
        .execute(self.pool_ref())
        .await?;
        self.require_payment(&id).await
    }

    /// Flip a scheduled payment to settled, stamping `paid_at`.
    pub async fn settle_payment(&self, id: &str) -> Result<PaymentRow> {
        let existing = self.require_payment(id).await?;
        if existing.status == STATUS_SETTLED {
            return Err(GymError::Refused(format!("payment {id} is already settled")).into());
        }
        sqlx::query("UPDATE payments SET status = 'settled', paid_at = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(self.pool_ref())
            .await?;
        self.require_payment(id).await
    }

    /// Remove a payment (corrections at the front desk).
    pub async fn delete_payment(&self, id: &str) -> Result<()> {
        self.require_payment(id).await?;
        sqlx::query("DELETE FROM payments WHERE id = ?")
            .bind(id)
            .execute(self.pool_ref())
            .await?;
        Ok(())
    }

    pub async fn get_payment(&self, id: &str) -> Result<Option<PaymentRow>> {
        Ok(sqlx::query_as("SELECT * FROM payments WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool_ref())
            .await?)
    }

    pub async fn require_payment(&self, id: &str) -> Result<PaymentRow> {
        self.get_payment(id)
            .await?
            .ok_or_else(|| GymError::PaymentNotFound(id.to_string()).into())
    }

    /// All payments for a membership, oldest first — the UI renders this as
    /// a ledger under the membership.
    pub async fn list_payments_for_membership(
        &self,
        membership_id: &str,
    ) -> Result<Vec<PaymentRow>> {
        Ok(
            sqlx::query_as("SELECT * FROM payments WHERE membership_id = ? ORDER BY created_at ASC")
                .bind(membership_id)
                .fetch_all(self.pool_ref())
                .await?,
        )
    }
}
