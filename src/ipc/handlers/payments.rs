use super::{opt_str, req_date, req_str};
use crate::error::invalid_params;
use crate::storage::payments::PaymentRow;
use crate::AppContext;
use anyhow::Result;
use serde_json::{json, Value};

fn payment_json(p: &PaymentRow) -> Value {
    json!({
        "id": p.id,
        "membershipId": p.membership_id,
        "amountCents": p.amount_cents,
        "method": p.method,
        "status": p.status,
        "paidAt": p.paid_at,
        "dueDate": p.due_date,
        "note": p.note,
        "createdAt": p.created_at,
    })
}

/// Re-fetch the membership and report its new payment standing alongside
/// the payment — saves the UI a follow-up call after every ledger change.
async fn with_membership_summary(ctx: &AppContext, payment: &PaymentRow) -> Result<Value> {
    let m = ctx.storage.require_membership(&payment.membership_id).await?;
    Ok(json!({
        "payment": payment_json(payment),
        "membership": super::memberships::membership_json(&m, ctx.config.expiring_window_days)?,
    }))
}

/// payment.record — settled payment taken at the desk.
///
/// Params: { membershipId, amountCents, method, note? }
pub async fn record(params: Value, ctx: &AppContext) -> Result<Value> {
    let membership_id = req_str(&params, "membershipId")?;
    let amount = params["amountCents"]
        .as_i64()
        .ok_or_else(|| invalid_params("missing amountCents"))?;
    let method = req_str(&params, "method")?;
    let payment = ctx
        .storage
        .record_payment(membership_id, amount, method, opt_str(&params, "note"))
        .await?;

    ctx.broadcaster.broadcast(
        "payment.recorded",
        json!({ "membershipId": membership_id, "amountCents": amount }),
    );

    with_membership_summary(ctx, &payment).await
}

/// payment.schedule — promise to pay later.
///
/// Params: { membershipId, amountCents, method, dueDate, note? }
pub async fn schedule(params: Value, ctx: &AppContext) -> Result<Value> {
    let membership_id = req_str(&params, "membershipId")?;
    let amount = params["amountCents"]
        .as_i64()
        .ok_or_else(|| invalid_params("missing amountCents"))?;
    let method = req_str(&params, "method")?;
    let due = req_date(&params, "dueDate")?;
    let payment = ctx
        .storage
        .schedule_payment(membership_id, amount, method, due, opt_str(&params, "note"))
        .await?;
    with_membership_summary(ctx, &payment).await
}

/// payment.settle — a scheduled payment arrived.
///
/// Params: { id }
pub async fn settle(params: Value, ctx: &AppContext) -> Result<Value> {
    let id = req_str(&params, "id")?;
    let payment = ctx.storage.settle_payment(id).await?;

    ctx.broadcaster.broadcast(
        "payment.recorded",
        json!({ "membershipId": payment.membership_id, "amountCents": payment.amount_cents }),
    );

    with_membership_summary(ctx, &payment).await
}

/// payment.delete — remove a mistaken entry.
///
/// Params: { id }
pub async fn delete(params: Value, ctx: &AppContext) -> Result<Value> {
    let id = req_str(&params, "id")?;
    ctx.storage.delete_payment(id).await?;
    Ok(json!({ "deleted": true }))
}

/// payment.listForMembership — the ledger under a membership, oldest first.
///
/// Params: { membershipId }
pub async fn list_for_membership(params: Value, ctx: &AppContext) -> Result<Value> {
    let membership_id = req_str(&params, "membershipId")?;
    ctx.storage.require_membership(membership_id).await?;
    let rows = ctx.storage.list_payments_for_membership(membership_id).await?;
    let items: Vec<Value> = rows.iter().map(payment_json).collect();
    Ok(json!({ "payments": items }))
}
