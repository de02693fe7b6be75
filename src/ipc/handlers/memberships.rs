use super::{req_date, req_str, today};
use crate::error::invalid_params;
use crate::lifecycle;
use crate::storage::memberships::MembershipWithPaid;
use crate::AppContext;
use anyhow::Result;
use serde_json::{json, Value};

/// Serialize a membership with every derived field the UI needs. All read
/// paths use this one function so status never disagrees between screens.
pub(crate) fn membership_json(m: &MembershipWithPaid, expiring_window_days: u32) -> Result<Value> {
    let start = m.row.start()?;
    let end = m.row.end()?;
    let status = lifecycle::derive_status(
        start,
        end,
        m.row.cancelled,
        m.row.remaining_checkins,
        today(),
        expiring_window_days,
    );
    let payment = lifecycle::payment_status(m.paid_cents, m.row.price_cents);
    Ok(json!({
        "id": m.row.id,
        "memberId": m.row.member_id,
        "planId": m.row.plan_id,
        "startDate": m.row.start_date,
        "endDate": m.row.end_date,
        "priceCents": m.row.price_cents,
        "remainingCheckins": m.row.remaining_checkins,
        "cancelled": m.row.cancelled,
        "cancelledAt": m.row.cancelled_at,
        "status": status.as_str(),
        "paymentStatus": payment.as_str(),
        "paidCents": m.paid_cents,
        "balanceCents": lifecycle::balance_cents(m.paid_cents, m.row.price_cents),
        "createdAt": m.row.created_at,
        "updatedAt": m.row.updated_at,
    }))
}

/// membership.create — sell a plan to a member.
///
/// Params: { memberId, planId, startDate, discountCents? }
///
/// The price is copied from the plan, minus the discount, floored at zero.
/// Back-dated start dates are allowed (signing up someone who has been
/// training on a handshake). Overlapping ranges are rejected.
pub async fn create(params: Value, ctx: &AppContext) -> Result<Value> {
    let member_id = req_str(&params, "memberId")?;
    let plan_id = req_str(&params, "planId")?;
    let start = req_date(&params, "startDate")?;
    let discount = params["discountCents"].as_i64().unwrap_or(0);
    if discount < 0 {
        return Err(invalid_params("discountCents must not be negative"));
    }

    ctx.storage.require_member(member_id).await?;
    let plan = ctx.storage.require_plan(plan_id).await?;
    if plan.archived {
        return Err(crate::error::GymError::Refused(format!(
            "plan '{}' is archived — pick a current plan",
            plan.name
        ))
        .into());
    }

    let end = lifecycle::end_date(start, plan.coverage_days());
    let price = (plan.price_cents - discount).max(0);
    let remaining = plan.is_quota().then(|| plan.checkin_quota.unwrap_or(0));

    let row = ctx
        .storage
        .create_membership(member_id, plan_id, start, end, price, remaining)
        .await?;
    let with_paid = ctx.storage.require_membership(&row.id).await?;

    ctx.broadcaster.broadcast(
        "membership.created",
        json!({ "membershipId": row.id, "memberId": member_id }),
    );

    Ok(json!({
        "membership": membership_json(&with_paid, ctx.config.expiring_window_days)?
    }))
}

/// membership.get — one membership with derived status and balance.
pub async fn get(params: Value, ctx: &AppContext) -> Result<Value> {
    let id = req_str(&params, "id")?;
    let m = ctx.storage.require_membership(id).await?;
    Ok(json!({
        "membership": membership_json(&m, ctx.config.expiring_window_days)?
    }))
}

/// membership.list — all memberships, or one member's with `memberId`.
pub async fn list(params: Value, ctx: &AppContext) -> Result<Value> {
    let rows = match params["memberId"].as_str() {
        Some(member_id) => {
            ctx.storage.require_member(member_id).await?;
            ctx.storage.list_memberships_for_member(member_id).await?
        }
        None => ctx.storage.list_memberships().await?,
    };
    let items = rows
        .iter()
        .map(|m| membership_json(m, ctx.config.expiring_window_days))
        .collect::<Result<Vec<_>>>()?;
    Ok(json!({ "memberships": items }))
}

/// membership.cancel — mark cancelled. The range stops counting toward
/// overlap checks, and the membership stops appearing in debtor reports.
pub async fn cancel(params: Value, ctx: &AppContext) -> Result<Value> {
    let id = req_str(&params, "id")?;
    let row = ctx.storage.cancel_membership(id).await?;
    ctx.broadcaster.broadcast(
        "membership.cancelled",
        json!({ "membershipId": row.id, "memberId": row.member_id }),
    );
    let m = ctx.storage.require_membership(id).await?;
    Ok(json!({
        "membership": membership_json(&m, ctx.config.expiring_window_days)?
    }))
}

/// membership.renew — follow-on membership starting the day after the
/// previous one ends, same plan, current plan price.
pub async fn renew(params: Value, ctx: &AppContext) -> Result<Value> {
    let id = req_str(&params, "id")?;
    let row = ctx.storage.renew_membership(id).await?;
    ctx.broadcaster.broadcast(
        "membership.created",
        json!({ "membershipId": row.id, "memberId": row.member_id }),
    );
    let m = ctx.storage.require_membership(&row.id).await?;
    Ok(json!({
        "membership": membership_json(&m, ctx.config.expiring_window_days)?
    }))
}
