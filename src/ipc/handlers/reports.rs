use super::{req_date, today};
use crate::lifecycle::{self, MembershipStatus};
use crate::AppContext;
use anyhow::Result;
use chrono::Datelike;
use serde_json::{json, Value};

/// report.dashboard — the numbers on the UI's landing screen.
///
/// No params. Everything is computed for "today" in local time.
pub async fn dashboard(_params: Value, ctx: &AppContext) -> Result<Value> {
    let today = today();
    let window = ctx.config.expiring_window_days;

    let members = ctx.storage.count_members(false).await?;
    let checkins_today = ctx.storage.count_checkins_on(today).await?;
    let debtors = ctx.storage.list_debtors().await?;
    let outstanding = ctx.storage.total_outstanding_cents().await?;

    // Memberships bucketed by derived status, through the same derivation
    // the listing screens use. The "expiring" bucket doubles as the
    // expiring-soon headline so the two numbers cannot disagree.
    let mut by_status = std::collections::BTreeMap::new();
    for m in ctx.storage.list_memberships().await? {
        let status = lifecycle::derive_status(
            m.row.start()?,
            m.row.end()?,
            m.row.cancelled,
            m.row.remaining_checkins,
            today,
            window,
        );
        *by_status.entry(status.as_str()).or_insert(0u64) += 1;
    }
    let expiring_soon = by_status
        .get(MembershipStatus::Expiring.as_str())
        .copied()
        .unwrap_or(0);

    // Settled revenue from the first of the current month through today.
    let month_start = today.with_day(1).unwrap_or(today);
    let revenue_month = ctx.storage.revenue_total(month_start, today).await?;

    Ok(json!({
        "date": today.to_string(),
        "members": members,
        "checkinsToday": checkins_today,
        "membershipsByStatus": by_status,
        "expiringSoon": expiring_soon,
        "expiringWindowDays": window,
        "debtors": debtors.len(),
        "outstandingCents": outstanding,
        "revenueMonthCents": revenue_month,
    }))
}

/// report.revenue — settled revenue over an inclusive date range, broken
/// down per day and per payment method.
///
/// Params: { from, to }
pub async fn revenue(params: Value, ctx: &AppContext) -> Result<Value> {
    let from = req_date(&params, "from")?;
    let to = req_date(&params, "to")?;
    if from > to {
        return Err(crate::error::invalid_params("from must not be after to"));
    }

    let by_day = ctx.storage.revenue_by_day(from, to).await?;
    let by_method = ctx.storage.revenue_by_method(from, to).await?;
    let total = ctx.storage.revenue_total(from, to).await?;

    let days: Vec<Value> = by_day
        .iter()
        .map(|r| {
            json!({
                "day": r.day,
                "totalCents": r.total_cents,
                "paymentCount": r.payment_count,
            })
        })
        .collect();
    let methods: Vec<Value> = by_method
        .iter()
        .map(|r| json!({ "method": r.method, "totalCents": r.total_cents }))
        .collect();

    Ok(json!({
        "from": from.to_string(),
        "to": to.to_string(),
        "totalCents": total,
        "byDay": days,
        "byMethod": methods,
    }))
}

/// report.attendance — check-in counts per day over an inclusive range.
///
/// Params: { from, to }
pub async fn attendance(params: Value, ctx: &AppContext) -> Result<Value> {
    let from = req_date(&params, "from")?;
    let to = req_date(&params, "to")?;
    if from > to {
        return Err(crate::error::invalid_params("from must not be after to"));
    }

    let rows = ctx.storage.attendance_by_day(from, to).await?;
    let total: i64 = rows.iter().map(|r| r.checkin_count).sum();
    let days: Vec<Value> = rows
        .iter()
        .map(|r| json!({ "day": r.day, "checkinCount": r.checkin_count }))
        .collect();

    Ok(json!({
        "from": from.to_string(),
        "to": to.to_string(),
        "totalCheckins": total,
        "byDay": days,
    }))
}

/// report.expiring — memberships ending within the window, with member
/// names so the front desk can start calling.
///
/// Params: { days? } — defaults to the configured expiring window.
pub async fn expiring(params: Value, ctx: &AppContext) -> Result<Value> {
    let days = match params["days"].as_u64() {
        Some(d) => u32::try_from(d)
            .map_err(|_| crate::error::invalid_params("days out of range"))?,
        None => ctx.config.expiring_window_days,
    };
    let today = today();
    let rows = ctx.storage.list_expiring(today, days).await?;

    // The end-date window nominates candidates; only rows that actually
    // derive as expiring make the list (not upcoming, not quota-expired).
    let mut items = Vec::with_capacity(rows.len());
    for m in &rows {
        let status = lifecycle::derive_status(
            m.row.start()?,
            m.row.end()?,
            m.row.cancelled,
            m.row.remaining_checkins,
            today,
            days,
        );
        if status != MembershipStatus::Expiring {
            continue;
        }
        let member = ctx.storage.require_member(&m.row.member_id).await?;
        items.push(json!({
            "membershipId": m.row.id,
            "memberId": member.id,
            "memberName": member.full_name,
            "endDate": m.row.end_date,
            "paidCents": m.paid_cents,
            "priceCents": m.row.price_cents,
        }));
    }

    Ok(json!({ "days": days, "memberships": items }))
}

/// report.debtors — open balances across non-cancelled memberships,
/// soonest-ending first.
///
/// No params.
pub async fn debtors(_params: Value, ctx: &AppContext) -> Result<Value> {
    let rows = ctx.storage.list_debtors().await?;
    let total = ctx.storage.total_outstanding_cents().await?;
    let today_s = today().to_string();

    let items: Vec<Value> = rows
        .iter()
        .map(|d| {
            json!({
                "membershipId": d.membership_id,
                "memberId": d.member_id,
                "memberName": d.member_name,
                "priceCents": d.price_cents,
                "paidCents": d.paid_cents,
                "balanceCents": lifecycle::balance_cents(d.paid_cents, d.price_cents),
                "endDate": d.end_date,
                "nextDueDate": d.next_due_date,
                // A promised payment whose due date has passed unsettled.
                "overdue": d.next_due_date.as_deref().is_some_and(|due| due < today_s.as_str()),
            })
        })
        .collect();

    Ok(json!({ "totalOutstandingCents": total, "debtors": items }))
}
