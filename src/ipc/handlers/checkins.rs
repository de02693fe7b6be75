use super::{opt_date, req_str, today};
use crate::storage::checkins::CheckinRow;
use crate::AppContext;
use anyhow::Result;
use serde_json::{json, Value};

fn checkin_json(c: &CheckinRow) -> Value {
    json!({
        "id": c.id,
        "memberId": c.member_id,
        "membershipId": c.membership_id,
        "date": c.checkin_date,
        "recordedAt": c.recorded_at,
    })
}

/// checkin.record — mark a member present.
///
/// Params: { memberId, date? } — date defaults to today; back-dating is
/// allowed for fixing a missed scan, still one per calendar day.
pub async fn record(params: Value, ctx: &AppContext) -> Result<Value> {
    let member_id = req_str(&params, "memberId")?;
    let date = opt_date(&params, "date")?.unwrap_or_else(today);

    let checkin = ctx.storage.record_checkin(member_id, date).await?;

    ctx.broadcaster.broadcast(
        "checkin.recorded",
        json!({
            "memberId": member_id,
            "membershipId": checkin.membership_id,
            "date": checkin.checkin_date,
        }),
    );

    Ok(json!({ "checkin": checkin_json(&checkin) }))
}

/// checkin.listForMember — attendance history, newest first.
///
/// Params: { memberId, limit?, before? } — before is a check-in ID cursor.
pub async fn list_for_member(params: Value, ctx: &AppContext) -> Result<Value> {
    let member_id = req_str(&params, "memberId")?;
    ctx.storage.require_member(member_id).await?;
    let limit = params["limit"].as_i64().unwrap_or(50).clamp(1, 500);
    let before = params["before"].as_str();
    let rows = ctx
        .storage
        .list_checkins_for_member(member_id, limit, before)
        .await?;
    let items: Vec<Value> = rows.iter().map(checkin_json).collect();
    Ok(json!({ "checkins": items }))
}

/// checkin.listForDay — who visited on one day, in arrival order.
///
/// Params: { date? } — defaults to today.
pub async fn list_for_day(params: Value, ctx: &AppContext) -> Result<Value> {
    let date = opt_date(&params, "date")?.unwrap_or_else(today);
    let rows = ctx.storage.list_checkins_for_day(date).await?;
    let items: Vec<Value> = rows.iter().map(checkin_json).collect();
    Ok(json!({ "date": date.to_string(), "checkins": items }))
}
