use super::req_str;
use crate::error::invalid_params;
use crate::storage::plans::PlanRow;
use crate::AppContext;
use anyhow::Result;
use serde_json::{json, Value};

pub(crate) fn plan_json(p: &PlanRow) -> Value {
    json!({
        "id": p.id,
        "name": p.name,
        "kind": p.kind,
        "priceCents": p.price_cents,
        "durationDays": p.duration_days,
        "checkinQuota": p.checkin_quota,
        "validityDays": p.validity_days,
        "archived": p.archived,
        "createdAt": p.created_at,
        "updatedAt": p.updated_at,
    })
}

/// plan.create — add a plan template.
///
/// Params: { name, kind: "duration"|"quota", priceCents,
///           durationDays?, checkinQuota?, validityDays? }
pub async fn create(params: Value, ctx: &AppContext) -> Result<Value> {
    let name = req_str(&params, "name")?;
    if name.trim().is_empty() {
        return Err(invalid_params("name must not be empty"));
    }
    let kind = req_str(&params, "kind")?;
    let price_cents = params["priceCents"]
        .as_i64()
        .ok_or_else(|| invalid_params("missing priceCents"))?;
    let plan = ctx
        .storage
        .create_plan(
            name.trim(),
            kind,
            price_cents,
            params["durationDays"].as_i64(),
            params["checkinQuota"].as_i64(),
            params["validityDays"].as_i64(),
        )
        .await?;
    Ok(json!({ "plan": plan_json(&plan) }))
}

/// plan.update — edit the template. The kind is fixed at creation;
/// existing memberships keep their copied price and coverage.
///
/// Params: { id, name, priceCents, durationDays?, checkinQuota?, validityDays? }
pub async fn update(params: Value, ctx: &AppContext) -> Result<Value> {
    let id = req_str(&params, "id")?;
    let name = req_str(&params, "name")?;
    if name.trim().is_empty() {
        return Err(invalid_params("name must not be empty"));
    }
    let price_cents = params["priceCents"]
        .as_i64()
        .ok_or_else(|| invalid_params("missing priceCents"))?;
    let plan = ctx
        .storage
        .update_plan(
            id,
            name.trim(),
            price_cents,
            params["durationDays"].as_i64(),
            params["checkinQuota"].as_i64(),
            params["validityDays"].as_i64(),
        )
        .await?;
    Ok(json!({ "plan": plan_json(&plan) }))
}

/// plan.get — single plan by id.
pub async fn get(params: Value, ctx: &AppContext) -> Result<Value> {
    let id = req_str(&params, "id")?;
    let plan = ctx.storage.require_plan(id).await?;
    Ok(json!({ "plan": plan_json(&plan) }))
}

/// plan.list — all plans, alphabetical. Archived hidden unless requested.
pub async fn list(params: Value, ctx: &AppContext) -> Result<Value> {
    let include_archived = params["includeArchived"].as_bool().unwrap_or(false);
    let plans = ctx.storage.list_plans(include_archived).await?;
    let items: Vec<Value> = plans.iter().map(plan_json).collect();
    Ok(json!({ "plans": items }))
}

/// plan.archive — retire a plan from the new-membership picker.
///
/// Params: { id, archived? } — defaults to true; pass false to restore.
pub async fn archive(params: Value, ctx: &AppContext) -> Result<Value> {
    let id = req_str(&params, "id")?;
    let archived = params["archived"].as_bool().unwrap_or(true);
    ctx.storage.set_plan_archived(id, archived).await?;
    Ok(json!({ "id": id, "archived": archived }))
}
