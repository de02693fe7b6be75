use super::{opt_str, req_str};
use crate::storage::members::MemberRow;
use crate::AppContext;
use anyhow::Result;
use serde_json::{json, Value};

pub(crate) fn member_json(m: &MemberRow) -> Value {
    json!({
        "id": m.id,
        "fullName": m.full_name,
        "phone": m.phone,
        "email": m.email,
        "birthDate": m.birth_date,
        "note": m.note,
        "archived": m.archived,
        "createdAt": m.created_at,
        "updatedAt": m.updated_at,
    })
}

/// member.create — register a new member.
///
/// Params: { fullName, phone?, email?, birthDate?, note? }
pub async fn create(params: Value, ctx: &AppContext) -> Result<Value> {
    let full_name = req_str(&params, "fullName")?;
    if full_name.trim().is_empty() {
        return Err(crate::error::invalid_params("fullName must not be empty"));
    }
    // Birth dates are validated as calendar dates; phone/email are free-form
    // (front desk enters whatever the member gives them).
    super::opt_date(&params, "birthDate")?;
    let member = ctx
        .storage
        .create_member(
            full_name.trim(),
            opt_str(&params, "phone"),
            opt_str(&params, "email"),
            opt_str(&params, "birthDate"),
            opt_str(&params, "note"),
        )
        .await?;
    Ok(json!({ "member": member_json(&member) }))
}

/// member.update — replace the editable fields.
///
/// Params: { id, fullName, phone?, email?, birthDate?, note? }
pub async fn update(params: Value, ctx: &AppContext) -> Result<Value> {
    let id = req_str(&params, "id")?;
    let full_name = req_str(&params, "fullName")?;
    if full_name.trim().is_empty() {
        return Err(crate::error::invalid_params("fullName must not be empty"));
    }
    super::opt_date(&params, "birthDate")?;
    let member = ctx
        .storage
        .update_member(
            id,
            full_name.trim(),
            opt_str(&params, "phone"),
            opt_str(&params, "email"),
            opt_str(&params, "birthDate"),
            opt_str(&params, "note"),
        )
        .await?;
    Ok(json!({ "member": member_json(&member) }))
}

/// member.get — single member by id.
pub async fn get(params: Value, ctx: &AppContext) -> Result<Value> {
    let id = req_str(&params, "id")?;
    let member = ctx.storage.require_member(id).await?;
    Ok(json!({ "member": member_json(&member) }))
}

/// member.list — all members, alphabetical. Archived members are hidden
/// unless `includeArchived` is set.
pub async fn list(params: Value, ctx: &AppContext) -> Result<Value> {
    let include_archived = params["includeArchived"].as_bool().unwrap_or(false);
    let members = ctx.storage.list_members(include_archived).await?;
    let items: Vec<Value> = members.iter().map(member_json).collect();
    Ok(json!({ "members": items }))
}

/// member.search — substring match on name/phone/email.
///
/// Params: { query, limit? }
pub async fn search(params: Value, ctx: &AppContext) -> Result<Value> {
    let query = req_str(&params, "query")?;
    let limit = params["limit"].as_i64().unwrap_or(25).clamp(1, 200);
    let members = ctx.storage.search_members(query, limit).await?;
    let items: Vec<Value> = members.iter().map(member_json).collect();
    Ok(json!({ "members": items }))
}

/// member.archive — hide a member from day-to-day lists. History stays.
///
/// Params: { id, archived? } — archived defaults to true; pass false to restore.
pub async fn archive(params: Value, ctx: &AppContext) -> Result<Value> {
    let id = req_str(&params, "id")?;
    let archived = params["archived"].as_bool().unwrap_or(true);
    ctx.storage.set_member_archived(id, archived).await?;
    Ok(json!({ "id": id, "archived": archived }))
}

/// member.delete — hard delete, refused when the member has any history.
pub async fn delete(params: Value, ctx: &AppContext) -> Result<Value> {
    let id = req_str(&params, "id")?;
    ctx.storage.delete_member(id).await?;
    Ok(json!({ "deleted": true }))
}
