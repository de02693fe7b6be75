use super::req_str;
use crate::storage::accounts::StaffAccountRow;
use crate::AppContext;
use anyhow::Result;
use serde_json::{json, Value};

/// Never include `password_hash` — this JSON goes straight to the UI.
fn account_json(a: &StaffAccountRow) -> Value {
    json!({
        "id": a.id,
        "username": a.username,
        "role": a.role,
        "createdAt": a.created_at,
        "updatedAt": a.updated_at,
    })
}

/// account.create — add a staff login.
///
/// Params: { username, password, role: "admin"|"staff" }
pub async fn create(params: Value, ctx: &AppContext) -> Result<Value> {
    let username = req_str(&params, "username")?;
    let password = req_str(&params, "password")?;
    let role = req_str(&params, "role")?;
    let account = ctx
        .storage
        .create_account(username.trim(), password, role)
        .await?;
    Ok(json!({ "account": account_json(&account) }))
}

/// account.list — all staff accounts, alphabetical.
pub async fn list(_params: Value, ctx: &AppContext) -> Result<Value> {
    let accounts = ctx.storage.list_accounts().await?;
    let items: Vec<Value> = accounts.iter().map(account_json).collect();
    Ok(json!({ "accounts": items }))
}

/// account.delete — remove a login. Refused for the last admin.
///
/// Params: { id }
pub async fn delete(params: Value, ctx: &AppContext) -> Result<Value> {
    let id = req_str(&params, "id")?;
    ctx.storage.delete_account(id).await?;
    Ok(json!({ "deleted": true }))
}

/// account.login — verify a username/password pair for the UI login
/// screen. Wrong password and unknown username return the same error.
///
/// Params: { username, password }
pub async fn login(params: Value, ctx: &AppContext) -> Result<Value> {
    let username = req_str(&params, "username")?;
    let password = req_str(&params, "password")?;
    let account = ctx.storage.verify_login(username, password).await?;
    Ok(json!({ "account": account_json(&account) }))
}

/// account.changePassword — requires the old password even for admins.
///
/// Params: { id, oldPassword, newPassword }
pub async fn change_password(params: Value, ctx: &AppContext) -> Result<Value> {
    let id = req_str(&params, "id")?;
    let old = req_str(&params, "oldPassword")?;
    let new = req_str(&params, "newPassword")?;
    ctx.storage.change_password(id, old, new).await?;
    Ok(json!({ "changed": true }))
}
