use super::today;
use crate::AppContext;
use anyhow::Result;
use serde_json::{json, Value};

/// daemon.ping — liveness check.
pub async fn ping(_params: Value, _ctx: &AppContext) -> Result<Value> {
    Ok(json!({ "pong": true }))
}

/// daemon.status — version, uptime, headline counts, db health.
pub async fn status(_params: Value, ctx: &AppContext) -> Result<Value> {
    let db_ok = ctx.storage.ping().await;
    let members = ctx.storage.count_members(false).await.unwrap_or(0);
    let checkins_today = ctx.storage.count_checkins_on(today()).await.unwrap_or(0);
    Ok(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "uptimeSecs": ctx.started_at.elapsed().as_secs(),
        "dbOk": db_ok,
        "members": members,
        "checkinsToday": checkins_today,
        "port": ctx.config.port,
    }))
}
