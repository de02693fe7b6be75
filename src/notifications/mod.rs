//! Background expiry scanner.
//!
//! Once an hour the scanner looks for memberships that are about to end or
//! have just ended and broadcasts `membership.expiring` / `membership.expired`
//! notifications to connected UIs. The `notification_log` table dedups so a
//! membership is announced at most once per kind per day, across restarts.

use crate::lifecycle::{self, MembershipStatus};
use crate::storage::memberships::MembershipWithPaid;
use crate::storage::notifications::{KIND_EXPIRED, KIND_EXPIRING};
use crate::AppContext;
use anyhow::Result;
use chrono::NaiveDate;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error, info};

const SCAN_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Run the scanner until the daemon shuts down. Spawned from main.
pub async fn run(ctx: AppContext) {
    // First scan right away so a daemon restarted mid-day still warns.
    loop {
        match scan(&ctx).await {
            Ok(emitted) if emitted > 0 => {
                info!(emitted, "expiry scan emitted notifications");
            }
            Ok(_) => debug!("expiry scan: nothing new"),
            Err(e) => error!("expiry scan failed: {e:#}"),
        }
        tokio::time::sleep(SCAN_INTERVAL).await;
    }
}

fn derived(m: &MembershipWithPaid, today: NaiveDate, window: u32) -> Result<MembershipStatus> {
    Ok(lifecycle::derive_status(
        m.row.start()?,
        m.row.end()?,
        m.row.cancelled,
        m.row.remaining_checkins,
        today,
        window,
    ))
}

/// One pass over the expiring and newly-expired memberships. Returns the
/// number of notifications actually broadcast (after dedup).
///
/// The SQL windows only nominate candidates; the shared status derivation
/// decides what gets announced, so a membership that every listing screen
/// shows as `upcoming` (or as `expired` through quota exhaustion) is never
/// announced as expiring.
pub async fn scan(ctx: &AppContext) -> Result<usize> {
    let today = chrono::Local::now().date_naive();
    let window = ctx.config.expiring_window_days;
    let mut emitted = 0;

    for m in ctx.storage.list_expiring(today, window).await? {
        if derived(&m, today, window)? != MembershipStatus::Expiring {
            continue;
        }
        if !ctx
            .storage
            .log_notification(&m.row.id, KIND_EXPIRING, today)
            .await?
        {
            continue;
        }
        let member = ctx.storage.require_member(&m.row.member_id).await?;
        ctx.broadcaster.broadcast(
            "membership.expiring",
            json!({
                "membershipId": m.row.id,
                "memberId": member.id,
                "memberName": member.full_name,
                "endDate": m.row.end_date,
            }),
        );
        emitted += 1;
    }

    for m in ctx.storage.list_newly_expired(today).await? {
        if derived(&m, today, window)? != MembershipStatus::Expired {
            continue;
        }
        if !ctx
            .storage
            .log_notification(&m.row.id, KIND_EXPIRED, today)
            .await?
        {
            continue;
        }
        let member = ctx.storage.require_member(&m.row.member_id).await?;
        ctx.broadcaster.broadcast(
            "membership.expired",
            json!({
                "membershipId": m.row.id,
                "memberId": member.id,
                "memberName": member.full_name,
                "endDate": m.row.end_date,
            }),
        );
        emitted += 1;
    }

    Ok(emitted)
}
