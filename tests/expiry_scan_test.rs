//! The background expiry scanner must announce exactly what the listing
//! screens would derive: `expiring` only for memberships that derive as
//! expiring, `expired` for derived-expired ones including quota exhaustion.

use chrono::{Days, Local};
use gymd::config::GymConfig;
use gymd::ipc::event::EventBroadcaster;
use gymd::notifications;
use gymd::storage::Storage;
use gymd::AppContext;
use serde_json::Value;
use std::sync::Arc;

async fn test_ctx() -> (AppContext, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = GymConfig::new(
        None,
        Some(dir.path().to_path_buf()),
        Some("warn".to_string()),
        None,
    );
    let storage = Storage::new(dir.path()).await.unwrap();
    let ctx = AppContext {
        config: Arc::new(config),
        storage: Arc::new(storage),
        broadcaster: EventBroadcaster::new(),
        started_at: std::time::Instant::now(),
        auth_token: String::new(),
    };
    (ctx, dir)
}

async fn recv_notification(rx: &mut tokio::sync::broadcast::Receiver<String>) -> Value {
    serde_json::from_str(&rx.recv().await.unwrap()).unwrap()
}

#[tokio::test]
async fn upcoming_membership_is_not_announced() {
    let (ctx, _dir) = test_ctx().await;
    let today = Local::now().date_naive();
    let member = ctx
        .storage
        .create_member("Early Bird", None, None, None, None)
        .await
        .unwrap()
        .id;
    let plan = ctx
        .storage
        .create_plan("Trial", "duration", 2_000, Some(3), None, None)
        .await
        .unwrap()
        .id;
    // Starts tomorrow, ends inside the warning window — still upcoming
    let start = today + Days::new(1);
    ctx.storage
        .create_membership(&member, &plan, start, start + Days::new(2), 2_000, None)
        .await
        .unwrap();

    let emitted = notifications::scan(&ctx).await.unwrap();
    assert_eq!(emitted, 0);
}

#[tokio::test]
async fn quota_exhausted_membership_is_announced_as_expired() {
    let (ctx, _dir) = test_ctx().await;
    let today = Local::now().date_naive();
    let member = ctx
        .storage
        .create_member("One And Done", None, None, None, None)
        .await
        .unwrap()
        .id;
    let plan = ctx
        .storage
        .create_plan("Single Pass", "quota", 1_500, None, Some(1), Some(5))
        .await
        .unwrap()
        .id;
    // Calendar window still open, but the last check-in drains the quota
    ctx.storage
        .create_membership(&member, &plan, today, today + Days::new(4), 1_500, Some(1))
        .await
        .unwrap();
    ctx.storage.record_checkin(&member, today).await.unwrap();

    let mut rx = ctx.broadcaster.subscribe();
    let emitted = notifications::scan(&ctx).await.unwrap();
    assert_eq!(emitted, 1);

    let v = recv_notification(&mut rx).await;
    assert_eq!(v["method"], "membership.expired");
    assert_eq!(v["params"]["memberName"], "One And Done");
}

#[tokio::test]
async fn expiring_membership_is_announced_once() {
    let (ctx, _dir) = test_ctx().await;
    let today = Local::now().date_naive();
    let member = ctx
        .storage
        .create_member("Winding Down", None, None, None, None)
        .await
        .unwrap()
        .id;
    let plan = ctx
        .storage
        .create_plan("Short", "duration", 4_000, Some(30), None, None)
        .await
        .unwrap()
        .id;
    // Active now, ends in three days — inside the default 7-day window
    ctx.storage
        .create_membership(
            &member,
            &plan,
            today - Days::new(26),
            today + Days::new(3),
            4_000,
            None,
        )
        .await
        .unwrap();

    let mut rx = ctx.broadcaster.subscribe();
    let emitted = notifications::scan(&ctx).await.unwrap();
    assert_eq!(emitted, 1);

    let v = recv_notification(&mut rx).await;
    assert_eq!(v["method"], "membership.expiring");
    assert_eq!(v["params"]["endDate"], (today + Days::new(3)).to_string());

    // Second pass the same day is deduped
    let emitted = notifications::scan(&ctx).await.unwrap();
    assert_eq!(emitted, 0);
}

#[tokio::test]
async fn calendar_expired_membership_is_announced_as_expired() {
    let (ctx, _dir) = test_ctx().await;
    let today = Local::now().date_naive();
    let member = ctx
        .storage
        .create_member("Lapsed", None, None, None, None)
        .await
        .unwrap()
        .id;
    let plan = ctx
        .storage
        .create_plan("Monthly", "duration", 5_000, Some(30), None, None)
        .await
        .unwrap()
        .id;
    ctx.storage
        .create_membership(
            &member,
            &plan,
            today - Days::new(31),
            today - Days::new(2),
            5_000,
            None,
        )
        .await
        .unwrap();

    let mut rx = ctx.broadcaster.subscribe();
    let emitted = notifications::scan(&ctx).await.unwrap();
    assert_eq!(emitted, 1);
    let v = recv_notification(&mut rx).await;
    assert_eq!(v["method"], "membership.expired");

    // Deduped on the second pass
    assert_eq!(notifications::scan(&ctx).await.unwrap(), 0);
}
