//! Storage-level tests for membership lifecycle rules, using fixed dates so
//! nothing depends on the wall clock.

use chrono::NaiveDate;
use gymd::error::GymError;
use gymd::lifecycle::{self, MembershipStatus, PaymentStatus};
use gymd::storage::Storage;

fn d(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

async fn test_storage() -> (Storage, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let storage = Storage::new(dir.path()).await.unwrap();
    (storage, dir)
}

async fn seed_member(storage: &Storage) -> String {
    storage
        .create_member("Test Member", None, None, None, None)
        .await
        .unwrap()
        .id
}

async fn seed_duration_plan(storage: &Storage, days: i64) -> String {
    storage
        .create_plan("Plan", "duration", 10_000, Some(days), None, None)
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn overlap_is_inclusive_at_the_edges() {
    let (storage, _dir) = test_storage().await;
    let member = seed_member(&storage).await;
    let plan = seed_duration_plan(&storage, 31).await;

    // Jan 1..Jan 31 inclusive
    storage
        .create_membership(&member, &plan, d("2026-01-01"), d("2026-01-31"), 10_000, None)
        .await
        .unwrap();

    // Touching the last covered day conflicts
    let err = storage
        .create_membership(&member, &plan, d("2026-01-31"), d("2026-03-02"), 10_000, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<GymError>(),
        Some(GymError::MembershipOverlap { .. })
    ));

    // The day after is fine
    storage
        .create_membership(&member, &plan, d("2026-02-01"), d("2026-03-03"), 10_000, None)
        .await
        .unwrap();

    // A different member is never in conflict
    let other = storage
        .create_member("Other", None, None, None, None)
        .await
        .unwrap()
        .id;
    storage
        .create_membership(&other, &plan, d("2026-01-15"), d("2026-02-14"), 10_000, None)
        .await
        .unwrap();
}

#[tokio::test]
async fn cancelled_ranges_do_not_block() {
    let (storage, _dir) = test_storage().await;
    let member = seed_member(&storage).await;
    let plan = seed_duration_plan(&storage, 30).await;

    let m = storage
        .create_membership(&member, &plan, d("2026-01-01"), d("2026-01-30"), 10_000, None)
        .await
        .unwrap();
    storage.cancel_membership(&m.id).await.unwrap();

    storage
        .create_membership(&member, &plan, d("2026-01-10"), d("2026-02-08"), 10_000, None)
        .await
        .unwrap();
}

#[tokio::test]
async fn renew_chains_end_to_end() {
    let (storage, _dir) = test_storage().await;
    let member = seed_member(&storage).await;
    let plan = seed_duration_plan(&storage, 30).await;

    let first = storage
        .create_membership(&member, &plan, d("2026-01-01"), d("2026-01-30"), 8_000, None)
        .await
        .unwrap();

    // Renewal starts the day after and takes the plan's current price,
    // not the discounted one on the previous membership.
    let second = storage.renew_membership(&first.id).await.unwrap();
    assert_eq!(second.start_date, "2026-01-31");
    assert_eq!(second.end_date, "2026-03-01");
    assert_eq!(second.price_cents, 10_000);

    let third = storage.renew_membership(&second.id).await.unwrap();
    assert_eq!(third.start_date, "2026-03-02");
}

#[tokio::test]
async fn renew_refuses_archived_plan() {
    let (storage, _dir) = test_storage().await;
    let member = seed_member(&storage).await;
    let plan = seed_duration_plan(&storage, 30).await;
    let m = storage
        .create_membership(&member, &plan, d("2026-01-01"), d("2026-01-30"), 10_000, None)
        .await
        .unwrap();

    storage.set_plan_archived(&plan, true).await.unwrap();
    let err = storage.renew_membership(&m.id).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<GymError>(),
        Some(GymError::Refused(_))
    ));
}

#[tokio::test]
async fn quota_decrements_and_exhausts() {
    let (storage, _dir) = test_storage().await;
    let member = seed_member(&storage).await;
    let plan = storage
        .create_plan("Two Pass", "quota", 3_000, None, Some(2), Some(90))
        .await
        .unwrap()
        .id;
    storage
        .create_membership(&member, &plan, d("2026-01-01"), d("2026-03-31"), 3_000, Some(2))
        .await
        .unwrap();

    storage.record_checkin(&member, d("2026-01-05")).await.unwrap();
    storage.record_checkin(&member, d("2026-01-06")).await.unwrap();

    let err = storage
        .record_checkin(&member, d("2026-01-07"))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<GymError>(),
        Some(GymError::QuotaExhausted(_))
    ));

    // Failed attempt must not have burned anything
    let m = &storage.list_memberships_for_member(&member).await.unwrap()[0];
    assert_eq!(m.row.remaining_checkins, Some(0));
    assert_eq!(
        storage
            .list_checkins_for_member(&member, 10, None)
            .await
            .unwrap()
            .len(),
        2
    );
}

#[tokio::test]
async fn checkin_without_covering_membership_is_not_found() {
    let (storage, _dir) = test_storage().await;
    let member = seed_member(&storage).await;

    let err = storage
        .record_checkin(&member, d("2026-01-10"))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<GymError>(),
        Some(GymError::MembershipNotFound(_))
    ));
}

#[tokio::test]
async fn duplicate_checkin_same_day() {
    let (storage, _dir) = test_storage().await;
    let member = seed_member(&storage).await;
    let plan = seed_duration_plan(&storage, 30).await;
    storage
        .create_membership(&member, &plan, d("2026-01-01"), d("2026-01-30"), 10_000, None)
        .await
        .unwrap();

    storage.record_checkin(&member, d("2026-01-10")).await.unwrap();
    let err = storage
        .record_checkin(&member, d("2026-01-10"))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<GymError>(),
        Some(GymError::DuplicateCheckin(_))
    ));
}

#[tokio::test]
async fn settled_payments_drive_payment_status() {
    let (storage, _dir) = test_storage().await;
    let member = seed_member(&storage).await;
    let plan = seed_duration_plan(&storage, 30).await;
    let m = storage
        .create_membership(&member, &plan, d("2026-01-01"), d("2026-01-30"), 10_000, None)
        .await
        .unwrap();

    let paid = storage.require_membership(&m.id).await.unwrap().paid_cents;
    assert_eq!(paid, 0);
    assert_eq!(lifecycle::payment_status(paid, 10_000), PaymentStatus::Unpaid);

    storage
        .record_payment(&m.id, 4_000, "cash", None)
        .await
        .unwrap();
    let scheduled = storage
        .schedule_payment(&m.id, 6_000, "transfer", d("2026-01-20"), None)
        .await
        .unwrap();

    let paid = storage.require_membership(&m.id).await.unwrap().paid_cents;
    assert_eq!(paid, 4_000);
    assert_eq!(lifecycle::payment_status(paid, 10_000), PaymentStatus::Partial);

    storage.settle_payment(&scheduled.id).await.unwrap();
    let paid = storage.require_membership(&m.id).await.unwrap().paid_cents;
    assert_eq!(paid, 10_000);
    assert_eq!(lifecycle::payment_status(paid, 10_000), PaymentStatus::Paid);
    assert_eq!(lifecycle::balance_cents(paid, 10_000), 0);
}

#[tokio::test]
async fn deleting_a_payment_reopens_the_balance() {
    let (storage, _dir) = test_storage().await;
    let member = seed_member(&storage).await;
    let plan = seed_duration_plan(&storage, 30).await;
    let m = storage
        .create_membership(&member, &plan, d("2026-01-01"), d("2026-01-30"), 10_000, None)
        .await
        .unwrap();
    let p = storage
        .record_payment(&m.id, 10_000, "card", None)
        .await
        .unwrap();

    storage.delete_payment(&p.id).await.unwrap();
    let paid = storage.require_membership(&m.id).await.unwrap().paid_cents;
    assert_eq!(paid, 0);
    assert_eq!(storage.list_debtors().await.unwrap().len(), 1);
}

#[tokio::test]
async fn debtors_report_skips_cancelled_and_paid() {
    let (storage, _dir) = test_storage().await;
    let plan = seed_duration_plan(&storage, 30).await;

    let paid_up = storage
        .create_member("Paid Up", None, None, None, None)
        .await
        .unwrap()
        .id;
    let m1 = storage
        .create_membership(&paid_up, &plan, d("2026-01-01"), d("2026-01-30"), 10_000, None)
        .await
        .unwrap();
    storage.record_payment(&m1.id, 10_000, "cash", None).await.unwrap();

    let owes = storage
        .create_member("Owes", None, None, None, None)
        .await
        .unwrap()
        .id;
    let m2 = storage
        .create_membership(&owes, &plan, d("2026-01-01"), d("2026-01-30"), 10_000, None)
        .await
        .unwrap();
    storage.record_payment(&m2.id, 2_500, "cash", None).await.unwrap();
    storage
        .schedule_payment(&m2.id, 7_500, "transfer", d("2026-01-15"), None)
        .await
        .unwrap();

    let walked_away = storage
        .create_member("Walked Away", None, None, None, None)
        .await
        .unwrap()
        .id;
    let m3 = storage
        .create_membership(&walked_away, &plan, d("2026-01-01"), d("2026-01-30"), 10_000, None)
        .await
        .unwrap();
    storage.cancel_membership(&m3.id).await.unwrap();

    let debtors = storage.list_debtors().await.unwrap();
    assert_eq!(debtors.len(), 1);
    assert_eq!(debtors[0].member_name, "Owes");
    assert_eq!(debtors[0].paid_cents, 2_500);
    assert_eq!(debtors[0].next_due_date.as_deref(), Some("2026-01-15"));
    assert_eq!(storage.total_outstanding_cents().await.unwrap(), 7_500);
}

#[tokio::test]
async fn member_delete_refused_with_history() {
    let (storage, _dir) = test_storage().await;
    let member = seed_member(&storage).await;
    let plan = seed_duration_plan(&storage, 30).await;
    storage
        .create_membership(&member, &plan, d("2026-01-01"), d("2026-01-30"), 10_000, None)
        .await
        .unwrap();

    let err = storage.delete_member(&member).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<GymError>(),
        Some(GymError::Refused(_))
    ));

    // Archiving is the supported way out
    storage.set_member_archived(&member, true).await.unwrap();
    assert!(storage.require_member(&member).await.unwrap().archived);
}

#[tokio::test]
async fn derived_status_from_stored_rows() {
    let (storage, _dir) = test_storage().await;
    let member = seed_member(&storage).await;
    let plan = seed_duration_plan(&storage, 30).await;
    let m = storage
        .create_membership(&member, &plan, d("2026-01-01"), d("2026-01-30"), 10_000, None)
        .await
        .unwrap();
    let row = storage.require_membership(&m.id).await.unwrap().row;
    let start = row.start().unwrap();
    let end = row.end().unwrap();

    let status = |today: &str| {
        lifecycle::derive_status(start, end, row.cancelled, row.remaining_checkins, d(today), 7)
    };
    assert_eq!(status("2025-12-31"), MembershipStatus::Upcoming);
    assert_eq!(status("2026-01-15"), MembershipStatus::Active);
    assert_eq!(status("2026-01-23"), MembershipStatus::Expiring);
    assert_eq!(status("2026-01-31"), MembershipStatus::Expired);
}

#[tokio::test]
async fn settings_roundtrip_and_upsert() {
    let (storage, _dir) = test_storage().await;
    assert_eq!(storage.get_setting("gym_name").await.unwrap(), None);
    storage.set_setting("gym_name", "Iron Temple").await.unwrap();
    storage.set_setting("gym_name", "Iron Temple II").await.unwrap();
    assert_eq!(
        storage.get_setting("gym_name").await.unwrap().as_deref(),
        Some("Iron Temple II")
    );
}

#[tokio::test]
async fn notification_log_prunes_by_age() {
    let (storage, _dir) = test_storage().await;
    let member = seed_member(&storage).await;
    let plan = seed_duration_plan(&storage, 30).await;
    let m = storage
        .create_membership(&member, &plan, d("2026-01-01"), d("2026-01-30"), 10_000, None)
        .await
        .unwrap();
    storage
        .log_notification(&m.id, "expiring", d("2026-01-25"))
        .await
        .unwrap();

    // Fresh rows survive a prune; 0 means pruning is disabled
    assert_eq!(storage.prune_notification_log(0).await.unwrap(), 0);
    assert_eq!(storage.prune_notification_log(90).await.unwrap(), 0);
    assert!(!storage
        .log_notification(&m.id, "expiring", d("2026-01-25"))
        .await
        .unwrap());
}

#[tokio::test]
async fn notification_log_dedups_per_day() {
    let (storage, _dir) = test_storage().await;
    let member = seed_member(&storage).await;
    let plan = seed_duration_plan(&storage, 30).await;
    let m = storage
        .create_membership(&member, &plan, d("2026-01-01"), d("2026-01-30"), 10_000, None)
        .await
        .unwrap();

    assert!(storage
        .log_notification(&m.id, "expiring", d("2026-01-25"))
        .await
        .unwrap());
    // Same membership, same kind, same day — already announced
    assert!(!storage
        .log_notification(&m.id, "expiring", d("2026-01-25"))
        .await
        .unwrap());
    // Next day is a fresh announcement
    assert!(storage
        .log_notification(&m.id, "expiring", d("2026-01-26"))
        .await
        .unwrap());
    // Different kind on the same day too
    assert!(storage
        .log_notification(&m.id, "expired", d("2026-01-25"))
        .await
        .unwrap());
}
