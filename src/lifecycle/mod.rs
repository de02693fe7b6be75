//! Membership lifecycle and payment-state derivation.
//!
//! This is the one place that computes date ranges, detects overlaps, and
//! derives membership/payment status. Every read path (listing, dashboard,
//! reports, the expiry scanner) goes through these functions so the UI never
//! sees two screens disagree about whether a membership is active.

use chrono::{Days, NaiveDate};
use serde::Serialize;

/// Derived membership state. Never stored — always recomputed against
/// "today" at read time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipStatus {
    /// Starts in the future.
    Upcoming,
    Active,
    /// Active, but the end date falls inside the expiring window.
    Expiring,
    Expired,
    Cancelled,
}

impl MembershipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::Upcoming => "upcoming",
            MembershipStatus::Active => "active",
            MembershipStatus::Expiring => "expiring",
            MembershipStatus::Expired => "expired",
            MembershipStatus::Cancelled => "cancelled",
        }
    }
}

/// Derived payment state from comparing settled payments to the price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Unpaid,
    Partial,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Paid => "paid",
        }
    }
}

/// Inclusive end date for a membership covering `coverage_days` days.
///
/// A one-day plan starting today ends today.
pub fn end_date(start: NaiveDate, coverage_days: u32) -> NaiveDate {
    debug_assert!(coverage_days >= 1);
    start + Days::new(u64::from(coverage_days.saturating_sub(1)))
}

/// Whether two inclusive date ranges intersect.
pub fn ranges_overlap(
    a_start: NaiveDate,
    a_end: NaiveDate,
    b_start: NaiveDate,
    b_end: NaiveDate,
) -> bool {
    a_start <= b_end && b_start <= a_end
}

/// Derive membership status for `today`.
///
/// `remaining_checkins` is `None` for duration plans. A quota membership
/// with zero remaining check-ins is expired even when its calendar window
/// is still open.
pub fn derive_status(
    start: NaiveDate,
    end: NaiveDate,
    cancelled: bool,
    remaining_checkins: Option<i64>,
    today: NaiveDate,
    expiring_window_days: u32,
) -> MembershipStatus {
    if cancelled {
        return MembershipStatus::Cancelled;
    }
    if end < today {
        return MembershipStatus::Expired;
    }
    if remaining_checkins == Some(0) {
        return MembershipStatus::Expired;
    }
    if start > today {
        return MembershipStatus::Upcoming;
    }
    if end <= today + Days::new(u64::from(expiring_window_days)) {
        return MembershipStatus::Expiring;
    }
    MembershipStatus::Active
}

/// Derive payment status from the settled-payments total.
pub fn payment_status(paid_cents: i64, price_cents: i64) -> PaymentStatus {
    if paid_cents <= 0 {
        // Free memberships (price 0) count as paid, not unpaid.
        if price_cents == 0 {
            return PaymentStatus::Paid;
        }
        return PaymentStatus::Unpaid;
    }
    if paid_cents >= price_cents {
        return PaymentStatus::Paid;
    }
    PaymentStatus::Partial
}

/// Outstanding balance, clamped at zero (overpayments display as settled).
pub fn balance_cents(paid_cents: i64, price_cents: i64) -> i64 {
    (price_cents - paid_cents).max(0)
}
