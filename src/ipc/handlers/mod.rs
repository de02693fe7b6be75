pub mod accounts;
pub mod checkins;
pub mod daemon;
pub mod members;
pub mod memberships;
pub mod payments;
pub mod plans;
pub mod reports;

use crate::error::invalid_params;
use anyhow::Result;
use chrono::NaiveDate;
use serde_json::Value;

/// Required string param, e.g. `req_str(&params, "memberId")?`.
pub(crate) fn req_str<'a>(params: &'a Value, key: &str) -> Result<&'a str> {
    params[key]
        .as_str()
        .ok_or_else(|| invalid_params(format!("missing {key}")))
}

/// Optional string param — absent and `null` both read as `None`.
pub(crate) fn opt_str<'a>(params: &'a Value, key: &str) -> Option<&'a str> {
    params[key].as_str()
}

/// Required `YYYY-MM-DD` date param.
pub(crate) fn req_date(params: &Value, key: &str) -> Result<NaiveDate> {
    req_str(params, key)?
        .parse::<NaiveDate>()
        .map_err(|_| invalid_params(format!("{key} must be YYYY-MM-DD")))
}

/// Optional `YYYY-MM-DD` date param.
pub(crate) fn opt_date(params: &Value, key: &str) -> Result<Option<NaiveDate>> {
    match params[key].as_str() {
        None => Ok(None),
        Some(s) => s
            .parse::<NaiveDate>()
            .map(Some)
            .map_err(|_| invalid_params(format!("{key} must be YYYY-MM-DD"))),
    }
}

/// The gym's calendar day. Check-in and expiry boundaries follow the wall
/// clock at the front desk, not UTC.
pub(crate) fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
