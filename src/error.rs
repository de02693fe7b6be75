//! Domain errors shared by storage and RPC handlers.
//!
//! Handlers return `anyhow::Result`; the IPC layer downcasts to `GymError`
//! to pick the JSON-RPC error code. Anything that doesn't downcast is an
//! internal error (-32603).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GymError {
    #[error("member not found: {0}")]
    MemberNotFound(String),

    #[error("plan not found: {0}")]
    PlanNotFound(String),

    #[error("membership not found: {0}")]
    MembershipNotFound(String),

    #[error("payment not found: {0}")]
    PaymentNotFound(String),

    #[error("account not found: {0}")]
    AccountNotFound(String),

    /// The requested date range intersects an existing membership
    /// for the same member.
    #[error("membership overlaps {existing_id} ({start}..{end})")]
    MembershipOverlap {
        existing_id: String,
        start: String,
        end: String,
    },

    #[error("member already checked in on {0}")]
    DuplicateCheckin(String),

    /// Quota plan with no remaining check-ins.
    #[error("no usable membership: {0}")]
    QuotaExhausted(String),

    #[error("login failed")]
    LoginFailed,

    #[error("invalid params: {0}")]
    InvalidParams(String),

    /// Catch-all for operations refused by a business rule
    /// (e.g. deleting a member with history, archiving the last admin).
    #[error("{0}")]
    Refused(String),
}

impl GymError {
    /// JSON-RPC error code for this variant.
    ///
    /// Codes below -32000 are the JSON-RPC server-error range;
    /// the UI maps these to user-facing messages.
    pub fn code(&self) -> i32 {
        match self {
            GymError::MemberNotFound(_) => -32001,
            GymError::PlanNotFound(_) => -32002,
            GymError::MembershipNotFound(_) => -32003,
            GymError::MembershipOverlap { .. } => -32005,
            GymError::DuplicateCheckin(_) => -32006,
            GymError::QuotaExhausted(_) => -32007,
            GymError::LoginFailed => -32008,
            GymError::PaymentNotFound(_) => -32009,
            GymError::AccountNotFound(_) => -32010,
            GymError::InvalidParams(_) => -32602,
            GymError::Refused(_) => -32011,
        }
    }
}

/// Shorthand for the `INVALID_PARAMS` pattern used throughout handlers.
pub fn invalid_params(msg: impl Into<String>) -> anyhow::Error {
    GymError::InvalidParams(msg.into()).into()
}
