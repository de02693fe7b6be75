pub mod config;
pub mod error;
pub mod ipc;
pub mod lifecycle;
pub mod notifications;
pub mod password;
pub mod storage;

use std::sync::Arc;
use std::time::Instant;

/// Everything a request handler needs, shared across connections and the
/// background scanner. Cheap to clone.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<config::GymConfig>,
    pub storage: Arc<storage::Storage>,
    pub broadcaster: ipc::event::EventBroadcaster,
    pub started_at: Instant,
    /// Token clients must present in `daemon.auth`. Empty disables auth
    /// (used by tests that talk to the daemon over localhost).
    pub auth_token: String,
}
