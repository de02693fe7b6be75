use serde_json::Value;
use tokio::sync::broadcast;

/// Fan-out of JSON-RPC notifications to every connected UI client.
///
/// The front desk may have two or three windows open at once (reception,
/// a wall dashboard); all of them hear `checkin.recorded` and the expiry
/// warnings through this channel.
#[derive(Clone)]
pub struct EventBroadcaster {
    tx: broadcast::Sender<String>,
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBroadcaster {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1024);
        Self { tx }
    }

    /// Send a JSON-RPC notification to all connected clients.
    pub fn broadcast(&self, method: &str, params: Value) {
        let notification = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params
        });
        // No subscribers is fine — the send error is meaningless here.
        let _ = self
            .tx
            .send(serde_json::to_string(&notification).unwrap_or_default());
    }

    /// Subscribe to all broadcast events.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_notification() {
        let bc = EventBroadcaster::new();
        let mut rx = bc.subscribe();
        bc.broadcast("checkin.recorded", serde_json::json!({"memberId": "m1"}));
        let raw = rx.recv().await.unwrap();
        let v: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(v["method"], "checkin.recorded");
        assert_eq!(v["params"]["memberId"], "m1");
        assert!(v.get("id").is_none());
    }
}
