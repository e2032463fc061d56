//! The SSE event bus (spec.md §4.5 "Event bus (SSE)"): a rolling backlog
//! plus fan-out to every connected client, each as its own channel so a
//! slow/disconnected client can be dropped without blocking the others
//! (spec.md §5: "SSE client set is a separate lock").

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use pof_types::EVENT_BACKLOG_MINUTES;

/// `{type, data, timestamp}` (spec.md §6 "SSE event envelope").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: serde_json::Value,
    pub timestamp: i64,
}

impl Envelope {
    pub fn new(kind: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            data,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

type ClientSender = mpsc::UnboundedSender<Envelope>;

/// Owns the rolling backlog and the set of connected clients. Two separate
/// locks, matching spec.md §5's explicit call-out that the SSE client set
/// is synchronised independently of the agent pool.
pub struct EventBus {
    backlog: RwLock<Vec<Envelope>>,
    clients: RwLock<Vec<ClientSender>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            backlog: RwLock::new(Vec::new()),
            clients: RwLock::new(Vec::new()),
        }
    }

    /// Append to the backlog (pruning anything older than
    /// [`EVENT_BACKLOG_MINUTES`]) and fan out to every connected client.
    /// Event order on the bus equals the order of calls here (spec.md §5
    /// "Ordering guarantees").
    pub fn publish(&self, envelope: Envelope) {
        {
            let mut backlog = self.backlog.write();
            backlog.push(envelope.clone());
            let cutoff = Utc::now().timestamp_millis() - EVENT_BACKLOG_MINUTES * 60_000;
            backlog.retain(|e| e.timestamp >= cutoff);
        }

        // Fan out without per-client flow control (spec.md §4.5); drop any
        // client whose receiver has gone away.
        self.clients
            .write()
            .retain(|tx| tx.send(envelope.clone()).is_ok());
    }

    pub fn publish_kind(&self, kind: &str, data: serde_json::Value) {
        self.publish(Envelope::new(kind, data));
    }

    /// Register a new SSE client, replaying the current backlog first so a
    /// newly-connected client never misses a recent event (spec.md §4.5
    /// "A rolling buffer... replays recent events to newly-connected
    /// clients").
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Envelope> {
        let (tx, rx) = mpsc::unbounded_channel();
        for envelope in self.backlog.read().iter().cloned() {
            // Replay best-effort: a brand-new channel cannot be full or
            // closed yet, so this can only fail if the subscriber never
            // polls, which is the subscriber's own problem to solve.
            let _ = tx.send(envelope);
        }
        self.clients.write().push(tx);
        rx
    }

    pub fn connected_clients(&self) -> usize {
        self.clients.read().len()
    }
}
