//! Domain event system — decoupled observation of agent activity.
//!
//! The reasoning loop publishes events as it runs; the CLI and tests can
//! subscribe without the loop knowing who is listening.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A tool was executed (or a cached observation was reused)
    ToolExecuted {
        session_id: String,
        tool_name: String,
        success: bool,
        cached: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A malformed model reply was answered with a corrective re-prompt
    ParseErrorRecovered {
        session_id: String,
        attempt: u32,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A user/assistant exchange was persisted
    TurnCommitted {
        session_id: String,
        tool_calls: usize,
        hit_iteration_limit: bool,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
