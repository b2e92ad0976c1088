//! Event bus for match scoring
//!
//! Provides pub/sub messaging using Tokio broadcast channels. Publishing
//! never blocks and never fails a scoring operation; events are dropped
//! when nobody listens.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

use super::types::ScoringEvent;

/// Channel capacity for broadcast
const CHANNEL_CAPACITY: usize = 256;

/// Shared reference to EventBus
pub type SharedEventBus = Arc<EventBus>;

/// Event bus with broadcast channels
pub struct EventBus {
    sender: broadcast::Sender<ScoringEvent>,
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Create a shared reference to this event bus
    pub fn shared(self) -> SharedEventBus {
        Arc::new(self)
    }

    /// Publish an event to all subscribers
    ///
    /// Returns the number of subscribers that received it.
    pub fn publish(&self, event: ScoringEvent) -> usize {
        let event_type = event.event_type();
        match self.sender.send(event) {
            Ok(count) => {
                debug!(event_type, receivers = count, "Event published");
                count
            }
            Err(_) => {
                debug!(event_type, "Event published (no receivers)");
                0
            }
        }
    }

    /// Subscribe to receive events
    pub fn subscribe(&self) -> broadcast::Receiver<ScoringEvent> {
        self.sender.subscribe()
    }

    /// Subscribe to events for a single match
    pub fn subscribe_match(&self, match_id: &str) -> MatchReceiver {
        MatchReceiver {
            receiver: self.subscribe(),
            match_id: match_id.to_string(),
        }
    }

    /// Get the number of current subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver that only yields events for one match
pub struct MatchReceiver {
    receiver: broadcast::Receiver<ScoringEvent>,
    match_id: String,
}

impl MatchReceiver {
    /// Receive the next event for this match
    pub async fn recv(&mut self) -> Result<ScoringEvent, broadcast::error::RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if event.match_id() == self.match_id {
                return Ok(event);
            }
        }
    }
}
