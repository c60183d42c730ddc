use serde::Serialize;
use tokio::sync::broadcast;
use tracing::warn;

use crate::dto::sse::ServerEvent;

/// Broadcast hub fanning events out to every SSE subscriber of one session.
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    ///
    /// A zero capacity is treated as one.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }

    /// Serialize `payload` and broadcast it under `name`.
    pub fn publish<T: Serialize>(&self, name: &str, payload: &T) {
        match ServerEvent::json(name.to_owned(), payload) {
            Ok(event) => self.broadcast(event),
            Err(err) => warn!(event = name, error = %err, "failed to serialize SSE payload"),
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn zero_capacity_still_delivers() {
        let hub = SseHub::new(0);
        let mut receiver = hub.subscribe();

        hub.publish("players", &vec!["Amy"]);

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.data, r#"["Amy"]"#);
    }

    #[tokio::test]
    async fn every_subscriber_receives_published_events() {
        let hub = SseHub::new(4);
        let mut first = hub.subscribe();
        let mut second = hub.subscribe();

        hub.publish("players", &vec!["Amy"]);

        for receiver in [&mut first, &mut second] {
            let event = receiver.recv().await.unwrap();
            assert_eq!(event.event.as_deref(), Some("players"));
            assert_eq!(event.data, r#"["Amy"]"#);
        }
        assert_eq!(hub.subscriber_count(), 2);
    }
}
