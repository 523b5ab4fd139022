use crate::gateway::protocol::GatewayEvent;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 256;

/// Fan-out broadcaster for turn progress events. Subscribers come and go;
/// broadcasting with no subscribers is fine and simply drops the event.
pub struct EventBroadcaster {
    sender: broadcast::Sender<GatewayEvent>,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.sender.subscribe()
    }

    pub fn broadcast(&self, event: GatewayEvent) {
        log::debug!("[GATEWAY] {}", event.event);
        // A send error only means nobody is listening right now
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_broadcast_events() {
        let broadcaster = EventBroadcaster::new();
        let mut rx = broadcaster.subscribe();

        broadcaster.broadcast(GatewayEvent::turn_started("t1"));
        broadcaster.broadcast(GatewayEvent::text_delta("t1", "hi"));

        assert_eq!(rx.recv().await.unwrap().event, "turn.started");
        assert_eq!(rx.recv().await.unwrap().event, "text.delta");
    }

    #[test]
    fn test_broadcast_without_subscribers_does_not_panic() {
        let broadcaster = EventBroadcaster::new();
        broadcaster.broadcast(GatewayEvent::turn_started("t1"));
        assert_eq!(broadcaster.subscriber_count(), 0);
    }
}
