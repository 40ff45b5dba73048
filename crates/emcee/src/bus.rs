use tokio::sync::broadcast;

use crate::event::DispatchEvent;

/// Broadcast channel carrying dispatch lifecycle notifications.
#[derive(Clone)]
pub struct Bus {
    sender: broadcast::Sender<DispatchEvent>,
}

impl Bus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DispatchEvent> {
        self.sender.subscribe()
    }

    pub fn publish(
        &self,
        event: DispatchEvent,
    ) -> Result<usize, broadcast::error::SendError<DispatchEvent>> {
        self.sender.send(event)
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::MessageInvalidPayload;
    use crate::message::ChatMessage;
    use tokio::time::{timeout, Duration};

    fn test_event() -> DispatchEvent {
        DispatchEvent::MessageInvalid(MessageInvalidPayload {
            message: ChatMessage::user("m1", "u1", "c1", "hello"),
        })
    }

    #[tokio::test]
    async fn publish_and_receive_event() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();

        let _ = bus.publish(test_event());

        let received = timeout(Duration::from_millis(100), rx.recv())
            .await
            .expect("timeout")
            .expect("recv");
        assert!(matches!(received, DispatchEvent::MessageInvalid(ref e) if e.message.id == "m1"));
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_event() {
        let bus = Bus::new(8);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let _ = bus.publish(test_event());

        assert!(rx1.recv().await.is_ok());
        assert!(rx2.recv().await.is_ok());
    }
}
