use dashmap::DashMap;
use tokio::sync::broadcast;
use ulid::Ulid;

use crate::model::Event;

const CHANNEL_CAPACITY: usize = 256;

/// Broadcast hub, one channel per court. This is the notification hook:
/// the engine publishes every committed event here — waitlist promotions
/// included — and delivery beyond the channel (email, SMS) is the
/// subscriber's business. Sends are fire-and-forget: no blocking, no
/// retry, a no-op when nobody is listening.
pub struct NotifyHub {
    channels: DashMap<Ulid, broadcast::Sender<Event>>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Subscribe to events for a court. Creates the channel if needed.
    pub fn subscribe(&self, court_id: Ulid) -> broadcast::Receiver<Event> {
        let sender = self
            .channels
            .entry(court_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// Send a notification. No-op if nobody is listening.
    pub fn send(&self, court_id: Ulid, event: &Event) {
        if let Some(sender) = self.channels.get(&court_id) {
            let _ = sender.send(event.clone());
        }
    }

    /// Drop a court's channel.
    pub fn remove(&self, court_id: &Ulid) {
        self.channels.remove(court_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Requester, TimeWindow, WaitlistEntry};

    fn entry(court_id: Ulid) -> WaitlistEntry {
        WaitlistEntry {
            id: Ulid::new(),
            requester: Requester {
                user_id: "u1".into(),
                name: "Ada".into(),
                email: "ada@example.com".into(),
            },
            court_id,
            window: TimeWindow::new("2025-06-02".parse().unwrap(), 600, 660).unwrap(),
            equipment: vec![],
            coach_id: None,
            position: 1,
            notified: true,
        }
    }

    #[tokio::test]
    async fn subscribe_and_receive() {
        let hub = NotifyHub::new();
        let court_id = Ulid::new();
        let mut rx = hub.subscribe(court_id);

        let event = Event::WaitlistPromoted {
            entry: entry(court_id),
        };
        hub.send(court_id, &event);

        let received = rx.recv().await.unwrap();
        assert_eq!(received, event);
    }

    #[tokio::test]
    async fn send_without_subscribers_is_noop() {
        let hub = NotifyHub::new();
        let court_id = Ulid::new();
        // No subscriber — should not panic
        hub.send(court_id, &Event::BookingCancelled { id: Ulid::new() });
    }
}
