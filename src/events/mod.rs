// events/mod.rs

//! State-change fan-out to subscribed viewers.
//!
//! The command path only knows that a push transport exists; delivery runs
//! over a broadcast channel, so a slow or disconnected viewer can lag its own
//! receiver but never block or fail the mutating request.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::debug;

use crate::models::{Device, ServerEvent};

const CHANNEL_CAPACITY: usize = 100;

/// Outbound push transport. Production uses [`EventBroadcaster`]; tests swap
/// in a recording implementation.
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn deliver(&self, event: ServerEvent);
}

/// Broadcast-channel transport shared by all viewer sockets. Each connected
/// viewer holds its own receiver and drains it in its own task.
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    tx: broadcast::Sender<ServerEvent>,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[async_trait]
impl PushTransport for EventBroadcaster {
    async fn deliver(&self, event: ServerEvent) {
        // send() only fails with zero subscribers; nobody to notify is fine.
        if self.tx.send(event).is_err() {
            debug!("event dropped, no subscribed viewers");
        }
    }
}

/// Announces one `DeviceStateChanged` event per device that actually changed,
/// in the order given (registry order). Failed batch items never reach this
/// point, so each change is announced exactly once.
pub async fn announce(transport: &dyn PushTransport, changed: &[Device]) {
    for device in changed {
        metrics::counter!("events_published_total").increment(1);
        transport.deliver(ServerEvent::state_changed(device.clone())).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands;
    use crate::devices::DeviceRegistry;
    use crate::models::DeviceType;
    use tokio::sync::Mutex;

    struct RecordingTransport {
        events: Mutex<Vec<ServerEvent>>,
    }

    impl RecordingTransport {
        fn new() -> Self {
            Self {
                events: Mutex::new(Vec::new()),
            }
        }

        async fn recorded(&self) -> Vec<ServerEvent> {
            self.events.lock().await.clone()
        }
    }

    #[async_trait]
    impl PushTransport for RecordingTransport {
        async fn deliver(&self, event: ServerEvent) {
            self.events.lock().await.push(event);
        }
    }

    fn device(id: u32, name: &str, is_on: bool, device_type: DeviceType) -> Device {
        Device {
            id,
            name: name.to_string(),
            is_on,
            device_type,
        }
    }

    #[tokio::test]
    async fn announce_emits_one_event_per_changed_device() {
        let transport = RecordingTransport::new();
        let changed = vec![
            device(1, "Light1", true, DeviceType::Lightbulb),
            device(2, "Light2", true, DeviceType::Lightbulb),
        ];

        announce(&transport, &changed).await;

        let events = transport.recorded().await;
        assert_eq!(events.len(), 2);

        let ids: Vec<u32> = events
            .iter()
            .map(|e| match e {
                ServerEvent::DeviceStateChanged { device, .. } => device.id,
                other => panic!("unexpected event: {other:?}"),
            })
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn announce_carries_the_post_mutation_state() {
        let transport = RecordingTransport::new();
        let changed = vec![device(3, "AirCon1", true, DeviceType::AirConditioner)];

        announce(&transport, &changed).await;

        let events = transport.recorded().await;
        match &events[0] {
            ServerEvent::DeviceStateChanged { device, .. } => {
                assert_eq!(device.id, 3);
                assert!(device.is_on);
                assert_eq!(device.device_type, DeviceType::AirConditioner);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn announce_with_no_changes_emits_nothing() {
        let transport = RecordingTransport::new();

        announce(&transport, &[]).await;

        assert!(transport.recorded().await.is_empty());
    }

    #[tokio::test]
    async fn broadcaster_delivers_to_every_subscriber() {
        let broadcaster = EventBroadcaster::new();
        let mut rx1 = broadcaster.subscribe();
        let mut rx2 = broadcaster.subscribe();

        announce(&broadcaster, &[device(1, "Light1", true, DeviceType::Lightbulb)]).await;

        for rx in [&mut rx1, &mut rx2] {
            match rx.recv().await.unwrap() {
                ServerEvent::DeviceStateChanged { device, .. } => assert_eq!(device.id, 1),
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn delivery_without_subscribers_never_fails_the_caller() {
        let broadcaster = EventBroadcaster::new();
        assert_eq!(broadcaster.subscriber_count(), 0);

        // Must not panic or error.
        announce(&broadcaster, &[device(1, "Light1", true, DeviceType::Lightbulb)]).await;
    }

    #[tokio::test]
    async fn toggle_then_announce_notifies_subscribers_exactly_once() {
        let registry = DeviceRegistry::with_default_fleet();
        let broadcaster = EventBroadcaster::new();
        let mut rx = broadcaster.subscribe();

        let toggled = commands::toggle_device(&registry, 1).await.unwrap();
        announce(&broadcaster, std::slice::from_ref(&toggled)).await;

        match rx.recv().await.unwrap() {
            ServerEvent::DeviceStateChanged { device, .. } => {
                assert_eq!(device.id, 1);
                assert!(device.is_on);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn batch_then_announce_emits_exactly_the_success_set() {
        let registry = DeviceRegistry::with_default_fleet();
        let broadcaster = EventBroadcaster::new();
        let mut rx = broadcaster.subscribe();

        let applied = commands::batch_set(&registry, DeviceType::Lightbulb, true).await;
        announce(&broadcaster, &applied.changed).await;

        let mut ids = Vec::new();
        for _ in 0..applied.outcome.devices_affected {
            match rx.recv().await.unwrap() {
                ServerEvent::DeviceStateChanged { device, .. } => {
                    assert!(device.is_on);
                    ids.push(device.id);
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }
        assert_eq!(ids, vec![1, 2]);

        // No duplicates, no events for the untouched air conditioners.
        assert!(rx.try_recv().is_err());
    }
}
