//! Event Bus implementation.
//!
//! Provides the core EventBus struct used by the connectivity service to fan
//! device events out to independent subscribers.

use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::events::{DeviceEvent, EventKind};
use crate::data::{CommandResult, ConnectionStatus, TelemetrySample};

/// Subscription handle for unsubscribing from events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Create a new unique subscription ID
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", &self.0.to_string()[..8])
    }
}

/// Type alias for event handler functions
type EventHandler = Arc<dyn Fn(&DeviceEvent) + Send + Sync>;

/// A registered handler
///
/// `active` is cleared on unsubscribe so an emission already iterating a
/// snapshot skips the handler from that point on.
#[derive(Clone)]
struct Subscriber {
    id: SubscriptionId,
    handler: EventHandler,
    active: Arc<AtomicBool>,
}

/// Configuration for the event bus
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Channel capacity for broadcast receivers.
    pub channel_capacity: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
        }
    }
}

/// Publish/subscribe registry routing device events to handlers
///
/// Handlers for a kind run synchronously on the publishing thread, in
/// registration order. No lock is held while a handler runs, so handlers may
/// subscribe, unsubscribe or publish re-entrantly.
pub struct EventBus {
    /// Broadcast channel sender
    sender: broadcast::Sender<DeviceEvent>,
    /// Registered synchronous handlers, ordered per kind
    handlers: RwLock<HashMap<EventKind, Vec<Subscriber>>>,
    /// Configuration
    config: EventBusConfig,
}

impl EventBus {
    /// Create a new event bus with default configuration
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    /// Create a new event bus with custom configuration
    pub fn with_config(config: EventBusConfig) -> Self {
        let (sender, _) = broadcast::channel(config.channel_capacity.max(1));
        Self {
            sender,
            handlers: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Publish an event to all subscribers of its kind
    ///
    /// Returns the number of handlers that completed without panicking.
    /// A panicking handler is logged and skipped; later handlers still run.
    pub fn publish(&self, event: DeviceEvent) -> usize {
        let kind = event.kind();
        let snapshot: Vec<Subscriber> = self
            .handlers
            .read()
            .get(&kind)
            .cloned()
            .unwrap_or_default();

        let mut delivered = 0;
        for subscriber in &snapshot {
            if !subscriber.active.load(Ordering::Acquire) {
                continue;
            }
            match catch_unwind(AssertUnwindSafe(|| (subscriber.handler)(&event))) {
                Ok(()) => delivered += 1,
                Err(payload) => {
                    tracing::error!(
                        subscription = %subscriber.id,
                        kind = %kind,
                        "Event handler panicked: {}",
                        panic_message(payload.as_ref())
                    );
                }
            }
        }

        // Err only means there are no async receivers
        let _ = self.sender.send(event);
        delivered
    }

    /// Subscribe to one kind of event with a synchronous handler
    ///
    /// The handler will be called on the publishing thread, so it should
    /// return quickly to avoid delaying later subscribers.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&DeviceEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId::new();
        let subscriber = Subscriber {
            id,
            handler: Arc::new(handler),
            active: Arc::new(AtomicBool::new(true)),
        };
        self.handlers.write().entry(kind).or_default().push(subscriber);
        tracing::debug!("Subscription {} added for {}", id, kind);
        id
    }

    /// Subscribe to connection status changes
    pub fn on_connection<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(ConnectionStatus) + Send + Sync + 'static,
    {
        self.subscribe(EventKind::Connection, move |event| {
            if let DeviceEvent::Connection { status } = event {
                handler(*status);
            }
        })
    }

    /// Subscribe to telemetry samples
    pub fn on_data<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&TelemetrySample) + Send + Sync + 'static,
    {
        self.subscribe(EventKind::Data, move |event| {
            if let DeviceEvent::Data(sample) = event {
                handler(sample);
            }
        })
    }

    /// Subscribe to command acknowledgments
    pub fn on_command_response<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&CommandResult) + Send + Sync + 'static,
    {
        self.subscribe(EventKind::CommandResponse, move |event| {
            if let DeviceEvent::CommandResponse(result) = event {
                handler(result);
            }
        })
    }

    /// Subscribe to link failures
    pub fn on_error<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.subscribe(EventKind::Error, move |event| {
            if let DeviceEvent::ConnectFailed { reason } = event {
                handler(reason);
            }
        })
    }

    /// Get a receiver for manual event polling
    ///
    /// This is useful for async contexts where you want to receive events
    /// in a tokio task.
    pub fn receiver(&self) -> broadcast::Receiver<DeviceEvent> {
        self.sender.subscribe()
    }

    /// Unsubscribe from events
    ///
    /// Returns true if the subscription was found and removed. Removing an
    /// unknown or already removed subscription is a no-op.
    pub fn unsubscribe(&self, kind: EventKind, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.write();
        let Some(subscribers) = handlers.get_mut(&kind) else {
            return false;
        };
        let Some(index) = subscribers.iter().position(|s| s.id == id) else {
            return false;
        };

        let removed = subscribers.remove(index);
        removed.active.store(false, Ordering::Release);
        if subscribers.is_empty() {
            handlers.remove(&kind);
        }
        tracing::debug!("Subscription {} removed from {}", id, kind);
        true
    }

    /// Get the number of active subscriptions across all kinds
    pub fn subscriber_count(&self) -> usize {
        self.handlers.read().values().map(Vec::len).sum()
    }

    /// Get the number of active subscriptions for one kind
    pub fn subscriber_count_for(&self, kind: EventKind) -> usize {
        self.handlers.read().get(&kind).map_or(0, Vec::len)
    }

    /// Get the current configuration
    pub fn config(&self) -> &EventBusConfig {
        &self.config
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .field("config", &self.config)
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicUsize;

    fn sample() -> DeviceEvent {
        DeviceEvent::Data(TelemetrySample::new(25.0, 2.0, 7.1, 1))
    }

    #[test]
    fn test_event_bus_creation() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_subscribe_and_unsubscribe() {
        let bus = EventBus::new();

        let id = bus.subscribe(EventKind::Data, |_| {});
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(bus.subscriber_count_for(EventKind::Data), 1);

        // Wrong kind leaves the subscription alone
        assert!(!bus.unsubscribe(EventKind::Connection, id));
        assert!(bus.unsubscribe(EventKind::Data, id));
        assert_eq!(bus.subscriber_count(), 0);

        // Double unsubscribe should return false
        assert!(!bus.unsubscribe(EventKind::Data, id));
    }

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(sample()), 0);
    }

    #[test]
    fn test_handlers_run_in_registration_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..4 {
            let order = order.clone();
            bus.subscribe(EventKind::Data, move |_| order.lock().push(i));
        }

        assert_eq!(bus.publish(sample()), 4);
        assert_eq!(*order.lock(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_event_routing_by_kind() {
        let bus = EventBus::new();
        let connection_count = Arc::new(AtomicUsize::new(0));
        let data_count = Arc::new(AtomicUsize::new(0));

        let cc = connection_count.clone();
        bus.on_connection(move |status| {
            assert_eq!(status, ConnectionStatus::Connected);
            cc.fetch_add(1, Ordering::SeqCst);
        });

        let dc = data_count.clone();
        bus.on_data(move |_| {
            dc.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(DeviceEvent::connection(ConnectionStatus::Connected));
        bus.publish(sample());
        bus.publish(sample());

        assert_eq!(connection_count.load(Ordering::SeqCst), 1);
        assert_eq!(data_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_panicking_handler_is_isolated() {
        let bus = EventBus::new();
        let after = Arc::new(AtomicUsize::new(0));

        bus.subscribe(EventKind::Data, |_| panic!("handler fault"));
        let a = after.clone();
        bus.subscribe(EventKind::Data, move |_| {
            a.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(bus.publish(sample()), 1);
        assert_eq!(after.load(Ordering::SeqCst), 1);

        // Bus state is intact for the next emission
        assert_eq!(bus.subscriber_count_for(EventKind::Data), 2);
        assert_eq!(bus.publish(sample()), 1);
        assert_eq!(after.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unsubscribe_during_dispatch_skips_handler() {
        let bus = Arc::new(EventBus::new());
        let victim_calls = Arc::new(AtomicUsize::new(0));
        let victim_id = Arc::new(Mutex::new(None::<SubscriptionId>));

        let weak_bus = Arc::downgrade(&bus);
        let target = victim_id.clone();
        bus.subscribe(EventKind::Data, move |_| {
            if let (Some(bus), Some(id)) = (weak_bus.upgrade(), *target.lock()) {
                bus.unsubscribe(EventKind::Data, id);
            }
        });

        let vc = victim_calls.clone();
        let id = bus.subscribe(EventKind::Data, move |_| {
            vc.fetch_add(1, Ordering::SeqCst);
        });
        *victim_id.lock() = Some(id);

        assert_eq!(bus.publish(sample()), 1);
        assert_eq!(victim_calls.load(Ordering::SeqCst), 0);
        assert_eq!(bus.subscriber_count_for(EventKind::Data), 1);
    }

    #[test]
    fn test_subscribe_during_dispatch_waits_for_next_emission() {
        let bus = Arc::new(EventBus::new());
        let late_calls = Arc::new(AtomicUsize::new(0));
        let added = Arc::new(AtomicBool::new(false));

        let weak_bus = Arc::downgrade(&bus);
        let lc = late_calls.clone();
        bus.subscribe(EventKind::Data, move |_| {
            if added.swap(true, Ordering::SeqCst) {
                return;
            }
            if let Some(bus) = weak_bus.upgrade() {
                let lc = lc.clone();
                bus.subscribe(EventKind::Data, move |_| {
                    lc.fetch_add(1, Ordering::SeqCst);
                });
            }
        });

        bus.publish(sample());
        assert_eq!(late_calls.load(Ordering::SeqCst), 0);
        bus.publish(sample());
        assert_eq!(late_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_nested_publish_from_handler() {
        let bus = Arc::new(EventBus::new());
        let statuses = Arc::new(Mutex::new(Vec::new()));

        let weak_bus = Arc::downgrade(&bus);
        bus.on_data(move |_| {
            if let Some(bus) = weak_bus.upgrade() {
                bus.publish(DeviceEvent::connection(ConnectionStatus::Disconnected));
            }
        });
        let s = statuses.clone();
        bus.on_connection(move |status| s.lock().push(status));

        bus.publish(sample());
        assert_eq!(*statuses.lock(), vec![ConnectionStatus::Disconnected]);
    }

    #[tokio::test]
    async fn test_async_receiver() {
        let bus = EventBus::new();
        let mut receiver = bus.receiver();

        bus.publish(DeviceEvent::connection(ConnectionStatus::Reconnecting));

        match receiver.try_recv() {
            Ok(DeviceEvent::Connection { status }) => {
                assert_eq!(status, ConnectionStatus::Reconnecting)
            }
            other => panic!("Wrong event received: {:?}", other),
        }
    }
}
