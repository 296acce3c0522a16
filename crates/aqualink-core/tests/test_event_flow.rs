//! Consumers attached to one bus: history, alerts and an async receiver

use aqualink_core::{
    AlertFilter, AlertLevel, AlertLog, AlertThresholds, ConnectionStatus, DeviceEvent, EventBus,
    EventKind, SensorChannel, TelemetryHistory, TelemetrySample,
};

#[test]
fn test_history_and_alerts_share_data_events() {
    let bus = EventBus::new();
    let (history, _) = TelemetryHistory::attach(&bus, 60).unwrap();
    let (alerts, _) = AlertLog::attach(&bus, AlertThresholds::default());
    assert_eq!(bus.subscriber_count_for(EventKind::Data), 2);

    bus.publish(DeviceEvent::Data(TelemetrySample::new(25.0, 3.0, 7.5, 1)));
    bus.publish(DeviceEvent::Data(TelemetrySample::new(31.0, 3.0, 7.5, 2)));
    bus.publish(DeviceEvent::Data(TelemetrySample::new(25.0, 3.0, 7.5, 3)));
    bus.publish(DeviceEvent::connection(ConnectionStatus::Connected));

    assert_eq!(history.lock().len(), 3);

    let alerts = alerts.lock();
    let levels: Vec<(SensorChannel, AlertLevel)> = alerts
        .alerts(AlertFilter::All)
        .iter()
        .map(|a| (a.channel, a.level))
        .collect();
    assert_eq!(
        levels,
        vec![
            (SensorChannel::Temperature, AlertLevel::Info),
            (SensorChannel::Temperature, AlertLevel::Critical),
        ]
    );
}

#[test]
fn test_detached_consumer_stops_receiving() {
    let bus = EventBus::new();
    let (history, id) = TelemetryHistory::attach(&bus, 60).unwrap();

    bus.publish(DeviceEvent::Data(TelemetrySample::new(25.0, 3.0, 7.5, 1)));
    assert!(bus.unsubscribe(EventKind::Data, id));
    bus.publish(DeviceEvent::Data(TelemetrySample::new(25.0, 3.0, 7.5, 2)));

    assert_eq!(history.lock().len(), 1);
}

#[tokio::test]
async fn test_async_receiver_sees_every_kind() {
    let bus = EventBus::new();
    let mut rx = bus.receiver();

    bus.publish(DeviceEvent::connection(ConnectionStatus::Connected));
    bus.publish(DeviceEvent::Data(TelemetrySample::new(25.0, 3.0, 7.5, 1)));
    bus.publish(DeviceEvent::ConnectFailed {
        reason: "timeout".to_string(),
    });

    let mut kinds = Vec::new();
    for _ in 0..3 {
        kinds.push(rx.recv().await.unwrap().kind());
    }
    assert_eq!(
        kinds,
        vec![EventKind::Connection, EventKind::Data, EventKind::Error]
    );
}

#[test]
fn test_event_envelope_json() {
    let event = DeviceEvent::connection(ConnectionStatus::Reconnecting);
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "connection");
    assert_eq!(json["data"]["status"], "reconnecting");

    let back: DeviceEvent = serde_json::from_value(json).unwrap();
    assert_eq!(back, event);
}
