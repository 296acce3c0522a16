//! Connection lifecycle of the connectivity service, driven on paused time

use aqualink_communication::{ConnectivityConfig, ConnectivityService, DeviceLink, SimulatedLink};
use aqualink_core::{thread_safe_vec, ConnectionStatus, EventBus, EventKind, ThreadSafeVec};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug, Clone, PartialEq)]
enum Seen {
    Status(ConnectionStatus),
    Data,
    Failed(String),
}

fn record(service: &ConnectivityService) -> ThreadSafeVec<Seen> {
    let log = thread_safe_vec();

    let sink = log.clone();
    service.on_connection(move |status| sink.lock().push(Seen::Status(status)));
    let sink = log.clone();
    service.on_data(move |_| sink.lock().push(Seen::Data));
    let sink = log.clone();
    service
        .bus()
        .on_error(move |reason| sink.lock().push(Seen::Failed(reason.to_string())));

    log
}

fn data_count(log: &ThreadSafeVec<Seen>) -> usize {
    log.lock().iter().filter(|seen| **seen == Seen::Data).count()
}

#[tokio::test(start_paused = true)]
async fn test_connect_stream_disconnect_scenario() {
    let service = ConnectivityService::simulated(ConnectivityConfig::default()).unwrap();
    let log = record(&service);

    service.connect();
    sleep(Duration::from_millis(999)).await;
    assert!(log.lock().is_empty());
    assert!(!service.is_connected());

    sleep(Duration::from_millis(2)).await;
    assert_eq!(
        *log.lock(),
        vec![Seen::Status(ConnectionStatus::Connected), Seen::Data]
    );
    assert!(service.is_connected());

    sleep(Duration::from_secs(30)).await;
    assert_eq!(data_count(&log), 2);

    service.disconnect();
    assert!(!service.is_connected());
    assert!(!service.is_streaming());
    assert_eq!(
        log.lock().last(),
        Some(&Seen::Status(ConnectionStatus::Disconnected))
    );

    sleep(Duration::from_secs(120)).await;
    assert_eq!(data_count(&log), 2);
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_is_idempotent_and_always_published() {
    let service = ConnectivityService::simulated(ConnectivityConfig::default()).unwrap();
    let log = record(&service);

    service.disconnect();
    service.disconnect();

    assert_eq!(service.status(), ConnectionStatus::Disconnected);
    assert_eq!(
        *log.lock(),
        vec![
            Seen::Status(ConnectionStatus::Disconnected),
            Seen::Status(ConnectionStatus::Disconnected),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_cancels_pending_connect() {
    let service = ConnectivityService::simulated(ConnectivityConfig::default()).unwrap();
    let log = record(&service);

    service.connect();
    sleep(Duration::from_millis(500)).await;
    service.disconnect();
    sleep(Duration::from_secs(5)).await;

    assert_eq!(
        *log.lock(),
        vec![Seen::Status(ConnectionStatus::Disconnected)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_sequence() {
    let service = ConnectivityService::simulated(ConnectivityConfig::default()).unwrap();
    let log = record(&service);

    service.connect();
    sleep(Duration::from_millis(1001)).await;
    service.reconnect();
    assert_eq!(service.status(), ConnectionStatus::Reconnecting);

    sleep(Duration::from_millis(2001)).await;
    assert_eq!(service.status(), ConnectionStatus::Connecting);

    sleep(Duration::from_millis(1000)).await;
    assert!(service.is_connected());
    assert_eq!(
        *log.lock(),
        vec![
            Seen::Status(ConnectionStatus::Connected),
            Seen::Data,
            Seen::Status(ConnectionStatus::Disconnected),
            Seen::Status(ConnectionStatus::Reconnecting),
            Seen::Status(ConnectionStatus::Connected),
            Seen::Data,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_during_reconnect_backoff_wins() {
    let service = ConnectivityService::simulated(ConnectivityConfig::default()).unwrap();
    let log = record(&service);

    service.reconnect();
    sleep(Duration::from_millis(1000)).await;
    service.disconnect();
    sleep(Duration::from_secs(10)).await;

    assert!(!service.is_connected());
    assert_eq!(
        *log.lock(),
        vec![
            Seen::Status(ConnectionStatus::Disconnected),
            Seen::Status(ConnectionStatus::Reconnecting),
            Seen::Status(ConnectionStatus::Disconnected),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_failed_open_reports_error_and_stays_disconnected() {
    let link = Arc::new(SimulatedLink::new());
    link.fail_next_opens(1);
    let service = ConnectivityService::new(ConnectivityConfig::default(), link.clone()).unwrap();
    let log = record(&service);

    service.connect();
    sleep(Duration::from_secs(60)).await;

    assert_eq!(service.status(), ConnectionStatus::Disconnected);
    assert!(!service.is_streaming());
    {
        let log = log.lock();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0], Seen::Status(ConnectionStatus::Disconnected));
        assert!(matches!(&log[1], Seen::Failed(reason) if reason.contains("ESP32-ECO-1")));
    }

    service.connect();
    sleep(Duration::from_millis(1001)).await;
    assert!(service.is_connected());
    assert_eq!(link.open_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_read_skips_tick() {
    let link = Arc::new(SimulatedLink::new());
    let service = ConnectivityService::new(ConnectivityConfig::default(), link.clone()).unwrap();
    let log = record(&service);

    link.set_failing_reads(true);
    service.connect();
    sleep(Duration::from_millis(1001)).await;
    assert!(service.is_connected());
    assert_eq!(data_count(&log), 0);

    link.set_failing_reads(false);
    sleep(Duration::from_secs(30)).await;
    assert!(service.is_connected());
    assert_eq!(data_count(&log), 1);
}

#[tokio::test(start_paused = true)]
async fn test_handler_can_disconnect_reentrantly() {
    let service = Arc::new(ConnectivityService::simulated(ConnectivityConfig::default()).unwrap());
    let log = record(&service);

    let weak: Weak<ConnectivityService> = Arc::downgrade(&service);
    service.on_connection(move |status| {
        if status == ConnectionStatus::Connected {
            if let Some(service) = weak.upgrade() {
                service.disconnect();
            }
        }
    });

    service.connect();
    sleep(Duration::from_secs(120)).await;

    assert!(!service.is_connected());
    assert!(!service.is_streaming());
    assert_eq!(
        *log.lock(),
        vec![
            Seen::Status(ConnectionStatus::Connected),
            Seen::Status(ConnectionStatus::Disconnected),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_panicking_handler_does_not_stop_stream() {
    let service = ConnectivityService::simulated(ConnectivityConfig::default()).unwrap();
    service.on_data(|_| panic!("dashboard widget crashed"));
    let log = record(&service);

    service.connect();
    sleep(Duration::from_millis(1001)).await;
    sleep(Duration::from_secs(30)).await;

    assert!(service.is_connected());
    assert_eq!(data_count(&log), 2);
}

#[tokio::test(start_paused = true)]
async fn test_off_removes_handler() {
    let service = ConnectivityService::simulated(ConnectivityConfig::default()).unwrap();
    let count = Arc::new(AtomicUsize::new(0));
    let counter = count.clone();
    let id = service.on(EventKind::Data, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    service.connect();
    sleep(Duration::from_millis(1001)).await;
    assert_eq!(count.load(Ordering::SeqCst), 1);

    assert!(service.off(EventKind::Data, id));
    assert!(!service.off(EventKind::Data, id));
    sleep(Duration::from_secs(60)).await;
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_drop_stops_all_tasks() {
    let bus = Arc::new(EventBus::new());
    let link = Arc::new(SimulatedLink::new());
    let service =
        ConnectivityService::with_bus(ConnectivityConfig::default(), link.clone(), bus.clone())
            .unwrap();

    let events = Arc::new(AtomicUsize::new(0));
    for kind in EventKind::ALL {
        let events = events.clone();
        bus.subscribe(kind, move |_| {
            events.fetch_add(1, Ordering::SeqCst);
        });
    }

    service.connect();
    sleep(Duration::from_millis(1001)).await;
    service
        .send_command("restartDevice", Default::default())
        .unwrap();
    let before = events.load(Ordering::SeqCst);

    drop(service);
    sleep(Duration::from_secs(120)).await;

    assert_eq!(events.load(Ordering::SeqCst), before);
    assert!(!link.is_open());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_no_data_after_disconnect_returns() {
    let config = ConnectivityConfig {
        connect_delay: Duration::from_millis(10),
        telemetry_interval: Duration::from_millis(2),
        ..ConnectivityConfig::default()
    };
    let service = ConnectivityService::simulated(config).unwrap();

    let disconnected = Arc::new(AtomicBool::new(false));
    let late = Arc::new(AtomicUsize::new(0));
    let samples = Arc::new(AtomicUsize::new(0));
    {
        let disconnected = disconnected.clone();
        let late = late.clone();
        let samples = samples.clone();
        service.on_data(move |_| {
            samples.fetch_add(1, Ordering::SeqCst);
            if disconnected.load(Ordering::SeqCst) {
                late.fetch_add(1, Ordering::SeqCst);
            }
        });
    }

    service.connect();
    for _ in 0..200 {
        if samples.load(Ordering::SeqCst) >= 5 {
            break;
        }
        sleep(Duration::from_millis(5)).await;
    }
    assert!(samples.load(Ordering::SeqCst) >= 5);

    service.disconnect();
    disconnected.store(true, Ordering::SeqCst);
    sleep(Duration::from_millis(50)).await;

    assert_eq!(late.load(Ordering::SeqCst), 0);
}
