//! End-to-end tests of the public surface against the mock harness.
//!
//! The unit suites in `glowlink-manager` cover each behavior in isolation;
//! these tests walk a whole session the way the configuration tool does:
//! connect, exchange a few messages, survive a fault, reconnect.

use std::time::Duration;

use glowlink::{ConnectOptions, ConnectionStatus, DataEvent, Error, SerialManager};
use glowlink_test_harness::{MockPortProvider, MockSerialLink};
use tokio::sync::mpsc;

async fn recv<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

#[tokio::test]
async fn a_full_session_round_trip() {
    let (link, handle) = MockSerialLink::new();
    let provider = MockPortProvider::new();
    provider.add_link(link);
    let manager = SerialManager::new(Box::new(provider));

    let (data_tx, mut data_rx) = mpsc::unbounded_channel::<DataEvent>();
    let sub = manager.on_data(move |event| {
        let _ = data_tx.send(event.clone());
    });

    assert!(manager.is_supported());
    manager.connect(ConnectOptions::default()).await.unwrap();
    assert!(manager.is_connected());

    // Host -> controller.
    manager
        .send(serde_json::json!({"cmd": "get-config"}))
        .await
        .unwrap();
    assert_eq!(handle.written().len(), 1);

    // Controller -> host, split across arbitrary chunk boundaries.
    handle.push_chunk(b"{\"config\":{\"cha");
    handle.push_chunk(b"nnels\":4}}\r\nready\n");

    let reply = recv(&mut data_rx).await;
    assert_eq!(
        reply.value,
        Some(serde_json::json!({"config": {"channels": 4}}))
    );
    assert_eq!(recv(&mut data_rx).await.line, "ready");

    manager.disconnect().await;
    assert_eq!(manager.status(), ConnectionStatus::Disconnected);
    assert_eq!(handle.close_count(), 1);

    // One outbound entry, two inbound lines, plus the lifecycle notes.
    let log = manager.log();
    let outbound: Vec<_> = log
        .iter()
        .filter(|e| e.direction == glowlink::Direction::Outbound)
        .collect();
    assert_eq!(outbound.len(), 1);

    sub.unsubscribe();
}

#[tokio::test]
async fn fault_then_reconnect_on_a_fresh_port() {
    let (first, first_handle) = MockSerialLink::new();
    let (second, second_handle) = MockSerialLink::new();
    let provider = MockPortProvider::new();
    provider.add_link(first);
    provider.add_link(second);
    let manager = SerialManager::new(Box::new(provider));

    let (status_tx, mut status_rx) = mpsc::unbounded_channel();
    let _sub = manager.on_status(move |event| {
        let _ = status_tx.send(event.clone());
    });

    manager.connect(ConnectOptions::default()).await.unwrap();
    assert_eq!(recv(&mut status_rx).await.status, ConnectionStatus::Connecting);
    assert_eq!(recv(&mut status_rx).await.status, ConnectionStatus::Connected);

    // Unplug. The manager goes through error and converges to
    // disconnected on its own; the UI reacts by offering a reconnect.
    first_handle.push_fault("device unplugged");
    assert_eq!(recv(&mut status_rx).await.status, ConnectionStatus::Error);
    assert_eq!(
        recv(&mut status_rx).await.status,
        ConnectionStatus::Disconnecting
    );
    assert_eq!(
        recv(&mut status_rx).await.status,
        ConnectionStatus::Disconnected
    );
    assert_eq!(first_handle.close_count(), 1);

    // The core never retries by itself; a new connect is a caller action.
    manager.connect(ConnectOptions::baud(9600)).await.unwrap();
    assert!(manager.is_connected());
    assert_eq!(second_handle.open_options().map(|o| o.baud_rate), Some(9600));

    manager.disconnect().await;
    assert_eq!(second_handle.close_count(), 1);
}

#[tokio::test]
async fn aborting_a_slow_open_from_the_ui() {
    let (link, handle) = MockSerialLink::new();
    let provider = MockPortProvider::new();
    provider.add_link(link);
    let manager = SerialManager::new(Box::new(provider));

    let mut held = handle.hold_open();

    let connecting = manager.clone();
    let attempt = tokio::spawn(async move { connecting.connect(ConnectOptions::default()).await });
    held.opening().await;

    // The user gives up while the open hangs.
    manager.disconnect().await;
    assert_eq!(manager.status(), ConnectionStatus::Disconnected);

    // The device finally answers; the port must still end up closed.
    held.release();
    let result = attempt.await.unwrap();
    assert!(matches!(result, Err(Error::Aborted)));
    assert_eq!(handle.close_count(), 1);
    assert!(!handle.is_open());
}
