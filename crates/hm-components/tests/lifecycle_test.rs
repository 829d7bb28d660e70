//! Connection lifecycle: setup, reconnect, unload

mod common;

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use common::{config, uid, TestHive};
use hm_bus::{BusClient, LifecycleEvent, LoopbackClient};
use hm_components::{setup_from_file, ButtonEntity, Entity, SetupError};
use tempfile::TempDir;

fn reconnect_sequence(site: &str) -> Vec<LifecycleEvent> {
    vec![
        LifecycleEvent::Closed,
        LifecycleEvent::SessionReset,
        LifecycleEvent::Connecting(site.to_string()),
        LifecycleEvent::Connected(site.to_string()),
    ]
}

#[tokio::test]
async fn test_reconnect_clears_then_restores_availability() {
    let client = Arc::new(
        LoopbackClient::new("10.0.0.5").with_connect_delay(Duration::from_millis(100)),
    );
    let hive = TestHive::with_client(config(), client).await;
    let first_key = hive.client.session_key();
    assert!(first_key.is_some());

    let button = hive.integration.reconnect_button.clone();
    let press = tokio::spawn(async move { button.press().await });

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!hive.integration.connection().is_available());
    assert_eq!(hive.state(&uid("hm-connection-status")), "off");
    assert_eq!(hive.state(&uid("hm-speaking-status")), "unavailable");

    press.await.unwrap();
    assert!(hive.integration.connection().is_available());
    assert_eq!(hive.state(&uid("hm-connection-status")), "on");
    assert_ne!(hive.client.session_key(), first_key);
    assert_eq!(hive.client.lifecycle(), reconnect_sequence("kitchen"));
}

#[tokio::test]
async fn test_concurrent_reconnects_are_serialized() {
    let client = Arc::new(
        LoopbackClient::new("10.0.0.5").with_connect_delay(Duration::from_millis(30)),
    );
    let hive = TestHive::with_client(config(), client).await;
    let button = hive.integration.reconnect_button.clone();

    tokio::join!(button.press(), button.press());

    let mut expected = reconnect_sequence("kitchen");
    expected.extend(reconnect_sequence("kitchen"));
    assert_eq!(hive.client.lifecycle(), expected);
    assert!(hive.integration.connection().is_available());
}

#[tokio::test]
async fn test_failed_setup_connect_recovers_on_reconnect() {
    let client = Arc::new(LoopbackClient::new("10.0.0.5"));
    client.set_fail_connect(true);
    let hive = TestHive::with_client(config(), client).await;

    assert_eq!(hive.state(&uid("hm-listen-mode")), "unavailable");
    assert_eq!(hive.state(&uid("hm-reconnect-button")), "unknown");

    hive.client.set_fail_connect(false);
    hive.integration.reconnect_button.press().await;
    assert_eq!(hive.state(&uid("hm-listen-mode")), "wakeword");
}

#[tokio::test]
async fn test_failed_reconnect_leaves_entities_unavailable() {
    let hive = TestHive::new().await;
    hive.client.set_fail_connect(true);
    hive.integration.reconnect_button.press().await;

    assert!(!hive.integration.connection().is_available());
    assert_eq!(hive.state(&uid("hm-ssh-switch")), "unavailable");
    assert_eq!(
        hive.client.lifecycle().last(),
        Some(&LifecycleEvent::ConnectFailed("kitchen".to_string()))
    );
}

#[tokio::test]
async fn test_unload_closes_connection() {
    let hive = TestHive::new().await;
    hive.integration.unload().await;
    assert_eq!(hive.client.lifecycle(), vec![LifecycleEvent::Closed]);
    assert!(!hive.integration.connection().is_available());
}

#[tokio::test]
async fn test_store_follows_failed_reconnect() {
    let hive = TestHive::new().await;
    let recorder = hive.store.spawn(hive.integration.notifier());

    hive.client.set_fail_connect(true);
    hive.integration.reconnect_button.press().await;

    hive.wait_for_state(&uid("hm-connection-status"), "off").await;
    hive.wait_for_state(&uid("hm-ssh-switch"), "unavailable").await;
    hive.wait_for_state(&uid("hm-ocp"), "unavailable").await;
    recorder.abort();
}

#[tokio::test]
async fn test_store_follows_reconnect_back_to_available() {
    let client = Arc::new(LoopbackClient::new("10.0.0.5"));
    client.set_fail_connect(true);
    let hive = TestHive::with_client(config(), client).await;
    assert_eq!(hive.store.get_state(&uid("hm-listen-mode")).as_deref(), Some("unavailable"));
    let recorder = hive.store.spawn(hive.integration.notifier());

    hive.client.set_fail_connect(false);
    hive.integration.reconnect_button.press().await;

    hive.wait_for_state(&uid("hm-listen-mode"), "wakeword").await;
    hive.wait_for_state(&uid("hm-connection-status"), "on").await;
    recorder.abort();
}

#[tokio::test]
async fn test_store_follows_unload() {
    let hive = TestHive::new().await;
    let recorder = hive.store.spawn(hive.integration.notifier());

    hive.integration.unload().await;

    hive.wait_for_state(&uid("hm-speaking-status"), "unavailable").await;
    recorder.abort();
}

#[tokio::test]
async fn test_poll_records_silent_handshake_loss() {
    let hive = TestHive::new().await;
    assert_eq!(hive.store.get_state(&uid("hm-ssh-switch")).as_deref(), Some("off"));

    hive.client.set_handshake(false);
    hive.store.poll();

    assert_eq!(hive.store.get_state(&uid("hm-connection-status")).as_deref(), Some("off"));
    assert_eq!(hive.store.get_state(&uid("hm-ssh-switch")).as_deref(), Some("unavailable"));
}

#[tokio::test]
async fn test_setup_from_file() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("secrets.yaml"),
        "office_key: k-123\noffice_password: hunter2\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("hivemind.yaml"),
        r#"
hivemind:
  - name: Office Pi
    host: 192.168.1.20
    access_key: !secret office_key
    password: !secret office_password
    site_id: office
  - name: Bedroom
    host: 192.168.1.21
    access_key: bedroom-key
    password: bedroom-pass
    legacy_audio: true
"#,
    )
    .unwrap();

    let integrations = setup_from_file(dir.path(), "hivemind.yaml", |entry| -> Arc<dyn BusClient> {
        Arc::new(LoopbackClient::new(entry.host.clone()))
    })
    .await
    .unwrap();

    assert_eq!(integrations.len(), 2);
    assert_eq!(integrations[0].config().access_key, "k-123");
    assert_eq!(integrations[0].media_player.unique_id(), "hm-ocp-Office-Pi-office");
    assert_eq!(integrations[1].config().site_id, "unknown");
    assert!(integrations[1].media_player.is_legacy_audio());
}

#[tokio::test]
async fn test_setup_from_file_rejects_invalid_entry() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("hivemind.yaml"),
        "host: 192.168.1.20\naccess_key: key\npassword: ''\n",
    )
    .unwrap();

    let result = setup_from_file(dir.path(), "hivemind.yaml", |entry| -> Arc<dyn BusClient> {
        Arc::new(LoopbackClient::new(entry.host.clone()))
    })
    .await;
    assert!(matches!(result, Err(SetupError::Config(_))));
}
