//! Integration tests for the registry server and client over real sockets.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use procbus_common::{ComponentDescriptor, ProcessRecord};
use procbus_registry::{RegistryClient, RegistryServer};

static ENDPOINT_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn test_registry_endpoint(tag: &str) -> String {
    let id = ENDPOINT_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("procbus-test-registry-{}-{}-{}", tag, std::process::id(), id)
}

fn test_record(endpoint: &str, pid: u32) -> ProcessRecord {
    ProcessRecord {
        process_id: pid,
        process_name: format!("proc-{pid}"),
        endpoint: endpoint.to_string(),
        last_heartbeat: Utc::now(),
        components: vec![ComponentDescriptor {
            type_name: "demo::TaskWorker".to_string(),
            interfaces: vec!["demo::TaskService".to_string()],
        }],
    }
}

#[tokio::test]
async fn test_register_then_list() {
    let registry = test_registry_endpoint("list");
    let handle = RegistryServer::bind_at(&registry).await.unwrap().spawn();

    let client = RegistryClient::with_endpoint(&registry);
    client.register(&test_record("ep-a", 100)).await.unwrap();
    client.register(&test_record("ep-b", 200)).await.unwrap();

    let mut active = client.list_active().await;
    active.sort_by_key(|r| r.process_id);
    assert_eq!(active.len(), 2);
    assert_eq!(active[0].endpoint, "ep-a");
    assert_eq!(active[1].endpoint, "ep-b");

    handle.stop().await;
}

#[tokio::test]
async fn test_reregistration_overwrites() {
    let registry = test_registry_endpoint("overwrite");
    let handle = RegistryServer::bind_at(&registry).await.unwrap().spawn();

    let client = RegistryClient::with_endpoint(&registry);
    client.register(&test_record("ep-a", 1)).await.unwrap();
    client.register(&test_record("ep-a", 2)).await.unwrap();

    let active = client.list_active().await;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].process_id, 2);

    handle.stop().await;
}

#[tokio::test]
async fn test_heartbeat_unknown_endpoint_acks() {
    let registry = test_registry_endpoint("hb-unknown");
    let handle = RegistryServer::bind_at(&registry).await.unwrap().spawn();

    let client = RegistryClient::with_endpoint(&registry);
    // Never registered, still acked, never listed.
    client.heartbeat("ghost-endpoint").await.unwrap();
    assert!(client.list_active().await.is_empty());

    handle.stop().await;
}

#[tokio::test]
async fn test_list_without_registry_is_empty() {
    let registry = test_registry_endpoint("absent");
    let client = RegistryClient::with_endpoint(&registry);
    assert!(client.list_active().await.is_empty());
}

#[tokio::test]
async fn test_register_bootstraps_registry_when_absent() {
    // Scenario C: no registry server running. The first register call times
    // out, bootstraps one in-process and the retry succeeds.
    let registry = test_registry_endpoint("bootstrap");
    let client = RegistryClient::with_endpoint(&registry);
    assert!(!client.is_registry_host());

    client.register(&test_record("ep-a", 300)).await.unwrap();
    assert!(client.is_registry_host());

    let active = client.list_active().await;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].process_id, 300);

    // A second process on the same host now finds the bootstrapped server.
    let other = RegistryClient::with_endpoint(&registry);
    other.register(&test_record("ep-b", 301)).await.unwrap();
    assert!(!other.is_registry_host());
    assert_eq!(other.list_active().await.len(), 2);
}

#[tokio::test]
async fn test_stopped_registry_no_longer_answers() {
    let registry = test_registry_endpoint("stopped");
    let handle = RegistryServer::bind_at(&registry).await.unwrap().spawn();

    let client = RegistryClient::with_endpoint(&registry);
    client.register(&test_record("ep-a", 400)).await.unwrap();

    handle.stop().await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(client.list_active().await.is_empty());
}
