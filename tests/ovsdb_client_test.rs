//! OVSDB client tests against an in-process fake `ovsdb-server`

#![cfg(unix)]

use ovs_exporter::collectors::{CollectionStatus, InterfaceCollector};
use ovs_exporter::config::OvsdbConfig;
use ovs_exporter::metrics::{Metric, Schema};
use ovs_exporter::ovsdb::connection::decode_message;
use ovs_exporter::ovsdb::{Endpoint, OvsdbClient};
use ovs_exporter::source::InterfaceSource;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};

fn socket_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "ovs-exporter-{}-{}.sock",
        std::process::id(),
        name
    ))
}

fn sample_rows() -> Value {
    json!([
        {
            "name": "br-int",
            "admin_state": "up",
            "mac_in_use": "aa:bb:cc:dd:ee:ff",
            "bfd_status": ["map", []],
            "options": ["map", []],
            "statistics": ["map", [["rx_bytes", 100], ["tx_bytes", 0]]],
            "status": ["map", []]
        },
        {
            "name": "ovn-abc123-0",
            "admin_state": "up",
            "mac_in_use": ["set", []],
            "bfd_status": ["map", [["state", "down"], ["flap_count", "1"]]],
            "options": ["map", [["remote_ip", "10.0.0.2"]]],
            "statistics": ["map", []],
            "status": ["map", [["tunnel_egress_iface_carrier", "down"]]]
        }
    ])
}

async fn handle_connection(mut stream: UnixStream, rows: Value, stall: Option<Duration>) {
    let mut buffer = Vec::new();
    let mut chunk = vec![0u8; 4096];
    loop {
        while let Ok(Some(message)) = decode_message(&mut buffer) {
            // Replies to our own echo probes carry no method
            let Some(method) = message["method"].as_str() else {
                continue;
            };
            let id = message["id"].clone();
            let reply = match method {
                "list_dbs" => json!({"id": id, "result": ["Open_vSwitch"], "error": null}),
                "echo" => json!({"id": id, "result": message["params"], "error": null}),
                "transact" => {
                    if let Some(stall) = stall {
                        tokio::time::sleep(stall).await;
                    }
                    // Probe the client mid-request, as ovsdb-server does on idle sessions
                    let probe = json!({"id": "echo", "method": "echo", "params": []});
                    if stream.write_all(probe.to_string().as_bytes()).await.is_err() {
                        return;
                    }
                    if message["params"][0] == "Open_vSwitch" {
                        json!({"id": id, "result": [{"rows": rows}], "error": null})
                    } else {
                        json!({"id": id, "result": null, "error": "unknown database"})
                    }
                }
                _ => json!({"id": id, "result": null, "error": "unknown method"}),
            };
            if stream.write_all(reply.to_string().as_bytes()).await.is_err() {
                return;
            }
        }

        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buffer.extend_from_slice(&chunk[..n]),
        }
    }
}

/// Start a fake server and return its endpoint string
async fn spawn_server(name: &str) -> String {
    spawn_server_with(name, sample_rows(), None).await.0
}

/// Start a fake server serving `rows`
///
/// When `stall_first` is set, the first accepted connection sleeps that long before
/// answering `transact`. Also returns the number of accepted connections.
async fn spawn_server_with(
    name: &str,
    rows: Value,
    stall_first: Option<Duration>,
) -> (String, Arc<AtomicUsize>) {
    let path = socket_path(name);
    let _ = std::fs::remove_file(&path);
    let listener = UnixListener::bind(&path).expect("Failed to bind test socket");
    let accepted = Arc::new(AtomicUsize::new(0));

    let counter = accepted.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let stall = match counter.fetch_add(1, Ordering::SeqCst) {
                0 => stall_first,
                _ => None,
            };
            tokio::spawn(handle_connection(stream, rows.clone(), stall));
        }
    });

    (format!("unix:{}", path.display()), accepted)
}

fn client_config(endpoint: String, database: &str) -> OvsdbConfig {
    OvsdbConfig {
        endpoint,
        database: database.to_string(),
        timeout_seconds: 5,
    }
}

#[tokio::test]
async fn test_connect_and_list_dbs() {
    // Given: A running server
    let endpoint = spawn_server("list-dbs").await;
    let client = OvsdbClient::new(&client_config(endpoint, "Open_vSwitch")).unwrap();

    // When: Connecting and listing databases
    client.connect().await.expect("Connect failed");
    let dbs = client.list_dbs().await.expect("list_dbs failed");

    // Then: The switch database is served
    assert_eq!(dbs, vec!["Open_vSwitch"]);
    client.verify_database().await.expect("Database should be found");
}

#[tokio::test]
async fn test_verify_database_rejects_unknown_database() {
    let endpoint = spawn_server("unknown-db").await;
    let client = OvsdbClient::new(&client_config(endpoint, "OVN_Southbound")).unwrap();

    let err = client.verify_database().await.unwrap_err();

    assert!(err.to_string().contains("OVN_Southbound"));
}

#[tokio::test]
async fn test_list_interfaces_answers_echo_and_decodes_rows() {
    // Given: A server that probes with echo before answering transact
    let endpoint = spawn_server("list-interfaces").await;
    let client = OvsdbClient::new(&client_config(endpoint, "Open_vSwitch")).unwrap();

    // When: Listing interfaces twice on the same session
    let first = client.list_interfaces().await.expect("First snapshot failed");
    let second = client.list_interfaces().await.expect("Second snapshot failed");

    // Then: Rows are decoded into typed records
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].name, "br-int");
    assert_eq!(first[0].statistics.get("rx_bytes"), Some(&100));
    assert_eq!(first[1].mac_in_use, None);
    assert_eq!(first[1].bfd.state.as_deref(), Some("down"));
    assert_eq!(first[1].remote_ip.as_deref(), Some("10.0.0.2"));
}

#[tokio::test]
async fn test_transact_error_is_reported() {
    let endpoint = spawn_server("transact-error").await;
    let client = OvsdbClient::new(&client_config(endpoint, "Missing")).unwrap();

    let err = client.list_interfaces().await.unwrap_err();

    assert!(err.to_string().contains("unknown database"));
}

#[tokio::test]
async fn test_echo_round_trip() {
    let endpoint = spawn_server("echo").await;
    let client = OvsdbClient::new(&client_config(endpoint, "Open_vSwitch")).unwrap();

    client.echo().await.expect("Echo failed");
}

#[tokio::test]
async fn test_connect_to_missing_socket_fails() {
    let path = socket_path("missing");
    let _ = std::fs::remove_file(&path);
    let client =
        OvsdbClient::new(&client_config(format!("unix:{}", path.display()), "Open_vSwitch"))
            .unwrap();

    assert!(client.connect().await.is_err());
    assert!(client.list_interfaces().await.is_err());
}

#[tokio::test]
async fn test_collector_over_ovsdb() {
    // Given: The engine wired to the OVSDB client
    let endpoint = spawn_server("collector").await;
    let client = OvsdbClient::new(&client_config(endpoint, "Open_vSwitch")).unwrap();
    let collector = InterfaceCollector::new(Schema::new(), client, Duration::from_secs(5));

    // When: Collecting
    let (status, samples) = collector.collect_samples().await;

    // Then: Samples reflect both rows
    assert_eq!(status, CollectionStatus::Success);
    let admin: Vec<_> = samples
        .iter()
        .filter(|s| s.metric == Metric::AdminState)
        .collect();
    assert_eq!(admin.len(), 2);
    assert_eq!(admin[1].labels, vec!["ovn-abc123-0", "unknown"]);

    let bfd_state: Vec<_> = samples
        .iter()
        .filter(|s| s.metric == Metric::BfdState)
        .collect();
    assert_eq!(bfd_state.len(), 1);
    assert_eq!(bfd_state[0].value, -1.0);

    let carrier: Vec<_> = samples
        .iter()
        .filter(|s| s.metric == Metric::StatusTunnelEgressCarrier)
        .collect();
    assert_eq!(carrier[0].value, 0.0);
}

#[tokio::test]
async fn test_timed_out_scrape_reconnects_on_next_scrape() {
    // Given: A server whose first session stalls past the scrape timeout
    let (endpoint, accepted) =
        spawn_server_with("stall", sample_rows(), Some(Duration::from_secs(3))).await;
    let client = OvsdbClient::new(&client_config(endpoint, "Open_vSwitch")).unwrap();
    let collector = InterfaceCollector::new(Schema::new(), client, Duration::from_millis(300));

    // When: Scraping twice
    let (first_status, first_samples) = collector.collect_samples().await;
    let (second_status, second_samples) = collector.collect_samples().await;

    // Then: The first scrape fails empty, the second succeeds on a fresh session
    assert_eq!(first_status, CollectionStatus::Failed);
    assert!(first_samples.is_empty());
    assert_eq!(second_status, CollectionStatus::Success);
    assert!(!second_samples.is_empty());
    assert_eq!(accepted.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_large_snapshot_spans_multiple_reads() {
    // Given: A table whose reply is several times the socket read size
    let rows: Vec<Value> = (0..2000)
        .map(|i| {
            json!({
                "name": format!("tap{:04}-{}", i, "x".repeat(64)),
                "admin_state": "up",
                "mac_in_use": "aa:bb:cc:dd:ee:ff",
                "bfd_status": ["map", []],
                "options": ["map", []],
                "statistics": ["map", [["rx_bytes", i], ["tx_bytes", i * 2]]],
                "status": ["map", []]
            })
        })
        .collect();
    let (endpoint, accepted) = spawn_server_with("large", Value::Array(rows), None).await;
    let client = OvsdbClient::new(&client_config(endpoint, "Open_vSwitch")).unwrap();

    // When: Listing interfaces twice on one session
    let first = client.list_interfaces().await.expect("First snapshot failed");
    let second = client.list_interfaces().await.expect("Second snapshot failed");

    // Then: Every row is decoded and the session is reused
    assert_eq!(first.len(), 2000);
    assert_eq!(first, second);
    assert_eq!(first[1999].statistics.get("tx_bytes"), Some(&3998));
    assert_eq!(accepted.load(Ordering::SeqCst), 1);
}

#[test]
fn test_endpoint_parsing() {
    assert_eq!(
        "unix:/var/run/openvswitch/db.sock".parse::<Endpoint>().unwrap(),
        Endpoint::Unix(PathBuf::from("/var/run/openvswitch/db.sock"))
    );
    assert_eq!(
        "tcp:127.0.0.1:6640".parse::<Endpoint>().unwrap(),
        Endpoint::Tcp("127.0.0.1:6640".to_string())
    );
    assert!("unix:".parse::<Endpoint>().is_err());
    assert!("tcp:127.0.0.1".parse::<Endpoint>().is_err());
    assert!("tcp:host:notaport".parse::<Endpoint>().is_err());
    assert!("ssl:127.0.0.1:6640".parse::<Endpoint>().is_err());
    assert!("/var/run/openvswitch/db.sock".parse::<Endpoint>().is_err());
}

#[test]
fn test_endpoint_display_round_trips() {
    for endpoint in ["unix:/run/db.sock", "tcp:[::1]:6640"] {
        assert_eq!(endpoint.parse::<Endpoint>().unwrap().to_string(), endpoint);
    }
}
