//! End-to-end tests publishing over HTTP to a local mock server.

mod test_utils;

use std::{net::TcpListener, sync::mpsc, time::Duration};

use femtopublish::{PayloadFormat, PublishError, PublisherBuilder, TextEncoding, TransportError};
use rstest::{fixture, rstest};
use serde_json::{Value, json};

use test_utils::mock_server::{CapturedRequest, spawn_status_server};

#[fixture]
fn tcp_listener() -> TcpListener {
    TcpListener::bind(("127.0.0.1", 0)).expect("bind ephemeral listener")
}

fn received_bodies(rx: &mpsc::Receiver<CapturedRequest>, count: usize) -> Vec<Vec<u8>> {
    (0..count)
        .map(|_| rx.recv_timeout(Duration::from_secs(5)).expect("request").body)
        .collect()
}

fn builder_for(addr: std::net::SocketAddr) -> PublisherBuilder {
    PublisherBuilder::new()
        .with_endpoint(format!("http://{addr}/ingest"))
        .with_connect_timeout_ms(2_000)
        .with_operation_timeout_ms(10_000)
        .with_min_backoff_ms(5)
        .with_max_backoff_ms(20)
        .with_delta_backoff_ms(5)
}

#[rstest]
fn posts_batches_with_content_type_and_charset(tcp_listener: TcpListener) {
    let (addr, rx) = spawn_status_server(tcp_listener, vec![200]);
    let mut publisher = builder_for(addr).build_http().expect("publisher");

    let report = publisher
        .publish(&[json!({"metric": "cpu", "value": 0.5})])
        .expect("publish");

    let captured = rx.recv_timeout(Duration::from_secs(5)).expect("request");
    assert_eq!(report.batches, 1);
    assert_eq!(captured.method, "POST");
    assert_eq!(captured.path, "/ingest");
    assert_eq!(
        captured.header("content-type"),
        Some("application/json; charset=UTF-8")
    );
    let body: Vec<Value> = serde_json::from_slice(&captured.body).expect("json body");
    assert_eq!(body, vec![json!({"metric": "cpu", "value": 0.5})]);
}

#[rstest]
fn retries_unavailable_endpoint_until_accepted(tcp_listener: TcpListener) {
    let (addr, rx) = spawn_status_server(tcp_listener, vec![503, 429, 200]);
    let mut publisher = builder_for(addr)
        .with_max_retry_count(3)
        .build_http()
        .expect("publisher");

    let report = publisher.publish_json(r#"[{"seq": 1}]"#).expect("publish");

    assert_eq!(report.retries, 2);
    let bodies = received_bodies(&rx, 3);
    assert!(bodies.iter().all(|b| b == br#"[{"seq":1}]"#));
}

#[rstest]
fn client_errors_are_retried_like_any_failure(tcp_listener: TcpListener) {
    let (addr, _rx) = spawn_status_server(tcp_listener, vec![400, 200]);
    let mut publisher = builder_for(addr)
        .with_max_retry_count(1)
        .build_http()
        .expect("publisher");

    let report = publisher.publish(&[json!({"seq": 1})]).expect("publish");

    assert_eq!(report.retries, 1);
}

#[rstest]
fn zero_retries_surfaces_rejection(tcp_listener: TcpListener) {
    let (addr, _rx) = spawn_status_server(tcp_listener, vec![500]);
    let mut publisher = builder_for(addr).build_http().expect("publisher");

    let err = publisher
        .publish(&[json!({"seq": 1})])
        .expect_err("rejected");

    match err {
        PublishError::Exhausted {
            attempts, source, ..
        } => {
            assert_eq!(attempts, 1);
            assert_eq!(source, TransportError::Rejected { status: 500 });
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[rstest]
fn unreachable_endpoint_is_a_transport_failure(tcp_listener: TcpListener) {
    let addr = tcp_listener.local_addr().expect("address");
    drop(tcp_listener);
    let mut publisher = builder_for(addr).build_http().expect("publisher");

    let err = publisher
        .publish(&[json!({"seq": 1})])
        .expect_err("unreachable");

    assert!(matches!(
        err,
        PublishError::Exhausted {
            source: TransportError::Unreachable(_),
            ..
        }
    ));
}

#[rstest]
fn transcodes_text_payloads(tcp_listener: TcpListener) {
    let (addr, rx) = spawn_status_server(tcp_listener, vec![200]);
    let encoding = TextEncoding::for_label("latin1").expect("latin1");
    let mut publisher = builder_for(addr)
        .with_encoding(encoding)
        .build_http()
        .expect("publisher");

    publisher.publish(&["caf\u{e9}"]).expect("publish");

    let captured = rx.recv_timeout(Duration::from_secs(5)).expect("request");
    assert_eq!(captured.body, b"[\"caf\xe9\"]");
    assert_eq!(
        captured.header("content-type"),
        Some("application/json; charset=windows-1252")
    );
}

#[rstest]
fn messagepack_payloads_omit_charset(tcp_listener: TcpListener) {
    let (addr, rx) = spawn_status_server(tcp_listener, vec![200]);
    let mut publisher = builder_for(addr)
        .with_format(PayloadFormat::MessagePack)
        .build_http()
        .expect("publisher");

    publisher.publish(&[1u8, 2, 3]).expect("publish");

    let captured = rx.recv_timeout(Duration::from_secs(5)).expect("request");
    assert_eq!(captured.header("content-type"), Some("application/msgpack"));
    assert_eq!(captured.body, vec![0x93, 0x01, 0x02, 0x03]);
}

#[rstest]
fn queued_publisher_delivers_over_http(tcp_listener: TcpListener) {
    let (addr, rx) = spawn_status_server(tcp_listener, vec![200, 200]);
    let queued = builder_for(addr).build_queued_http().expect("queued");

    let first = queued.submit(&[json!({"seq": 1})]).expect("submit");
    let second = queued.submit(&[json!({"seq": 2})]).expect("submit");

    assert!(first.wait().expect("outcome").is_ok());
    assert!(second.wait().expect("outcome").is_ok());
    let bodies = received_bodies(&rx, 2);
    assert_eq!(
        bodies,
        vec![br#"[{"seq":1}]"#.to_vec(), br#"[{"seq":2}]"#.to_vec()]
    );
}
