//! Integration tests for metadata resolution and recorded ingestion.
//!
//! A local Axum server stands in for the metadata host so the real HTTP
//! path (URL layout, status handling, body parsing) is exercised without
//! leaving the machine.

#![allow(clippy::unwrap_used, clippy::float_cmp)]

use std::io::Cursor;
use std::net::SocketAddr;

use axum::Router;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::get;
use radar_core::calibration::{CalibrationError, MetadataClient};
use radar_core::config::MetadataConfig;
use radar_core::demo::JsonLinesDemo;
use radar_core::ingest::{IngestError, ingest_recorded};

async fn info_json(Path((map, crc)): Path<(String, u32)>) -> (StatusCode, String) {
    match (map.as_str(), crc) {
        ("de_dust2", 1) => (
            StatusCode::OK,
            String::from(r#"{"de_dust2": {"pos_x": "-2476", "pos_y": "3239", "scale": "4.4"}}"#),
        ),
        ("de_dust2", 2) => (
            StatusCode::OK,
            String::from(r#"{"de_dust2": {"pos_x": "-2476", "pos_y": "3239", "scale": "huge"}}"#),
        ),
        ("de_mirage", _) => (
            StatusCode::OK,
            String::from(r#"{"de_dust2": {"pos_x": "-2476", "pos_y": "3239", "scale": "4.4"}}"#),
        ),
        _ => (StatusCode::NOT_FOUND, String::from("not found")),
    }
}

async fn spawn_metadata_host() -> SocketAddr {
    let app = Router::new().route("/{map}/{crc}/info.json", get(info_json));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client_for(addr: SocketAddr) -> MetadataClient {
    MetadataClient::new(&MetadataConfig {
        base_url: format!("http://{addr}"),
        request_timeout_ms: 5_000,
    })
    .unwrap()
}

#[tokio::test]
async fn resolves_calibration_over_http() {
    let client = client_for(spawn_metadata_host().await);
    let cal = client.resolve("de_dust2", 1).await.unwrap();
    assert_eq!(cal.map_name(), "de_dust2");
    assert_eq!(cal.origin_x(), -2476.0);
    assert_eq!(cal.origin_y(), 3239.0);
    assert_eq!(cal.scale(), 4.4);
}

#[tokio::test]
async fn non_200_is_unavailable() {
    let client = client_for(spawn_metadata_host().await);
    let err = client.resolve("de_dust2", 999).await.unwrap_err();
    assert!(matches!(err, CalibrationError::MetadataUnavailable(_)));
}

#[tokio::test]
async fn malformed_scale_is_unavailable() {
    let client = client_for(spawn_metadata_host().await);
    let err = client.resolve("de_dust2", 2).await.unwrap_err();
    assert!(matches!(err, CalibrationError::MetadataUnavailable(_)));
}

#[tokio::test]
async fn document_without_entry_is_not_found() {
    let client = client_for(spawn_metadata_host().await);
    let err = client.resolve("de_mirage", 5).await.unwrap_err();
    assert!(matches!(err, CalibrationError::MapEntryNotFound(name) if name == "de_mirage"));
}

#[tokio::test]
async fn unreachable_host_is_unavailable() {
    // Bind then drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client_for(addr).resolve("de_dust2", 1).await.unwrap_err();
    assert!(matches!(err, CalibrationError::MetadataUnavailable(_)));
}

#[tokio::test]
async fn recorded_ingestion_end_to_end() {
    let client = client_for(spawn_metadata_host().await);
    let demo = JsonLinesDemo::new(Cursor::new(
        br#"{"type":"header","map_name":"de_dust2","map_crc":1}
{"type":"tick","tick":10,"participants":[{"name":"a","alive":true,"x":100.0,"y":200.0,"z":0.0}]}
{"type":"tick","tick":11,"participants":[{"name":"a","alive":false,"x":-2476.0,"y":3239.0,"z":0.0}]}
{"type":"end"}
"#
        .to_vec(),
    ));

    let ingested = ingest_recorded(demo, &client).await.unwrap();
    assert_eq!(ingested.header.map_crc, 1);
    assert_eq!(ingested.calibration.scale(), 4.4);
    assert_eq!(ingested.records.len(), 2);

    let first = &ingested.records[0];
    assert_eq!(first.tick, 10);
    assert!((first.players[0].position.x - 2576.0 / 4.4).abs() < 1e-9);
    assert!((first.players[0].position.y - 3039.0 / 4.4).abs() < 1e-9);

    let second = &ingested.records[1];
    assert!(!second.players[0].alive);
    assert_eq!(second.players[0].position.x, 0.0);
}

#[tokio::test]
async fn calibration_failure_aborts_ingestion() {
    let client = client_for(spawn_metadata_host().await);
    let demo = JsonLinesDemo::new(Cursor::new(
        b"{\"type\":\"header\",\"map_name\":\"de_dust2\",\"map_crc\":2}\n{\"type\":\"end\"}\n".to_vec(),
    ));
    let err = ingest_recorded(demo, &client).await.unwrap_err();
    assert!(matches!(err, IngestError::Calibration { .. }));
}

#[tokio::test]
async fn truncated_demo_aborts_ingestion() {
    let client = client_for(spawn_metadata_host().await);
    let demo = JsonLinesDemo::new(Cursor::new(
        b"{\"type\":\"header\",\"map_name\":\"de_dust2\",\"map_crc\":1}\n{\"type\":\"tick\",\"tick\":1}\n"
            .to_vec(),
    ));
    let err = ingest_recorded(demo, &client).await.unwrap_err();
    assert!(matches!(err, IngestError::Decode { .. }));
}
