// Integration tests for the HTTP live source
//
// Tests cover:
// - Live room snapshot and room identity endpoints
// - User identity lookup, including rate-limit responses
// - Known persona list fetch and failure

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vup_tracker::config::config::{AppConfig, UpstreamConfig};
use vup_tracker::error::AppError;
use vup_tracker::models::live::ROLE_UNKNOWN;
use vup_tracker::observability::Metrics;
use vup_tracker::services::{CacheKeys, JobContext, Reconciler};
use vup_tracker::storage::{MemoryCacheStore, MemoryPersonaRepository};
use vup_tracker::upstream::{HttpLiveSource, LiveSource};

fn config(server: &MockServer) -> UpstreamConfig {
    UpstreamConfig {
        listening_url: server.uri(),
        user_info_url: format!("{}/x/space/acc/info", server.uri()),
        vup_list_url: format!("{}/vup_list.json", server.uri()),
        ..AppConfig::development().upstream
    }
}

#[tokio::test]
async fn test_live_rooms() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/listening"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_listening_count": 3,
            "rooms": [10, 11, 12]
        })))
        .mount(&server)
        .await;

    let source = HttpLiveSource::new(&config(&server)).unwrap();
    assert_eq!(source.live_rooms().await.unwrap(), vec![10, 11, 12]);
}

#[tokio::test]
async fn test_live_rooms_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/listening"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let source = HttpLiveSource::new(&config(&server)).unwrap();
    assert!(matches!(
        source.live_rooms().await,
        Err(AppError::Upstream(_))
    ));
}

#[tokio::test]
async fn test_room_identity() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/listening/10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "room_id": 10,
            "uid": 100,
            "name": "streamer",
            "user_face": "https://face/100.png",
            "user_description": "hello",
            "official_role": 1
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/listening/11"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "room_id": 11,
            "uid": 101,
            "name": "no role"
        })))
        .mount(&server)
        .await;

    let source = HttpLiveSource::new(&config(&server)).unwrap();

    let identity = source.room_identity(10).await.unwrap();
    assert_eq!(identity.uid, 100);
    assert_eq!(identity.official_role, 1);
    assert_eq!(identity.user_description, "hello");

    let identity = source.room_identity(11).await.unwrap();
    assert_eq!(identity.official_role, ROLE_UNKNOWN);
    assert!(!identity.role_declared());
}

#[tokio::test]
async fn test_lookup_identity() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/x/space/acc/info"))
        .and(query_param("mid", "101"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "message": "0",
            "data": { "mid": 101, "official": { "role": 2, "title": "vup", "type": 0 } }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/x/space/acc/info"))
        .and(query_param("mid", "102"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "message": "0",
            "data": { "mid": 102, "official": { "role": 3, "title": "agency", "type": 1 } }
        })))
        .mount(&server)
        .await;

    let source = HttpLiveSource::new(&config(&server)).unwrap();

    let lookup = source.lookup_identity(101).await.unwrap();
    assert_eq!(lookup.code, 0);
    assert_eq!(lookup.role, 2);
    assert!(!lookup.org_certified);

    let lookup = source.lookup_identity(102).await.unwrap();
    assert!(lookup.org_certified);
}

#[tokio::test]
async fn test_lookup_identity_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/x/space/acc/info"))
        .and(query_param("mid", "201"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": -412,
            "message": "请求被拦截",
            "data": null
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/x/space/acc/info"))
        .and(query_param("mid", "202"))
        .respond_with(ResponseTemplate::new(412))
        .mount(&server)
        .await;

    let source = HttpLiveSource::new(&config(&server)).unwrap();

    let lookup = source.lookup_identity(201).await.unwrap();
    assert_eq!(lookup.code, -412);
    assert!(!lookup.rate_limited);

    let lookup = source.lookup_identity(202).await.unwrap();
    assert_eq!(lookup.code, -412);
    assert!(lookup.rate_limited);
}

#[tokio::test]
async fn test_http_412_defers_with_custom_rate_limit_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/listening"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_listening_count": 1,
            "rooms": [11]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/listening/11"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "room_id": 11,
            "uid": 101,
            "name": "no role",
            "official_role": -1
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/x/space/acc/info"))
        .respond_with(ResponseTemplate::new(412))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/vup_list.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let mut discovery = AppConfig::development().discovery;
    discovery.rate_limit_code = -352;
    let reconciler = Reconciler::new(
        Arc::new(HttpLiveSource::new(&config(&server)).unwrap()),
        Arc::new(MemoryPersonaRepository::new()),
        Arc::new(MemoryCacheStore::new()),
        CacheKeys::default(),
        &discovery,
        Arc::new(Metrics::new().unwrap()),
    );
    let ctx = JobContext::new(CancellationToken::new(), Duration::from_secs(10));

    let report = reconciler.discover(&ctx).await.unwrap();
    assert_eq!(report.deferred, 1);
    assert_eq!(report.not_tracked, 0);
    assert!(reconciler.cooldown().has(101));

    // cooling down, so the second pass must not hit user-info again
    reconciler.discover(&ctx).await.unwrap();
}

#[tokio::test]
async fn test_known_personas() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vup_list.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "100": { "name": "listed", "room_id": 10 },
            "101": { "name": "no room" }
        })))
        .mount(&server)
        .await;

    let source = HttpLiveSource::new(&config(&server)).unwrap();
    let known = source.known_personas().await.unwrap();
    assert_eq!(known.len(), 2);
    assert_eq!(known["100"].room_id, Some(10));
    assert_eq!(known["101"].room_id, None);
}

#[tokio::test]
async fn test_known_personas_tolerates_malformed_entries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vup_list.json"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"100":{"name":null,"room_id":10},"101":{"name":"x","room_id":"11"}}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let source = HttpLiveSource::new(&config(&server)).unwrap();
    let known = source.known_personas().await.unwrap();
    assert_eq!(known.len(), 2);
    assert!(known["100"].name.is_empty());
    assert_eq!(known["100"].room_id, Some(10));
    assert_eq!(known["101"].room_id, Some(11));
}

#[tokio::test]
async fn test_known_personas_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vup_list.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let source = HttpLiveSource::new(&config(&server)).unwrap();
    assert!(source.known_personas().await.is_err());

    let unset = HttpLiveSource::new(&UpstreamConfig {
        vup_list_url: String::new(),
        ..config(&server)
    })
    .unwrap();
    assert!(unset.known_personas().await.unwrap().is_empty());
}
