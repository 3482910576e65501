//! Cache-control handling through the public router.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, header::HOST};
use common::{SITE_HOST, gateway, permalink_key};
use facciata::application::site::SiteConfig;
use facciata::cache::InvalidationTarget;
use facciata::domain::response::{ResolvedContent, ResponseState};
use tower::ServiceExt;

fn cache_control(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/_cache")
        .header(HOST, SITE_HOST)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body collects");
    serde_json::from_slice(&bytes).expect("body is JSON")
}

fn seed(gw: &common::TestGateway, slug: &str) {
    gw.site.cache.put(
        permalink_key(slug),
        Arc::new(ResolvedContent {
            state: ResponseState::default(),
        }),
    );
}

fn short_window_config() -> SiteConfig {
    let mut config = SiteConfig::default();
    config.cache.invalidation_window_ms = 100;
    config
}

#[tokio::test(start_paused = true)]
async fn destroy_deletes_immediately_and_batches_the_purge() {
    let gw = gateway(short_window_config(), true);
    seed(&gw, "/news/launch");

    let response = gw
        .router
        .clone()
        .oneshot(cache_control(
            r#"{"cache":{"action":"destroy","params":{"type":"permalink","slug":"/news/launch"}}}"#,
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");

    // The entry is gone before the window elapses; the sink call is not.
    assert!(gw.site.cache.get(&permalink_key("/news/launch")).is_none());
    assert!(gw.sink.calls().is_empty());

    tokio::time::sleep(Duration::from_millis(150)).await;
    tokio::task::yield_now().await;

    let calls = gw.sink.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0],
        vec![InvalidationTarget::Path("/news/launch".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn burst_of_destroys_flushes_as_one_batch() {
    let gw = gateway(short_window_config(), true);

    for slug in ["/one", "/two", "/three"] {
        let body = format!(
            r#"{{"cache":{{"action":"destroy","params":{{"type":"permalink","slug":"{slug}"}}}}}}"#
        );
        gw.router
            .clone()
            .oneshot(cache_control(&body))
            .await
            .expect("router responds");
    }

    tokio::time::sleep(Duration::from_millis(150)).await;
    tokio::task::yield_now().await;

    let calls = gw.sink.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0],
        vec![
            InvalidationTarget::Path("/one".to_string()),
            InvalidationTarget::Path("/two".to_string()),
            InvalidationTarget::Path("/three".to_string()),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn flush_clears_the_cache_and_purges_everything_at_once() {
    let gw = gateway(short_window_config(), true);
    seed(&gw, "/news/launch");
    seed(&gw, "/about");

    // A pending destroy is discarded by the flush.
    gw.router
        .clone()
        .oneshot(cache_control(
            r#"{"cache":{"action":"destroy","params":{"type":"permalink","slug":"/about"}}}"#,
        ))
        .await
        .expect("router responds");

    let response = gw
        .router
        .clone()
        .oneshot(cache_control(r#"{"cache":{"action":"flush"}}"#))
        .await
        .expect("router responds");

    assert_eq!(body_json(response).await["status"], "ok");
    assert!(gw.site.cache.is_empty());

    let calls = gw.sink.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0], vec![InvalidationTarget::Everything]);

    // The discarded batch never reaches the sink.
    tokio::time::sleep(Duration::from_millis(150)).await;
    tokio::task::yield_now().await;
    assert_eq!(gw.sink.calls().len(), 1);
}

#[tokio::test]
async fn malformed_payload_is_rejected_without_side_effects() {
    let gw = gateway(short_window_config(), true);
    seed(&gw, "/news/launch");

    let response = gw
        .router
        .clone()
        .oneshot(cache_control("{}"))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["error"], "Invalid request");
    assert_eq!(gw.site.cache.len(), 1);
    assert!(gw.sink.calls().is_empty());
}

#[tokio::test]
async fn destroy_without_a_sink_only_touches_the_cache() {
    let gw = gateway(short_window_config(), false);
    seed(&gw, "/news/launch");

    let response = gw
        .router
        .clone()
        .oneshot(cache_control(
            r#"{"cache":{"action":"destroy","params":{"type":"permalink","slug":"/news/launch"}}}"#,
        ))
        .await
        .expect("router responds");

    assert_eq!(body_json(response).await["status"], "ok");
    assert!(gw.site.cache.is_empty());
    assert!(gw.sink.calls().is_empty());
}
