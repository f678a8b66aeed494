//! Integration tests for the API server.

use std::sync::OnceLock;

use api::config::Config;
use api::Workers;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::ShowtimeId;
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

async fn setup() -> (axum::Router, Workers, ShowtimeId) {
    let config = Config::default();
    let (state, workers, showtime_id) = api::create_default_state(&config).await;
    let app = api::create_app(state, get_metrics_handle());
    (app, workers, showtime_id)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn get_document(app: &axum::Router, showtime_id: ShowtimeId) -> serde_json::Value {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/showtimes/{showtime_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

fn reserve_request(showtime_id: ShowtimeId, seat_ids: &[&str]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/reservations")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::to_string(&serde_json::json!({
                "showtime_id": showtime_id.to_string(),
                "seat_ids": seat_ids,
            }))
            .unwrap(),
        ))
        .unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let (app, _, _) = setup().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "api");
}

#[tokio::test]
async fn test_seeded_showtime_document() {
    let (app, _, showtime_id) = setup().await;

    let document = get_document(&app, showtime_id).await;
    assert_eq!(document["id"], showtime_id.to_string());
    assert_eq!(document["seats"].as_array().unwrap().len(), 40);
    assert!(document["seats"]
        .as_array()
        .unwrap()
        .iter()
        .all(|s| s["status"] == "Available"));
}

#[tokio::test]
async fn test_unknown_showtime_is_404() {
    let (app, _, _) = setup().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/showtimes/{}", ShowtimeId::new()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reserve_seats() {
    let (app, _, showtime_id) = setup().await;

    let document = get_document(&app, showtime_id).await;
    let seats = document["seats"].as_array().unwrap();
    let wanted = [
        seats[0]["seat_id"].as_str().unwrap(),
        seats[1]["seat_id"].as_str().unwrap(),
    ];

    let response = app
        .oneshot(reserve_request(showtime_id, &wanted))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["reservation_id"].as_str().is_some());
    assert_eq!(json["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_contended_seats_conflict() {
    let (app, _, showtime_id) = setup().await;

    let document = get_document(&app, showtime_id).await;
    let seats = document["seats"].as_array().unwrap();
    let wanted = [seats[0]["seat_id"].as_str().unwrap()];

    let first = app
        .clone()
        .oneshot(reserve_request(showtime_id, &wanted))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .oneshot(reserve_request(showtime_id, &wanted))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_empty_seat_list_is_bad_request() {
    let (app, _, showtime_id) = setup().await;

    let response = app
        .oneshot(reserve_request(showtime_id, &[]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("no seats"));
}

#[tokio::test]
async fn test_unknown_seat_is_bad_request() {
    let (app, _, showtime_id) = setup().await;

    let bogus = uuid::Uuid::new_v4().to_string();
    let response = app
        .oneshot(reserve_request(showtime_id, &[bogus.as_str()]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reservation_flows_into_the_read_model() {
    let (app, mut workers, showtime_id) = setup().await;

    let document = get_document(&app, showtime_id).await;
    let seats = document["seats"].as_array().unwrap();
    let wanted = [
        seats[0]["seat_id"].as_str().unwrap(),
        seats[1]["seat_id"].as_str().unwrap(),
    ];

    let response = app
        .clone()
        .oneshot(reserve_request(showtime_id, &wanted))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Drive the pipeline by hand: outbox to broker, broker to projection.
    assert_eq!(workers.relay.relay_once().await.unwrap(), 1);
    let event = workers.events.recv().await.unwrap();
    workers.processor.process_event(&event).await;

    let document = get_document(&app, showtime_id).await;
    let reserved: Vec<_> = document["seats"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|s| s["status"] == "Reserved")
        .collect();
    assert_eq!(reserved.len(), 2);
    assert!(reserved.iter().all(|s| !s["reserver_id"].is_null()));
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _, _) = setup().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
