//! API integration tests for the create endpoint, tile retrieval and health.
//!
//! Tests verify:
//! - A full split: manifest, stored files, sidecars and static retrieval
//! - Validation errors and their status codes
//! - Processing errors (fetch, decode, geometry)
//! - JSON, urlencoded and multipart bodies

use axum::http::StatusCode;
use chrono::{DateTime, TimeDelta, Utc};
use serde_json::json;

use grid_splitter::{ExpiryRecord, RouterConfig};

use super::test_utils::{
    body_bytes, body_json, encode, form_request, gradient_image, json_request, multipart_request,
    quadrant_png, MockFetcher, TestApp, BLUE, GREEN, RED, YELLOW,
};

const IMAGE_URL: &str = "https://images.example.com/quadrants.png";

fn app_with_quadrants() -> TestApp {
    TestApp::new(MockFetcher::new().with_image(IMAGE_URL, quadrant_png(100)))
}

fn is_tile_filename(name: &str, column: u32, row: u32, ext: &str) -> bool {
    let Some(rest) = name.strip_prefix("split_") else {
        return false;
    };
    let suffix = format!("_{}_{}.{}", column, row, ext);
    match rest.strip_suffix(&suffix) {
        Some(millis) => !millis.is_empty() && millis.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

// =============================================================================
// Successful Splits
// =============================================================================

#[tokio::test]
async fn test_split_end_to_end() {
    let app = app_with_quadrants();

    let response = app
        .send(json_request(json!({
            "imageUrl": IMAGE_URL,
            "grid": "2x2",
            "expiresInDays": 1
        })))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["grid"], "2x2");
    assert_eq!(body["tilesCount"], 4);
    assert_eq!(body["expiresInDays"], json!(1));
    assert_eq!(body["originalFormat"], "png");
    assert_eq!(body["baseUrl"], "http://localhost:3000");

    let session_id = body["sessionId"].as_str().unwrap();
    assert!(session_id.starts_with("split_"));

    let tiles = body["tiles"].as_array().unwrap();
    assert_eq!(tiles.len(), 4);

    let expected = [(0, 0, RED), (1, 0, GREEN), (0, 1, BLUE), (1, 1, YELLOW)];
    for (tile, (x, y, colour)) in tiles.iter().zip(expected) {
        let filename = tile["filename"].as_str().unwrap();
        assert!(is_tile_filename(filename, x, y, "png"), "unexpected filename {}", filename);
        assert!(filename.starts_with(session_id));
        assert_eq!(tile["position"]["x"], x);
        assert_eq!(tile["position"]["y"], y);
        assert_eq!(tile["format"], "png");

        let url = tile["url"].as_str().unwrap();
        assert_eq!(url, format!("/images/{}", filename));

        // Reachable at its url, with the right size and quadrant colour
        let response = app.get(url).await;
        assert_eq!(response.status(), StatusCode::OK);
        let data = body_bytes(response).await;
        let decoded = image::load_from_memory(&data).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (50, 50));
        assert_eq!(*decoded.get_pixel(25, 25), colour);

        // Sidecar holds a one-day window
        let sidecar = std::fs::read(app.root().join(format!("{}.info", filename))).unwrap();
        let record = ExpiryRecord::from_json(&sidecar).unwrap();
        assert_eq!(record.format, "png");
        assert_eq!(record.expires_at - record.created_at, TimeDelta::hours(24));
    }

    assert_eq!(app.files().len(), 8);
    assert_eq!(app.fetcher.request_count(), 1);
}

#[tokio::test]
async fn test_split_reports_expiry_timestamp() {
    let app = app_with_quadrants();
    let before = Utc::now();

    let response = app
        .send(json_request(json!({
            "imageUrl": IMAGE_URL,
            "grid": "1x1",
            "expiresInDays": "0.5"
        })))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["expiresInDays"], 0.5);

    let expires_at: DateTime<Utc> = body["expiresAt"].as_str().unwrap().parse().unwrap();
    let window = expires_at - before;
    assert!(window > TimeDelta::hours(11));
    assert!(window < TimeDelta::hours(13));
}

#[tokio::test]
async fn test_split_uneven_dimensions() {
    let source = encode(&gradient_image(103, 47), image::ImageFormat::Png);
    let app = TestApp::new(MockFetcher::new().with_image(IMAGE_URL, source));

    let response = app
        .send(json_request(json!({ "imageUrl": IMAGE_URL, "grid": "3x2" })))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["tilesCount"], 6);

    for tile in body["tiles"].as_array().unwrap() {
        let data = std::fs::read(app.root().join(tile["filename"].as_str().unwrap())).unwrap();
        let decoded = image::load_from_memory(&data).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (34, 23));
    }
}

#[tokio::test]
async fn test_split_normalizes_grid() {
    let app = app_with_quadrants();

    let response = app
        .send(json_request(json!({ "imageUrl": IMAGE_URL, "grid": "02x01" })))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["grid"], "2x1");
    assert_eq!(body["tilesCount"], 2);
}

#[tokio::test]
async fn test_split_form_body() {
    let app = app_with_quadrants();

    let body = format!(
        "imageUrl={}&grid=2x1&expiresInDays=2",
        "https%3A%2F%2Fimages.example.com%2Fquadrants.png"
    );
    let response = app.send(form_request(&body)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["tilesCount"], 2);
    assert_eq!(body["expiresInDays"], json!(2));
}

#[tokio::test]
async fn test_split_multipart_body() {
    let app = app_with_quadrants();

    let response = app
        .send(multipart_request(&[
            ("imageUrl", IMAGE_URL),
            ("grid", "1x2"),
            ("expiresInDays", "3"),
        ]))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["tilesCount"], 2);
    assert_eq!(body["expiresInDays"], json!(3));
}

#[tokio::test]
async fn test_split_configured_base_url() {
    let app = TestApp::with_config(
        MockFetcher::new().with_image(IMAGE_URL, quadrant_png(10)),
        RouterConfig::new()
            .with_tracing(false)
            .with_base_url("https://tiles.example.com"),
    );

    let response = app
        .send(json_request(json!({ "imageUrl": IMAGE_URL, "grid": "1x1" })))
        .await;
    let body = body_json(response).await;
    assert_eq!(body["baseUrl"], "https://tiles.example.com");
}

// =============================================================================
// Validation Errors
// =============================================================================

async fn assert_invalid(app: &TestApp, body: serde_json::Value, field: Option<&str>) {
    let response = app.send(json_request(body.clone())).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {}", body);

    let json = body_json(response).await;
    assert_eq!(json["error"], "invalid_request");
    assert_eq!(json["status"], 400);
    assert!(!json["message"].as_str().unwrap().is_empty());
    match field {
        Some(field) => assert_eq!(json["field"], field),
        None => assert!(json.get("field").is_none()),
    }
}

#[tokio::test]
async fn test_grid_out_of_range() {
    let app = app_with_quadrants();
    assert_invalid(&app, json!({ "imageUrl": IMAGE_URL, "grid": "11x1" }), Some("grid")).await;
    assert_invalid(&app, json!({ "imageUrl": IMAGE_URL, "grid": "0x1" }), Some("grid")).await;
    assert_invalid(&app, json!({ "imageUrl": IMAGE_URL, "grid": "1x11" }), Some("grid")).await;
}

#[tokio::test]
async fn test_grid_malformed() {
    let app = app_with_quadrants();
    for grid in ["", "2", "2by2", "x2", "2x", "-1x2", "2x2x2", " 2x2"] {
        assert_invalid(&app, json!({ "imageUrl": IMAGE_URL, "grid": grid }), Some("grid")).await;
    }
    assert_invalid(&app, json!({ "imageUrl": IMAGE_URL }), Some("grid")).await;
}

#[tokio::test]
async fn test_missing_image_url() {
    let app = app_with_quadrants();
    assert_invalid(&app, json!({ "grid": "2x2" }), Some("imageUrl")).await;
    assert_invalid(&app, json!({ "imageUrl": "", "grid": "2x2" }), Some("imageUrl")).await;
}

#[tokio::test]
async fn test_invalid_expiry() {
    let app = app_with_quadrants();
    for days in [json!(-1), json!("-0.5"), json!("tomorrow")] {
        assert_invalid(
            &app,
            json!({ "imageUrl": IMAGE_URL, "grid": "2x2", "expiresInDays": days }),
            Some("expiresInDays"),
        )
        .await;
    }
}

#[tokio::test]
async fn test_validation_happens_before_fetch() {
    let app = app_with_quadrants();
    assert_invalid(&app, json!({ "imageUrl": IMAGE_URL, "grid": "11x11" }), Some("grid")).await;
    assert_eq!(app.fetcher.request_count(), 0);
    assert!(app.files().is_empty());
}

#[tokio::test]
async fn test_malformed_bodies() {
    let app = app_with_quadrants();

    let response = app
        .send(
            axum::http::Request::builder()
                .method("POST")
                .uri("/api/split-image")
                .header("content-type", "application/json")
                .body(axum::body::Body::from("{not json"))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_request");

    let response = app
        .send(
            axum::http::Request::builder()
                .method("POST")
                .uri("/api/split-image")
                .header("content-type", "text/plain")
                .body(axum::body::Body::from("imageUrl"))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Processing Errors
// =============================================================================

#[tokio::test]
async fn test_fetch_failure() {
    let app = app_with_quadrants();

    let response = app
        .send(json_request(json!({
            "imageUrl": "https://images.example.com/missing.png",
            "grid": "2x2"
        })))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let body = body_json(response).await;
    assert_eq!(body["error"], "fetch_error");
    assert!(body["message"].as_str().unwrap().contains("404"));
    assert!(app.files().is_empty());
}

#[tokio::test]
async fn test_decode_failure() {
    let app = TestApp::new(MockFetcher::new().with_image(IMAGE_URL, &b"<html>not an image</html>"[..]));

    let response = app
        .send(json_request(json!({ "imageUrl": IMAGE_URL, "grid": "2x2" })))
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "decode_error");
    assert!(app.files().is_empty());
}

#[tokio::test]
async fn test_grid_finer_than_image() {
    let app = TestApp::new(MockFetcher::new().with_image(IMAGE_URL, quadrant_png(1)));

    let response = app
        .send(json_request(json!({ "imageUrl": IMAGE_URL, "grid": "2x2" })))
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert_eq!(body["error"], "geometry_error");
    assert_eq!(body["status"], 500);
    assert!(app.files().is_empty());
}

// =============================================================================
// Static Retrieval and Health
// =============================================================================

#[tokio::test]
async fn test_unknown_tile_is_not_found() {
    let app = app_with_quadrants();
    let response = app.get("/images/split_1_0_0.png").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health() {
    let app = app_with_quadrants();

    let response = app.get("/api/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    let timestamp: Result<DateTime<Utc>, _> = body["timestamp"].as_str().unwrap().parse();
    assert!(timestamp.is_ok());
}
