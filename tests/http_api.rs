use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use base64::{prelude::BASE64_STANDARD, Engine};
use chrono::NaiveTime;
use image::{Rgb, RgbImage};
use serde_json::{json, Value};
use std::io::Cursor;
use std::sync::Arc;
use tower::ServiceExt;

use shelf_discount::{
    adapters::{
        discount::{knn::DiscountArtifact, model::KnnDiscountModel},
        http::{router, state::HttpState},
    },
    application::{
        ports::{ClockPort, DetectorPort},
        services::{CleaningParams, PredictionService},
    },
    domain::{
        detection::{BoundingBox, RawDetection},
        errors::DomainResult,
    },
};

struct ScriptedDetector(Vec<RawDetection>);

#[async_trait]
impl DetectorPort for ScriptedDetector {
    async fn detect(&self, _image: RgbImage) -> DomainResult<Vec<RawDetection>> {
        Ok(self.0.clone())
    }
}

struct FixedClock(NaiveTime);

impl ClockPort for FixedClock {
    fn time_of_day(&self) -> NaiveTime {
        self.0
    }
}

fn raw(entity: &str, score: f32) -> RawDetection {
    RawDetection {
        bbox: BoundingBox { y_min: 0.25, x_min: 0.5, y_max: 0.75, x_max: 1.0 },
        entity: entity.into(),
        score,
    }
}

/// Discount is 0.1 for an empty shelf and 0.5 for a full one, whatever the category.
fn discount_model() -> KnnDiscountModel {
    let artifact: DiscountArtifact = serde_json::from_value(json!({
        "label_encoder": { "classes": ["Bottle", "Clothing", "Drink", "Footwear", "Pen"] },
        "scaler": { "mean": [0.0, 0.0], "scale": [1000.0, 1.0] },
        "regressor": {
            "n_neighbors": 1,
            "weights": "uniform",
            "fit_x": [[0.0, 0.0], [0.0, 1000.0]],
            "fit_y": [0.1, 0.5]
        }
    }))
    .unwrap();
    KnnDiscountModel::from_artifact(artifact).unwrap()
}

const BODY_LIMIT: usize = 1024 * 1024;

fn app(detections: Vec<RawDetection>, time: NaiveTime) -> Router {
    let prediction = Arc::new(PredictionService::new(
        Arc::new(ScriptedDetector(detections)),
        Arc::new(discount_model()),
        Arc::new(FixedClock(time)),
        CleaningParams::default(),
    ));
    router(HttpState { prediction }, BODY_LIMIT)
}

fn jpeg_base64() -> String {
    let img = RgbImage::from_pixel(16, 12, Rgb([200, 120, 40]));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Jpeg).unwrap();
    BASE64_STANDARD.encode(buf)
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn predictions_are_filtered_and_priced() {
    let app = app(
        vec![raw("Bottle", 0.9), raw("Person", 0.95), raw("Pen", 0.1), raw("Clothing", 0.15)],
        NaiveTime::from_hms_opt(1, 0, 0).unwrap(),
    );

    let (status, body) = send(app, post_json("/predictions", json!({ "image": jpeg_base64() }))).await;

    assert_eq!(status, StatusCode::OK);
    let detections = body["detections"].as_array().unwrap();
    assert_eq!(detections.len(), 2);
    assert_eq!(detections[0]["class"], "Bottle");
    assert_eq!(detections[0]["label"], "Bottle");
    assert_eq!(detections[0]["cValue"], "15% off");
    assert_eq!(detections[0]["box"], json!({ "yMin": 0.25, "xMin": 0.5, "yMax": 0.75, "xMax": 1.0 }));
    assert_eq!(detections[0]["discount"], 0.1);
    assert_eq!(detections[1]["class"], "Clothing");
}

#[tokio::test]
async fn full_shelf_moves_to_the_other_neighbour() {
    // 23:00 -> Pen stock 958, nearer the full-shelf sample
    let app = app(vec![raw("Pen", 0.5)], NaiveTime::from_hms_opt(23, 0, 0).unwrap());
    let (status, body) = send(app, post_json("/predictions", json!({ "image": jpeg_base64() }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["detections"][0]["discount"], 0.5);
}

#[tokio::test]
async fn malformed_base64_is_a_bad_request() {
    let app = app(vec![], NaiveTime::from_hms_opt(9, 0, 0).unwrap());
    let (status, body) = send(app, post_json("/predictions", json!({ "image": "@@@" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("base64"));
}

#[tokio::test]
async fn missing_image_is_a_bad_request() {
    let app = app(vec![], NaiveTime::from_hms_opt(9, 0, 0).unwrap());
    let (status, _) = send(app, post_json("/predictions", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

fn nine_am() -> Router {
    app(vec![], NaiveTime::from_hms_opt(9, 0, 0).unwrap())
}

#[tokio::test]
async fn wrong_typed_image_is_a_bad_request() {
    let (status, body) = send(nine_am(), post_json("/predictions", json!({ "image": 5 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn non_json_body_is_a_bad_request() {
    let req = Request::builder()
        .method("POST")
        .uri("/predictions")
        .header("content-type", "application/json")
        .body(Body::from("not json"))
        .unwrap();
    let (status, body) = send(nine_am(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn missing_content_type_is_a_bad_request() {
    let req = Request::builder()
        .method("POST")
        .uri("/predictions")
        .body(Body::from(json!({ "image": jpeg_base64() }).to_string()))
        .unwrap();
    let (status, body) = send(nine_am(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn oversized_body_gets_json_413() {
    let image = "A".repeat(BODY_LIMIT + 16);
    let (status, body) = send(nine_am(), post_json("/predictions", json!({ "image": image }))).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(body["error"].as_str().unwrap().contains("too large"));
}

#[tokio::test]
async fn stock_endpoint_reports_snapshot() {
    let app = app(vec![], NaiveTime::from_hms_opt(12, 0, 0).unwrap());
    let req = Request::builder().uri("/api/stock").body(Body::empty()).unwrap();
    let (status, body) = send(app, req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stock"][0], json!({ "category": "Bottle", "max_stock": 100, "current": 50 }));
    assert_eq!(body["stock"][4]["current"], 250);
}

#[tokio::test]
async fn health_is_ok() {
    let app = app(vec![], NaiveTime::from_hms_opt(0, 0, 0).unwrap());
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true }));
}
