// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Shared helpers for API tests

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, Response, StatusCode};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::DynamicImage;
use std::sync::Arc;

use fabstir_detect_node::api::{router, AppState};
use fabstir_detect_node::config::ServiceConfig;
use fabstir_detect_node::vision::{Detection, Detector, ModelState};

// 1x1 red PNG image (base64)
const TINY_PNG_BASE64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8DwHwAFBQIAX8jx0gAAAABJRU5ErkJggg==";

pub const BOUNDARY: &str = "test-boundary-0001";

/// A detector that always returns the same detections
pub struct FixedDetector {
    pub detections: Vec<Detection>,
}

impl Detector for FixedDetector {
    fn detect(&self, _image: &DynamicImage) -> Result<Vec<Detection>> {
        Ok(self.detections.clone())
    }
}

/// A detector that always fails, simulating a broken model call
pub struct FailingDetector;

impl Detector for FailingDetector {
    fn detect(&self, _image: &DynamicImage) -> Result<Vec<Detection>> {
        anyhow::bail!("unsupported input shape")
    }
}

pub fn sample_detection(class_name: &str, confidence: f32) -> Detection {
    Detection {
        class_id: 0,
        class_name: class_name.to_string(),
        confidence,
        x1: 10.0,
        y1: 20.0,
        x2: 110.0,
        y2: 95.0,
    }
}

pub fn state_with_detector(detector: Arc<dyn Detector>) -> AppState {
    AppState::new(ModelState::Loaded(detector), ServiceConfig::default())
}

pub fn state_unavailable(reason: &str) -> AppState {
    AppState::new(
        ModelState::Unavailable {
            reason: reason.to_string(),
        },
        ServiceConfig::default(),
    )
}

pub fn png_fixture() -> Vec<u8> {
    STANDARD.decode(TINY_PNG_BASE64).unwrap()
}

/// Build a multipart/form-data body with one field
pub fn multipart_body(field_name: &str, filename: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field_name}\"; \
             filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn predict_request(field_name: &str, filename: &str, bytes: &[u8]) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/predict")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(field_name, filename, bytes)))
        .unwrap()
}

pub fn root_request() -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri("/")
        .body(Body::empty())
        .unwrap()
}

pub async fn send(state: AppState, request: Request<Body>) -> Response<Body> {
    use tower::ServiceExt;
    router(state).oneshot(request).await.unwrap()
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn assert_error_detail(
    response: Response<Body>,
    expected_status: StatusCode,
) -> String {
    assert_eq!(response.status(), expected_status);
    let body = json_body(response).await;
    body["detail"]
        .as_str()
        .expect("error body must carry a detail string")
        .to_string()
}
