// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Tests for POST /predict
//!
//! These tests verify that the predict handler:
//! - Rejects requests before decode when the model is unavailable
//! - Maps each failure class to its HTTP status
//! - Returns detections in model output order with the fixed message

use axum::http::StatusCode;
use std::sync::Arc;

use fabstir_detect_node::api::predict::SUCCESS_MESSAGE;

use crate::common::{
    assert_error_detail, json_body, png_fixture, predict_request, sample_detection, send,
    state_unavailable, state_with_detector, FailingDetector, FixedDetector,
};

#[tokio::test]
async fn test_unavailable_model_returns_503() {
    let state = state_unavailable("weights file missing");

    let response = send(state, predict_request("file", "site.jpg", &png_fixture())).await;

    let detail = assert_error_detail(response, StatusCode::SERVICE_UNAVAILABLE).await;
    assert!(detail.contains("weights file missing"));
}

#[tokio::test]
async fn test_availability_check_precedes_decode() {
    // Garbage bytes would be a 400 if decode ran; the unavailable model
    // must win with a 503
    let state = state_unavailable("weights file missing");

    let response = send(state, predict_request("file", "junk.bin", b"not an image")).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_undecodable_image_returns_400() {
    let state = state_with_detector(Arc::new(FixedDetector { detections: vec![] }));

    let response = send(state, predict_request("file", "junk.bin", b"not an image")).await;

    let detail = assert_error_detail(response, StatusCode::BAD_REQUEST).await;
    assert!(detail.contains("Image processing error"));
}

#[tokio::test]
async fn test_truncated_image_returns_400_not_500() {
    let state = state_with_detector(Arc::new(FixedDetector { detections: vec![] }));

    // Valid PNG magic, truncated data
    let response = send(
        state,
        predict_request("file", "broken.png", &[0x89, 0x50, 0x4E, 0x47, 0x00, 0x00]),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_empty_upload_returns_400() {
    let state = state_with_detector(Arc::new(FixedDetector { detections: vec![] }));

    let response = send(state, predict_request("file", "empty.png", b"")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_file_field_returns_400() {
    let state = state_with_detector(Arc::new(FixedDetector { detections: vec![] }));

    let response = send(state, predict_request("other", "site.jpg", &png_fixture())).await;

    let detail = assert_error_detail(response, StatusCode::BAD_REQUEST).await;
    assert!(detail.contains("file"));
}

#[tokio::test]
async fn test_inference_failure_returns_500() {
    let state = state_with_detector(Arc::new(FailingDetector));

    let response = send(state, predict_request("file", "site.jpg", &png_fixture())).await;

    let detail = assert_error_detail(response, StatusCode::INTERNAL_SERVER_ERROR).await;
    assert!(detail.contains("unsupported input shape"));
}

#[tokio::test]
async fn test_successful_prediction_shape() {
    let detections = vec![
        sample_detection("helmet", 0.91),
        sample_detection("head", 0.44),
    ];
    let state = state_with_detector(Arc::new(FixedDetector { detections }));
    let payload = png_fixture();

    let response = send(state, predict_request("file", "site.jpg", &payload)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["filename"], "site.jpg");
    assert_eq!(body["file_size"], payload.len() as u64);
    assert_eq!(body["message"], SUCCESS_MESSAGE);

    let detections = body["detections"].as_array().unwrap();
    assert_eq!(detections.len(), 2);

    // Model output order preserved, not confidence-sorted by the endpoint
    assert_eq!(detections[0]["class_name"], "helmet");
    assert_eq!(detections[1]["class_name"], "head");

    let bbox = &detections[0]["bbox"];
    assert_eq!(bbox["x1"], 10.0);
    assert_eq!(bbox["y1"], 20.0);
    assert_eq!(bbox["x2"], 110.0);
    assert_eq!(bbox["y2"], 95.0);
}

#[tokio::test]
async fn test_empty_detections_still_succeed() {
    let state = state_with_detector(Arc::new(FixedDetector { detections: vec![] }));

    let response = send(state, predict_request("file", "empty.jpg", &png_fixture())).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["detections"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_identical_uploads_yield_identical_detections() {
    let detections = vec![sample_detection("helmet", 0.77)];
    let detector: Arc<dyn fabstir_detect_node::vision::Detector> =
        Arc::new(FixedDetector { detections });
    let payload = png_fixture();

    let first = send(
        state_with_detector(detector.clone()),
        predict_request("file", "same.png", &payload),
    )
    .await;
    let second = send(
        state_with_detector(detector),
        predict_request("file", "same.png", &payload),
    )
    .await;

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::OK);

    let first_body = json_body(first).await;
    let second_body = json_body(second).await;
    assert_eq!(first_body, second_body);
}

#[tokio::test]
async fn test_filename_echoed_as_received() {
    let state = state_with_detector(Arc::new(FixedDetector { detections: vec![] }));

    let response = send(
        state,
        predict_request("file", "Weird Name (1).JPG", &png_fixture()),
    )
    .await;

    let body = json_body(response).await;
    assert_eq!(body["filename"], "Weird Name (1).JPG");
}
