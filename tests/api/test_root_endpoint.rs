// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Tests for GET /

use axum::http::StatusCode;
use std::sync::Arc;

use fabstir_detect_node::api::WELCOME_MESSAGE;

use crate::common::{json_body, root_request, send, state_unavailable, state_with_detector, FixedDetector};

#[tokio::test]
async fn test_root_returns_welcome() {
    let state = state_with_detector(Arc::new(FixedDetector { detections: vec![] }));

    let response = send(state, root_request()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["message"], WELCOME_MESSAGE);
}

#[tokio::test]
async fn test_root_unaffected_by_model_state() {
    let state = state_unavailable("weights file missing");

    let response = send(state, root_request()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["message"], WELCOME_MESSAGE);
}
