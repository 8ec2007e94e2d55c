// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Prediction response types

use serde::{Deserialize, Serialize};

use crate::vision::Detection;

/// Fixed success message
pub const SUCCESS_MESSAGE: &str = "Helmet detection complete";

/// Bounding box corners in pixel space of the normalized input image
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

/// One detected object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Human-readable class name
    pub class_name: String,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
    /// Box location
    pub bbox: BoundingBox,
}

impl From<Detection> for DetectionResult {
    fn from(detection: Detection) -> Self {
        Self {
            class_name: detection.class_name,
            confidence: detection.confidence,
            bbox: BoundingBox {
                x1: detection.x1,
                y1: detection.y1,
                x2: detection.x2,
                y2: detection.y2,
            },
        }
    }
}

/// Response from `POST /predict`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    /// Client-supplied filename, echoed as received
    pub filename: String,
    /// Byte size of the uploaded payload
    pub file_size: u64,
    /// Detections in model output order
    pub detections: Vec<DetectionResult>,
    /// Fixed success message
    pub message: String,
}

impl PredictionResponse {
    pub fn new(filename: String, file_size: u64, detections: Vec<Detection>) -> Self {
        Self {
            filename,
            file_size,
            detections: detections.into_iter().map(DetectionResult::from).collect(),
            message: SUCCESS_MESSAGE.to_string(),
        }
    }
}
