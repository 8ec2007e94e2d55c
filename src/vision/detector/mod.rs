// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Object detection model wrapper
//!
//! The `Detector` trait is the seam between the HTTP layer and the model:
//! request handlers only ever see detections, so tests can substitute a
//! fixed-output implementation for the real ONNX session.

pub mod model;
pub mod postprocessing;
pub mod preprocessing;

use anyhow::Result;
use image::DynamicImage;

pub use model::YoloDetector;
pub use preprocessing::LetterboxInfo;

/// Fallback label for class ids missing from the model's mapping
pub const UNKNOWN_CLASS: &str = "unknown";

/// One detected object instance
///
/// Coordinates are corners `(x1, y1, x2, y2)` in the pixel space of the
/// normalized (upright RGB) input image.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Class index reported by the model
    pub class_id: usize,
    /// Human-readable class name, `"unknown"` when unmapped
    pub class_name: String,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

/// Detection model interface
///
/// Implementations must be safe to share across concurrent requests; the
/// ONNX-backed implementation serializes session access internally.
pub trait Detector: Send + Sync {
    /// Run detection on a normalized image
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>>;
}
