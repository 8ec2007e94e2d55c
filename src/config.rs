// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Service configuration parsed from environment variables

use std::env;
use std::path::PathBuf;

/// Default confidence threshold, matching the model's training configuration
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;

/// Default IoU threshold for non-max suppression
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.45;

/// Configuration for the detection service
///
/// Every value has a fixed default; environment variables override them.
/// The inference resolution is left unset by default so the model's own
/// training resolution (read from its metadata) wins.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// HTTP listen port
    pub api_port: u16,
    /// Path to the ONNX detection model weights
    pub model_path: PathBuf,
    /// Inclusive confidence floor for reported detections
    pub confidence_threshold: f32,
    /// IoU threshold used by non-max suppression
    pub iou_threshold: f32,
    /// Square inference resolution override (model metadata wins when unset)
    pub input_size: Option<u32>,
    /// Fixed path for the debug image capture (disabled when unset)
    pub debug_capture_path: Option<PathBuf>,
    /// Directory for annotated result images (disabled when unset)
    pub annotated_output_dir: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_port: 8000,
            model_path: PathBuf::from("./models/best.onnx"),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            input_size: None,
            debug_capture_path: None,
            annotated_output_dir: None,
        }
    }
}

impl ServiceConfig {
    /// Build a configuration from environment variables, falling back to
    /// the defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let api_port = env::var("API_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(defaults.api_port);

        let model_path = env::var("MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.model_path);

        let confidence_threshold = env::var("CONFIDENCE_THRESHOLD")
            .ok()
            .and_then(|v| v.parse::<f32>().ok())
            .unwrap_or(defaults.confidence_threshold);

        let iou_threshold = env::var("IOU_THRESHOLD")
            .ok()
            .and_then(|v| v.parse::<f32>().ok())
            .unwrap_or(defaults.iou_threshold);

        let input_size = env::var("INPUT_SIZE")
            .ok()
            .and_then(|v| v.parse::<u32>().ok());

        let debug_capture_path = env::var("DEBUG_CAPTURE_PATH").ok().map(PathBuf::from);

        let annotated_output_dir = env::var("ANNOTATED_OUTPUT_DIR").ok().map(PathBuf::from);

        Self {
            api_port,
            model_path,
            confidence_threshold,
            iou_threshold,
            input_size,
            debug_capture_path,
            annotated_output_dir,
        }
    }
}
