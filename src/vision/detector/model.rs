// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ONNX-backed detection model
//!
//! Loads an exported detection model and its embedded metadata (class name
//! mapping, training resolution) and runs inference on CPU.

use anyhow::{Context, Result};
use image::DynamicImage;
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::postprocessing::decode_predictions;
use super::preprocessing::{image_to_tensor, letterbox, LetterboxInfo, DEFAULT_INPUT_SIZE};
use super::{Detection, Detector};

/// Object detection model backed by an ONNX Runtime session
///
/// The session is not assumed safe for concurrent invocation; inference
/// calls are serialized behind a single lock. Everything else is read-only
/// after construction.
pub struct YoloDetector {
    /// ONNX Runtime session (inference serialized)
    session: Arc<Mutex<Session>>,
    /// Model input name
    input_name: String,
    /// Class id to name mapping from the model metadata
    names: HashMap<usize, String>,
    /// Square inference resolution
    input_size: u32,
    /// Inclusive confidence floor
    confidence_threshold: f32,
    /// NMS overlap threshold
    iou_threshold: f32,
}

impl std::fmt::Debug for YoloDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoloDetector")
            .field("input_name", &self.input_name)
            .field("num_classes", &self.names.len())
            .field("input_size", &self.input_size)
            .field("confidence_threshold", &self.confidence_threshold)
            .field("iou_threshold", &self.iou_threshold)
            .finish_non_exhaustive()
    }
}

impl YoloDetector {
    /// Load the detection model from a file
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - ONNX Runtime initialization fails
    pub async fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("Detection model not found: {}", model_path.display());
        }

        info!("Loading detection model from {}", model_path.display());

        // CPU-only execution
        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(4)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load detection model from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        // Class names and training resolution travel in the export metadata
        let (names, metadata_size) = match session.metadata() {
            Ok(metadata) => {
                let names = metadata
                    .custom("names")
                    .ok()
                    .flatten()
                    .map(|raw| parse_names(&raw))
                    .unwrap_or_default();
                let size = metadata
                    .custom("imgsz")
                    .ok()
                    .flatten()
                    .and_then(|raw| parse_imgsz(&raw));
                (names, size)
            }
            Err(_) => (HashMap::new(), None),
        };

        let input_size = metadata_size.unwrap_or(DEFAULT_INPUT_SIZE);

        debug!(
            "Detection model loaded - input: {}, classes: {}, imgsz: {}",
            input_name,
            names.len(),
            input_size
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            names,
            input_size,
            confidence_threshold: 0.25,
            iou_threshold: 0.45,
        })
    }

    /// Set the inclusive confidence threshold for detections
    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Set the NMS IoU threshold
    pub fn with_iou_threshold(mut self, threshold: f32) -> Self {
        self.iou_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Override the inference resolution
    ///
    /// Mismatching the training resolution silently degrades accuracy, so
    /// the metadata value should normally be left in charge.
    pub fn with_input_size(mut self, size: u32) -> Self {
        self.input_size = size.max(32);
        self
    }

    /// Get the class id to name mapping
    pub fn class_names(&self) -> &HashMap<usize, String> {
        &self.names
    }

    /// Get current confidence threshold
    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    /// Get the inference resolution
    pub fn input_size(&self) -> u32 {
        self.input_size
    }
}

impl Detector for YoloDetector {
    /// Run detection on a normalized image
    ///
    /// Letterboxes to the inference resolution, runs the session and decodes
    /// boxes back into the image's pixel space.
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>> {
        let transform = LetterboxInfo::new(image, self.input_size);
        let boxed = letterbox(image, self.input_size);
        let tensor = image_to_tensor(&boxed, self.input_size);

        let mut session = self.session.lock().unwrap();

        let input_value = Value::from_array(tensor).context("Failed to create input tensor")?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Detection inference failed")?;

        let output = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        let detections = decode_predictions(
            &output.view(),
            &self.names,
            self.confidence_threshold,
            self.iou_threshold,
            &transform,
        )?;

        debug!("Detected {} objects", detections.len());

        Ok(detections)
    }
}

/// Parse the `names` metadata entry, e.g. `{0: 'helmet', 1: 'head'}`
fn parse_names(raw: &str) -> HashMap<usize, String> {
    let mut names = HashMap::new();

    let inner = raw.trim().trim_start_matches('{').trim_end_matches('}');
    for entry in inner.split(',') {
        let Some((id, name)) = entry.split_once(':') else {
            continue;
        };
        let Ok(id) = id.trim().parse::<usize>() else {
            continue;
        };
        let name = name.trim().trim_matches(|c| c == '\'' || c == '"').to_string();
        if !name.is_empty() {
            names.insert(id, name);
        }
    }

    names
}

/// Parse the `imgsz` metadata entry, e.g. `[640, 640]`
fn parse_imgsz(raw: &str) -> Option<u32> {
    raw.split(|c: char| !c.is_ascii_digit())
        .find(|s| !s.is_empty())
        .and_then(|s| s.parse().ok())
}
