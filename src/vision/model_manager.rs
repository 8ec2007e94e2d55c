// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Model loading and availability state

use std::sync::Arc;

use crate::config::ServiceConfig;
use crate::vision::detector::{Detector, YoloDetector};

/// Availability of the process-wide detection model
///
/// Loading is a fixed boot-time decision: a failed load leaves the service
/// running with every inference request answered 503. Modeled as a tagged
/// state rather than an `Option` so call sites handle both cases.
#[derive(Clone)]
pub enum ModelState {
    /// Model loaded and ready for inference
    Loaded(Arc<dyn Detector>),
    /// Model could not be loaded; the reason is surfaced to clients
    Unavailable { reason: String },
}

impl ModelState {
    /// Whether inference is available
    pub fn is_available(&self) -> bool {
        matches!(self, ModelState::Loaded(_))
    }
}

impl std::fmt::Debug for ModelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelState::Loaded(_) => f.write_str("ModelState::Loaded"),
            ModelState::Unavailable { reason } => f
                .debug_struct("ModelState::Unavailable")
                .field("reason", reason)
                .finish(),
        }
    }
}

/// Load the detection model once at startup
///
/// Never fails the process: a load error is logged and returned as the
/// `Unavailable` state. There is no retry and no reload endpoint.
pub async fn load_model(config: &ServiceConfig) -> ModelState {
    match YoloDetector::new(&config.model_path).await {
        Ok(detector) => {
            let mut detector = detector
                .with_confidence_threshold(config.confidence_threshold)
                .with_iou_threshold(config.iou_threshold);
            if let Some(size) = config.input_size {
                detector = detector.with_input_size(size);
            }

            tracing::info!(
                "✅ Detection model loaded from {}",
                config.model_path.display()
            );

            // Operator-facing listing of what the model can recognize
            let mut classes: Vec<(usize, &str)> = detector
                .class_names()
                .iter()
                .map(|(id, name)| (*id, name.as_str()))
                .collect();
            classes.sort_by_key(|(id, _)| *id);
            if classes.is_empty() {
                tracing::info!("Model metadata carries no class names; ids will be reported as \"unknown\"");
            } else {
                tracing::info!("Model classes: {:?}", classes);
            }

            ModelState::Loaded(Arc::new(detector))
        }
        Err(e) => {
            tracing::warn!(
                "⚠️ Failed to load detection model from {}: {}",
                config.model_path.display(),
                e
            );
            ModelState::Unavailable {
                reason: e.to_string(),
            }
        }
    }
}
