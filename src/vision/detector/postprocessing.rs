// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Decoding of raw detection model output
//!
//! The model emits one prediction per anchor as `[cx, cy, w, h, score_0,
//! .., score_n]` in model-input pixel space. Decoding picks the best class
//! per anchor, filters by confidence, applies class-aware non-max
//! suppression and maps the surviving boxes back to image space.

use anyhow::Result;
use ndarray::ArrayViewD;
use std::collections::HashMap;

use super::preprocessing::LetterboxInfo;
use super::{Detection, UNKNOWN_CLASS};

/// Number of box attributes preceding the per-class scores
const BOX_ATTRS: usize = 4;

struct Candidate {
    class_id: usize,
    confidence: f32,
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
}

/// Decode raw model output into detections
///
/// # Arguments
/// - `output`: raw tensor of shape `[1, 4+nc, anchors]` (or transposed)
/// - `names`: the model's class id to name mapping
/// - `confidence_threshold`: inclusive confidence floor
/// - `iou_threshold`: NMS overlap threshold
/// - `transform`: letterbox parameters for mapping back to image space
pub fn decode_predictions(
    output: &ArrayViewD<f32>,
    names: &HashMap<usize, String>,
    confidence_threshold: f32,
    iou_threshold: f32,
    transform: &LetterboxInfo,
) -> Result<Vec<Detection>> {
    let shape = output.shape();
    if shape.len() != 3 || shape[0] != 1 {
        anyhow::bail!("Unexpected output shape: {:?}, expected [1, attrs, anchors]", shape);
    }

    // Exports differ on whether attributes or anchors come first; the
    // attribute axis is the one matching 4 + num_classes, or the smaller
    // axis when the class count is unknown.
    let expected_attrs = if names.is_empty() {
        None
    } else {
        Some(BOX_ATTRS + names.len())
    };
    let transposed = match expected_attrs {
        Some(attrs) if shape[1] == attrs => false,
        Some(attrs) if shape[2] == attrs => true,
        _ => shape[1] > shape[2],
    };
    let (num_attrs, num_anchors) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };

    if num_attrs <= BOX_ATTRS {
        anyhow::bail!("Output carries no class scores: {:?}", shape);
    }
    let num_classes = num_attrs - BOX_ATTRS;

    let at = |attr: usize, anchor: usize| -> f32 {
        if transposed {
            output[[0, anchor, attr]]
        } else {
            output[[0, attr, anchor]]
        }
    };

    let mut candidates = Vec::new();

    for i in 0..num_anchors {
        // Best class score for this anchor
        let mut confidence = f32::NEG_INFINITY;
        let mut class_id = 0usize;
        for c in 0..num_classes {
            let score = at(BOX_ATTRS + c, i);
            if score > confidence {
                confidence = score;
                class_id = c;
            }
        }

        // Inclusive at the threshold
        if confidence < confidence_threshold {
            continue;
        }

        let cx = at(0, i);
        let cy = at(1, i);
        let w = at(2, i);
        let h = at(3, i);

        let (x1, y1) = transform.map_to_original(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = transform.map_to_original(cx + w / 2.0, cy + h / 2.0);

        candidates.push(Candidate {
            class_id,
            confidence,
            x1,
            y1,
            x2,
            y2,
        });
    }

    let kept = nms(candidates, iou_threshold);

    Ok(kept
        .into_iter()
        .map(|c| Detection {
            class_id: c.class_id,
            class_name: names
                .get(&c.class_id)
                .cloned()
                .unwrap_or_else(|| UNKNOWN_CLASS.to_string()),
            confidence: c.confidence,
            x1: c.x1,
            y1: c.y1,
            x2: c.x2,
            y2: c.y2,
        })
        .collect())
}

/// Class-aware greedy non-max suppression
fn nms(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut kept: Vec<Candidate> = Vec::new();

    for candidate in candidates {
        let suppressed = kept.iter().any(|k| {
            k.class_id == candidate.class_id && iou(k, &candidate) >= iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }

    kept
}

fn iou(a: &Candidate, b: &Candidate) -> f32 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let area_a = (a.x2 - a.x1).max(0.0) * (a.y2 - a.y1).max(0.0);
    let area_b = (b.x2 - b.x1).max(0.0) * (b.y2 - b.y1).max(0.0);
    let union = area_a + area_b - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}
