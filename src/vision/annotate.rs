// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Annotated result images
//!
//! When an output directory is configured, each successful inference writes
//! one image with the detection boxes drawn on it. Filenames carry a
//! process-wide sequence number so concurrent requests never collide.

use anyhow::{Context, Result};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::vision::detector::Detection;

/// Box border color
const BOX_COLOR: Rgb<u8> = Rgb([0, 0, 255]);

/// Box border thickness in pixels
const BOX_THICKNESS: u32 = 2;

static ANNOTATION_SEQ: AtomicU64 = AtomicU64::new(0);

/// Draw detections on a copy of the image and write it into `dir`
///
/// Returns the path of the written file.
pub fn save_annotated(
    image: &DynamicImage,
    detections: &[Detection],
    dir: &Path,
    source_name: &str,
) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let mut canvas = image.to_rgb8();
    for detection in detections {
        draw_detection(&mut canvas, detection);
    }

    let seq = ANNOTATION_SEQ.fetch_add(1, Ordering::Relaxed);
    let path = dir.join(format!("{}_{}.jpg", sanitize_stem(source_name), seq));

    canvas
        .save(&path)
        .with_context(|| format!("Failed to write annotated image {}", path.display()))?;

    Ok(path)
}

fn draw_detection(canvas: &mut RgbImage, detection: &Detection) {
    let (w, h) = (canvas.width() as f32, canvas.height() as f32);

    let x1 = detection.x1.clamp(0.0, w - 1.0) as i32;
    let y1 = detection.y1.clamp(0.0, h - 1.0) as i32;
    let x2 = detection.x2.clamp(0.0, w - 1.0) as i32;
    let y2 = detection.y2.clamp(0.0, h - 1.0) as i32;

    if x2 <= x1 || y2 <= y1 {
        return;
    }

    for t in 0..BOX_THICKNESS as i32 {
        let width = (x2 - x1) - 2 * t;
        let height = (y2 - y1) - 2 * t;
        if width <= 0 || height <= 0 {
            break;
        }
        let rect = Rect::at(x1 + t, y1 + t).of_size(width as u32, height as u32);
        draw_hollow_rect_mut(canvas, rect, BOX_COLOR);
    }
}

/// Reduce a client-supplied filename to a safe file stem
///
/// The upload filename is untrusted; only its alphanumeric stem survives.
fn sanitize_stem(name: &str) -> String {
    let stem = Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("");

    let cleaned: String = stem
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .take(64)
        .collect();

    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}
