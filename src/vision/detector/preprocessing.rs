// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for the detection model

use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use ndarray::Array4;

/// Default inference resolution when the model metadata carries none
pub const DEFAULT_INPUT_SIZE: u32 = 640;

/// Padding gray used when letterboxing to a square
const PAD_COLOR: u8 = 114;

/// Letterbox an image into a `target_size` square
///
/// The image is scaled to fit while preserving aspect ratio, then centered
/// on a gray background to reach the target dimensions.
pub fn letterbox(image: &DynamicImage, target_size: u32) -> DynamicImage {
    let (orig_w, orig_h) = image.dimensions();

    if orig_w == 0 || orig_h == 0 {
        return DynamicImage::ImageRgb8(RgbImage::from_pixel(
            target_size,
            target_size,
            Rgb([PAD_COLOR, PAD_COLOR, PAD_COLOR]),
        ));
    }

    let scale = (target_size as f32 / orig_w as f32).min(target_size as f32 / orig_h as f32);

    let new_w = ((orig_w as f32 * scale).round() as u32).max(1);
    let new_h = ((orig_h as f32 * scale).round() as u32).max(1);

    let resized = image.resize_exact(new_w, new_h, image::imageops::FilterType::Triangle);
    let rgb = resized.to_rgb8();

    let mut output = RgbImage::from_pixel(target_size, target_size, Rgb([PAD_COLOR; 3]));

    let offset_x = (target_size - new_w) / 2;
    let offset_y = (target_size - new_h) / 2;

    for y in 0..new_h {
        for x in 0..new_w {
            output.put_pixel(x + offset_x, y + offset_y, *rgb.get_pixel(x, y));
        }
    }

    DynamicImage::ImageRgb8(output)
}

/// Convert a letterboxed image into an NCHW `[1, 3, S, S]` tensor
///
/// Pixel values are scaled to `[0, 1]`; no mean/std normalization, matching
/// the model's training preprocessing.
pub fn image_to_tensor(image: &DynamicImage, target_size: u32) -> Array4<f32> {
    let rgb = image.to_rgb8();
    let size = target_size as usize;

    let mut tensor = Array4::zeros((1, 3, size, size));

    for y in 0..size {
        for x in 0..size {
            let pixel = rgb.get_pixel(x as u32, y as u32);
            for c in 0..3 {
                tensor[[0, c, y, x]] = pixel[c] as f32 / 255.0;
            }
        }
    }

    tensor
}

/// Scaling factor and offsets used during letterboxing
///
/// Used to map detection coordinates from model-input space back to the
/// normalized image's pixel space.
#[derive(Debug, Clone)]
pub struct LetterboxInfo {
    /// Scale factor applied
    pub scale: f32,
    /// X offset from padding
    pub offset_x: u32,
    /// Y offset from padding
    pub offset_y: u32,
    /// Normalized image width
    pub original_width: u32,
    /// Normalized image height
    pub original_height: u32,
}

impl LetterboxInfo {
    /// Calculate letterbox parameters for an image
    pub fn new(image: &DynamicImage, target_size: u32) -> Self {
        let (orig_w, orig_h) = image.dimensions();

        if orig_w == 0 || orig_h == 0 {
            return Self {
                scale: 1.0,
                offset_x: 0,
                offset_y: 0,
                original_width: orig_w,
                original_height: orig_h,
            };
        }

        let scale = (target_size as f32 / orig_w as f32).min(target_size as f32 / orig_h as f32);
        let new_w = ((orig_w as f32 * scale).round() as u32).max(1);
        let new_h = ((orig_h as f32 * scale).round() as u32).max(1);

        Self {
            scale,
            offset_x: (target_size - new_w) / 2,
            offset_y: (target_size - new_h) / 2,
            original_width: orig_w,
            original_height: orig_h,
        }
    }

    /// Map a coordinate from model-input space back to image space,
    /// clamped to the image bounds
    pub fn map_to_original(&self, x: f32, y: f32) -> (f32, f32) {
        let orig_x = ((x - self.offset_x as f32) / self.scale)
            .max(0.0)
            .min(self.original_width as f32);
        let orig_y = ((y - self.offset_y as f32) / self.scale)
            .max(0.0)
            .min(self.original_height as f32);
        (orig_x, orig_y)
    }
}
