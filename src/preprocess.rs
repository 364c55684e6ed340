//! Page image cleanup before OCR.
//!
//! Fixed pipeline: grayscale, median blur, light gaussian blur, adaptive
//! threshold, morphological close/open, contrast boost, sharpening. Every
//! step is deterministic so identical renders give identical OCR input.

use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::filter::{box_filter, gaussian_blur_f32, median_filter};
use imageproc::morphology::{close, open};

use crate::error::EngineError;

const GAUSSIAN_SIGMA: f32 = 0.5;
/// 11x11 window.
const THRESHOLD_BLOCK_RADIUS: u32 = 5;
const THRESHOLD_OFFSET: i16 = 2;
const CONTRAST_FACTOR: f32 = 1.2;
const SHARPNESS_FACTOR: f32 = 1.5;

/// Run the full cleanup pipeline on a rendered page.
pub fn preprocess(image: &DynamicImage) -> GrayImage {
    let gray = image.to_luma8();
    let gray = median_filter(&gray, 1, 1);
    let gray = gaussian_blur_f32(&gray, GAUSSIAN_SIGMA);
    let binary = threshold_adaptive(&gray, THRESHOLD_BLOCK_RADIUS, THRESHOLD_OFFSET);
    let binary = close(&binary, Norm::LInf, 1);
    let binary = open(&binary, Norm::LInf, 1);
    let boosted = enhance_contrast(&binary, CONTRAST_FACTOR);
    enhance_sharpness(&boosted, SHARPNESS_FACTOR)
}

/// Binarise against the local mean: a pixel is white when it is brighter
/// than the mean of its window minus `offset`.
pub fn threshold_adaptive(image: &GrayImage, block_radius: u32, offset: i16) -> GrayImage {
    let means = box_filter(image, block_radius, block_radius);
    let mut out = GrayImage::new(image.width(), image.height());
    for (x, y, pixel) in image.enumerate_pixels() {
        let local = means.get_pixel(x, y)[0] as i16 - offset;
        let value = if pixel[0] as i16 > local { 255 } else { 0 };
        out.put_pixel(x, y, Luma([value]));
    }
    out
}

/// Scale distance from the mean grey level by `factor`.
pub fn enhance_contrast(image: &GrayImage, factor: f32) -> GrayImage {
    let pixels = image.as_raw();
    if pixels.is_empty() {
        return image.clone();
    }
    let sum: u64 = pixels.iter().map(|&p| p as u64).sum();
    let mean = (sum as f32 / pixels.len() as f32 + 0.5).floor();

    let mut out = image.clone();
    for p in out.pixels_mut() {
        p[0] = clamp_u8(mean + factor * (p[0] as f32 - mean));
    }
    out
}

/// Blend between a smoothed copy and the original. Factors above 1 sharpen.
///
/// Border pixels are left as they are.
pub fn enhance_sharpness(image: &GrayImage, factor: f32) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut out = image.clone();
    if width < 3 || height < 3 {
        return out;
    }

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let mut acc = 0u32;
            for dy in 0..3 {
                for dx in 0..3 {
                    let weight = if dx == 1 && dy == 1 { 5 } else { 1 };
                    acc += weight * image.get_pixel(x + dx - 1, y + dy - 1)[0] as u32;
                }
            }
            let smooth = acc as f32 / 13.0;
            let original = image.get_pixel(x, y)[0] as f32;
            out.put_pixel(x, y, Luma([clamp_u8(smooth + factor * (original - smooth))]));
        }
    }
    out
}

fn clamp_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Path of a saved enhanced page: `<dir>/<stem>/page_NNNN.png`, 1-based.
pub fn enhanced_image_path(dir: &Path, source: &Path, page: u32) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    dir.join(stem).join(format!("page_{:04}.png", page + 1))
}

/// Write a preprocessed page so the OCR input can be inspected later.
pub fn save_enhanced(
    image: &GrayImage,
    dir: &Path,
    source: &Path,
    page: u32,
) -> Result<PathBuf, EngineError> {
    let path = enhanced_image_path(dir, source, page);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    image.save(&path)?;
    Ok(path)
}
