//! Tesseract CLI recognition.

use std::process::Command;
use std::time::Duration;

use image::GrayImage;
use tempfile::TempDir;

use super::tools::{handle_cmd_output, run_with_deadline};
use crate::error::EngineError;

/// Run tesseract over a single preprocessed image.
pub(super) fn recognize(
    image: &GrayImage,
    language: &str,
    deadline: Duration,
) -> Result<String, EngineError> {
    let temp_dir = TempDir::new()?;
    let image_path = temp_dir.path().join("page.png");
    image.save(&image_path)?;

    let mut cmd = Command::new("tesseract");
    cmd.arg(&image_path).arg("stdout").args(["-l", language]);
    let output = run_with_deadline(cmd, "tesseract", deadline)?;
    handle_cmd_output(output, EngineError::Ocr)
}
