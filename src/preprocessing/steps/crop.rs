use crate::error::OcrError;
use image::{imageops, GrayImage};
use serde::{Deserialize, Serialize};

/// Crop box as (left, upper, right, lower); right and lower are exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub left: u32,
    pub upper: u32,
    pub right: u32,
    pub lower: u32,
}

impl Rect {
    pub fn new(left: u32, upper: u32, right: u32, lower: u32) -> Self {
        Self {
            left,
            upper,
            right,
            lower,
        }
    }
}

/// Crop to `rect`, clamped to the image bounds. Areas outside the image are
/// dropped, not padded.
pub fn apply(image: &GrayImage, rect: Rect) -> Result<GrayImage, OcrError> {
    let (width, height) = image.dimensions();
    let right = rect.right.min(width);
    let lower = rect.lower.min(height);

    if rect.left >= right || rect.upper >= lower {
        return Err(OcrError::Preprocessing(format!(
            "crop box {:?} is empty for a {}x{} image",
            rect, width, height
        )));
    }

    Ok(imageops::crop_imm(image, rect.left, rect.upper, right - rect.left, lower - rect.upper)
        .to_image())
}
