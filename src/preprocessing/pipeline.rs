use crate::error::OcrError;
use image::{DynamicImage, GrayImage, ImageFormat};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::time::Instant;

use super::steps::{self, crop::Rect};

/// Options for preparing an image before it is handed to the engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageOptions {
    /// Pixels darker than this become black, the rest white
    pub black_threshold: u8,
    /// Counter-clockwise rotation in degrees; zero skips the step
    pub rotate_angle: f32,
    pub crop: Option<Rect>,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            black_threshold: 128,
            rotate_angle: 0.0,
            crop: None,
        }
    }
}

/// Preprocessing pipeline: grayscale, threshold, rotate, crop
pub struct Pipeline {
    options: ImageOptions,
}

impl Pipeline {
    pub fn new(options: ImageOptions) -> Self {
        Self { options }
    }

    /// Process an image according to the configured options
    pub fn process(&self, image: &DynamicImage) -> Result<GrayImage, OcrError> {
        let start = Instant::now();

        let gray = self.run_step("grayscale", || Ok(steps::grayscale::apply(image)))?;
        let mut img = self.run_step("threshold", || {
            Ok(steps::threshold::apply(gray, self.options.black_threshold))
        })?;

        let angle = self.options.rotate_angle;
        if angle != 0.0 {
            img = self.run_step("rotate", || Ok(steps::rotate::apply(&img, angle)))?;
        }

        if let Some(rect) = self.options.crop {
            img = self.run_step("crop", || steps::crop::apply(&img, rect))?;
        }

        tracing::debug!(
            "Preprocessing finished in {}ms ({}x{})",
            start.elapsed().as_millis(),
            img.width(),
            img.height()
        );

        Ok(img)
    }

    fn run_step<F>(&self, name: &str, step_fn: F) -> Result<GrayImage, OcrError>
    where
        F: FnOnce() -> Result<GrayImage, OcrError>,
    {
        let step_start = Instant::now();
        let result = step_fn()?;
        tracing::debug!(
            "Preprocessing step {} took {}ms",
            name,
            step_start.elapsed().as_millis()
        );
        Ok(result)
    }
}

/// Encode a processed image as PNG bytes for the engine's stdin
pub fn encode_png(image: &GrayImage) -> Result<Vec<u8>, OcrError> {
    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| OcrError::Preprocessing(format!("Failed to encode PNG: {}", e)))?;
    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};

    #[test]
    fn test_default_pipeline_binarizes() {
        let mut img = RgbImage::from_pixel(8, 8, Rgb([230, 230, 230]));
        img.put_pixel(3, 3, Rgb([10, 10, 10]));

        let result = Pipeline::new(ImageOptions::default())
            .process(&DynamicImage::ImageRgb8(img))
            .unwrap();

        assert_eq!(result.dimensions(), (8, 8));
        assert_eq!(result.get_pixel(3, 3).0[0], 0);
        assert_eq!(result.get_pixel(0, 0).0[0], 255);
    }

    #[test]
    fn test_pipeline_applies_crop() {
        let img = GrayImage::from_pixel(20, 10, Luma([255]));
        let options = ImageOptions {
            crop: Some(Rect::new(0, 0, 5, 5)),
            ..ImageOptions::default()
        };

        let result = Pipeline::new(options)
            .process(&DynamicImage::ImageLuma8(img))
            .unwrap();

        assert_eq!(result.dimensions(), (5, 5));
    }

    #[test]
    fn test_encode_png_has_signature() {
        let png = encode_png(&GrayImage::new(4, 4)).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");

        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 4));
    }
}
