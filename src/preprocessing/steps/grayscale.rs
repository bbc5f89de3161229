use image::{DynamicImage, GrayImage};

/// Convert image to 8-bit grayscale
pub fn apply(image: &DynamicImage) -> GrayImage {
    image.to_luma8()
}
