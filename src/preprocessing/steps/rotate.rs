use image::{GrayImage, Luma};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};

/// Rotate counter-clockwise by `degrees` about the center, keeping the
/// canvas size and filling uncovered area with black
pub fn apply(image: &GrayImage, degrees: f32) -> GrayImage {
    // imageproc rotates clockwise for positive angles
    let theta = -degrees.to_radians();
    rotate_about_center(image, theta, Interpolation::Nearest, Luma([0u8]))
}
