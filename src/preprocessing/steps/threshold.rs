use image::{GrayImage, Luma};
use imageproc::contrast::{threshold, ThresholdType};

/// Binarize with a fixed cut-off: pixels below `black_threshold` become
/// black, everything else white
pub fn apply(image: GrayImage, black_threshold: u8) -> GrayImage {
    // imageproc whitens pixels strictly above its cut-off
    match black_threshold.checked_sub(1) {
        Some(cutoff) => threshold(&image, cutoff, ThresholdType::Binary),
        None => GrayImage::from_pixel(image.width(), image.height(), Luma([255u8])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_binarizes_image() {
        let img = GrayImage::from_fn(50, 50, |x, _| Luma([(x as u8 * 5).min(255)]));

        let result = apply(img, 128);

        for pixel in result.pixels() {
            assert!(
                pixel.0[0] == 0 || pixel.0[0] == 255,
                "Expected binary pixel, got {}",
                pixel.0[0]
            );
        }
    }

    #[test]
    fn test_threshold_boundary_is_white() {
        let mut img = GrayImage::from_pixel(3, 1, Luma([127]));
        img.put_pixel(1, 0, Luma([128]));
        img.put_pixel(2, 0, Luma([200]));

        let result = apply(img, 128);

        assert_eq!(result.get_pixel(0, 0).0[0], 0);
        assert_eq!(result.get_pixel(1, 0).0[0], 255);
        assert_eq!(result.get_pixel(2, 0).0[0], 255);
    }

    #[test]
    fn test_zero_threshold_is_all_white() {
        let img = GrayImage::from_pixel(4, 4, Luma([0]));
        let result = apply(img, 0);
        assert_eq!(result.dimensions(), (4, 4));
        assert!(result.pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn test_max_threshold_keeps_only_white() {
        let mut img = GrayImage::from_pixel(2, 1, Luma([254]));
        img.put_pixel(1, 0, Luma([255]));

        let result = apply(img, 255);

        assert_eq!(result.get_pixel(0, 0).0[0], 0);
        assert_eq!(result.get_pixel(1, 0).0[0], 255);
    }
}
