//! Normalization applied to user-submitted photos before face analysis.
//!
//! Detection reliability drops sharply on tiny or enormous inputs and on
//! underexposed photos, so uploads are clamped into the [800, 2000] pixel
//! range and given a mild brightness/contrast lift before the detector
//! ever sees them.

use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};

/// Shorter side below this is upscaled.
pub const MIN_SIDE: u32 = 800;
/// Longer side above this is downscaled.
pub const MAX_SIDE: u32 = 2000;

/// Correction applied to the source photo before detection.
pub const SOURCE_ALPHA: f32 = 1.1;
pub const SOURCE_BETA: f32 = 10.0;

/// Lighter correction applied to the swapped result.
pub const RESULT_ALPHA: f32 = 1.05;
pub const RESULT_BETA: f32 = 3.0;

/// Full source normalization: channel fix, size clamp, brightness lift.
/// Total — never fails, only transforms.
pub fn normalize(img: DynamicImage) -> DynamicImage {
    let img = ensure_color(img);
    let img = clamp_size(img);
    adjust(&img, SOURCE_ALPHA, SOURCE_BETA)
}

/// Expand grayscale input to three channels by duplication.
pub fn ensure_color(img: DynamicImage) -> DynamicImage {
    match img {
        DynamicImage::ImageLuma8(_)
        | DynamicImage::ImageLuma16(_)
        | DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageLumaA16(_) => DynamicImage::ImageRgb8(img.to_rgb8()),
        other => other,
    }
}

/// Uniformly rescale so the shorter side is at least [`MIN_SIDE`] or the
/// longer side is at most [`MAX_SIDE`]. At most one clamp applies; the
/// upscale takes precedence when an image violates both bounds.
pub fn clamp_size(img: DynamicImage) -> DynamicImage {
    let (w, h) = (img.width(), img.height());
    let shorter = w.min(h);
    let longer = w.max(h);

    if shorter < MIN_SIDE {
        let scale = MIN_SIDE as f32 / shorter as f32;
        resize_by(img, scale, FilterType::Triangle)
    } else if longer > MAX_SIDE {
        let scale = MAX_SIDE as f32 / longer as f32;
        resize_by(img, scale, FilterType::Lanczos3)
    } else {
        img
    }
}

fn resize_by(img: DynamicImage, scale: f32, filter: FilterType) -> DynamicImage {
    let w = ((img.width() as f32) * scale).round().max(1.0) as u32;
    let h = ((img.height() as f32) * scale).round().max(1.0) as u32;
    img.resize_exact(w, h, filter)
}

/// Linear brightness/contrast correction: `clamp(alpha*p + beta, 0, 255)`
/// applied uniformly to all channels.
pub fn adjust(img: &DynamicImage, alpha: f32, beta: f32) -> DynamicImage {
    let rgb = img.to_rgb8();
    let mut out = RgbImage::new(rgb.width(), rgb.height());
    for (x, y, pixel) in rgb.enumerate_pixels() {
        let mut corrected = [0u8; 3];
        for (c, v) in pixel.0.iter().enumerate() {
            corrected[c] = (alpha * *v as f32 + beta).clamp(0.0, 255.0) as u8;
        }
        out.put_pixel(x, y, image::Rgb(corrected));
    }
    DynamicImage::ImageRgb8(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GrayImage;

    fn rgb_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(
            width,
            height,
            image::Rgb([100, 120, 140]),
        ))
    }

    #[test]
    fn small_image_is_upscaled_to_min_side() {
        let out = clamp_size(rgb_image(600, 900));
        assert_eq!((out.width(), out.height()), (800, 1200));
    }

    #[test]
    fn upscale_preserves_aspect_ratio() {
        let out = clamp_size(rgb_image(633, 950));
        assert_eq!(out.width().min(out.height()), 800);
        let before = 633.0 / 950.0;
        let after = out.width() as f64 / out.height() as f64;
        assert!((before - after).abs() < 0.01);
    }

    #[test]
    fn large_image_is_downscaled_to_max_side() {
        let out = clamp_size(rgb_image(3000, 1500));
        assert_eq!((out.width(), out.height()), (2000, 1000));
    }

    #[test]
    fn in_range_image_is_untouched() {
        let out = clamp_size(rgb_image(1000, 1400));
        assert_eq!((out.width(), out.height()), (1000, 1400));
    }

    #[test]
    fn boundary_dimensions_are_untouched() {
        let out = clamp_size(rgb_image(800, 2000));
        assert_eq!((out.width(), out.height()), (800, 2000));
    }

    #[test]
    fn upscale_wins_when_both_bounds_are_violated() {
        // 500x3000 breaks both limits; only the upscale clamp applies.
        let out = clamp_size(rgb_image(500, 3000));
        assert_eq!((out.width(), out.height()), (800, 4800));
    }

    #[test]
    fn grayscale_becomes_three_channels() {
        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(10, 10, image::Luma([77])));
        let out = ensure_color(gray);
        assert_eq!(out.color().channel_count(), 3);
        let rgb = out.to_rgb8();
        assert_eq!(rgb.get_pixel(0, 0).0, [77, 77, 77]);
    }

    #[test]
    fn adjust_applies_linear_correction() {
        let img = rgb_image(1, 1);
        let out = adjust(&img, SOURCE_ALPHA, SOURCE_BETA).to_rgb8();
        // 1.1 * 100 + 10 = 120, 1.1 * 120 + 10 = 142, 1.1 * 140 + 10 = 164
        assert_eq!(out.get_pixel(0, 0).0, [120, 142, 164]);
    }

    #[test]
    fn adjust_clamps_at_white() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, image::Rgb([250, 250, 250])));
        let out = adjust(&img, SOURCE_ALPHA, SOURCE_BETA).to_rgb8();
        assert_eq!(out.get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn normalize_output_is_color_and_bounded() {
        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(400, 300, image::Luma([90])));
        let out = normalize(gray);
        assert_eq!(out.color().channel_count(), 3);
        assert!(out.width().min(out.height()) >= MIN_SIDE);
        assert!(out.width().max(out.height()) <= MAX_SIDE);
    }
}
