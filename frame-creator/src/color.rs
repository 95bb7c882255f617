//! Colour and brightness helpers for study frames.

use image::{Rgb, RgbImage};
use rayon::prelude::*;

use crate::embed::LUMA_WEIGHTS;

/// sRGB transfer function, `c` in `[0, 1]`.
pub fn srgb_to_linear(c: f64) -> f64 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Relative luminance of an sRGB pixel in `[0, 1]`.
pub fn relative_luminance(pixel: Rgb<u8>) -> f64 {
    pixel
        .0
        .iter()
        .zip(LUMA_WEIGHTS)
        .map(|(&c, w)| w as f64 * srgb_to_linear(c as f64 / 255.0))
        .sum()
}

/// Mean relative luminance over all pixels; 0 for an empty image.
pub fn mean_luminance(image: &RgbImage) -> f64 {
    let count = image.width() as usize * image.height() as usize;
    if count == 0 {
        return 0.0;
    }
    let total: f64 = image
        .as_raw()
        .par_chunks_exact(3)
        .map(|p| relative_luminance(Rgb([p[0], p[1], p[2]])))
        .sum();
    total / count as f64
}

fn rgb_to_hsv(pixel: Rgb<u8>) -> (f32, f32, f32) {
    let [r, g, b] = pixel.0.map(|c| c as f32);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let chroma = max - min;

    let hue = if chroma == 0.0 {
        0.0
    } else if max == r {
        60.0 * ((g - b) / chroma).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / chroma + 2.0)
    } else {
        60.0 * ((r - g) / chroma + 4.0)
    };
    let saturation = if max == 0.0 { 0.0 } else { chroma / max };

    (hue, saturation, max)
}

fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> Rgb<u8> {
    let chroma = value * saturation;
    let sector = hue / 60.0;
    let x = chroma * (1.0 - (sector.rem_euclid(2.0) - 1.0).abs());
    let (r, g, b) = match sector as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let m = value - chroma;
    Rgb([r, g, b].map(|c| (c + m).round().clamp(0.0, 255.0) as u8))
}

/// Shift the HSV value channel of every pixel by `value`, saturating at 0 and
/// 255. Hue and saturation are kept.
pub fn adjust_brightness(image: &RgbImage, value: i16) -> RgbImage {
    let mut out = image.clone();
    out.par_chunks_exact_mut(3).for_each(|p| {
        let (h, s, v) = rgb_to_hsv(Rgb([p[0], p[1], p[2]]));
        let shifted = (v + value as f32).clamp(0.0, 255.0);
        p.copy_from_slice(&hsv_to_rgb(h, s, shifted).0);
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_srgb_to_linear_endpoints() {
        assert_relative_eq!(srgb_to_linear(0.0), 0.0);
        assert_relative_eq!(srgb_to_linear(1.0), 1.0, epsilon = 1e-12);
        assert_relative_eq!(srgb_to_linear(0.04), 0.04 / 12.92);
        assert_relative_eq!(srgb_to_linear(0.5), 0.214041, epsilon = 1e-6);
    }

    #[test]
    fn test_relative_luminance() {
        assert_relative_eq!(relative_luminance(Rgb([0, 0, 0])), 0.0);
        assert_relative_eq!(relative_luminance(Rgb([255, 255, 255])), 1.0, epsilon = 1e-6);
        assert_relative_eq!(relative_luminance(Rgb([0, 255, 0])), 0.7152, epsilon = 1e-6);
    }

    #[test]
    fn test_mean_luminance() {
        let mut image = RgbImage::new(2, 1);
        image.put_pixel(1, 0, Rgb([255, 255, 255]));
        assert_relative_eq!(mean_luminance(&image), 0.5, epsilon = 1e-6);
        assert_relative_eq!(mean_luminance(&RgbImage::new(0, 0)), 0.0);
    }

    #[test]
    fn test_hsv_round_trip_keeps_colour() {
        for pixel in [
            Rgb([0, 0, 0]),
            Rgb([255, 255, 255]),
            Rgb([200, 30, 90]),
            Rgb([12, 240, 100]),
            Rgb([40, 60, 250]),
        ] {
            let (h, s, v) = rgb_to_hsv(pixel);
            assert_eq!(hsv_to_rgb(h, s, v), pixel);
        }
    }

    #[test]
    fn test_adjust_brightness_saturates() {
        let image = RgbImage::from_pixel(1, 1, Rgb([200, 100, 50]));

        let brighter = adjust_brightness(&image, 30);
        assert_eq!(brighter.get_pixel(0, 0).0[0], 230);

        let clipped = adjust_brightness(&image, 100);
        assert_eq!(clipped.get_pixel(0, 0).0[0], 255);

        let black = adjust_brightness(&image, -255);
        assert_eq!(black.get_pixel(0, 0).0, [0, 0, 0]);
    }

    #[test]
    fn test_adjust_brightness_keeps_gray_gray() {
        let image = RgbImage::from_pixel(3, 3, Rgb([100, 100, 100]));
        let darker = adjust_brightness(&image, -40);
        assert!(darker.pixels().all(|p| p.0 == [60, 60, 60]));
    }
}
