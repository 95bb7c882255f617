//! Dual-exposure embedding.
//!
//! A background frame is split into a bright and a dark copy. Every channel
//! is first compressed into `[floor, floor + range]` to leave headroom, then
//! nudged up in one copy and down in the other by a luminance-weighted delta.
//! Shown in alternation at a high refresh rate the pair fuses into the
//! compressed background. Under the on-pixels of a marker the direction is
//! swapped, so the marker only exists in the difference between the frames.

use image::{Rgb, RgbImage};
use rayon::prelude::*;
use shared::image_size::ImageSize;
use thiserror::Error;

/// Rec. 709 luma weights for R, G and B.
///
/// Applied in RGB channel order: red gets 0.2126 of the delta, blue 0.0722.
/// BGR frames (as loaded by OpenCV) must be reordered first, otherwise the
/// red and blue shares swap and non-gray pairs come out different.
pub const LUMA_WEIGHTS: [f32; 3] = [0.2126, 0.7152, 0.0722];

/// Marker pixels whose channel sum exceeds this value count as on.
pub const MARKER_ON_THRESHOLD: u32 = 200;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum EmbedError {
    #[error("Marker of {marker} at offset ({x}, {y}) does not fit into frame {frame}")]
    MarkerOutOfBounds {
        marker: ImageSize,
        frame: ImageSize,
        x: u32,
        y: u32,
    },
}

/// The two alternating output frames.
#[derive(Debug, Clone)]
pub struct ExposurePair {
    /// Brighter than the background outside the marker, darker under it
    pub first: RgbImage,
    /// Darker than the background outside the marker, brighter under it
    pub second: RgbImage,
}

/// Parameters of the dual-exposure split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DualExposure {
    /// Total brightness delta before luminance weighting
    pub delta: f32,
    /// Lowest value of a compressed channel
    pub floor: f32,
    /// Span of a compressed channel
    pub range: f32,
}

impl Default for DualExposure {
    fn default() -> Self {
        Self {
            delta: 60.0,
            floor: 10.0,
            range: 235.0,
        }
    }
}

impl DualExposure {
    pub fn with_delta(delta: f32) -> Self {
        Self {
            delta,
            ..Self::default()
        }
    }

    /// Per-channel deltas (R, G, B).
    pub fn channel_deltas(&self) -> [f32; 3] {
        LUMA_WEIGHTS.map(|w| w * self.delta)
    }

    /// Channel value after headroom compression.
    pub fn compress(&self, value: u8) -> f32 {
        value as f32 * self.range / 255.0 + self.floor
    }

    /// Split one pixel into its (bright, dark) pair.
    pub fn split_pixel(&self, pixel: Rgb<u8>) -> (Rgb<u8>, Rgb<u8>) {
        let deltas = self.channel_deltas();
        let mut bright = [0u8; 3];
        let mut dark = [0u8; 3];

        for c in 0..3 {
            let value = self.compress(pixel.0[c]);
            let mut delta = deltas[c];
            if value + delta > 255.0 {
                delta = 255.0 - value;
            }
            if value - delta < 0.0 {
                delta = value;
            }
            bright[c] = (value + delta) as u8;
            dark[c] = (value - delta) as u8;
        }

        (Rgb(bright), Rgb(dark))
    }

    /// Split a whole frame without a marker.
    pub fn embed_frame(&self, frame: &RgbImage) -> ExposurePair {
        self.split(frame, |_, _| false)
    }

    /// Split a frame and hide `marker` at `offset` (top-left corner).
    pub fn embed_marker(
        &self,
        frame: &RgbImage,
        marker: &RgbImage,
        offset: (u32, u32),
    ) -> Result<ExposurePair, EmbedError> {
        let frame_size = ImageSize::of(frame);
        let marker_size = ImageSize::of(marker);
        if !frame_size.contains(offset, marker_size) {
            return Err(EmbedError::MarkerOutOfBounds {
                marker: marker_size,
                frame: frame_size,
                x: offset.0,
                y: offset.1,
            });
        }

        let (ox, oy) = offset;
        Ok(self.split(frame, |x, y| {
            if x < ox || y < oy || x >= ox + marker.width() || y >= oy + marker.height() {
                return false;
            }
            let p = marker.get_pixel(x - ox, y - oy);
            p.0.iter().map(|&c| c as u32).sum::<u32>() > MARKER_ON_THRESHOLD
        }))
    }

    fn split<F>(&self, frame: &RgbImage, swapped: F) -> ExposurePair
    where
        F: Fn(u32, u32) -> bool + Sync,
    {
        let (width, height) = frame.dimensions();
        let mut first = RgbImage::new(width, height);
        let mut second = RgbImage::new(width, height);
        let row_len = width as usize * 3;

        if row_len > 0 {
            first
                .par_chunks_mut(row_len)
                .zip(second.par_chunks_mut(row_len))
                .enumerate()
                .for_each(|(y, (first_row, second_row))| {
                    let y = y as u32;
                    for x in 0..width {
                        let (bright, dark) = self.split_pixel(*frame.get_pixel(x, y));
                        let (a, b) = if swapped(x, y) {
                            (dark, bright)
                        } else {
                            (bright, dark)
                        };
                        let i = x as usize * 3;
                        first_row[i..i + 3].copy_from_slice(&a.0);
                        second_row[i..i + 3].copy_from_slice(&b.0);
                    }
                });
        }

        ExposurePair { first, second }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_channel_deltas_follow_luma_weights() {
        let d = DualExposure::default().channel_deltas();
        assert_relative_eq!(d[0], 12.756, epsilon = 1e-4);
        assert_relative_eq!(d[1], 42.912, epsilon = 1e-4);
        assert_relative_eq!(d[2], 4.332, epsilon = 1e-4);
    }

    #[test]
    fn test_compression_range() {
        let e = DualExposure::default();
        assert_relative_eq!(e.compress(0), 10.0);
        assert_relative_eq!(e.compress(255), 245.0);
    }

    #[test]
    fn test_split_pixel_mid_gray() {
        let e = DualExposure::default();
        let (bright, dark) = e.split_pixel(Rgb([128, 128, 128]));
        // 128 * 235 / 255 + 10 = 127.96
        assert_eq!(bright.0, [140, 170, 132]);
        assert_eq!(dark.0, [115, 85, 123]);
    }

    #[test]
    fn test_split_pixel_clamps_at_extremes() {
        let e = DualExposure::default();

        let (bright, dark) = e.split_pixel(Rgb([255, 255, 255]));
        assert_eq!(bright.0, [255, 255, 249]);
        // Green delta clamped to 10: 245 - 10
        assert_eq!(dark.0[1], 235);

        let (bright, dark) = e.split_pixel(Rgb([0, 0, 0]));
        assert_eq!(dark.0, [0, 0, 5]);
        assert_eq!(bright.0[0], 20);
    }

    #[test]
    fn test_weights_follow_rgb_channel_order() {
        let e = DualExposure::default();
        let (bright, dark) = e.split_pixel(Rgb([200, 100, 50]));
        let spread: Vec<i32> = (0..3)
            .map(|c| bright.0[c] as i32 - dark.0[c] as i32)
            .collect();

        // Red carries 0.2126 of the delta, blue 0.0722
        assert!((spread[0] - 26).abs() <= 1, "{spread:?}");
        assert!((spread[2] - 9).abs() <= 1, "{spread:?}");
        assert!(spread[1] > spread[0] && spread[0] > spread[2]);
    }

    #[test]
    fn test_pair_averages_to_compressed_background() {
        let e = DualExposure::default();
        for v in (0..=255u8).step_by(5) {
            let (bright, dark) = e.split_pixel(Rgb([v, v, v]));
            let expected = e.compress(v);
            for c in 0..3 {
                let mean = (bright.0[c] as f32 + dark.0[c] as f32) / 2.0;
                assert!((mean - expected).abs() <= 1.0, "v={v} c={c}");
            }
        }
    }

    #[test]
    fn test_embed_marker_swaps_under_on_pixels() {
        let e = DualExposure::default();
        let frame = RgbImage::from_pixel(20, 10, Rgb([100, 100, 100]));
        let mut marker = RgbImage::new(4, 4);
        marker.put_pixel(1, 1, Rgb([255, 255, 255]));

        let pair = e.embed_marker(&frame, &marker, (5, 3)).unwrap();
        let (bright, dark) = e.split_pixel(Rgb([100, 100, 100]));

        assert_eq!(*pair.first.get_pixel(0, 0), bright);
        assert_eq!(*pair.second.get_pixel(0, 0), dark);
        // Off marker pixel behaves like background
        assert_eq!(*pair.first.get_pixel(5, 3), bright);
        // On marker pixel is swapped
        assert_eq!(*pair.first.get_pixel(6, 4), dark);
        assert_eq!(*pair.second.get_pixel(6, 4), bright);
    }

    #[test]
    fn test_marker_out_of_bounds() {
        let e = DualExposure::default();
        let frame = RgbImage::new(20, 10);
        let marker = RgbImage::new(4, 4);
        let err = e.embed_marker(&frame, &marker, (17, 0)).unwrap_err();
        assert!(matches!(err, EmbedError::MarkerOutOfBounds { x: 17, .. }));
    }

    #[test]
    fn test_embed_frame_matches_split_pixel() {
        let e = DualExposure::with_delta(30.0);
        let frame = RgbImage::from_fn(8, 8, |x, y| Rgb([(x * 30) as u8, (y * 30) as u8, 77]));
        let pair = e.embed_frame(&frame);
        for (x, y, p) in frame.enumerate_pixels() {
            let (bright, dark) = e.split_pixel(*p);
            assert_eq!(*pair.first.get_pixel(x, y), bright);
            assert_eq!(*pair.second.get_pixel(x, y), dark);
        }
    }
}
