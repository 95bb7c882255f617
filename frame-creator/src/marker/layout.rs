//! Scaled, bordered and repeated marker frames.
//!
//! A [`ModuleMatrix`] becomes a [`MarkerFrame`] by blowing every module up to
//! a `scale x scale` block, surrounding the result with a black border and,
//! optionally, tiling it as often as it fits into a display window. Pixels are
//! stored as packed RGB words, `0xFFFFFF` for on and `0x000000` for off.

use clap::ValueEnum;
use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};
use shared::image_size::ImageSize;

use super::{aruco, dot, qr, ArucoDictionary, MarkerError, MarkerResult, ModuleMatrix};

pub const ON_PIXEL: u32 = 0xFF_FFFF;
pub const OFF_PIXEL: u32 = 0x00_0000;

/// Marker families shown in the study.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerType {
    /// QR code, error correction level H
    Qr,
    /// Dot marker on a checkerboard lattice
    #[value(alias = "point")]
    #[serde(alias = "point")]
    Dot,
    /// ArUco tag; the payload is the marker id
    Aruco,
}

impl MarkerType {
    /// Encode `payload` into the module grid of this marker family.
    pub fn encode(&self, payload: &str, spec: &MarkerSpec) -> MarkerResult<ModuleMatrix> {
        match self {
            MarkerType::Qr => qr::encode(payload),
            MarkerType::Dot => dot::encode(payload),
            MarkerType::Aruco => {
                let id = payload
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| MarkerError::InvalidArucoPayload(payload.to_string()))?;
                aruco::marker_bits(spec.dictionary, id, spec.aruco_border_bits)
            }
        }
    }

    fn module_shape(&self) -> ModuleShape {
        match self {
            MarkerType::Dot => ModuleShape::Dot,
            MarkerType::Qr | MarkerType::Aruco => ModuleShape::Square,
        }
    }
}

/// How a single on-module is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleShape {
    Square,
    /// Filled circle; falls back to squares below a scale of 3
    Dot,
}

/// Parameters for building a marker frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerSpec {
    pub marker_type: MarkerType,
    /// Black border around the scaled marker, in pixels
    pub border_px: u32,
    /// Pixels per module
    pub scale: u32,
    /// Tile the marker over the whole window
    pub repeated: bool,
    pub dictionary: ArucoDictionary,
    pub aruco_border_bits: usize,
}

impl Default for MarkerSpec {
    fn default() -> Self {
        Self {
            marker_type: MarkerType::Qr,
            border_px: 4,
            scale: 8,
            repeated: false,
            dictionary: ArucoDictionary::Dict4x4_1000,
            aruco_border_bits: 1,
        }
    }
}

/// A rendered marker ready to be composited onto a display frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u32>,
    /// Show the inverted marker for this frame
    pub negative: bool,
}

impl MarkerFrame {
    pub fn size(&self) -> ImageSize {
        ImageSize::from_width_height(self.width, self.height)
    }

    /// Bytes needed for the packed pixel buffer.
    pub fn memory_size(&self) -> usize {
        self.pixels.len() * std::mem::size_of::<u32>()
    }

    pub fn pixel(&self, x: u32, y: u32) -> u32 {
        self.pixels[(y * self.width + x) as usize]
    }

    fn is_on(&self, x: u32, y: u32) -> bool {
        (self.pixel(x, y) != OFF_PIXEL) != self.negative
    }

    /// Grayscale rendering, honouring the `negative` flag.
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            if self.is_on(x, y) {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }

    /// RGB rendering, honouring the `negative` flag.
    pub fn to_rgb_image(&self) -> RgbImage {
        RgbImage::from_fn(self.width, self.height, |x, y| {
            if self.is_on(x, y) {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        })
    }

    fn from_gray(image: &GrayImage) -> Self {
        let pixels = image
            .pixels()
            .map(|p| if p.0[0] > 127 { ON_PIXEL } else { OFF_PIXEL })
            .collect();
        Self {
            width: image.width(),
            height: image.height(),
            pixels,
            negative: false,
        }
    }
}

/// Blow every module up to `scale x scale` pixels and add a black border.
pub fn scale_with_border(
    matrix: &ModuleMatrix,
    scale: u32,
    border_px: u32,
    shape: ModuleShape,
) -> MarkerResult<MarkerFrame> {
    if scale == 0 {
        return Err(MarkerError::ZeroScale);
    }

    let side = |modules: usize| {
        u32::try_from(modules)
            .ok()
            .and_then(|m| m.checked_mul(scale))
            .and_then(|px| border_px.checked_mul(2).and_then(|b| px.checked_add(b)))
    };
    let (width, height) = match (side(matrix.width()), side(matrix.height())) {
        (Some(w), Some(h)) if w.checked_mul(h).is_some() => (w, h),
        _ => return Err(MarkerError::TooLarge { scale, border_px }),
    };
    let mut canvas = GrayImage::new(width, height);
    let white = Luma([255u8]);

    for my in 0..matrix.height() {
        for mx in 0..matrix.width() {
            if !matrix.get(mx, my) {
                continue;
            }
            let x0 = border_px + mx as u32 * scale;
            let y0 = border_px + my as u32 * scale;

            if shape == ModuleShape::Dot && scale >= 3 {
                let center = ((x0 + scale / 2) as i32, (y0 + scale / 2) as i32);
                draw_filled_circle_mut(&mut canvas, center, ((scale - 1) / 2) as i32, white);
            } else {
                let block = Rect::at(x0 as i32, y0 as i32).of_size(scale, scale);
                draw_filled_rect_mut(&mut canvas, block, white);
            }
        }
    }

    Ok(MarkerFrame::from_gray(&canvas))
}

/// Tile `frame` as often as it fits into `window`.
///
/// The result covers `floor(window / frame)` copies in each direction and is
/// anchored at the top-left corner; left-over window space is not filled.
pub fn repeat_to_fit(frame: &MarkerFrame, window: ImageSize) -> MarkerResult<MarkerFrame> {
    let across = window.width / frame.width.max(1);
    let down = window.height / frame.height.max(1);
    if across == 0 || down == 0 {
        return Err(MarkerError::DoesNotFit {
            marker: frame.size(),
            window,
        });
    }

    let width = frame.width * across;
    let height = frame.height * down;
    let mut pixels = Vec::with_capacity((width * height) as usize);
    for y in 0..height {
        let row = (y % frame.height * frame.width) as usize;
        let source = &frame.pixels[row..row + frame.width as usize];
        for _ in 0..across {
            pixels.extend_from_slice(source);
        }
    }

    Ok(MarkerFrame {
        width,
        height,
        pixels,
        negative: frame.negative,
    })
}

/// Encode `payload` and lay it out for a display window of size `window`.
pub fn create_marker(
    payload: &str,
    spec: &MarkerSpec,
    window: ImageSize,
) -> MarkerResult<MarkerFrame> {
    let matrix = spec.marker_type.encode(payload, spec)?;
    let frame = scale_with_border(
        &matrix,
        spec.scale,
        spec.border_px,
        spec.marker_type.module_shape(),
    )?;

    if spec.repeated {
        return repeat_to_fit(&frame, window);
    }
    if !window.contains((0, 0), frame.size()) {
        return Err(MarkerError::DoesNotFit {
            marker: frame.size(),
            window,
        });
    }

    tracing::debug!(
        marker = ?spec.marker_type,
        size = %frame.size(),
        "Created marker frame"
    );
    Ok(frame)
}
