//! Overlay sheet of ArUco tags on a white canvas.
//!
//! Tiles are laid out in a grid starting `gap_px` from the left and `top_px`
//! from the top, separated by `gap_px`. Whatever the grid leaves over on the
//! right and bottom stays white.

use image::{imageops, GrayImage, Luma};
use shared::image_size::ImageSize;
use thiserror::Error;

use crate::marker::aruco::generate_image_marker;
use crate::marker::{ArucoDictionary, MarkerError};

#[derive(Error, Debug)]
pub enum SheetError {
    #[error("Sheet grid needs {needed} but the canvas is {canvas}")]
    DoesNotFit { needed: ImageSize, canvas: ImageSize },

    #[error(transparent)]
    Marker(#[from] MarkerError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetLayout {
    pub canvas: ImageSize,
    pub tile_px: u32,
    pub gap_px: u32,
    pub columns: u32,
    pub rows: u32,
    pub top_px: u32,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            canvas: ImageSize::from_width_height(1920, 1080),
            tile_px: 300,
            gap_px: 25,
            columns: 5,
            rows: 3,
            top_px: 25,
        }
    }
}

impl SheetLayout {
    /// Space taken up by the tile grid including its leading margins.
    pub fn grid_size(&self) -> ImageSize {
        let pitch = self.tile_px + self.gap_px;
        ImageSize::from_width_height(
            self.gap_px + self.columns * pitch,
            self.top_px + self.rows * pitch,
        )
    }

    pub fn fits(&self) -> bool {
        let grid = self.grid_size();
        grid.width <= self.canvas.width && grid.height <= self.canvas.height
    }

    /// Top-left corner of every tile, row by row.
    pub fn tile_origins(&self) -> Vec<(u32, u32)> {
        let pitch = self.tile_px + self.gap_px;
        (0..self.rows)
            .flat_map(|row| {
                (0..self.columns)
                    .map(move |col| (self.gap_px + col * pitch, self.top_px + row * pitch))
            })
            .collect()
    }
}

/// Render marker `id` of `dictionary` into every tile of `layout`.
pub fn render_sheet(
    dictionary: ArucoDictionary,
    id: usize,
    layout: &SheetLayout,
) -> Result<GrayImage, SheetError> {
    if !layout.fits() {
        return Err(SheetError::DoesNotFit {
            needed: layout.grid_size(),
            canvas: layout.canvas,
        });
    }

    let tag = generate_image_marker(dictionary, id, layout.tile_px, 1)?;
    let mut sheet = GrayImage::from_pixel(layout.canvas.width, layout.canvas.height, Luma([255]));
    for (x, y) in layout.tile_origins() {
        imageops::replace(&mut sheet, &tag, x as i64, y as i64);
    }
    Ok(sheet)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_fills_full_hd() {
        let layout = SheetLayout::default();
        assert!(layout.fits());
        assert_eq!(layout.grid_size(), ImageSize::from_width_height(1650, 1000));

        let origins = layout.tile_origins();
        assert_eq!(origins.len(), 15);
        assert_eq!(origins[0], (25, 25));
        assert_eq!(origins[4], (1325, 25));
        assert_eq!(origins[14], (1325, 675));
    }

    #[test]
    fn test_layout_too_large() {
        let layout = SheetLayout {
            columns: 6,
            ..SheetLayout::default()
        };
        assert!(!layout.fits());
        assert!(matches!(
            render_sheet(ArucoDictionary::Dict4x4_1000, 1, &layout),
            Err(SheetError::DoesNotFit { .. })
        ));
    }

    #[test]
    fn test_render_sheet_places_tags_on_white() {
        let layout = SheetLayout {
            canvas: ImageSize::from_width_height(200, 100),
            tile_px: 60,
            gap_px: 10,
            columns: 2,
            rows: 1,
            top_px: 10,
        };
        let sheet = render_sheet(ArucoDictionary::Dict6x6_1000, 1, &layout).unwrap();
        assert_eq!(sheet.dimensions(), (200, 100));

        // Margins and right padding stay white
        assert_eq!(sheet.get_pixel(0, 0).0[0], 255);
        assert_eq!(sheet.get_pixel(199, 99).0[0], 255);
        // Tag border bits are black
        assert_eq!(sheet.get_pixel(10, 10).0[0], 0);
        assert_eq!(sheet.get_pixel(80, 10).0[0], 0);
    }

    #[test]
    fn test_invalid_id_propagates() {
        let err = render_sheet(ArucoDictionary::Dict4x4_1000, 5000, &SheetLayout::default());
        assert!(matches!(
            err,
            Err(SheetError::Marker(MarkerError::InvalidId { .. }))
        ));
    }
}
