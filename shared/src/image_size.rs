//! Image dimensions and placement utilities

use image::GenericImageView;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Image dimensions structure
///
/// Represents the width and height of a frame, marker or display window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
}

impl ImageSize {
    /// Create a new ImageSize
    pub fn from_width_height(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Size of an existing image
    pub fn of<I: GenericImageView>(image: &I) -> Self {
        let (width, height) = image.dimensions();
        Self { width, height }
    }

    /// Get total number of pixels
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Whether a rectangle of size `inner` placed with its top-left corner at
    /// `offset` lies completely inside this size.
    pub fn contains(&self, offset: (u32, u32), inner: ImageSize) -> bool {
        let (x, y) = offset;
        x.checked_add(inner.width)
            .is_some_and(|right| right <= self.width)
            && y.checked_add(inner.height)
                .is_some_and(|bottom| bottom <= self.height)
    }

    /// Convert to tuple (width, height)
    pub fn to_tuple(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Create from tuple (width, height)
    pub fn from_tuple(dimensions: (u32, u32)) -> Self {
        Self {
            width: dimensions.0,
            height: dimensions.1,
        }
    }
}

impl From<(u32, u32)> for ImageSize {
    fn from(dimensions: (u32, u32)) -> Self {
        Self::from_tuple(dimensions)
    }
}

impl From<ImageSize> for (u32, u32) {
    fn from(size: ImageSize) -> Self {
        size.to_tuple()
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("Invalid image size '{0}', expected WIDTHxHEIGHT (e.g. 1920x1080)")]
pub struct ParseImageSizeError(String);

impl FromStr for ImageSize {
    type Err = ParseImageSizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| ParseImageSizeError(s.to_string()))?;
        let width = w
            .trim()
            .parse::<u32>()
            .map_err(|_| ParseImageSizeError(s.to_string()))?;
        let height = h
            .trim()
            .parse::<u32>()
            .map_err(|_| ParseImageSizeError(s.to_string()))?;
        if width == 0 || height == 0 {
            return Err(ParseImageSizeError(s.to_string()));
        }
        Ok(Self { width, height })
    }
}
