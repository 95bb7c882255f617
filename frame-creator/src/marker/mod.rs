//! Marker encoders and marker frame layout.
//!
//! Every encoder produces a [`ModuleMatrix`]: a grid of on/off modules where
//! "on" is rendered white. [`layout`] scales the grid, adds a black border and
//! optionally repeats it over a display window.

pub mod aruco;
pub mod cache;
pub mod dot;
pub mod layout;
pub mod qr;

pub use aruco::ArucoDictionary;
pub use cache::{FifoIdSource, IdSource, MarkerCache, StaticIdSource};
pub use layout::{create_marker, MarkerFrame, MarkerSpec, MarkerType};

use thiserror::Error;

/// Errors raised while encoding or laying out a marker.
#[derive(Error, Debug)]
pub enum MarkerError {
    #[error("Marker payload is empty")]
    EmptyPayload,

    #[error("Payload of {len} bytes exceeds the {max} byte limit of {kind} markers")]
    PayloadTooLong {
        kind: &'static str,
        len: usize,
        max: usize,
    },

    #[error("QR encoding failed: {0}")]
    Qr(String),

    #[error("Marker id {id} is out of range for {dictionary} ({len} markers)")]
    InvalidId {
        id: usize,
        dictionary: ArucoDictionary,
        len: usize,
    },

    #[error("ArUco payload must be a marker id, got '{0}'")]
    InvalidArucoPayload(String),

    #[error("Scale must be at least 1")]
    ZeroScale,

    #[error("Marker at scale {scale} with a {border_px} px border exceeds the image size limit")]
    TooLarge { scale: u32, border_px: u32 },

    #[error("Marker of {marker} does not fit into window {window}")]
    DoesNotFit {
        marker: shared::image_size::ImageSize,
        window: shared::image_size::ImageSize,
    },
}

pub type MarkerResult<T> = Result<T, MarkerError>;

/// Grid of marker modules, row-major, `true` = on (white).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleMatrix {
    width: usize,
    height: usize,
    modules: Vec<bool>,
}

impl ModuleMatrix {
    /// Create an all-off matrix.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            modules: vec![false; width * height],
        }
    }

    /// Build a matrix from row-major module values.
    ///
    /// Returns `None` when the number of modules does not match the size.
    pub fn from_modules(width: usize, height: usize, modules: Vec<bool>) -> Option<Self> {
        (modules.len() == width * height).then_some(Self {
            width,
            height,
            modules,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> bool {
        self.modules[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, on: bool) {
        self.modules[y * self.width + x] = on;
    }

    /// Number of on modules.
    pub fn on_count(&self) -> usize {
        self.modules.iter().filter(|&&m| m).count()
    }

    pub fn modules(&self) -> &[bool] {
        &self.modules
    }
}
