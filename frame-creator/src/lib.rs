//! Marker generation and dual-exposure frame compositing for the marker
//! visibility study.
//!
//! Markers (QR, ArUco, dot) are produced as [`marker::ModuleMatrix`] grids,
//! laid out into pixel frames by [`marker::layout`], and hidden in background
//! frames by [`embed`] as a bright/dark image pair.

pub mod color;
pub mod embed;
pub mod marker;
pub mod sheet;
