//! Shared components for the marker visibility study tools.

pub mod duration_arg;
pub mod fifo;
pub mod image_size;
pub mod test_util;
