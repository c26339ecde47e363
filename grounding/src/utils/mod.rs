//! Utility functions and types.

mod image;

pub use image::*;
