//! Data preprocessing building blocks.

pub mod augment;
pub mod color_jitter;
pub mod lighting;
pub mod phrase;

pub use augment::*;
pub use color_jitter::*;
pub use lighting::*;
pub use phrase::*;
