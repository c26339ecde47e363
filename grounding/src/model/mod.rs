//! The grounding model and its components.

mod coord;
mod fusion;
mod grounding;
mod predictor;
mod traits;

pub use coord::*;
pub use fusion::*;
pub use grounding::*;
pub use predictor::*;
pub use traits::*;
