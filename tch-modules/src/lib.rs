//! Neural network building blocks on top of libtorch.

mod common;
pub mod conv_bn_2d;
pub mod instance_norm;
pub mod l2_norm;
pub mod mlp;

pub use conv_bn_2d::*;
pub use instance_norm::*;
pub use l2_norm::*;
pub use mlp::*;
