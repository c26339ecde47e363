//! Language-conditioned visual grounding on three feature scales, with the
//! referring expression dataset that feeds it.

mod common;
pub mod config;
pub mod dataset;
pub mod error;
pub mod model;
pub mod processor;
pub mod tokenizer;
pub mod utils;
