//! Dataset processing toolkit.

mod csv;
mod referring;

pub use self::csv::*;
pub use referring::*;

use crate::common::*;

/// Random access to annotated referring expressions.
pub trait AnnotationStore
where
    Self: Debug + Send,
{
    fn num_records(&self) -> usize;

    fn image_path(&self, index: usize) -> Result<&Path>;

    /// The `[left, top, right, bottom]` box in pixels.
    fn annotation_box(&self, index: usize) -> Result<[i64; 4]>;

    fn phrase(&self, index: usize) -> Result<&str>;
}
