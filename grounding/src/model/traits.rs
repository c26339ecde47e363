//! Interfaces of the networks plugged into the grounding model.

use crate::common::*;

/// A convolutional backbone producing multi-scale feature maps.
pub trait VisualBackbone
where
    Self: Debug + Send,
{
    /// Channel sizes of the produced feature maps, deepest first.
    fn output_channels(&self) -> Vec<i64>;

    /// Compute `[batch, channels, height, width]` feature maps, deepest first.
    fn forward_t(&self, images: &Tensor, train: bool) -> Result<Vec<Tensor>>;
}

/// A phrase encoder producing one embedding per phrase.
pub trait LanguageEncoder
where
    Self: Debug + Send,
{
    /// The length of the phrase embedding.
    fn output_dim(&self) -> i64;

    /// Encode `[batch, length]` token ids into a `[batch, output_dim]` embedding.
    ///
    /// The mask is non-zero on real tokens.
    fn forward_t(&self, token_ids: &Tensor, mask: &Tensor, train: bool) -> Result<Tensor>;
}

/// The loss or decoding function applied to the raw predictions.
pub trait GroundingCriterion
where
    Self: Debug + Send,
{
    /// Score the per-scale predictions.
    ///
    /// `targets` is `None` at test time, where the criterion decodes boxes instead.
    fn forward(&self, outputs: &[Tensor], targets: Option<&Tensor>) -> Result<Tensor>;
}
