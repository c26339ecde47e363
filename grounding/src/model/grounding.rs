use super::{
    fusion::{Fusion, FusionInit},
    predictor::{Predictor, PredictorInit},
    traits::{GroundingCriterion, LanguageEncoder, VisualBackbone},
};
use crate::{
    common::*,
    config::{Anchor, ModelConfig, NUM_ANCHORS, NUM_SCALES},
    error::GroundingError,
};

/// The one-stage visual grounding model.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct GroundingModel {
    #[derivative(Debug = "ignore")]
    visual_encoder: Box<dyn VisualBackbone>,
    #[derivative(Debug = "ignore")]
    lang_encoder: Box<dyn LanguageEncoder>,
    #[derivative(Debug = "ignore")]
    criterion: Box<dyn GroundingCriterion>,
    fusion: Fusion,
    predictor: Predictor,
    anchors: [[Anchor; NUM_ANCHORS]; NUM_SCALES],
    input_size: usize,
}

impl GroundingModel {
    /// Build the fusion and prediction heads around the given collaborators.
    ///
    /// Fails if the collaborators disagree with the configured channel sizes.
    pub fn new<'p, P>(
        path: P,
        config: &ModelConfig,
        visual_encoder: Box<dyn VisualBackbone>,
        lang_encoder: Box<dyn LanguageEncoder>,
        criterion: Box<dyn GroundingCriterion>,
    ) -> Result<Self>
    where
        P: Borrow<nn::Path<'p>>,
    {
        let path = path.borrow();
        config.validate()?;

        let ModelConfig {
            joint_embedding_size,
            joint_embedding_dropout,
            joint_out_dim,
            visual_dims,
            ref anchors,
            input_size,
            balance_init,
            ..
        } = *config;
        let lang_dim = config.lang_dim()?;

        // check the collaborators against the configuration
        {
            let channels = visual_encoder.output_channels();
            ensure!(
                channels.len() == NUM_SCALES,
                "the visual backbone produces {} scales, but {} are expected",
                channels.len(),
                NUM_SCALES
            );
            for (&actual, &expect) in izip!(&channels, &visual_dims) {
                if actual != expect as i64 {
                    return Err(GroundingError::ChannelMismatch {
                        what: "visual backbone",
                        expect: expect as i64,
                        actual,
                    }
                    .into());
                }
            }

            let actual = lang_encoder.output_dim();
            if actual != lang_dim as i64 {
                return Err(GroundingError::ChannelMismatch {
                    what: "language encoder",
                    expect: lang_dim as i64,
                    actual,
                }
                .into());
            }
        }

        let fusion = FusionInit {
            visual_dims,
            lang_dim,
            joint_embedding_size: joint_embedding_size.get(),
            joint_embedding_dropout,
            joint_out_dim: joint_out_dim.get(),
        }
        .build(path / "fusion")?;
        let predictor = PredictorInit {
            in_c: joint_out_dim.get(),
            balance_init,
        }
        .build(path / "predictor");

        info!(
            "grounding model built with {} scales, joint_inp_dim={}, joint_out_dim={}, balance_init={}",
            NUM_SCALES,
            fusion.joint_inp_dim(),
            fusion.joint_out_dim(),
            balance_init
        );

        Ok(Self {
            visual_encoder,
            lang_encoder,
            criterion,
            fusion,
            predictor,
            anchors: anchors.clone(),
            input_size: input_size.get(),
        })
    }

    /// Predict raw per-scale outputs.
    ///
    /// `images` is `[batch, 3, height, width]` and `phrases` is `[batch, length]`
    /// token ids. The mask defaults to the non-zero token ids. Each output is
    /// `[batch, 15, height_s, width_s]`, deepest scale first.
    pub fn forward_t(
        &self,
        images: &Tensor,
        phrases: &Tensor,
        masks: Option<&Tensor>,
        train: bool,
    ) -> Result<Vec<Tensor>> {
        let (batch_size, _channels, _height, _width) = images.size4()?;
        let (phrase_batch_size, _length) = phrases.size2()?;
        ensure!(
            batch_size == phrase_batch_size,
            "images and phrases have different batch sizes {} and {}",
            batch_size,
            phrase_batch_size
        );

        let visual_feats = self.visual_encoder.forward_t(images, train)?;
        let lang_feat = match masks {
            Some(masks) => self.lang_encoder.forward_t(phrases, masks, train)?,
            None => {
                let masks = phrases.f_gt(0i64)?;
                self.lang_encoder.forward_t(phrases, &masks, train)?
            }
        };

        let joint_feats = self.fusion.forward_t(&visual_feats, &lang_feat, train)?;
        self.predictor.forward_t(&joint_feats, train)
    }

    /// Predict and hand the outputs to the criterion for decoding.
    pub fn forward_test(
        &self,
        images: &Tensor,
        phrases: &Tensor,
        masks: Option<&Tensor>,
    ) -> Result<Tensor> {
        let outputs = self.forward_t(images, phrases, masks, false)?;
        self.criterion.forward(&outputs, None)
    }

    /// Score the outputs against targets with the criterion.
    pub fn loss(&self, outputs: &[Tensor], targets: &Tensor) -> Result<Tensor> {
        self.criterion.forward(outputs, Some(targets))
    }

    /// Anchors in pixel units, one group per output scale.
    pub fn anchors(&self) -> &[[Anchor; NUM_ANCHORS]; NUM_SCALES] {
        &self.anchors
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn joint_inp_dim(&self) -> i64 {
        self.fusion.joint_inp_dim()
    }
}
