use super::coord::{coord_map, COORD_CHANNELS};
use crate::{common::*, config::NUM_SCALES, error::GroundingError};
use tch_modules::{
    ConvBn2D, ConvBn2DInit, InstanceNorm, InstanceNormInit, L2Normalize as _, MlpProjection,
    MlpProjectionInit,
};

#[derive(Debug, Clone)]
pub struct FusionInit {
    /// Channel sizes of visual feature maps, deepest first.
    pub visual_dims: [usize; NUM_SCALES],
    pub lang_dim: usize,
    pub joint_embedding_size: usize,
    pub joint_embedding_dropout: R64,
    pub joint_out_dim: usize,
}

impl FusionInit {
    pub fn build<'p, P>(self, path: P) -> Result<Fusion>
    where
        P: Borrow<nn::Path<'p>>,
    {
        let path = path.borrow();
        let Self {
            visual_dims,
            lang_dim,
            joint_embedding_size,
            joint_embedding_dropout,
            joint_out_dim,
        } = self;

        ensure!(
            visual_dims.iter().all(|&dim| dim > 0),
            "visual_dims must be positive, but get {:?}",
            visual_dims
        );
        ensure!(
            joint_embedding_size > 0 && joint_out_dim > 0,
            "joint_embedding_size and joint_out_dim must be positive"
        );

        let mapping_lang = MlpProjectionInit {
            in_dim: lang_dim,
            out_dim: joint_embedding_size,
            dropout: joint_embedding_dropout,
        }
        .build(path / "mapping_lang")?;

        let joint_inp_dim = COORD_CHANNELS as usize + 2 * joint_embedding_size;
        let scales: Vec<_> = visual_dims
            .iter()
            .enumerate()
            .map(|(index, &visual_dim)| -> Result<_> {
                let path = path / format!("scale_{}", index);

                Ok(ScaleFusion {
                    visual_dim: visual_dim as i64,
                    norm: InstanceNormInit::default().build(visual_dim as i64)?,
                    mapping_visu: ConvBn2DInit::new(visual_dim, joint_embedding_size, 1)
                        .build(&path / "mapping_visu"),
                    joint_fusion: ConvBn2DInit::new(joint_inp_dim, joint_out_dim, 1)
                        .build(&path / "joint_fusion"),
                })
            })
            .try_collect()?;
        let scales: [ScaleFusion; NUM_SCALES] = scales
            .try_into()
            .map_err(|_| format_err!("expect {} scales", NUM_SCALES))?;

        Ok(Fusion {
            lang_dim: lang_dim as i64,
            joint_embedding_size: joint_embedding_size as i64,
            joint_out_dim: joint_out_dim as i64,
            mapping_lang,
            scales,
        })
    }
}

/// Combines multi-scale visual features with a phrase embedding.
#[derive(Debug)]
pub struct Fusion {
    lang_dim: i64,
    joint_embedding_size: i64,
    joint_out_dim: i64,
    mapping_lang: MlpProjection,
    scales: [ScaleFusion; NUM_SCALES],
}

impl Fusion {
    /// The channel size of the concatenated `[visual, language, coordinate]` map.
    pub fn joint_inp_dim(&self) -> i64 {
        COORD_CHANNELS + 2 * self.joint_embedding_size
    }

    pub fn joint_out_dim(&self) -> i64 {
        self.joint_out_dim
    }

    /// Project a `[batch, lang_dim]` embedding to the unit-length joint embedding.
    pub fn project_language(&self, lang_feat: &Tensor, train: bool) -> Result<Tensor> {
        let (_batch_size, lang_dim) = lang_feat.size2()?;
        if lang_dim != self.lang_dim {
            return Err(GroundingError::ChannelMismatch {
                what: "language projection",
                expect: self.lang_dim,
                actual: lang_dim,
            }
            .into());
        }

        lang_feat.apply_t(&self.mapping_lang, train).f_l2_normalize(1)
    }

    /// Produce one `[batch, joint_out_dim, height, width]` map per scale.
    ///
    /// The language projection runs once and is shared by all scales.
    pub fn forward_t(
        &self,
        visual_feats: &[Tensor],
        lang_feat: &Tensor,
        train: bool,
    ) -> Result<Vec<Tensor>> {
        ensure!(
            visual_feats.len() == NUM_SCALES,
            "expect {} visual feature maps, but get {}",
            NUM_SCALES,
            visual_feats.len()
        );

        let (batch_size, _lang_dim) = lang_feat.size2()?;
        let lang = self.project_language(lang_feat, train)?.view([
            batch_size,
            self.joint_embedding_size,
            1,
            1,
        ]);

        izip!(&self.scales, visual_feats)
            .map(|(scale, visual_feat)| scale.forward_t(visual_feat, &lang, train))
            .try_collect()
    }
}

#[derive(Debug)]
struct ScaleFusion {
    visual_dim: i64,
    norm: InstanceNorm,
    mapping_visu: ConvBn2D,
    joint_fusion: ConvBn2D,
}

impl ScaleFusion {
    fn forward_t(&self, visual_feat: &Tensor, lang: &Tensor, train: bool) -> Result<Tensor> {
        let Self {
            visual_dim,
            ref norm,
            ref mapping_visu,
            ref joint_fusion,
        } = *self;

        let (batch_size, channels, height, width) = visual_feat.size4()?;
        if channels != visual_dim {
            return Err(GroundingError::ChannelMismatch {
                what: "visual feature map",
                expect: visual_dim,
                actual: channels,
            }
            .into());
        }
        let (lang_batch_size, embedding_size, _, _) = lang.size4()?;
        ensure!(
            lang_batch_size == batch_size,
            "batch size mismatch between visual ({}) and language ({}) features",
            batch_size,
            lang_batch_size
        );

        let coord = coord_map(batch_size, height, width, visual_feat.device())?;
        let visu = norm
            .forward(visual_feat)?
            .apply_t(mapping_visu, train);
        let lang = lang.f_expand(&[batch_size, embedding_size, height, width], false)?;
        let joint = Tensor::f_cat(&[visu, lang, coord], 1)?;

        Ok(joint.apply_t(joint_fusion, train))
    }
}
