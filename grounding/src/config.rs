//! Model, dataset and augmentation configuration format.

use crate::{common::*, error::GroundingError};

pub use augment::*;
pub use dataset::*;
pub use model::*;

/// The number of feature map scales consumed by the fusion and prediction heads.
pub const NUM_SCALES: usize = 3;
/// The number of anchors per scale.
pub const NUM_ANCHORS: usize = 3;

/// The main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub model: ModelConfig,
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub augment: AugmentConfig,
}

impl Config {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("unable to read config file '{}'", path.display()))?;
        let config: Self = json5::from_str(&text)
            .with_context(|| format!("unable to parse config file '{}'", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.model.validate()?;
        self.dataset.validate()?;
        self.augment.validate()?;
        Ok(())
    }
}

mod model {
    use super::*;

    /// The model configuration.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ModelConfig {
        /// The size of the shared visual-language embedding.
        pub joint_embedding_size: NonZeroUsize,
        /// The dropout rate inside the language projection.
        pub joint_embedding_dropout: R64,
        /// The channel size of fused feature maps.
        pub joint_out_dim: NonZeroUsize,
        /// Channel sizes of backbone feature maps, deepest first.
        #[serde(default = "default_visual_dims")]
        pub visual_dims: [usize; NUM_SCALES],
        /// The language encoder selection.
        pub encoder: EncoderConfig,
        /// Anchors per scale in pixel units, deepest scale first.
        pub anchors: [[Anchor; NUM_ANCHORS]; NUM_SCALES],
        /// The input image size.
        pub input_size: NonZeroUsize,
        /// If set, initialize the prediction heads with the low confidence prior.
        #[serde(default = "default_balance_init")]
        pub balance_init: bool,
    }

    impl ModelConfig {
        pub fn validate(&self) -> Result<()> {
            let dropout = self.joint_embedding_dropout.raw();
            ensure!(
                (0.0..1.0).contains(&dropout),
                "joint_embedding_dropout must be in range [0, 1), but get {}",
                dropout
            );
            ensure!(
                self.visual_dims.iter().all(|&dim| dim > 0),
                "visual_dims must be positive, but get {:?}",
                self.visual_dims
            );
            ensure!(
                self.anchors.iter().flatten().all(|anchor| anchor.w > 0 && anchor.h > 0),
                "anchor sizes must be positive"
            );
            self.encoder.lang_dim()?;
            Ok(())
        }

        /// The length of the embedding produced by the language encoder.
        pub fn lang_dim(&self) -> Result<usize> {
            self.encoder.lang_dim()
        }
    }

    /// The language encoder variants.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(tag = "kind")]
    pub enum EncoderConfig {
        /// A pretrained BERT checkpoint.
        Transformer { model_name: String },
        /// A recurrent encoder over word embeddings.
        Recurrent {
            hidden_size: NonZeroUsize,
            #[serde(default)]
            bidirectional: bool,
        },
    }

    impl EncoderConfig {
        pub fn lang_dim(&self) -> Result<usize> {
            let dim = match self {
                Self::Transformer { model_name } => match model_name.as_str() {
                    "bert-base-uncased" => 768,
                    "bert-large-uncased" => 1024,
                    _ => return Err(GroundingError::UnsupportedEncoder(model_name.clone()).into()),
                },
                Self::Recurrent {
                    hidden_size,
                    bidirectional,
                } => {
                    let num_directions = if *bidirectional { 2 } else { 1 };
                    hidden_size.get() * num_directions
                }
            };
            Ok(dim)
        }
    }

    /// An anchor size, written as `[width, height]` in pixels.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(from = "[usize; 2]", into = "[usize; 2]")]
    pub struct Anchor {
        pub w: usize,
        pub h: usize,
    }

    impl From<[usize; 2]> for Anchor {
        fn from([w, h]: [usize; 2]) -> Self {
            Self { w, h }
        }
    }

    impl From<Anchor> for [usize; 2] {
        fn from(anchor: Anchor) -> Self {
            [anchor.w, anchor.h]
        }
    }

    fn default_visual_dims() -> [usize; NUM_SCALES] {
        [1024, 512, 256]
    }

    fn default_balance_init() -> bool {
        true
    }
}

mod dataset {
    use super::*;

    /// Dataset options.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct DatasetConfig {
        /// The directory that image paths in the annotation file are relative to.
        pub image_dir: PathBuf,
        /// The CSV annotation file.
        pub annotation_file: PathBuf,
        /// The `tokenizer.json` file of the language encoder.
        pub tokenizer_file: PathBuf,
        /// Per-channel RGB mean in ratio unit.
        pub mean: [R64; 3],
        /// Per-channel RGB standard deviation in ratio unit.
        pub std: [R64; 3],
        /// PCA eigenvalues for lighting noise.
        #[serde(default = "default_eig_val")]
        pub eig_val: [R64; 3],
        /// PCA eigenvectors for lighting noise, one row per channel.
        #[serde(default = "default_eig_vec")]
        pub eig_vec: [[R64; 3]; 3],
        /// The letterbox size of non-augmented samples.
        pub input_size: NonZeroUsize,
        /// The fixed token sequence length.
        pub max_query_len: NonZeroUsize,
        /// The maximum number of attempts to find a sample with a valid box.
        #[serde(default = "default_max_retries")]
        pub max_retries: usize,
        /// If set, shuffle the index pool once when the dataset is opened.
        #[serde(default)]
        pub shuffle: bool,
    }

    impl DatasetConfig {
        pub fn validate(&self) -> Result<()> {
            ensure!(
                self.std.iter().all(|&std| std > 0.0),
                "std entries must be positive, but get {:?}",
                self.std
            );
            ensure!(self.max_retries > 0, "max_retries must be positive");
            ensure!(
                self.max_query_len.get() >= 2,
                "max_query_len must leave room for the [CLS] and [SEP] tokens"
            );
            Ok(())
        }
    }

    fn default_max_retries() -> usize {
        100
    }

    fn default_eig_val() -> [R64; 3] {
        [0.2141788, 0.01817699, 0.00629258].map(r64)
    }

    fn default_eig_vec() -> [[R64; 3]; 3] {
        [
            [-0.58752847, -0.69563484, 0.41340352],
            [-0.5832747, 0.00994535, -0.81221408],
            [-0.56089297, 0.71832671, 0.41158938],
        ]
        .map(|row| row.map(r64))
    }
}

mod augment {
    use super::*;

    /// Data augmentation options.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(default)]
    pub struct AugmentConfig {
        /// Master switch. If unset, samples are letterboxed instead.
        pub data_aug: bool,
        /// Enable vertical and horizontal flips.
        pub random_flip: bool,
        /// Enable the random crop.
        pub random_affine: bool,
        /// Enable brightness, contrast and saturation jittering.
        pub random_color: bool,
        /// Enable PCA lighting noise. It takes effect only with `random_color`.
        pub random_lighting: bool,
        /// The probability of each flip.
        pub flip_prob: R64,
        /// The probability of the random crop.
        pub crop_prob: R64,
        /// The maximum trimmed fraction per side in the random crop.
        pub max_crop_ratio: R64,
        /// The maximum relative change of brightness, contrast and saturation.
        pub color_jitter_var: R64,
        /// The standard deviation of lighting noise coefficients.
        pub lighting_std: R64,
    }

    impl AugmentConfig {
        pub fn validate(&self) -> Result<()> {
            let unit = 0.0..=1.0;
            ensure!(
                unit.contains(&self.flip_prob.raw()),
                "flip_prob must be in range [0, 1]"
            );
            ensure!(
                unit.contains(&self.crop_prob.raw()),
                "crop_prob must be in range [0, 1]"
            );
            ensure!(
                (0.0..0.5).contains(&self.max_crop_ratio.raw()),
                "max_crop_ratio must be in range [0, 0.5)"
            );
            ensure!(
                unit.contains(&self.color_jitter_var.raw()),
                "color_jitter_var must be in range [0, 1]"
            );
            ensure!(self.lighting_std >= 0.0, "lighting_std must be non-negative");
            Ok(())
        }
    }

    impl Default for AugmentConfig {
        fn default() -> Self {
            Self {
                data_aug: true,
                random_flip: true,
                random_affine: true,
                random_color: false,
                random_lighting: false,
                flip_prob: r64(0.5),
                crop_prob: r64(0.5),
                max_crop_ratio: r64(0.15),
                color_jitter_var: r64(0.4),
                lighting_std: r64(0.1),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG_TEXT: &str = r#"{
        model: {
            joint_embedding_size: 512,
            joint_embedding_dropout: 0.1,
            joint_out_dim: 512,
            encoder: { kind: "Transformer", model_name: "bert-base-uncased" },
            anchors: [
                [[116, 90], [156, 198], [373, 326]],
                [[30, 61], [62, 45], [59, 119]],
                [[10, 13], [16, 30], [33, 23]],
            ],
            input_size: 416,
        },
        dataset: {
            image_dir: "images",
            annotation_file: "refs.csv",
            tokenizer_file: "tokenizer.json",
            mean: [0.485, 0.456, 0.406],
            std: [0.229, 0.224, 0.225],
            input_size: 416,
            max_query_len: 20,
        },
    }"#;

    #[test]
    fn parse_config_with_defaults() -> Result<()> {
        let config: Config = json5::from_str(CONFIG_TEXT)?;
        config.validate()?;

        assert_eq!(config.model.lang_dim()?, 768);
        assert_eq!(config.model.visual_dims, [1024, 512, 256]);
        assert_eq!(config.model.anchors[0][0], Anchor { w: 116, h: 90 });
        assert!(config.model.balance_init);
        assert_eq!(config.dataset.max_retries, 100);
        assert!(!config.dataset.shuffle);
        assert!(config.augment.data_aug);
        assert!(!config.augment.random_color);
        assert_abs_diff_eq!(config.augment.max_crop_ratio.raw(), 0.15);
        Ok(())
    }

    #[test]
    fn open_config_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.json5");
        std::fs::write(&path, CONFIG_TEXT)?;

        let config = Config::open(&path)?;
        assert_eq!(config.dataset.max_query_len.get(), 20);
        Ok(())
    }

    #[test]
    fn encoder_lang_dim() -> Result<()> {
        let large = EncoderConfig::Transformer {
            model_name: "bert-large-uncased".into(),
        };
        assert_eq!(large.lang_dim()?, 1024);

        let recurrent = EncoderConfig::Recurrent {
            hidden_size: NonZeroUsize::new(256).unwrap(),
            bidirectional: true,
        };
        assert_eq!(recurrent.lang_dim()?, 512);

        let unknown = EncoderConfig::Transformer {
            model_name: "gpt2".into(),
        };
        let err = unknown.lang_dim().unwrap_err();
        assert_eq!(
            err.downcast_ref::<GroundingError>(),
            Some(&GroundingError::UnsupportedEncoder("gpt2".into()))
        );
        Ok(())
    }

    #[test]
    fn reject_out_of_range_probability() {
        let augment = AugmentConfig {
            flip_prob: r64(1.5),
            ..Default::default()
        };
        assert!(augment.validate().is_err());

        let augment = AugmentConfig {
            max_crop_ratio: r64(0.5),
            ..Default::default()
        };
        assert!(augment.validate().is_err());
    }
}
