use super::{AnnotationStore, CsvAnnotations};
use crate::{
    common::*,
    config::{AugmentConfig, Config, DatasetConfig},
    error::GroundingError,
    processor::{
        AugmentedSample, ColorJitter, ColorJitterInit, Lighting, LightingInit, SampleAugmentor,
        SampleAugmentorInit,
    },
    tokenizer::{BertPhraseTokenizer, PhraseTokenizer, TokenizedPhrase},
    utils::ImageTensorExt as _,
};

/// A training sample.
#[derive(Debug)]
pub struct TrainSample {
    /// The standardized `[3, height, width]` float image.
    pub image: Tensor,
    /// The clipped `[left, top, right, bottom]` box in pixels.
    pub ltrb: [i64; 4],
    pub token_ids: Vec<i64>,
    pub token_mask: Vec<i64>,
}

/// An evaluation sample.
#[derive(Debug)]
pub struct TestSample {
    /// The standardized `[3, height, width]` float image.
    pub image: Tensor,
    /// The `Kind::Int64` token ids of shape `[max_query_len]`.
    pub token_ids: Tensor,
    /// The `(height, width, channels)` of the loaded image.
    pub original_shape: [i64; 3],
}

#[derive(Debug)]
pub enum Sample {
    Train(TrainSample),
    Test(TestSample),
}

/// Referring expression samples ready for the grounding model.
#[derive(Debug)]
pub struct ReferringDataset {
    store: Box<dyn AnnotationStore>,
    tokenizer: Box<dyn PhraseTokenizer>,
    db_inds: Vec<usize>,
    augmentor: Option<SampleAugmentor>,
    color_jitter: Option<ColorJitter>,
    lighting: Option<Lighting>,
    mean: [f64; 3],
    std: [f64; 3],
    input_size: i64,
    max_query_len: usize,
    max_retries: usize,
    test: bool,
}

impl ReferringDataset {
    /// Open the CSV annotations and the tokenizer named in the configuration.
    pub fn open<R>(rng: &mut R, config: &Config, test: bool) -> Result<Self>
    where
        R: Rng + ?Sized,
    {
        let Config {
            dataset, augment, ..
        } = config;

        let store = CsvAnnotations::open(&dataset.image_dir, &dataset.annotation_file)?;
        let tokenizer = BertPhraseTokenizer::open(&dataset.tokenizer_file)?;
        Self::new(
            rng,
            Box::new(store),
            Box::new(tokenizer),
            dataset,
            augment,
            test,
        )
    }

    pub fn new<R>(
        rng: &mut R,
        store: Box<dyn AnnotationStore>,
        tokenizer: Box<dyn PhraseTokenizer>,
        dataset: &DatasetConfig,
        augment: &AugmentConfig,
        test: bool,
    ) -> Result<Self>
    where
        R: Rng + ?Sized,
    {
        dataset.validate()?;
        augment.validate()?;

        let DatasetConfig {
            mean,
            std,
            eig_val,
            eig_vec,
            input_size,
            max_query_len,
            max_retries,
            shuffle,
            ..
        } = *dataset;
        let AugmentConfig {
            data_aug,
            random_flip,
            random_affine,
            random_color,
            random_lighting,
            flip_prob,
            crop_prob,
            max_crop_ratio,
            color_jitter_var,
            lighting_std,
        } = *augment;

        let augmentor = data_aug
            .then(|| {
                SampleAugmentorInit {
                    flip_prob,
                    crop_prob,
                    max_crop_ratio,
                    vertical_flip: random_flip,
                    horizontal_flip: random_flip,
                    random_crop: random_affine,
                }
                .build()
            })
            .transpose()?;
        let color_jitter = (data_aug && random_color)
            .then(|| ColorJitterInit::uniform(color_jitter_var).build())
            .transpose()?;
        let lighting = (data_aug && random_color && random_lighting)
            .then(|| {
                LightingInit {
                    std: lighting_std,
                    eig_val,
                    eig_vec,
                }
                .build()
            })
            .transpose()?;

        let mut db_inds: Vec<_> = (0..store.num_records()).collect();
        if shuffle {
            db_inds.shuffle(rng);
        }

        info!(
            "loaded {} referring expressions, augmentation {}, test mode {}",
            db_inds.len(),
            if data_aug { "enabled" } else { "disabled" },
            test
        );

        Ok(Self {
            store,
            tokenizer,
            db_inds,
            augmentor,
            color_jitter,
            lighting,
            mean: mean.map(R64::raw),
            std: std.map(R64::raw),
            input_size: input_size.get() as i64,
            max_query_len: max_query_len.get(),
            max_retries,
            test,
        })
    }

    pub fn len(&self) -> usize {
        self.db_inds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db_inds.is_empty()
    }

    /// The record indexes in sample order.
    pub fn db_inds(&self) -> &[usize] {
        &self.db_inds
    }

    /// Produce the sample at position `index` of the index pool.
    ///
    /// If the processed box is degenerate, another record is drawn from the
    /// pool at random. It fails with [GroundingError::ExhaustedRetries] when
    /// no valid sample is found within `max_retries` attempts.
    pub fn get_sample<R>(&self, rng: &mut R, index: usize) -> Result<Sample>
    where
        R: Rng + ?Sized,
    {
        let mut db_ind = *self.db_inds.get(index).ok_or_else(|| {
            format_err!(
                "sample index {} is out of range, the dataset has {} samples",
                index,
                self.db_inds.len()
            )
        })?;

        for attempt in 1..=self.max_retries {
            if let Some(sample) = self.try_sample(rng, db_ind)? {
                if is_slow_attempt(attempt, self.max_retries) {
                    warn!(
                        "sample {} took {} attempts to find a valid box",
                        index, attempt
                    );
                }
                return Ok(sample);
            }

            let next = *self
                .db_inds
                .choose(rng)
                .ok_or_else(|| format_err!("the index pool is empty"))?;
            debug!(
                "record {} has a degenerate box at attempt {}, retry with record {}",
                db_ind, attempt, next
            );
            db_ind = next;
        }

        Err(GroundingError::ExhaustedRetries {
            index,
            attempts: self.max_retries,
        }
        .into())
    }

    /// Process one record, or return `None` if its box degenerates.
    fn try_sample<R>(&self, rng: &mut R, db_ind: usize) -> Result<Option<Sample>>
    where
        R: Rng + ?Sized,
    {
        let image_path = self.store.image_path(db_ind)?;
        let image = vision::image::load(image_path)
            .with_context(|| format!("unable to load image '{}'", image_path.display()))?
            .to_rgb()?;
        let (channels, height, width) = image.size3()?;
        let original_shape = [height, width, channels];
        let ltrb = self.store.annotation_box(db_ind)?;
        let phrase = self.store.phrase(db_ind)?.to_lowercase();

        let (image, ltrb, phrase) = match &self.augmentor {
            Some(augmentor) => {
                let AugmentedSample {
                    image,
                    ltrb,
                    phrase,
                } = augmentor.forward(rng, &image, ltrb, &phrase)?;
                let mut image = image.to_ratio()?;
                if let Some(color_jitter) = &self.color_jitter {
                    image = color_jitter.forward(rng, &image)?;
                }
                if let Some(lighting) = &self.lighting {
                    image = lighting.forward(rng, &image)?;
                }
                (image, ltrb, phrase)
            }
            None => {
                let fill = self.mean.map(|mean| mean * 255.0);
                let (image, transform) = image.letterbox(self.input_size, fill)?;
                let tlbr = &transform * &TLBR::from_ltrb(ltrb.map(|v| v as f64));
                let ltrb = tlbr.ltrb().map(|v| v as i64);
                (image.to_ratio()?, ltrb, phrase)
            }
        };
        let image = image.standardize(self.mean, self.std)?;

        let (_, height, width) = image.size3()?;
        let tlbr = TLBR::from_ltrb(ltrb).clip(height, width);
        if tlbr.is_degenerate() {
            return Ok(None);
        }

        let TokenizedPhrase { ids, mask } = self.tokenizer.tokenize(&phrase, self.max_query_len)?;

        let sample = if self.test {
            Sample::Test(TestSample {
                image,
                token_ids: Tensor::of_slice(&ids),
                original_shape,
            })
        } else {
            Sample::Train(TrainSample {
                image,
                ltrb: tlbr.ltrb(),
                token_ids: ids,
                token_mask: mask,
            })
        };

        Ok(Some(sample))
    }
}

/// True if finding a valid sample took more than one attempt and more than a
/// quarter of the retry cap.
fn is_slow_attempt(attempt: usize, max_retries: usize) -> bool {
    attempt > 1 && attempt * 4 > max_retries
}
