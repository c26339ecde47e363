//! Flip and crop augmentation that keeps the box and phrase consistent.

use super::phrase::WordSwap;
use crate::{common::*, utils::ImageTensorExt as _};

#[derive(Debug, Clone)]
pub struct SampleAugmentorInit {
    /// The probability of each flip.
    pub flip_prob: R64,
    /// The probability of the random crop.
    pub crop_prob: R64,
    /// The maximum trimmed fraction per side.
    pub max_crop_ratio: R64,
    pub vertical_flip: bool,
    pub horizontal_flip: bool,
    pub random_crop: bool,
}

impl SampleAugmentorInit {
    pub fn build(self) -> Result<SampleAugmentor> {
        let Self {
            flip_prob,
            crop_prob,
            max_crop_ratio,
            vertical_flip,
            horizontal_flip,
            random_crop,
        } = self;

        ensure!(
            (0.0..=1.0).contains(&flip_prob.raw()),
            "flip_prob must be in range [0, 1]"
        );
        ensure!(
            (0.0..=1.0).contains(&crop_prob.raw()),
            "crop_prob must be in range [0, 1]"
        );
        ensure!(
            (0.0..0.5).contains(&max_crop_ratio.raw()),
            "max_crop_ratio must be in range [0, 0.5)"
        );

        Ok(SampleAugmentor {
            flip_prob: flip_prob.raw(),
            crop_prob: crop_prob.raw(),
            max_crop_ratio: max_crop_ratio.raw(),
            vertical_flip,
            horizontal_flip,
            random_crop,
            vertical_swap: WordSwap::vertical(),
            horizontal_swap: WordSwap::horizontal(),
        })
    }
}

impl Default for SampleAugmentorInit {
    fn default() -> Self {
        Self {
            flip_prob: r64(0.5),
            crop_prob: r64(0.5),
            max_crop_ratio: r64(0.15),
            vertical_flip: true,
            horizontal_flip: true,
            random_crop: true,
        }
    }
}

/// An augmented image with its box and phrase.
#[derive(Debug)]
pub struct AugmentedSample {
    /// The `[channels, height, width]` image.
    pub image: Tensor,
    /// The `[left, top, right, bottom]` box in pixels.
    pub ltrb: [i64; 4],
    pub phrase: String,
}

#[derive(Debug, Clone)]
pub struct SampleAugmentor {
    flip_prob: f64,
    crop_prob: f64,
    max_crop_ratio: f64,
    vertical_flip: bool,
    horizontal_flip: bool,
    random_crop: bool,
    vertical_swap: WordSwap,
    horizontal_swap: WordSwap,
}

impl SampleAugmentor {
    /// Apply the vertical flip, the horizontal flip and the random crop in order.
    ///
    /// The output box is truncated to integers and may be degenerate.
    pub fn forward<R>(
        &self,
        rng: &mut R,
        image: &Tensor,
        ltrb: [i64; 4],
        phrase: &str,
    ) -> Result<AugmentedSample>
    where
        R: Rng + ?Sized,
    {
        let vflip = self.vertical_flip && rng.gen_bool(self.flip_prob);
        let hflip = self.horizontal_flip && rng.gen_bool(self.flip_prob);
        let crop = self.random_crop && rng.gen_bool(self.crop_prob);
        let crop_ratios = crop.then(|| CropRatios::sample(rng, self.max_crop_ratio));

        self.apply(image, ltrb, phrase, vflip, hflip, crop_ratios)
    }

    fn apply(
        &self,
        image: &Tensor,
        ltrb: [i64; 4],
        phrase: &str,
        vflip: bool,
        hflip: bool,
        crop_ratios: Option<CropRatios>,
    ) -> Result<AugmentedSample> {
        tch::no_grad(|| {
            let (_channels, height, width) = image.size3()?;
            ensure!(
                height > 0 && width > 0,
                "the image must not be empty, but get {}x{}",
                height,
                width
            );
            let (height, width) = (height as f64, width as f64);

            let to_ratio = Transform::scaling(1.0 / height, 1.0 / width);
            let to_pixel = Transform::scaling(height, width);

            let mut image = image.shallow_clone();
            let mut cycxhw = &to_ratio * &CyCxHW::from(TLBR::from_ltrb(ltrb.map(|v| v as f64)));
            let mut phrase = phrase.to_owned();

            if vflip {
                image = image.vflip()?;
                cycxhw = cycxhw.vflip(1.0);
                phrase = self.vertical_swap.apply(&phrase);
            }

            if hflip {
                image = image.hflip()?;
                cycxhw = cycxhw.hflip(1.0);
                phrase = self.horizontal_swap.apply(&phrase);
            }

            let mut tlbr = TLBR::from(&to_pixel * &cycxhw);

            if let Some(ratios) = crop_ratios {
                let (cropped, transform) = ratios.crop(&image, &tlbr)?;
                image = cropped;
                tlbr = &transform * &tlbr;
            }

            Ok(AugmentedSample {
                image,
                ltrb: tlbr.ltrb().map(|v| v as i64),
                phrase,
            })
        })
    }
}

/// Random draws of a crop, applied to sides depending on the box location.
#[derive(Debug, Clone, Copy)]
struct CropRatios {
    top: f64,
    left: f64,
    bottom: f64,
    right: f64,
}

impl CropRatios {
    fn sample<R>(rng: &mut R, max_ratio: f64) -> Self
    where
        R: Rng + ?Sized,
    {
        let mut draw = || rng.gen_range(0.0..=max_ratio);
        Self {
            left: draw(),
            right: draw(),
            top: draw(),
            bottom: draw(),
        }
    }

    /// Crop the side opposite to the half holding the box, and stretch the
    /// result back to the input size.
    ///
    /// A box in the right half trims the left side, a box in the left half
    /// trims the right side, and likewise for the bottom and top halves.
    fn crop(&self, image: &Tensor, tlbr: &TLBR<f64>) -> Result<(Tensor, Transform<f64>)> {
        let (_channels, height, width) = image.size3()?;
        let (height_f, width_f) = (height as f64, width as f64);

        let left = if tlbr.l() >= width_f / 2.0 {
            (self.left * width_f) as i64
        } else {
            0
        };
        let right = if tlbr.r() <= width_f / 2.0 {
            width - (self.right * width_f) as i64
        } else {
            width
        };
        let top = if tlbr.t() >= height_f / 2.0 {
            (self.top * height_f) as i64
        } else {
            0
        };
        let bottom = if tlbr.b() <= height_f / 2.0 {
            height - (self.bottom * height_f) as i64
        } else {
            height
        };

        ensure!(
            top < bottom && left < right,
            "invalid crop region t={} l={} b={} r={}",
            top,
            left,
            bottom,
            right
        );

        if (top, left, bottom, right) == (0, 0, height, width) {
            return Ok((image.shallow_clone(), Transform::identity()));
        }

        let cropped = image
            .f_narrow(1, top, bottom - top)?
            .f_narrow(2, left, right - left)?;
        let resized = cropped.resize2d_exact(height, width)?;

        let crop_size = HW::try_from_hw([(bottom - top) as f64, (right - left) as f64])?;
        let orig_size = HW::try_from_hw([height_f, width_f])?;
        let transform = &Transform::from_sizes_exact(&crop_size, &orig_size)
            * &Transform::translation(-top as f64, -left as f64);

        Ok((resized, transform))
    }
}
