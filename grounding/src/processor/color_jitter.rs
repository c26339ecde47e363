//! The random color distortion algorithm.

use crate::common::*;

/// Grayscale weights of the RGB channels, as in ITU-R 601.
const GRAY_WEIGHTS: [f64; 3] = [0.299, 0.587, 0.114];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColorJitterInit {
    pub brightness: Option<R64>,
    pub contrast: Option<R64>,
    pub saturation: Option<R64>,
}

impl ColorJitterInit {
    /// Jitter all three properties by the same variance.
    pub fn uniform(var: R64) -> Self {
        Self {
            brightness: Some(var),
            contrast: Some(var),
            saturation: Some(var),
        }
    }

    pub fn build(self) -> Result<ColorJitter> {
        let Self {
            brightness,
            contrast,
            saturation,
        } = self;

        let check = |name: &str, var: Option<R64>| -> Result<_> {
            var.map(|var| {
                ensure!(
                    (0.0..=1.0).contains(&var.raw()),
                    "{} must be in range [0, 1], but get {}",
                    name,
                    var
                );
                Ok(var.raw())
            })
            .transpose()
        };

        Ok(ColorJitter {
            max_brightness: check("brightness", brightness)?,
            max_contrast: check("contrast", contrast)?,
            max_saturation: check("saturation", saturation)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Distortion {
    Brightness,
    Contrast,
    Saturation,
}

#[derive(Debug, Clone)]
pub struct ColorJitter {
    max_brightness: Option<f64>,
    max_contrast: Option<f64>,
    max_saturation: Option<f64>,
}

impl ColorJitter {
    /// Distort a `[3, height, width]` RGB image in `[0, 1]` range.
    ///
    /// The enabled distortions run in random order, each scaling by a factor
    /// `1 + U(-var, var)`. Contrast blends toward the mean gray level of the
    /// input, and saturation toward its grayscale image.
    pub fn forward<R>(&self, rng: &mut R, rgb: &Tensor) -> Result<Tensor>
    where
        R: Rng + ?Sized,
    {
        tch::no_grad(|| -> Result<_> {
            let (channels, _height, _width) = rgb.size3()?;
            ensure!(
                channels == 3,
                "channel size must be 3, but get {}",
                channels
            );

            let rgb = rgb.f_to_kind(Kind::Float)?;
            let weights = Tensor::of_slice(&GRAY_WEIGHTS)
                .to_kind(Kind::Float)
                .to_device(rgb.device())
                .view([3, 1, 1]);
            let gray = (&rgb * weights).f_sum_dim_intlist(&[0], true, Kind::Float)?;
            let gray_mean = gray.f_mean(Kind::Float)?;

            let mut distortions: Vec<_> = [
                (Distortion::Brightness, self.max_brightness),
                (Distortion::Contrast, self.max_contrast),
                (Distortion::Saturation, self.max_saturation),
            ]
            .into_iter()
            .filter_map(|(distortion, var)| Some((distortion, var?)))
            .collect();
            distortions.shuffle(rng);

            let output = distortions
                .into_iter()
                .fold(rgb, |image, (distortion, var)| {
                    let alpha = 1.0 + rng.gen_range(-var..=var);
                    match distortion {
                        Distortion::Brightness => image * alpha,
                        Distortion::Contrast => image * alpha + &gray_mean * (1.0 - alpha),
                        Distortion::Saturation => image * alpha + &gray * (1.0 - alpha),
                    }
                });

            Ok(output)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gray_image_is_stable_under_saturation() -> Result<()> {
        let jitter = ColorJitterInit {
            brightness: None,
            contrast: None,
            saturation: Some(r64(0.4)),
        }
        .build()?;
        let mut rng = StdRng::seed_from_u64(0);

        let image = Tensor::ones(&[3, 4, 4], FLOAT_CPU) * 0.3;
        let output = jitter.forward(&mut rng, &image)?;
        assert!(output.allclose(&image, 1e-5, 1e-6, false));
        Ok(())
    }

    #[test]
    fn brightness_scales_pixels() -> Result<()> {
        let jitter = ColorJitterInit {
            brightness: Some(r64(0.4)),
            contrast: None,
            saturation: None,
        }
        .build()?;
        let mut rng = StdRng::seed_from_u64(1);

        let image = Tensor::rand(&[3, 5, 5], FLOAT_CPU) * 0.5 + 0.25;
        let output = jitter.forward(&mut rng, &image)?;
        let ratio = (&output / &image).flatten(0, -1);
        let min = ratio.min().double_value(&[]);
        let max = ratio.max().double_value(&[]);

        assert_abs_diff_eq!(min, max, epsilon = 1e-4);
        assert!((0.6..=1.4).contains(&min));
        Ok(())
    }

    #[test]
    fn disabled_jitter_is_identity() -> Result<()> {
        let jitter = ColorJitterInit {
            brightness: None,
            contrast: None,
            saturation: None,
        }
        .build()?;
        let mut rng = StdRng::seed_from_u64(2);

        let image = Tensor::rand(&[3, 5, 5], FLOAT_CPU);
        assert!(jitter.forward(&mut rng, &image)?.equal(&image));
        Ok(())
    }

    #[test]
    fn reject_large_variance() {
        assert!(ColorJitterInit::uniform(r64(1.5)).build().is_err());
    }
}
