use crate::common::*;
use rand_distr::Normal;

#[derive(Debug, Clone)]
pub struct LightingInit {
    /// The standard deviation of the per-component coefficients.
    pub std: R64,
    /// PCA eigenvalues of the dataset pixels.
    pub eig_val: [R64; 3],
    /// PCA eigenvectors of the dataset pixels, one row per channel.
    pub eig_vec: [[R64; 3]; 3],
}

impl LightingInit {
    pub fn build(self) -> Result<Lighting> {
        let Self {
            std,
            eig_val,
            eig_vec,
        } = self;

        let normal = Normal::new(0.0, std.raw())
            .map_err(|err| format_err!("invalid lighting std {}: {}", std, err))?;

        Ok(Lighting {
            normal,
            eig_val: eig_val.map(R64::raw),
            eig_vec: eig_vec.map(|row| row.map(R64::raw)),
        })
    }
}

/// AlexNet-style PCA lighting noise.
#[derive(Debug, Clone)]
pub struct Lighting {
    normal: Normal<f64>,
    eig_val: [f64; 3],
    eig_vec: [[f64; 3]; 3],
}

impl Lighting {
    /// Add `eig_vec * (eig_val * alpha)` to every pixel of a `[3, height, width]` image,
    /// where `alpha` is drawn per component.
    pub fn forward<R>(&self, rng: &mut R, rgb: &Tensor) -> Result<Tensor>
    where
        R: Rng + ?Sized,
    {
        let (channels, _height, _width) = rgb.size3()?;
        ensure!(
            channels == 3,
            "channel size must be 3, but get {}",
            channels
        );

        let alpha: [f64; 3] = array::from_fn(|_| self.normal.sample(rng));
        let shift = self.shift(alpha);

        tch::no_grad(|| {
            let shift = Tensor::of_slice(&shift)
                .to_kind(Kind::Float)
                .to_device(rgb.device())
                .view([3, 1, 1]);
            Ok(rgb.f_to_kind(Kind::Float)? + shift)
        })
    }

    fn shift(&self, alpha: [f64; 3]) -> [f64; 3] {
        let Self {
            ref eig_val,
            ref eig_vec,
            ..
        } = *self;

        array::from_fn(|channel| {
            izip!(&eig_vec[channel], eig_val, &alpha)
                .map(|(vec, val, alpha)| vec * val * alpha)
                .sum()
        })
    }
}
