use crate::common::*;

/// Instance normalization options.
///
/// Each sample and channel is normalized with its own statistics. There are
/// no affine parameters and no running statistics, so training and
/// evaluation behave the same.
#[derive(Debug, Clone)]
pub struct InstanceNormInit {
    pub eps: R64,
}

impl InstanceNormInit {
    pub fn build(self, num_features: i64) -> Result<InstanceNorm> {
        let Self { eps } = self;
        ensure!(
            num_features > 0,
            "num_features must be positive, but get {}",
            num_features
        );
        ensure!(eps > 0.0, "eps must be positive, but get {}", eps);

        Ok(InstanceNorm {
            num_features,
            eps: eps.raw(),
        })
    }
}

impl Default for InstanceNormInit {
    fn default() -> Self {
        Self { eps: r64(1e-5) }
    }
}

#[derive(Debug, Clone)]
pub struct InstanceNorm {
    num_features: i64,
    eps: f64,
}

impl InstanceNorm {
    pub fn forward(&self, input: &Tensor) -> Result<Tensor> {
        let Self { num_features, eps } = *self;

        let (_b, c, _h, _w) = input.size4()?;
        ensure!(
            c == num_features,
            "expect {} channels, but get {}",
            num_features,
            c
        );

        let output = Tensor::f_instance_norm(
            input,
            None::<&Tensor>,
            None::<&Tensor>,
            None::<&Tensor>,
            None::<&Tensor>,
            true,
            0.0,
            eps,
            true,
        )?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use tch::kind::FLOAT_CPU;

    #[test]
    fn instance_norm_statistics() {
        let norm = InstanceNormInit::default().build(4).unwrap();

        let input = Tensor::randn(&[2, 4, 8, 8], FLOAT_CPU) * 3.0 + 5.0;
        let output = norm.forward(&input).unwrap();
        let flat = output.view([2, 4, 64]);

        let mean = f64::from(flat.mean_dim(&[2], false, Kind::Float).abs().max());
        let var = (&flat * &flat).mean_dim(&[2], false, Kind::Float);
        assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-4);
        assert!(var.allclose(&var.ones_like(), 1e-2, 1e-2, false));
    }

    #[test]
    fn instance_norm_rejects_channel_mismatch() {
        let norm = InstanceNormInit::default().build(4).unwrap();
        let input = Tensor::zeros(&[1, 3, 2, 2], FLOAT_CPU);
        assert!(norm.forward(&input).is_err());
    }

    #[test]
    fn instance_norm_is_per_sample() {
        let norm = InstanceNormInit::default().build(2).unwrap();

        // scaling one sample must not affect the other
        let input = Tensor::randn(&[2, 2, 4, 4], FLOAT_CPU);
        let scale = Tensor::of_slice(&[1.0f32, 100.0]).view([2, 1, 1, 1]);
        let lhs = norm.forward(&input).unwrap();
        let rhs = norm.forward(&(&input * scale)).unwrap();
        assert!(lhs.allclose(&rhs, 1e-3, 1e-3, false));
    }

    #[test]
    fn instance_norm_rejects_invalid_options() {
        assert!(InstanceNormInit::default().build(0).is_err());
        assert!(InstanceNormInit { eps: r64(0.0) }.build(4).is_err());
    }
}
