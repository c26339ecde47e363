use crate::common::*;

/// Lower bound of the norm, as in `torch.nn.functional.normalize`.
const NORM_EPS: f64 = 1e-12;

pub trait L2Normalize {
    /// Scale each slice along `dim` to unit L2 norm.
    fn f_l2_normalize(&self, dim: i64) -> Result<Tensor>;
}

impl L2Normalize for Tensor {
    fn f_l2_normalize(&self, dim: i64) -> Result<Tensor> {
        let norm = self
            .f_mul(self)?
            .f_sum_dim_intlist(&[dim], true, self.kind())?
            .f_sqrt()?
            .f_clamp_min(NORM_EPS)?;
        let output = self.f_div(&norm)?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use tch::kind::FLOAT_CPU;

    #[test]
    fn l2_normalize_rows() {
        let input = Tensor::of_slice(&[3.0f32, 4.0, 0.0, 0.0, 0.0, 0.0]).view([2, 3]);
        let output = input.f_l2_normalize(1).unwrap();
        let values: Vec<f32> = output.view([-1]).into();
        assert_abs_diff_eq!(values[0], 0.6);
        assert_abs_diff_eq!(values[1], 0.8);
        // zero rows stay zero instead of becoming NaN
        assert!(values[3..].iter().all(|&val| val == 0.0));
    }

    #[test]
    fn l2_normalize_is_idempotent() {
        let input = Tensor::randn(&[4, 16], FLOAT_CPU);
        let once = input.f_l2_normalize(1).unwrap();
        let twice = once.f_l2_normalize(1).unwrap();
        assert!(once.allclose(&twice, 1e-6, 1e-6, false));
    }
}
