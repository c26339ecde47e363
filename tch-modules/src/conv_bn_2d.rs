use crate::common::*;

/// Convolution followed by optional batch normalization and ReLU.
#[derive(Debug, Clone)]
pub struct ConvBn2DInit {
    pub in_c: usize,
    pub out_c: usize,
    pub k: usize,
    pub s: usize,
    pub p: usize,
    pub bias: bool,
    pub ws_init: nn::Init,
    pub bs_init: nn::Init,
    pub batch_norm: bool,
    pub relu: bool,
}

impl ConvBn2DInit {
    /// A same-padded convolution with batch norm and ReLU.
    pub fn new(in_c: usize, out_c: usize, k: usize) -> Self {
        Self {
            in_c,
            out_c,
            k,
            s: 1,
            p: (k - 1) / 2,
            bias: true,
            ws_init: nn::Init::KaimingUniform,
            bs_init: nn::Init::Const(0.0),
            batch_norm: true,
            relu: true,
        }
    }

    pub fn build<'p, P>(self, path: P) -> ConvBn2D
    where
        P: Borrow<nn::Path<'p>>,
    {
        let path = path.borrow();

        let Self {
            in_c,
            out_c,
            k,
            s,
            p,
            bias,
            ws_init,
            bs_init,
            batch_norm,
            relu,
        } = self;

        let conv = nn::conv2d(
            path / "conv",
            in_c as i64,
            out_c as i64,
            k as i64,
            nn::ConvConfig {
                stride: s as i64,
                padding: p as i64,
                bias,
                ws_init,
                bs_init,
                ..Default::default()
            },
        );
        let bn = batch_norm
            .then(|| nn::batch_norm2d(path / "bn", out_c as i64, Default::default()));

        ConvBn2D { conv, bn, relu }
    }
}

#[derive(Debug)]
pub struct ConvBn2D {
    conv: nn::Conv2D,
    bn: Option<nn::BatchNorm>,
    relu: bool,
}

impl nn::ModuleT for ConvBn2D {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        let Self {
            ref conv,
            ref bn,
            relu,
        } = *self;

        let xs = xs.apply(conv);
        let xs = match bn {
            Some(bn) => xs.apply_t(bn, train),
            None => xs,
        };

        if relu {
            xs.relu()
        } else {
            xs
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::kind::FLOAT_CPU;

    #[test]
    fn conv_bn_2d_output_shape() {
        let vs = nn::VarStore::new(Device::Cpu);
        let root = vs.root();

        let conv = ConvBn2DInit::new(16, 8, 1).build(&root / "conv_1x1");
        let input = Tensor::randn(&[2, 16, 13, 13], FLOAT_CPU);
        let output = conv.forward_t(&input, true);
        assert_eq!(output.size(), vec![2, 8, 13, 13]);
        assert!(f64::from(output.min()) >= 0.0);

        let conv = ConvBn2DInit {
            batch_norm: false,
            relu: false,
            ..ConvBn2DInit::new(16, 4, 3)
        }
        .build(&root / "conv_3x3");
        let output = conv.forward_t(&input, false);
        assert_eq!(output.size(), vec![2, 4, 13, 13]);
    }

    #[test]
    fn conv_bn_2d_const_init() {
        let vs = nn::VarStore::new(Device::Cpu);
        let root = vs.root();

        let conv = ConvBn2DInit {
            ws_init: nn::Init::Const(0.0),
            bs_init: nn::Init::Const(0.5),
            batch_norm: false,
            relu: false,
            ..ConvBn2DInit::new(3, 2, 1)
        }
        .build(&root);
        let input = Tensor::randn(&[1, 3, 4, 4], FLOAT_CPU);
        let output = conv.forward_t(&input, false);
        let expect = Tensor::full(&[1, 2, 4, 4], 0.5, FLOAT_CPU);
        assert!(output.allclose(&expect, 1e-6, 1e-6, false));
    }
}
