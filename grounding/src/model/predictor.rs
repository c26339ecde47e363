use crate::{
    common::*,
    config::{NUM_ANCHORS, NUM_SCALES},
};
use tch_modules::{ConvBn2D, ConvBn2DInit};

/// The number of entries per anchor, `4` box parameters followed by the confidence.
pub const NUM_ENTRIES: usize = 5;
/// The index of the confidence entry within an anchor.
pub const CONFIDENCE_ENTRY: usize = 4;
/// The prior foreground probability of the balanced initialization.
pub const CONFIDENCE_PRIOR: f64 = 0.001;

/// The bias making `sigmoid(bias) == prior`.
pub fn prior_bias(prior: f64) -> f64 {
    -((1.0 - prior) / prior).ln()
}

#[derive(Debug, Clone)]
pub struct PredictorInit {
    pub in_c: usize,
    /// If set, start from a low confidence everywhere.
    pub balance_init: bool,
}

impl PredictorInit {
    pub fn build<'p, P>(self, path: P) -> Predictor
    where
        P: Borrow<nn::Path<'p>>,
    {
        let path = path.borrow();
        let Self { in_c, balance_init } = self;

        let heads = array::from_fn(|index| {
            let path = path / format!("head_{}", index);
            Self::build_head(&path, in_c, balance_init)
        });

        Predictor { heads }
    }

    fn build_head(path: &nn::Path, in_c: usize, balance_init: bool) -> PredictorHead {
        let out_c = NUM_ANCHORS * NUM_ENTRIES;

        let conv = {
            let init = ConvBn2DInit {
                batch_norm: false,
                ..ConvBn2DInit::new(in_c, in_c, 3)
            };
            let init = if balance_init {
                ConvBn2DInit {
                    ws_init: nn::Init::Randn {
                        mean: 0.0,
                        stdev: 0.01,
                    },
                    bs_init: nn::Init::Const(0.0),
                    ..init
                }
            } else {
                init
            };
            init.build(path / "conv")
        };

        let out = {
            let ws_init = if balance_init {
                nn::Init::Const(0.0)
            } else {
                nn::Init::KaimingUniform
            };
            let mut out = nn::conv2d(
                path / "out",
                in_c as i64,
                out_c as i64,
                1,
                nn::ConvConfig {
                    ws_init,
                    bs_init: nn::Init::Const(0.0),
                    ..Default::default()
                },
            );

            if balance_init {
                if let Some(bs) = &mut out.bs {
                    let bias: Vec<f32> = (0..NUM_ANCHORS)
                        .flat_map(|_| {
                            let mut entries = [0f32; NUM_ENTRIES];
                            entries[CONFIDENCE_ENTRY] = prior_bias(CONFIDENCE_PRIOR) as f32;
                            entries
                        })
                        .collect();
                    let bias = Tensor::of_slice(&bias).to_device(bs.device());
                    tch::no_grad(|| bs.copy_(&bias));
                }
            }

            out
        };

        PredictorHead { conv, out }
    }
}

/// Per-scale anchor prediction heads.
///
/// Each head emits `[batch, 15, height, width]`, where channel
/// `anchor * 5 + entry` holds the entry of an anchor.
#[derive(Debug)]
pub struct Predictor {
    heads: [PredictorHead; NUM_SCALES],
}

impl Predictor {
    pub fn forward_t(&self, inputs: &[Tensor], train: bool) -> Result<Vec<Tensor>> {
        ensure!(
            inputs.len() == NUM_SCALES,
            "expect {} feature maps, but get {}",
            NUM_SCALES,
            inputs.len()
        );

        let outputs = izip!(&self.heads, inputs)
            .map(|(head, input)| head.forward_t(input, train))
            .collect();
        Ok(outputs)
    }
}

#[derive(Debug)]
struct PredictorHead {
    conv: ConvBn2D,
    out: nn::Conv2D,
}

impl nn::ModuleT for PredictorHead {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        xs.apply_t(&self.conv, train).apply(&self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prior_bias_value() {
        let bias = prior_bias(CONFIDENCE_PRIOR);
        assert_abs_diff_eq!(bias, -(999f64.ln()));
        assert_abs_diff_eq!(bias, -6.906755, epsilon = 1e-6);
    }

    #[test]
    fn balanced_init() -> Result<()> {
        let vs = nn::VarStore::new(Device::Cpu);
        let predictor = PredictorInit {
            in_c: 8,
            balance_init: true,
        }
        .build(&vs.root());

        for head in &predictor.heads {
            let out_ws = &head.out.ws;
            assert_eq!(out_ws.size(), vec![15, 8, 1, 1]);
            assert_eq!(out_ws.abs().sum(Kind::Float).double_value(&[]), 0.0);

            let bias = head.out.bs.as_ref().unwrap();
            for anchor in 0..NUM_ANCHORS {
                for entry in 0..NUM_ENTRIES {
                    let value = bias.double_value(&[(anchor * NUM_ENTRIES + entry) as i64]);
                    if entry == CONFIDENCE_ENTRY {
                        assert_abs_diff_eq!(value, -6.906755, epsilon = 1e-5);
                    } else {
                        assert_eq!(value, 0.0);
                    }
                }
            }
        }

        // the copied biases must be visible through the variable store
        let num_prior_biases = vs
            .trainable_variables()
            .iter()
            .filter(|var| var.size() == vec![15])
            .map(|var| var.lt(-6.0).sum(Kind::Int64).int64_value(&[]))
            .sum::<i64>();
        assert_eq!(num_prior_biases, (NUM_SCALES * NUM_ANCHORS) as i64);
        Ok(())
    }

    #[test]
    fn output_shapes() -> Result<()> {
        let vs = nn::VarStore::new(Device::Cpu);
        let predictor = PredictorInit {
            in_c: 8,
            balance_init: true,
        }
        .build(&vs.root());

        let inputs: Vec<_> = [13, 26, 52]
            .into_iter()
            .map(|size| Tensor::randn(&[2, 8, size, size], FLOAT_CPU))
            .collect();
        let outputs = predictor.forward_t(&inputs, false)?;

        for (output, size) in izip!(&outputs, [13, 26, 52]) {
            assert_eq!(output.size(), vec![2, 15, size, size]);
        }

        // zero weights make the outputs equal to the biases
        assert_abs_diff_eq!(
            outputs[0].double_value(&[1, 4, 5, 5]),
            prior_bias(CONFIDENCE_PRIOR),
            epsilon = 1e-5
        );
        assert_eq!(outputs[2].double_value(&[0, 5, 0, 0]), 0.0);
        Ok(())
    }

    #[test]
    fn reject_wrong_scale_count() {
        let vs = nn::VarStore::new(Device::Cpu);
        let predictor = PredictorInit {
            in_c: 4,
            balance_init: false,
        }
        .build(&vs.root());
        let inputs = vec![Tensor::randn(&[1, 4, 13, 13], FLOAT_CPU)];
        assert!(predictor.forward_t(&inputs, false).is_err());
    }
}
