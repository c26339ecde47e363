use crate::common::*;

/// Two-layer projection: `linear, bn, relu, dropout, linear, bn, relu`.
#[derive(Debug, Clone)]
pub struct MlpProjectionInit {
    pub in_dim: usize,
    pub out_dim: usize,
    pub dropout: R64,
}

impl MlpProjectionInit {
    pub fn build<'p, P>(self, path: P) -> Result<MlpProjection>
    where
        P: Borrow<nn::Path<'p>>,
    {
        let path = path.borrow();
        let Self {
            in_dim,
            out_dim,
            dropout,
        } = self;

        ensure!(in_dim > 0 && out_dim > 0, "in_dim and out_dim must be positive");
        ensure!(
            (0.0..1.0).contains(&dropout.raw()),
            "dropout must be in range [0, 1), but get {}",
            dropout
        );

        let fc1 = nn::linear(path / "fc1", in_dim as i64, out_dim as i64, Default::default());
        let bn1 = nn::batch_norm1d(path / "bn1", out_dim as i64, Default::default());
        let fc2 = nn::linear(path / "fc2", out_dim as i64, out_dim as i64, Default::default());
        let bn2 = nn::batch_norm1d(path / "bn2", out_dim as i64, Default::default());

        Ok(MlpProjection {
            fc1,
            bn1,
            fc2,
            bn2,
            dropout: dropout.raw(),
        })
    }
}

#[derive(Debug)]
pub struct MlpProjection {
    fc1: nn::Linear,
    bn1: nn::BatchNorm,
    fc2: nn::Linear,
    bn2: nn::BatchNorm,
    dropout: f64,
}

impl nn::ModuleT for MlpProjection {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        let Self {
            ref fc1,
            ref bn1,
            ref fc2,
            ref bn2,
            dropout,
        } = *self;

        xs.apply(fc1)
            .apply_t(bn1, train)
            .relu()
            .dropout(dropout, train)
            .apply(fc2)
            .apply_t(bn2, train)
            .relu()
    }
}
