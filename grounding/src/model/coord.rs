use crate::common::*;

/// The channel size of the coordinate map.
pub const COORD_CHANNELS: i64 = 8;

/// Build the `[batch_size, 8, height, width]` positional encoding of a feature map.
///
/// The channels are `x_min, y_min, x_max, y_max, x_ctr, y_ctr, 1/height, 1/width`.
/// For the cell at row `i` and column `j`, the `x` channels follow `i`
/// normalized by `width`, and the `y` channels follow `j` normalized by `height`,
/// so that `x_min = (2i - width) / width` and `x_max = (2(i + 1) - width) / width`.
pub fn coord_map(batch_size: i64, height: i64, width: i64, device: Device) -> Result<Tensor> {
    ensure!(
        batch_size > 0 && height > 0 && width > 0,
        "batch_size, height and width must be positive, but get {}, {}, {}",
        batch_size,
        height,
        width
    );

    tch::no_grad(|| {
        let options = (Kind::Float, device);
        let (height_f, width_f) = (height as f64, width as f64);

        let rows = Tensor::arange(height, options)
            .view([height, 1])
            .expand(&[height, width], false);
        let cols = Tensor::arange(width, options)
            .view([1, width])
            .expand(&[height, width], false);

        let x_min = (&rows * 2.0 - width_f) / width_f;
        let y_min = (&cols * 2.0 - height_f) / height_f;
        let x_max = ((&rows + 1.0) * 2.0 - width_f) / width_f;
        let y_max = ((&cols + 1.0) * 2.0 - height_f) / height_f;
        let x_ctr = (&x_min + &x_max) / 2.0;
        let y_ctr = (&y_min + &y_max) / 2.0;
        let h_map = Tensor::full(&[height, width], 1.0 / height_f, options);
        let w_map = Tensor::full(&[height, width], 1.0 / width_f, options);

        let coord = Tensor::f_stack(&[x_min, y_min, x_max, y_max, x_ctr, y_ctr, h_map, w_map], 0)?
            .f_unsqueeze(0)?
            .f_repeat(&[batch_size, 1, 1, 1])?;
        Ok(coord)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_coord_map() -> Result<()> {
        let coord = coord_map(2, 13, 13, Device::Cpu)?;
        assert_eq!(coord.size(), vec![2, COORD_CHANNELS, 13, 13]);

        let value = |c: i64, i: i64, j: i64| coord.double_value(&[1, c, i, j]);

        // top-left cell
        assert_abs_diff_eq!(value(0, 0, 0), -1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(value(1, 0, 0), -1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(value(2, 0, 0), -11.0 / 13.0, epsilon = 1e-6);
        assert_abs_diff_eq!(value(3, 0, 0), -11.0 / 13.0, epsilon = 1e-6);
        assert_abs_diff_eq!(value(4, 0, 0), -12.0 / 13.0, epsilon = 1e-6);

        // bottom-right cell
        assert_abs_diff_eq!(value(0, 12, 12), 11.0 / 13.0, epsilon = 1e-6);
        assert_abs_diff_eq!(value(2, 12, 12), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(value(5, 12, 12), 12.0 / 13.0, epsilon = 1e-6);

        // uniform maps
        assert_abs_diff_eq!(value(6, 4, 7), 1.0 / 13.0, epsilon = 1e-6);
        assert_abs_diff_eq!(value(7, 9, 2), 1.0 / 13.0, epsilon = 1e-6);
        Ok(())
    }

    #[test]
    fn x_channels_follow_rows() -> Result<()> {
        let coord = coord_map(1, 2, 4, Device::Cpu)?;
        assert_eq!(coord.size(), vec![1, COORD_CHANNELS, 2, 4]);

        // row 1 normalized by width 4
        assert_abs_diff_eq!(coord.double_value(&[0, 0, 1, 3]), -0.5, epsilon = 1e-6);
        // column 3 normalized by height 2
        assert_abs_diff_eq!(coord.double_value(&[0, 1, 1, 3]), 2.0, epsilon = 1e-6);
        assert_abs_diff_eq!(coord.double_value(&[0, 6, 0, 0]), 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(coord.double_value(&[0, 7, 0, 0]), 0.25, epsilon = 1e-6);
        Ok(())
    }

    #[test]
    fn deterministic() -> Result<()> {
        let lhs = coord_map(3, 26, 26, Device::Cpu)?;
        let rhs = coord_map(3, 26, 26, Device::Cpu)?;
        assert!(lhs.equal(&rhs));
        Ok(())
    }

    #[test]
    fn reject_empty_grid() {
        assert!(coord_map(1, 0, 13, Device::Cpu).is_err());
    }
}
