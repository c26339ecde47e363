//! Channel-first image tensor operations.

use crate::common::*;

/// Geometric and photometric operations on `[channels, height, width]` images.
///
/// Images are either `Kind::Uint8` in range `[0, 255]` or `Kind::Float` in range `[0, 1]`.
pub trait ImageTensorExt {
    /// Mirror the image top-to-bottom.
    fn vflip(&self) -> Result<Tensor>;

    /// Mirror the image left-to-right.
    fn hflip(&self) -> Result<Tensor>;

    /// Stretch the image to exactly `new_height` x `new_width`.
    fn resize2d_exact(&self, new_height: i64, new_width: i64) -> Result<Tensor>;

    /// Fit the image into a `size` x `size` square preserving the aspect
    /// ratio, and pad the margins with `fill` in `[0, 255]` units.
    ///
    /// Returns the padded image and the pixel transform from the input to it.
    fn letterbox(&self, size: i64, fill: [f64; 3]) -> Result<(Tensor, Transform<f64>)>;

    /// Repeat a single channel image to three channels.
    fn to_rgb(&self) -> Result<Tensor>;

    /// Convert `[0, 255]` pixels to `[0, 1]` floats.
    fn to_ratio(&self) -> Result<Tensor>;

    /// Standardize a `[0, 1]` image by per-channel mean and standard deviation.
    fn standardize(&self, mean: [f64; 3], std: [f64; 3]) -> Result<Tensor>;
}

impl ImageTensorExt for Tensor {
    fn vflip(&self) -> Result<Tensor> {
        let _ = self.size3()?;
        Ok(self.f_flip(&[1])?)
    }

    fn hflip(&self) -> Result<Tensor> {
        let _ = self.size3()?;
        Ok(self.f_flip(&[2])?)
    }

    fn resize2d_exact(&self, new_height: i64, new_width: i64) -> Result<Tensor> {
        ensure!(
            new_height > 0 && new_width > 0,
            "the target size must be positive, but get {}x{}",
            new_height,
            new_width
        );

        tch::no_grad(|| match (self.kind(), self.size().as_slice()) {
            (_, &[_channels, height, width]) if (height, width) == (new_height, new_width) => {
                Ok(self.shallow_clone())
            }
            (Kind::Uint8, &[_channels, _height, _width]) => {
                let resized = vision::image::resize(self, new_width, new_height)?;
                Ok(resized)
            }
            (Kind::Float, &[_channels, _height, _width]) => {
                let resized = vision::image::resize(
                    &(self * 255.0).clamp(0.0, 255.0).to_kind(Kind::Uint8),
                    new_width,
                    new_height,
                )?
                .to_kind(Kind::Float)
                    / 255.0;
                Ok(resized)
            }
            (_, &[_channels, _height, _width]) => bail!("unsupported data kind"),
            _ => bail!("invalid shape: expect three dimensions"),
        })
    }

    fn letterbox(&self, size: i64, fill: [f64; 3]) -> Result<(Tensor, Transform<f64>)> {
        ensure!(size > 0, "the letterbox size must be positive");
        let (channels, height, width) = self.size3()?;
        ensure!(
            channels == 3,
            "letterbox expects 3 channels, but get {}",
            channels
        );
        ensure!(height > 0 && width > 0, "the image must not be empty");

        let ratio = size as f64 / height.max(width) as f64;
        let inner_h = ((height as f64 * ratio).round() as i64).clamp(1, size);
        let inner_w = ((width as f64 * ratio).round() as i64).clamp(1, size);
        let dh = (size - inner_h) as f64 / 2.0;
        let dw = (size - inner_w) as f64 / 2.0;
        let top = (dh - 0.1).round() as i64;
        let left = (dw - 0.1).round() as i64;

        let inner = self.resize2d_exact(inner_h, inner_w)?;
        let fill = match self.kind() {
            Kind::Float => fill.map(|value| value / 255.0),
            _ => fill,
        };

        let outer = tch::no_grad(|| -> Result<_> {
            let fill = Tensor::of_slice(&fill)
                .to_kind(Kind::Float)
                .to_device(self.device())
                .view([3, 1, 1]);
            let outer = (Tensor::ones(&[3, size, size], (Kind::Float, self.device())) * fill)
                .to_kind(self.kind());
            outer
                .f_narrow(1, top, inner_h)?
                .f_narrow(2, left, inner_w)?
                .f_copy_(&inner)?;
            Ok(outer)
        })?;

        let transform = &Transform::translation(top as f64, left as f64)
            * &Transform::scaling(
                inner_h as f64 / height as f64,
                inner_w as f64 / width as f64,
            );

        Ok((outer, transform))
    }

    fn to_rgb(&self) -> Result<Tensor> {
        let (channels, _height, _width) = self.size3()?;
        let rgb = match channels {
            3 => self.shallow_clone(),
            1 => self.f_repeat(&[3, 1, 1])?,
            _ => bail!("expect 1 or 3 channels, but get {}", channels),
        };
        Ok(rgb)
    }

    fn to_ratio(&self) -> Result<Tensor> {
        let ratio = match self.kind() {
            Kind::Uint8 => self.f_to_kind(Kind::Float)? / 255.0,
            Kind::Float => self.shallow_clone(),
            kind => bail!("unsupported data kind {:?}", kind),
        };
        Ok(ratio)
    }

    fn standardize(&self, mean: [f64; 3], std: [f64; 3]) -> Result<Tensor> {
        let (channels, _height, _width) = self.size3()?;
        ensure!(
            channels == 3,
            "standardize expects 3 channels, but get {}",
            channels
        );
        ensure!(
            std.iter().all(|&std| std > 0.0),
            "std must be positive, but get {:?}",
            std
        );

        let device = self.device();
        let mean = Tensor::of_slice(&mean)
            .to_kind(Kind::Float)
            .to_device(device)
            .view([3, 1, 1]);
        let std = Tensor::of_slice(&std)
            .to_kind(Kind::Float)
            .to_device(device)
            .view([3, 1, 1]);
        Ok((self.f_to_kind(Kind::Float)? - mean) / std)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_image(height: i64, width: i64) -> Tensor {
        Tensor::arange(3 * height * width, INT64_CPU)
            .remainder(256i64)
            .to_kind(Kind::Uint8)
            .view([3, height, width])
    }

    #[test]
    fn double_flip_restores_pixels() -> Result<()> {
        let image = gradient_image(5, 7);
        assert!(image.vflip()?.vflip()?.equal(&image));
        assert!(image.hflip()?.hflip()?.equal(&image));
        assert!(!image.vflip()?.equal(&image));
        Ok(())
    }

    #[test]
    fn vflip_moves_rows() -> Result<()> {
        let image = gradient_image(4, 3);
        let flipped = image.vflip()?;
        assert!(flipped.i((.., 0, ..)).equal(&image.i((.., 3, ..))));
        Ok(())
    }

    #[test]
    fn resize_exact_size() -> Result<()> {
        let image = gradient_image(30, 40);
        let (channels, height, width) = image.resize2d_exact(20, 50)?.size3()?;
        assert_eq!((channels, height, width), (3, 20, 50));

        let float = image.to_ratio()?;
        assert_eq!(float.resize2d_exact(20, 50)?.kind(), Kind::Float);
        Ok(())
    }

    #[test]
    fn letterbox_wide_image() -> Result<()> {
        let image = Tensor::full(&[3, 100, 200], 200i64, (Kind::Uint8, Device::Cpu));
        let fill = [10.0, 20.0, 30.0];
        let (boxed, transform) = image.letterbox(416, fill)?;

        assert_eq!(boxed.size(), vec![3, 416, 416]);
        // inner height is 208 centered vertically, the margin is 104 pixels
        assert_eq!(boxed.int64_value(&[0, 0, 0]), 10);
        assert_eq!(boxed.int64_value(&[2, 103, 200]), 30);
        assert_eq!(boxed.int64_value(&[1, 104, 200]), 200);
        assert_eq!(boxed.int64_value(&[1, 311, 200]), 200);
        assert_eq!(boxed.int64_value(&[1, 312, 200]), 20);

        assert_abs_diff_eq!(transform.sy, 2.08);
        assert_abs_diff_eq!(transform.sx, 2.08);
        assert_abs_diff_eq!(transform.ty, 104.0);
        assert_abs_diff_eq!(transform.tx, 0.0);

        // boxes on the padded image map back to the input pixels
        let tlbr = TLBR::from_ltrb([41.6, 124.8, 249.6, 228.8]);
        let [l, t, r, b] = (&transform.inverse() * &tlbr).ltrb();
        assert_abs_diff_eq!(l, 20.0, epsilon = 1e-9);
        assert_abs_diff_eq!(t, 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(r, 120.0, epsilon = 1e-9);
        assert_abs_diff_eq!(b, 60.0, epsilon = 1e-9);
        Ok(())
    }

    #[test]
    fn standardize_channels() -> Result<()> {
        let image = Tensor::ones(&[3, 2, 2], FLOAT_CPU) * 0.5;
        let output = image.standardize([0.5, 0.25, 0.0], [1.0, 0.5, 0.25])?;
        assert_abs_diff_eq!(output.double_value(&[0, 0, 0]), 0.0);
        assert_abs_diff_eq!(output.double_value(&[1, 1, 1]), 0.5);
        assert_abs_diff_eq!(output.double_value(&[2, 0, 1]), 2.0);
        Ok(())
    }

    #[test]
    fn grayscale_to_rgb() -> Result<()> {
        let gray = gradient_image(1, 12).view([1, 6, 6]);
        let rgb = gray.to_rgb()?;
        assert_eq!(rgb.size(), vec![3, 6, 6]);
        assert!(rgb.i(2).equal(&gray.i(0)));
        Ok(())
    }
}
