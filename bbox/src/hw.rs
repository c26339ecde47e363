use crate::common::*;

/// The extent of an image or a crop window, height first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HW<T> {
    h: T,
    w: T,
}

impl<T> HW<T>
where
    T: Num + PartialOrd + Copy,
{
    /// Fails if either side is negative.
    pub fn try_from_hw([h, w]: [T; 2]) -> Result<Self> {
        ensure!(
            h >= T::zero() && w >= T::zero(),
            "image sizes must be non-negative"
        );
        Ok(Self { h, w })
    }

    pub fn h(&self) -> T {
        self.h
    }

    pub fn w(&self) -> T {
        self.w
    }
}
