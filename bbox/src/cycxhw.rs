use super::{Rect, TLBR};
use crate::{common::*, Transform};

/// Bounding box in CyCxHW format.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CyCxHW<T> {
    pub(crate) cy: T,
    pub(crate) cx: T,
    pub(crate) h: T,
    pub(crate) w: T,
}

impl<T> CyCxHW<T>
where
    T: Copy + Num + PartialOrd,
{
    pub fn transform(&self, transform: &Transform<T>) -> Self {
        CyCxHW {
            cy: self.cy * transform.sy + transform.ty,
            cx: self.cx * transform.sx + transform.tx,
            h: self.h * transform.sy,
            w: self.w * transform.sx,
        }
    }

    /// Mirror the center along the vertical extent `height`.
    ///
    /// With ratio coordinates pass `1`, so that `cy` becomes `1 - cy`.
    pub fn vflip(&self, height: T) -> Self {
        Self {
            cy: height - self.cy,
            ..*self
        }
    }

    /// Mirror the center along the horizontal extent `width`.
    pub fn hflip(&self, width: T) -> Self {
        Self {
            cx: width - self.cx,
            ..*self
        }
    }
}

impl<T> Rect for CyCxHW<T>
where
    T: Copy + Num,
{
    type Type = T;

    fn t(&self) -> T {
        let two = T::one() + T::one();
        self.cy - self.h / two
    }

    fn l(&self) -> T {
        let two = T::one() + T::one();
        self.cx - self.w / two
    }

    fn b(&self) -> T {
        let two = T::one() + T::one();
        self.cy + self.h / two
    }

    fn r(&self) -> T {
        let two = T::one() + T::one();
        self.cx + self.w / two
    }

    fn cy(&self) -> T {
        self.cy
    }

    fn cx(&self) -> T {
        self.cx
    }

    fn h(&self) -> T {
        self.h
    }

    fn w(&self) -> T {
        self.w
    }
}

impl<T> From<&TLBR<T>> for CyCxHW<T>
where
    T: Copy + Num,
{
    fn from(from: &TLBR<T>) -> Self {
        Self {
            cy: from.cy(),
            cx: from.cx(),
            h: from.h(),
            w: from.w(),
        }
    }
}

impl<T> From<TLBR<T>> for CyCxHW<T>
where
    T: Copy + Num,
{
    fn from(from: TLBR<T>) -> Self {
        Self::from(&from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn tlbr_round_trip() {
        let tlbr = TLBR::from_ltrb([100.0, 50.0, 200.0, 250.0]);
        let cycxhw = CyCxHW::from(&tlbr);
        assert_abs_diff_eq!(cycxhw.cy(), 150.0);
        assert_abs_diff_eq!(cycxhw.cx(), 150.0);
        assert_abs_diff_eq!(cycxhw.h(), 200.0);
        assert_abs_diff_eq!(cycxhw.w(), 100.0);
        assert_eq!(TLBR::from(&cycxhw), tlbr);
    }

    #[test]
    fn ratio_flip() {
        let cycxhw = CyCxHW::from(&TLBR::from_ltrb([0.65, 0.2, 0.85, 0.3]));

        let flipped = cycxhw.vflip(1.0);
        assert_abs_diff_eq!(flipped.cy(), 0.75);
        assert_abs_diff_eq!(flipped.cx(), 0.75);
        assert_eq!(flipped.vflip(1.0), cycxhw);

        let flipped = cycxhw.hflip(1.0);
        assert_abs_diff_eq!(flipped.cx(), 0.25);
        assert_eq!(flipped.hflip(1.0), cycxhw);
        assert_abs_diff_eq!(flipped.h(), cycxhw.h());
        assert_abs_diff_eq!(flipped.w(), cycxhw.w());
    }
}
