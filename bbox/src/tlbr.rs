use super::{CyCxHW, Rect};
use crate::{common::*, Transform};

/// Bounding box in TLBR format.
///
/// Boxes read from annotations or produced by clipping may be degenerate.
/// The corner order is not checked.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TLBR<T> {
    pub(crate) t: T,
    pub(crate) l: T,
    pub(crate) b: T,
    pub(crate) r: T,
}

impl<T> TLBR<T> {
    /// Build from `[left, top, right, bottom]` without checking the order.
    pub fn from_ltrb(ltrb: [T; 4]) -> Self {
        let [l, t, r, b] = ltrb;
        Self { t, l, b, r }
    }
}

impl<T> TLBR<T>
where
    T: Copy + Num + PartialOrd,
{
    pub fn transform(&self, transform: &Transform<T>) -> Self {
        TLBR {
            t: self.t * transform.sy + transform.ty,
            l: self.l * transform.sx + transform.tx,
            b: self.b * transform.sy + transform.ty,
            r: self.r * transform.sx + transform.tx,
        }
    }

    /// Clamp the corners to the pixel grid of an image of `height` x `width`.
    ///
    /// Coordinates end up in `[0, width - 1]` and `[0, height - 1]`. A box
    /// lying entirely outside the image collapses to zero extent.
    pub fn clip(&self, height: T, width: T) -> Self {
        let zero = T::zero();
        let max_y = height - T::one();
        let max_x = width - T::one();
        let clamp = |value: T, max: T| {
            if value < zero {
                zero
            } else if value > max {
                max
            } else {
                value
            }
        };

        TLBR {
            t: clamp(self.t, max_y),
            l: clamp(self.l, max_x),
            b: clamp(self.b, max_y),
            r: clamp(self.r, max_x),
        }
    }
}

impl<T> Rect for TLBR<T>
where
    T: Copy + Num,
{
    type Type = T;

    fn t(&self) -> T {
        self.t
    }

    fn l(&self) -> T {
        self.l
    }

    fn b(&self) -> T {
        self.b
    }

    fn r(&self) -> T {
        self.r
    }

    fn cy(&self) -> T {
        let two = T::one() + T::one();
        (self.t + self.b) / two
    }

    fn cx(&self) -> T {
        let two = T::one() + T::one();
        (self.l + self.r) / two
    }

    fn h(&self) -> T {
        self.b - self.t
    }

    fn w(&self) -> T {
        self.r - self.l
    }
}

impl<T> From<&CyCxHW<T>> for TLBR<T>
where
    T: Copy + Num,
{
    fn from(from: &CyCxHW<T>) -> Self {
        let two = T::one() + T::one();
        let CyCxHW { cy, cx, h, w } = *from;
        Self {
            t: cy - h / two,
            l: cx - w / two,
            b: cy + h / two,
            r: cx + w / two,
        }
    }
}

impl<T> From<CyCxHW<T>> for TLBR<T>
where
    T: Copy + Num,
{
    fn from(from: CyCxHW<T>) -> Self {
        Self::from(&from)
    }
}
