use crate::common::*;
use num_traits::Zero;

/// The generic rectangle.
pub trait Rect {
    type Type;

    fn t(&self) -> Self::Type;
    fn l(&self) -> Self::Type;
    fn b(&self) -> Self::Type;
    fn r(&self) -> Self::Type;
    fn cy(&self) -> Self::Type;
    fn cx(&self) -> Self::Type;
    fn h(&self) -> Self::Type;
    fn w(&self) -> Self::Type;
}

pub trait RectNum: Rect
where
    Self::Type: Num + PartialOrd + Copy,
{
    /// Corners in annotation order, `[left, top, right, bottom]`.
    fn ltrb(&self) -> [Self::Type; 4] {
        [self.l(), self.t(), self.r(), self.b()]
    }

    /// True if the height or width is zero or negative.
    fn is_degenerate(&self) -> bool {
        let zero = Self::Type::zero();
        self.h() <= zero || self.w() <= zero
    }
}

impl<R> RectNum for R
where
    R: Rect,
    R::Type: Num + PartialOrd + Copy,
{
}
