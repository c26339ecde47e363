use super::{CyCxHW, TLBR};
use crate::{common::*, HW};

/// Per-axis scaling followed by translation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Transform<T> {
    pub sy: T,
    pub sx: T,
    pub ty: T,
    pub tx: T,
}

impl<T> Transform<T>
where
    T: Copy + Num,
{
    pub fn identity() -> Self {
        Self {
            sy: T::one(),
            sx: T::one(),
            ty: T::zero(),
            tx: T::zero(),
        }
    }

    pub fn translation(ty: T, tx: T) -> Self {
        Self {
            ty,
            tx,
            ..Self::identity()
        }
    }

    pub fn scaling(sy: T, sx: T) -> Self {
        Self {
            sy,
            sx,
            ..Self::identity()
        }
    }

    /// The transform of stretching an image of `src` size to `tgt` size.
    pub fn from_sizes_exact(src: &HW<T>, tgt: &HW<T>) -> Self
    where
        T: PartialOrd,
    {
        Self::scaling(tgt.h() / src.h(), tgt.w() / src.w())
    }
}

impl<T> Transform<T>
where
    T: Copy + Num + Neg<Output = T>,
{
    pub fn inverse(&self) -> Self {
        let sy = T::one() / self.sy;
        let sx = T::one() / self.sx;
        let ty = -self.ty / self.sy;
        let tx = -self.tx / self.sx;

        Self { sy, sx, ty, tx }
    }
}

impl<T> Mul<&TLBR<T>> for &Transform<T>
where
    T: Copy + Num + PartialOrd,
{
    type Output = TLBR<T>;

    fn mul(self, rhs: &TLBR<T>) -> Self::Output {
        rhs.transform(self)
    }
}

impl<T> Mul<&CyCxHW<T>> for &Transform<T>
where
    T: Copy + Num + PartialOrd,
{
    type Output = CyCxHW<T>;

    fn mul(self, rhs: &CyCxHW<T>) -> Self::Output {
        rhs.transform(self)
    }
}

/// Composition, `(lhs * rhs)` applies `rhs` first.
impl<T> Mul<&Transform<T>> for &Transform<T>
where
    T: Copy + Num,
{
    type Output = Transform<T>;

    fn mul(self, rhs: &Transform<T>) -> Self::Output {
        Transform {
            sx: self.sx * rhs.sx,
            sy: self.sy * rhs.sy,
            tx: rhs.tx * self.sx + self.tx,
            ty: rhs.ty * self.sy + self.ty,
        }
    }
}
