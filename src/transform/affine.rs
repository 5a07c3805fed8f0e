//! Affine transform helpers.

use crate::foundation::core::{Affine, Rect, Vec2};

#[inline]
pub fn identity() -> Affine {
    Affine::IDENTITY
}

#[inline]
/// `first` is applied before `second`.
pub fn then(first: Affine, second: Affine) -> Affine {
    second * first
}

#[inline]
pub fn translate(x: f64, y: f64) -> Affine {
    Affine::translate(Vec2::new(x, y))
}

/// Inverse of `a`, or `None` when it collapses area to zero.
pub fn checked_inverse(a: Affine) -> Option<Affine> {
    let det = a.determinant();
    if det == 0.0 || !det.is_finite() {
        return None;
    }
    Some(a.inverse())
}

/// Device-space bounding box of `rect` under `a`.
pub fn bounding_box(a: Affine, rect: Rect) -> Rect {
    a.transform_rect_bbox(rect)
}
