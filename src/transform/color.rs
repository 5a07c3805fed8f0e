//! Color matrix transform.

use crate::foundation::core::Rgba8Premul;
use crate::foundation::math::{u8_to_unit, unit_to_u8};

/// A 4x5 affine transform over straight-alpha RGBA in unit range.
///
/// Row `i` computes output channel `i` as `sum(m[i][j] * in[j]) + m[i][4]`. The matrix is applied
/// to un-premultiplied color; the result is re-premultiplied and clamped.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ColorMatrix {
    pub elements: [[f64; 5]; 4],
}

impl Default for ColorMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ColorMatrix {
    pub const IDENTITY: Self = Self {
        elements: [
            [1.0, 0.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 1.0, 0.0],
        ],
    };

    pub fn scale(r: f64, g: f64, b: f64, a: f64) -> Self {
        let mut m = Self::IDENTITY;
        m.elements[0][0] = r;
        m.elements[1][1] = g;
        m.elements[2][2] = b;
        m.elements[3][3] = a;
        m
    }

    pub fn translate(r: f64, g: f64, b: f64, a: f64) -> Self {
        let mut m = Self::IDENTITY;
        m.elements[0][4] = r;
        m.elements[1][4] = g;
        m.elements[2][4] = b;
        m.elements[3][4] = a;
        m
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Matrix equivalent to applying `self` first and then `next`.
    pub fn then(&self, next: &ColorMatrix) -> ColorMatrix {
        let a = &next.elements;
        let b = &self.elements;
        let mut out = [[0.0f64; 5]; 4];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                let mut v = 0.0;
                for k in 0..4 {
                    v += a[i][k] * b[k][j];
                }
                if j == 4 {
                    v += a[i][4];
                }
                *cell = v;
            }
        }
        ColorMatrix { elements: out }
    }

    pub fn apply(&self, px: Rgba8Premul) -> Rgba8Premul {
        if self.is_identity() {
            return px;
        }

        let a = u8_to_unit(px.a);
        let straight = if px.a == 0 {
            [0.0, 0.0, 0.0, 0.0]
        } else {
            [
                u8_to_unit(px.r) / a,
                u8_to_unit(px.g) / a,
                u8_to_unit(px.b) / a,
                a,
            ]
        };

        let mut out = [0.0f64; 4];
        for (i, o) in out.iter_mut().enumerate() {
            let row = &self.elements[i];
            let v = row[0] * straight[0]
                + row[1] * straight[1]
                + row[2] * straight[2]
                + row[3] * straight[3]
                + row[4];
            *o = v.clamp(0.0, 1.0);
        }

        let oa = out[3];
        Rgba8Premul {
            r: unit_to_u8(out[0] * oa),
            g: unit_to_u8(out[1] * oa),
            b: unit_to_u8(out[2] * oa),
            a: unit_to_u8(oa),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/transform/color.rs"]
mod tests;
