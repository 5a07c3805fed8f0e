use crate::foundation::core::CompositeMode;
use crate::foundation::math::mul_div255_u8;

pub type PremulRgba8 = [u8; 4];

/// Porter-Duff composite of premultiplied `src` onto premultiplied `dst`.
pub fn blend(mode: CompositeMode, dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    let sa = u16::from(src[3]);
    let da = u16::from(dst[3]);
    let inv_sa = 255 - sa;
    let inv_da = 255 - da;

    // (source factor, destination factor), both scaled to 0..=255.
    let (fs, fd) = match mode {
        CompositeMode::Clear => (0, 0),
        CompositeMode::Copy => (255, 0),
        CompositeMode::Destination => (0, 255),
        CompositeMode::SourceOver => (255, inv_sa),
        CompositeMode::DestinationOver => (inv_da, 255),
        CompositeMode::SourceIn => (da, 0),
        CompositeMode::DestinationIn => (0, sa),
        CompositeMode::SourceOut => (inv_da, 0),
        CompositeMode::DestinationOut => (0, inv_sa),
        CompositeMode::SourceAtop => (da, inv_sa),
        CompositeMode::DestinationAtop => (inv_da, sa),
        CompositeMode::Xor => (inv_da, inv_sa),
        CompositeMode::Lighter => (255, 255),
    };

    let mut out = [0u8; 4];
    for i in 0..4 {
        let sc = mul_div255(u16::from(src[i]), fs);
        let dc = mul_div255(u16::from(dst[i]), fd);
        out[i] = add_sat_u8(sc, dc);
    }
    out
}

pub fn blend_in_place(mode: CompositeMode, dst: &mut [u8], idx: usize, src: PremulRgba8) {
    let d = [dst[idx], dst[idx + 1], dst[idx + 2], dst[idx + 3]];
    let out = blend(mode, d, src);
    dst[idx..idx + 4].copy_from_slice(&out);
}

fn mul_div255(x: u16, y: u16) -> u8 {
    mul_div255_u8(x, y)
}

fn add_sat_u8(a: u8, b: u8) -> u8 {
    a.saturating_add(b)
}

#[cfg(test)]
#[path = "../../tests/unit/backend/composite.rs"]
mod tests;
