use image::{GenericImageView, Rgba};

use crate::foundation::{
    core::{Rgba8Premul, rgba8_len},
    error::{ResurfaceError, ResurfaceResult},
};

/// Dense premultiplied RGBA8 copy of `source`, sized to the view itself.
///
/// Views with a non-zero origin (e.g. `image::SubImage`) are re-based so that the view's top-left
/// pixel lands at byte 0.
pub(crate) fn normalize_view<V>(source: &V) -> ResurfaceResult<(u32, u32, Vec<u8>)>
where
    V: GenericImageView<Pixel = Rgba<u8>>,
{
    let (width, height) = source.dimensions();
    let len = checked_len(width, height)?;
    let mut out = vec![0u8; len];
    for (x, y, px) in source.pixels() {
        let idx = ((y as usize) * (width as usize) + (x as usize)) * 4;
        out[idx..idx + 4].copy_from_slice(&px.0);
    }
    premultiply_rgba8_in_place(&mut out);
    Ok((width, height, out))
}

/// Buffer of `width * height` copies of `color`.
pub(crate) fn solid(width: u32, height: u32, color: Rgba8Premul) -> Vec<u8> {
    color
        .to_array()
        .repeat((width as usize) * (height as usize))
}

pub(crate) fn checked_len(width: u32, height: u32) -> ResurfaceResult<usize> {
    if width == 0 || height == 0 {
        return Err(ResurfaceError::validation(format!(
            "image size must be at least 1x1, got {width}x{height}"
        )));
    }
    rgba8_len(width, height).ok_or_else(|| {
        ResurfaceError::validation(format!("image size {width}x{height} overflows"))
    })
}

pub(crate) fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/image/pixels.rs"]
mod tests;
