use anyhow::Context;
use image::DynamicImage;

use crate::foundation::error::ResurfaceResult;

/// Decode an encoded image (any format the `image` crate detects) from memory.
pub fn decode_image(bytes: &[u8]) -> ResurfaceResult<DynamicImage> {
    let img = image::load_from_memory(bytes).context("decode image from memory")?;
    tracing::debug!(
        width = img.width(),
        height = img.height(),
        color = ?img.color(),
        "decoded image"
    );
    Ok(img)
}

/// Read and decode an image file.
pub fn load_image(path: &std::path::Path) -> ResurfaceResult<DynamicImage> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read image file '{}'", path.display()))?;
    decode_image(&bytes)
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
