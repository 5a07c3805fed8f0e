use crate::{backend::texture::TexturedQuad, draw::parts::ImageParts, foundation::core::Rect};

/// Resolve `parts` against a `width` x `height` source into backend quads.
///
/// Parts with an empty destination or source are dropped. Source rectangles reaching outside the
/// source are clipped, and the destination shrinks by the same proportion.
pub fn textured_quads(parts: &dyn ImageParts, width: u32, height: u32) -> Vec<TexturedQuad> {
    let bounds = Rect::new(0.0, 0.0, f64::from(width), f64::from(height));
    let mut out = Vec::with_capacity(parts.len());

    for i in 0..parts.len() {
        let dst = parts.dst(i);
        let src = parts.src(i);
        if !(dst.width() > 0.0 && dst.height() > 0.0 && src.width() > 0.0 && src.height() > 0.0)
        {
            continue;
        }

        let clipped = src.intersect(bounds);
        if clipped.width() <= 0.0 || clipped.height() <= 0.0 {
            continue;
        }
        if clipped == src {
            out.push(TexturedQuad { dst, src });
            continue;
        }

        let sx = dst.width() / src.width();
        let sy = dst.height() / src.height();
        let dst = Rect::new(
            dst.x0 + (clipped.x0 - src.x0) * sx,
            dst.y0 + (clipped.y0 - src.y0) * sy,
            dst.x1 - (src.x1 - clipped.x1) * sx,
            dst.y1 - (src.y1 - clipped.y1) * sy,
        );
        out.push(TexturedQuad { dst, src: clipped });
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/draw/quads.rs"]
mod tests;
