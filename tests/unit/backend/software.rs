use super::*;
use crate::foundation::core::{Affine, CompositeMode};
use crate::transform::color::ColorMatrix;

fn backend() -> SoftwareBackend {
    SoftwareBackend::new(SoftwareBackendOpts::default())
}

fn whole(w: f64, h: f64) -> TexturedQuad {
    TexturedQuad {
        dst: Rect::new(0.0, 0.0, w, h),
        src: Rect::new(0.0, 0.0, w, h),
    }
}

fn px(buf: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
    let i = ((y * width + x) * 4) as usize;
    [buf[i], buf[i + 1], buf[i + 2], buf[i + 3]]
}

#[test]
fn fill_then_read_back() {
    let b = backend();
    let ctx = b.current_context().unwrap();
    let t = b.create_texture(4, 4, Filter::Nearest).unwrap();
    b.fill(t, Rgba8Premul::opaque(1, 2, 3)).unwrap();
    let pixels = b.read_pixels(t, ctx).unwrap();
    assert!(pixels.chunks_exact(4).all(|p| p == [1, 2, 3, 255]));
}

#[test]
fn composite_identity_copies_opaque_source() {
    let b = backend();
    let ctx = b.current_context().unwrap();
    let src = b.create_texture(4, 4, Filter::Nearest).unwrap();
    let dst = b.create_texture(8, 8, Filter::Nearest).unwrap();
    b.fill(src, Rgba8Premul::opaque(255, 0, 0)).unwrap();

    b.composite_draw(dst, src, &[whole(4.0, 4.0)], &DrawParams::default())
        .unwrap();

    let out = b.read_pixels(dst, ctx).unwrap();
    assert_eq!(px(&out, 8, 0, 0), [255, 0, 0, 255]);
    assert_eq!(px(&out, 8, 3, 3), [255, 0, 0, 255]);
    assert_eq!(px(&out, 8, 4, 4), [0, 0, 0, 0]);
}

#[test]
fn composite_honors_translation_and_scale() {
    let b = backend();
    let ctx = b.current_context().unwrap();
    let src = b.create_texture(2, 2, Filter::Nearest).unwrap();
    let dst = b.create_texture(8, 8, Filter::Nearest).unwrap();
    b.replace_pixels(
        src,
        &[
            255, 0, 0, 255, 0, 255, 0, 255, //
            0, 0, 255, 255, 255, 255, 255, 255,
        ],
    )
    .unwrap();

    let params = DrawParams {
        geom: Affine::translate((4.0, 4.0)) * Affine::scale(2.0),
        ..DrawParams::default()
    };
    b.composite_draw(dst, src, &[whole(2.0, 2.0)], &params)
        .unwrap();

    let out = b.read_pixels(dst, ctx).unwrap();
    assert_eq!(px(&out, 8, 3, 3), [0, 0, 0, 0]);
    assert_eq!(px(&out, 8, 4, 4), [255, 0, 0, 255]);
    assert_eq!(px(&out, 8, 5, 5), [255, 0, 0, 255]);
    assert_eq!(px(&out, 8, 6, 4), [0, 255, 0, 255]);
    assert_eq!(px(&out, 8, 4, 6), [0, 0, 255, 255]);
    assert_eq!(px(&out, 8, 7, 7), [255, 255, 255, 255]);
}

#[test]
fn composite_applies_color_matrix_and_mode() {
    let b = backend();
    let ctx = b.current_context().unwrap();
    let src = b.create_texture(1, 1, Filter::Nearest).unwrap();
    let dst = b.create_texture(1, 1, Filter::Nearest).unwrap();
    b.fill(src, Rgba8Premul::opaque(255, 255, 255)).unwrap();
    b.fill(dst, Rgba8Premul::opaque(0, 0, 0)).unwrap();

    let params = DrawParams {
        color_m: ColorMatrix::scale(1.0, 0.0, 0.0, 1.0),
        mode: CompositeMode::Lighter,
        ..DrawParams::default()
    };
    b.composite_draw(dst, src, &[whole(1.0, 1.0)], &params)
        .unwrap();
    assert_eq!(b.read_pixels(dst, ctx).unwrap(), vec![255, 0, 0, 255]);
}

#[test]
fn linear_filter_is_exact_at_texel_centers() {
    let b = backend();
    let ctx = b.current_context().unwrap();
    let src = b.create_texture(2, 1, Filter::Linear).unwrap();
    let dst = b.create_texture(2, 1, Filter::Nearest).unwrap();
    b.replace_pixels(src, &[10, 20, 30, 255, 40, 50, 60, 255])
        .unwrap();
    b.composite_draw(dst, src, &[whole(2.0, 1.0)], &DrawParams::default())
        .unwrap();
    assert_eq!(
        b.read_pixels(dst, ctx).unwrap(),
        vec![10, 20, 30, 255, 40, 50, 60, 255]
    );
}

#[test]
fn context_loss_invalidates_textures() {
    let b = backend();
    let old = b.current_context().unwrap();
    let t = b.create_texture(2, 2, Filter::Nearest).unwrap();
    assert!(!b.is_invalidated(t, old));
    assert_eq!(b.live_textures(), 1);

    let new = b.reset_context();
    assert_ne!(old, new);
    assert!(b.is_invalidated(t, new));
    assert!(b.is_invalidated(t, old));
    assert_eq!(b.live_textures(), 0);
    assert!(matches!(
        b.fill(t, Rgba8Premul::transparent()),
        Err(BackendError::InvalidTexture(_))
    ));
}

#[test]
fn operations_without_context_fail() {
    let b = SoftwareBackend::uninitialized(SoftwareBackendOpts::default());
    assert!(b.current_context().is_none());
    assert!(matches!(
        b.create_texture(1, 1, Filter::Nearest),
        Err(BackendError::NoContext)
    ));
}

#[test]
fn size_limits_are_enforced() {
    let b = SoftwareBackend::new(SoftwareBackendOpts {
        max_texture_size: 8,
    });
    assert!(b.create_texture(9, 1, Filter::Nearest).is_err());
    assert!(b.create_texture(0, 1, Filter::Nearest).is_err());
    assert!(matches!(
        b.create_texture_from_pixels(1, 1, &[0; 3], Filter::Nearest),
        Err(BackendError::SizeMismatch {
            expected: 4,
            actual: 3
        })
    ));
}

#[test]
fn injected_composite_failure_is_reported() {
    let b = backend();
    let src = b.create_texture(1, 1, Filter::Nearest).unwrap();
    let dst = b.create_texture(1, 1, Filter::Nearest).unwrap();
    b.set_fail_composites(true);
    assert!(
        b.composite_draw(dst, src, &[whole(1.0, 1.0)], &DrawParams::default())
            .is_err()
    );
    b.set_fail_composites(false);
    assert!(
        b.composite_draw(dst, src, &[whole(1.0, 1.0)], &DrawParams::default())
            .is_ok()
    );
}

#[test]
fn dispose_unknown_texture_errors() {
    let b = backend();
    let t = b.create_screen_framebuffer(2, 2).unwrap();
    b.dispose_texture(t).unwrap();
    assert!(matches!(
        b.dispose_texture(t),
        Err(BackendError::InvalidTexture(_))
    ));
}
