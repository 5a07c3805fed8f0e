use super::*;
use crate::{
    backend::{
        software::{SoftwareBackend, SoftwareBackendOpts},
        texture::DrawParams,
    },
    draw::parts::WholeImage,
    foundation::core::{Affine, Filter, Rgba8Premul},
};

const RED: Rgba8Premul = Rgba8Premul::opaque(255, 0, 0);

fn software() -> Arc<SoftwareBackend> {
    Arc::new(SoftwareBackend::new(SoftwareBackendOpts::default()))
}

fn persistent(b: &Arc<SoftwareBackend>, reg: &ImageRegistry, w: u32, h: u32) -> Arc<ImageStore> {
    let img = ImageStore::new(b.clone(), w, h, Filter::Nearest, false).unwrap();
    reg.register(&img);
    img
}

fn draw(dst: &ImageStore, src: &Arc<ImageStore>, geom: Affine) {
    let (width, height) = src.size();
    let params = DrawParams {
        geom,
        ..DrawParams::default()
    };
    dst.draw_image(src, &WholeImage { width, height }, params)
        .unwrap();
}

fn source_then_dependent(dependent_first: bool, opts: &RestoreOpts) {
    let b = software();
    let reg = ImageRegistry::new();
    let (a, dst) = if dependent_first {
        let dst = persistent(&b, &reg, 8, 8);
        (persistent(&b, &reg, 4, 4), dst)
    } else {
        let a = persistent(&b, &reg, 4, 4);
        (a, persistent(&b, &reg, 8, 8))
    };
    a.fill(RED).unwrap();
    draw(&dst, &a, Affine::translate((4.0, 4.0)));

    let ctx = b.reset_context();
    assert!(reg.any_invalidated(ctx));
    let stats = reg.restore_all(ctx, opts).unwrap();
    assert_eq!(
        stats,
        RestoreStats {
            restored: 2,
            replayed: 1,
            skipped_disposed: 0,
        }
    );
    assert!(!reg.any_invalidated(ctx));
    assert_eq!(dst.at(5, 5).unwrap(), RED);
    assert_eq!(dst.at(1, 1).unwrap(), Rgba8Premul::transparent());
    assert_eq!(a.at(0, 0).unwrap(), RED);
}

#[test]
fn restore_is_independent_of_registration_order() {
    source_then_dependent(false, &RestoreOpts::default());
    source_then_dependent(true, &RestoreOpts::default());
}

#[test]
fn parallel_restore_matches_sequential() {
    let opts = RestoreOpts {
        parallel: true,
        threads: Some(2),
    };
    source_then_dependent(true, &opts);
}

#[test]
fn stats_count_every_kind_of_image() {
    let b = software();
    let reg = ImageRegistry::new();
    let keep = persistent(&b, &reg, 2, 2);
    let gone = persistent(&b, &reg, 2, 2);
    let scratch = ImageStore::new(b.clone(), 2, 2, Filter::Nearest, true).unwrap();
    reg.register(&scratch);
    let screen = ImageStore::new_screen(b.clone(), 2, 2).unwrap();
    reg.register(&screen);
    keep.fill(RED).unwrap();
    gone.dispose().unwrap();

    let ctx = b.reset_context();
    let stats = reg.restore_all(ctx, &RestoreOpts::default()).unwrap();
    assert_eq!(stats.restored, 3);
    assert_eq!(stats.skipped_disposed, 1);
    assert_eq!(stats.replayed, 0);
    assert_eq!(keep.at(0, 0).unwrap(), RED);
}

#[test]
fn dropped_images_are_pruned() {
    let b = software();
    let reg = ImageRegistry::new();
    let keep = persistent(&b, &reg, 2, 2);
    {
        let _tmp = persistent(&b, &reg, 2, 2);
        assert_eq!(reg.len(), 2);
    }
    assert_eq!(reg.len(), 1);
    assert!(!reg.is_empty());
    drop(keep);
    assert!(reg.is_empty());
}

#[test]
fn clearing_volatile_images_flattens_their_dependents() {
    let b = software();
    let reg = ImageRegistry::new();
    let scratch = ImageStore::new(b.clone(), 2, 2, Filter::Nearest, true).unwrap();
    reg.register(&scratch);
    let dst = persistent(&b, &reg, 2, 2);
    scratch.fill(RED).unwrap();
    draw(&dst, &scratch, Affine::IDENTITY);
    assert!(dst.has_history_with(&scratch));

    reg.clear_volatile_images().unwrap();
    assert!(!dst.has_history());
    assert!(dst.has_pixel_cache());
    assert_eq!(dst.at(0, 0).unwrap(), RED);
    assert_eq!(scratch.at(0, 0).unwrap(), Rgba8Premul::transparent());
}

#[test]
fn reset_history_counts_flattened_images() {
    let b = software();
    let reg = ImageRegistry::new();
    let a = persistent(&b, &reg, 2, 2);
    let d1 = persistent(&b, &reg, 2, 2);
    let d2 = persistent(&b, &reg, 2, 2);
    let other = persistent(&b, &reg, 2, 2);
    a.fill(RED).unwrap();
    draw(&d1, &a, Affine::IDENTITY);
    draw(&d2, &a, Affine::IDENTITY);
    draw(&other, &d1, Affine::IDENTITY);

    assert_eq!(reg.reset_history_if_needed(&a), 1);
    assert!(!d1.has_history());
    assert!(!d2.has_history());
    assert!(other.has_history());
    assert_eq!(reg.reset_history_if_needed(&a), 0);
}

#[test]
fn zero_threads_are_rejected_before_restoring() {
    let b = software();
    let reg = ImageRegistry::new();
    let img = persistent(&b, &reg, 2, 2);
    let ctx = b.reset_context();
    let opts = RestoreOpts {
        parallel: true,
        threads: Some(0),
    };
    assert!(matches!(
        reg.restore_all(ctx, &opts),
        Err(ResurfaceError::Validation(_))
    ));
    assert!(img.is_invalidated(ctx));
}
