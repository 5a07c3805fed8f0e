use super::*;
use crate::backend::texture::TextureId;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        ResurfaceError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        ResurfaceError::invalid_operand("x")
            .to_string()
            .contains("invalid operand:")
    );
    assert!(
        ResurfaceError::AlreadyDisposed
            .to_string()
            .contains("already disposed")
    );
    assert_eq!(
        ResurfaceError::size_mismatch(16, 3).to_string(),
        "size mismatch: expected 16 bytes, got 3"
    );
}

#[test]
fn backend_errors_keep_their_message() {
    let err: ResurfaceError = BackendError::InvalidTexture(TextureId::from_u64(7)).into();
    let msg = err.to_string();
    assert!(msg.starts_with("backend failure:"));
    assert!(msg.contains('7'));
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = ResurfaceError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn already_disposed_predicate() {
    assert!(ResurfaceError::AlreadyDisposed.is_already_disposed());
    assert!(!ResurfaceError::validation("x").is_already_disposed());
}
