use crate::backend::texture::BackendError;

/// Convenience result type used across resurface.
pub type ResurfaceResult<T> = Result<T, ResurfaceError>;

/// Top-level error taxonomy returned by image and restore operations.
#[derive(thiserror::Error, Debug)]
pub enum ResurfaceError {
    /// The image was disposed before this operation ran.
    #[error("image is already disposed")]
    AlreadyDisposed,

    /// A pixel buffer did not match `4 * width * height`.
    #[error("size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        /// Required length in bytes.
        expected: usize,
        /// Length that was supplied.
        actual: usize,
    },

    /// An operand is not acceptable for this operation (e.g. drawing an image onto itself).
    #[error("invalid operand: {0}")]
    InvalidOperand(String),

    /// Failure reported by the texture backend, passed through unchanged.
    #[error("backend failure: {0}")]
    Backend(#[from] BackendError),

    /// Invalid construction parameters or options.
    #[error("validation error: {0}")]
    Validation(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ResurfaceError {
    /// Build a [`ResurfaceError::InvalidOperand`] value.
    pub fn invalid_operand(msg: impl Into<String>) -> Self {
        Self::InvalidOperand(msg.into())
    }

    /// Build a [`ResurfaceError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`ResurfaceError::SizeMismatch`] value.
    pub fn size_mismatch(expected: usize, actual: usize) -> Self {
        Self::SizeMismatch { expected, actual }
    }

    /// True for [`ResurfaceError::AlreadyDisposed`].
    pub fn is_already_disposed(&self) -> bool {
        matches!(self, Self::AlreadyDisposed)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
