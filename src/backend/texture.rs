use crate::{
    foundation::core::{Affine, CompositeMode, Filter, Rect, Rgba8Premul},
    transform::color::ColorMatrix,
};

/// Opaque handle to a texture (or the screen framebuffer) owned by a [`TextureBackend`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(u64);

impl TextureId {
    /// Construct a [`TextureId`] from a raw backend value.
    pub fn from_u64(raw: u64) -> Self {
        Self(raw)
    }

    /// Access the raw backend value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TextureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Generation of the rendering context. Every context re-creation yields a new value; textures
/// created under an older generation are invalid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(pub u64);

/// Errors reported by a [`TextureBackend`].
#[derive(thiserror::Error, Debug)]
pub enum BackendError {
    /// No rendering context is currently live.
    #[error("no live rendering context")]
    NoContext,

    /// The handle does not name a texture known to the backend.
    #[error("unknown texture {0}")]
    InvalidTexture(TextureId),

    /// The texture was created under a context that has since been lost.
    #[error("texture {texture} belongs to a lost context")]
    ContextLost {
        /// Stale handle.
        texture: TextureId,
    },

    /// An upload buffer did not match the texture size.
    #[error("pixel buffer size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        /// Required length in bytes.
        expected: usize,
        /// Length that was supplied.
        actual: usize,
    },

    /// Any other device-level failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience result type for backend calls.
pub type BackendResult<T> = Result<T, BackendError>;

/// One textured quad of a composite draw, before the geometry transform.
///
/// `dst` is in the destination's local space (transformed by [`DrawParams::geom`]); `src` is in
/// source texel coordinates and is mapped linearly onto `dst`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TexturedQuad {
    /// Destination rectangle in local (pre-transform) space.
    pub dst: Rect,
    /// Source rectangle in texels.
    pub src: Rect,
}

/// Transform and blend parameters of a composite draw.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DrawParams {
    /// Geometry transform applied to quad positions.
    pub geom: Affine,
    /// Color transform applied to sampled source pixels.
    pub color_m: ColorMatrix,
    /// Porter-Duff operator used to combine source and destination.
    pub mode: CompositeMode,
}

/// GPU texture layer consumed by the image backing store.
///
/// Implementations serialize device access internally, so every method takes `&self` and the
/// trait object can be shared across threads. All pixel buffers are tightly packed, row-major,
/// premultiplied RGBA8.
pub trait TextureBackend: Send + Sync {
    /// The live context, or `None` before initialization / after a loss.
    fn current_context(&self) -> Option<ContextId>;

    /// Allocate a transparent texture.
    fn create_texture(&self, width: u32, height: u32, filter: Filter) -> BackendResult<TextureId>;

    /// Allocate a texture initialized from `pixels`.
    fn create_texture_from_pixels(
        &self,
        width: u32,
        height: u32,
        pixels: &[u8],
        filter: Filter,
    ) -> BackendResult<TextureId>;

    /// Bind the platform framebuffer of the current context.
    fn create_screen_framebuffer(&self, width: u32, height: u32) -> BackendResult<TextureId>;

    /// Overwrite every texel with `color`.
    fn fill(&self, texture: TextureId, color: Rgba8Premul) -> BackendResult<()>;

    /// Composite `src` into `dst` through `quads` using `params`.
    fn composite_draw(
        &self,
        dst: TextureId,
        src: TextureId,
        quads: &[TexturedQuad],
        params: &DrawParams,
    ) -> BackendResult<()>;

    /// Overwrite every texel with `pixels`.
    fn replace_pixels(&self, texture: TextureId, pixels: &[u8]) -> BackendResult<()>;

    /// Read the texture back to CPU memory.
    fn read_pixels(&self, texture: TextureId, context: ContextId) -> BackendResult<Vec<u8>>;

    /// Release the texture.
    fn dispose_texture(&self, texture: TextureId) -> BackendResult<()>;

    /// True when `texture` is not usable under `context`.
    fn is_invalidated(&self, texture: TextureId, context: ContextId) -> bool;
}
