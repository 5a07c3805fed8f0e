//! Resurface is a restorable backing store for GPU-resident images.
//!
//! Every image keeps enough CPU-side state to rebuild its texture after the rendering context is
//! lost: a pixel cache, a flat base color, and a log of composite draws still pending on top of
//! them. When the device comes back, [`Graphics::restore`] recreates every texture and replays
//! the pending draws.
//!
//! # Layers
//!
//! 1. **Backend**: [`TextureBackend`] is the device seam. [`SoftwareBackend`] is an in-memory
//!    implementation with simulated context loss.
//! 2. **Store**: [`ImageStore`] owns one texture and its restore state.
//! 3. **Coordinator**: [`ImageRegistry`] tracks live stores and restores them in dependency-safe
//!    passes.
//! 4. **Session**: [`Graphics`] and [`Image`] are the public façade. Mutating an image first
//!    flattens every image whose history draws from it.
//!
//! Pixels are premultiplied RGBA8 end-to-end.
#![forbid(unsafe_code)]

mod assets;
mod backend;
mod draw;
mod foundation;
mod image;
mod restore;
mod session;

/// Shared transform helpers (geometry and color).
pub mod transform;

pub use crate::assets::decode::{decode_image, load_image};
pub use crate::backend::software::{SoftwareBackend, SoftwareBackendOpts};
pub use crate::backend::texture::{
    BackendError, BackendResult, ContextId, DrawParams, TextureBackend, TextureId, TexturedQuad,
};
pub use crate::draw::parts::{ImagePart, ImageParts, WholeImage};
pub use crate::draw::quads::textured_quads;
pub use crate::foundation::core::{
    Affine, CompositeMode, Filter, Point, Rect, Rgba8Premul, Vec2,
};
pub use crate::foundation::error::{ResurfaceError, ResurfaceResult};
pub use crate::image::store::{ImageStore, RestoreOutcome};
pub use crate::restore::coordinator::{ImageRegistry, RestoreStats};
pub use crate::restore::opts::{GraphicsOpts, RestoreOpts};
pub use crate::session::graphics::Graphics;
pub use crate::session::handle::{DrawImageOptions, Image};
pub use crate::transform::color::ColorMatrix;
