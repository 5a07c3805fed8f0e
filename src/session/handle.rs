use std::sync::Arc;

use crate::{
    backend::texture::DrawParams,
    draw::parts::{ImagePart, ImageParts, WholeImage},
    foundation::{
        core::{Affine, CompositeMode, Filter, Rgba8Premul},
        error::{ResurfaceError, ResurfaceResult},
    },
    image::store::ImageStore,
    restore::coordinator::ImageRegistry,
    transform::color::ColorMatrix,
};

/// How [`Image::draw_image`] places and blends the source.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DrawImageOptions {
    pub geom: Affine,
    pub color_m: ColorMatrix,
    pub mode: CompositeMode,
    /// Source regions to draw; `None` draws the whole source at the origin.
    pub parts: Option<Vec<ImagePart>>,
}

impl DrawImageOptions {
    /// Whole source translated by `(x, y)`.
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            geom: Affine::translate((x, y)),
            ..Self::default()
        }
    }

    fn params(&self) -> DrawParams {
        DrawParams {
            geom: self.geom,
            color_m: self.color_m,
            mode: self.mode,
        }
    }
}

/// Public handle to an image created by [`crate::Graphics`].
///
/// Clones share the same backing store. Every mutation first flattens the images whose draw
/// history reads from this one, so their replay never sees the new content.
#[derive(Clone)]
pub struct Image {
    store: Arc<ImageStore>,
    registry: Arc<ImageRegistry>,
}

impl Image {
    pub(crate) fn new(store: Arc<ImageStore>, registry: Arc<ImageRegistry>) -> Self {
        Self { store, registry }
    }

    pub fn store(&self) -> &Arc<ImageStore> {
        &self.store
    }

    pub fn size(&self) -> (u32, u32) {
        self.store.size()
    }

    pub fn filter(&self) -> Filter {
        self.store.filter()
    }

    pub fn is_volatile(&self) -> bool {
        self.store.is_volatile()
    }

    pub fn is_disposed(&self) -> bool {
        self.store.is_disposed()
    }

    pub fn has_history(&self) -> bool {
        self.store.has_history()
    }

    pub fn fill(&self, color: Rgba8Premul) -> ResurfaceResult<()> {
        self.registry.reset_history_if_needed(&self.store);
        self.store.fill(color)
    }

    pub fn clear(&self) -> ResurfaceResult<()> {
        self.fill(Rgba8Premul::transparent())
    }

    /// Composite `source` onto this image.
    pub fn draw_image(&self, source: &Image, opts: &DrawImageOptions) -> ResurfaceResult<()> {
        match &opts.parts {
            Some(parts) => self.draw_image_parts(source, parts, opts),
            None => {
                let (width, height) = source.size();
                self.draw_image_parts(source, &WholeImage { width, height }, opts)
            }
        }
    }

    /// Composite the regions selected by `parts`; `opts.parts` is ignored.
    pub fn draw_image_parts(
        &self,
        source: &Image,
        parts: &dyn ImageParts,
        opts: &DrawImageOptions,
    ) -> ResurfaceResult<()> {
        if Arc::ptr_eq(&self.store, &source.store) {
            return Err(ResurfaceError::invalid_operand(
                "an image cannot be drawn onto itself",
            ));
        }
        self.registry.reset_history_if_needed(&self.store);
        self.store.draw_image(&source.store, parts, opts.params())
    }

    /// Premultiplied pixel at `(x, y)`; see [`ImageStore::at`].
    pub fn at(&self, x: i32, y: i32) -> ResurfaceResult<Rgba8Premul> {
        self.store.at(x, y)
    }

    /// Whole image as premultiplied RGBA8.
    pub fn read_pixels(&self) -> ResurfaceResult<Vec<u8>> {
        self.store.read_pixels()
    }

    /// Overwrite the image with premultiplied RGBA8 `bytes`.
    pub fn replace_pixels(&self, bytes: &[u8]) -> ResurfaceResult<()> {
        let (width, height) = self.size();
        let expected = (width as usize) * (height as usize) * 4;
        if bytes.len() != expected {
            return Err(ResurfaceError::size_mismatch(expected, bytes.len()));
        }
        self.registry.reset_history_if_needed(&self.store);
        self.store.replace_pixels(bytes)
    }

    pub fn dispose(&self) -> ResurfaceResult<()> {
        self.registry.reset_history_if_needed(&self.store);
        self.store.dispose()
    }
}

impl PartialEq for Image {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.store, &other.store)
    }
}

impl Eq for Image {}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Image").field(&self.store).finish()
    }
}
