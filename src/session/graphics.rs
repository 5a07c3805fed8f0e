use std::sync::Arc;

use image::{DynamicImage, GenericImageView, Rgba};

use crate::{
    backend::texture::{BackendError, ContextId, TextureBackend},
    foundation::{core::Filter, error::ResurfaceResult},
    image::store::ImageStore,
    restore::{
        coordinator::{ImageRegistry, RestoreStats},
        opts::GraphicsOpts,
    },
    session::handle::Image,
};

/// Entry point: owns the texture backend and the registry of every image created through it.
pub struct Graphics {
    backend: Arc<dyn TextureBackend>,
    registry: Arc<ImageRegistry>,
    opts: GraphicsOpts,
}

impl Graphics {
    pub fn new(backend: Arc<dyn TextureBackend>, opts: GraphicsOpts) -> Self {
        Self {
            backend,
            registry: Arc::new(ImageRegistry::new()),
            opts,
        }
    }

    pub fn backend(&self) -> &Arc<dyn TextureBackend> {
        &self.backend
    }

    pub fn registry(&self) -> &ImageRegistry {
        &self.registry
    }

    pub fn opts(&self) -> &GraphicsOpts {
        &self.opts
    }

    /// Blank persistent image.
    pub fn new_image(&self, width: u32, height: u32, filter: Filter) -> ResurfaceResult<Image> {
        let store = ImageStore::new(self.backend.clone(), width, height, filter, false)?;
        Ok(self.adopt(store))
    }

    /// Blank image that is cleared at every frame boundary and never restored with content.
    pub fn new_volatile_image(
        &self,
        width: u32,
        height: u32,
        filter: Filter,
    ) -> ResurfaceResult<Image> {
        let store = ImageStore::new(self.backend.clone(), width, height, filter, true)?;
        Ok(self.adopt(store))
    }

    pub fn new_image_from_image<V>(&self, source: &V, filter: Filter) -> ResurfaceResult<Image>
    where
        V: GenericImageView<Pixel = Rgba<u8>>,
    {
        let store = ImageStore::new_from_image(self.backend.clone(), source, filter)?;
        Ok(self.adopt(store))
    }

    pub fn new_image_from_dynamic(
        &self,
        source: &DynamicImage,
        filter: Filter,
    ) -> ResurfaceResult<Image> {
        let store = ImageStore::new_from_dynamic(self.backend.clone(), source, filter)?;
        Ok(self.adopt(store))
    }

    pub fn new_screen_image(&self, width: u32, height: u32) -> ResurfaceResult<Image> {
        let store = ImageStore::new_screen(self.backend.clone(), width, height)?;
        Ok(self.adopt(store))
    }

    /// Restore only when some image lost its texture. Returns `None` when nothing was stale.
    pub fn restore_if_needed(&self) -> ResurfaceResult<Option<RestoreStats>> {
        let context = self.live_context()?;
        if !self.registry.any_invalidated(context) {
            return Ok(None);
        }
        tracing::info!(context = context.0, "context loss detected; restoring images");
        self.registry
            .restore_all(context, &self.opts.restore)
            .map(Some)
    }

    /// Unconditionally rebuild every image under the current context.
    pub fn restore(&self) -> ResurfaceResult<RestoreStats> {
        let context = self.live_context()?;
        self.registry.restore_all(context, &self.opts.restore)
    }

    /// Frame boundary.
    pub fn clear_volatile_images(&self) -> ResurfaceResult<()> {
        self.registry.clear_volatile_images()
    }

    fn live_context(&self) -> ResurfaceResult<ContextId> {
        Ok(self
            .backend
            .current_context()
            .ok_or(BackendError::NoContext)?)
    }

    fn adopt(&self, store: Arc<ImageStore>) -> Image {
        self.registry.register(&store);
        Image::new(store, self.registry.clone())
    }
}

impl std::fmt::Debug for Graphics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graphics")
            .field("registry", &self.registry)
            .field("opts", &self.opts)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/graphics.rs"]
mod tests;
