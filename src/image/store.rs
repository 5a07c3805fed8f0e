use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use image::{DynamicImage, GenericImageView, Rgba};

use crate::{
    backend::texture::{BackendError, ContextId, DrawParams, TextureBackend, TextureId},
    draw::{parts::ImageParts, quads::textured_quads},
    foundation::{
        core::{Filter, Rgba8Premul},
        error::{ResurfaceError, ResurfaceResult},
    },
    image::{
        history::{DrawHistory, DrawRecord},
        pixels,
    },
};

/// Backing store of one logical image.
///
/// The store keeps up to three descriptions of the image content next to the GPU texture: a CPU
/// pixel cache, a flat base color, and a log of composite draws applied on top of those. After a
/// context loss, [`ImageStore::restore`] rebuilds the texture from them.
///
/// All bookkeeping is guarded by a per-image lock. No operation holds two image locks at once:
/// [`ImageStore::restore`] resolves its history sources with its own lock released.
pub struct ImageStore {
    backend: Arc<dyn TextureBackend>,
    width: u32,
    height: u32,
    filter: Filter,
    volatile: bool,
    screen: bool,
    state: Mutex<StoreState>,
}

#[derive(Debug)]
struct StoreState {
    texture: Option<TextureId>,
    pixels: Option<Vec<u8>>,
    base_color: Option<Rgba8Premul>,
    history: DrawHistory,
    disposed: bool,
}

/// What [`ImageStore::restore`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// The image was already disposed.
    Skipped,
    /// The texture is still valid under the context; nothing was done.
    Current,
    /// Screen image re-bound to the new framebuffer.
    Rebound,
    /// Volatile image re-allocated empty.
    Reallocated,
    /// Persistent image rebuilt from its pixels or base color, replaying `replayed` draws.
    Rebuilt {
        /// Number of history records replayed.
        replayed: usize,
    },
}

impl ImageStore {
    /// Blank (transparent) image.
    pub fn new(
        backend: Arc<dyn TextureBackend>,
        width: u32,
        height: u32,
        filter: Filter,
        volatile: bool,
    ) -> ResurfaceResult<Arc<Self>> {
        let len = pixels::checked_len(width, height)?;
        let texture = backend.create_texture(width, height, filter)?;
        Ok(Arc::new(Self::with_state(
            backend,
            width,
            height,
            filter,
            volatile,
            false,
            texture,
            vec![0; len],
        )))
    }

    /// Image initialized from an external RGBA view (straight alpha), cropped to the view.
    pub fn new_from_image<V>(
        backend: Arc<dyn TextureBackend>,
        source: &V,
        filter: Filter,
    ) -> ResurfaceResult<Arc<Self>>
    where
        V: GenericImageView<Pixel = Rgba<u8>>,
    {
        let (width, height, pixels) = pixels::normalize_view(source)?;
        Self::from_normalized(backend, width, height, pixels, filter)
    }

    /// Image initialized from any decoded image, converted to RGBA8 first.
    pub fn new_from_dynamic(
        backend: Arc<dyn TextureBackend>,
        source: &DynamicImage,
        filter: Filter,
    ) -> ResurfaceResult<Arc<Self>> {
        let rgba = source.to_rgba8();
        Self::new_from_image(backend, &rgba, filter)
    }

    /// The image bound to the platform framebuffer. Always volatile.
    pub fn new_screen(
        backend: Arc<dyn TextureBackend>,
        width: u32,
        height: u32,
    ) -> ResurfaceResult<Arc<Self>> {
        let len = pixels::checked_len(width, height)?;
        let texture = backend.create_screen_framebuffer(width, height)?;
        Ok(Arc::new(Self::with_state(
            backend,
            width,
            height,
            Filter::Nearest,
            true,
            true,
            texture,
            vec![0; len],
        )))
    }

    fn from_normalized(
        backend: Arc<dyn TextureBackend>,
        width: u32,
        height: u32,
        pixels: Vec<u8>,
        filter: Filter,
    ) -> ResurfaceResult<Arc<Self>> {
        let texture = backend.create_texture_from_pixels(width, height, &pixels, filter)?;
        Ok(Arc::new(Self::with_state(
            backend, width, height, filter, false, false, texture, pixels,
        )))
    }

    #[allow(clippy::too_many_arguments)]
    fn with_state(
        backend: Arc<dyn TextureBackend>,
        width: u32,
        height: u32,
        filter: Filter,
        volatile: bool,
        screen: bool,
        texture: TextureId,
        pixels: Vec<u8>,
    ) -> Self {
        Self {
            backend,
            width,
            height,
            filter,
            volatile,
            screen,
            state: Mutex::new(StoreState {
                texture: Some(texture),
                pixels: Some(pixels),
                base_color: None,
                history: DrawHistory::default(),
                disposed: false,
            }),
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn is_volatile(&self) -> bool {
        self.volatile
    }

    pub fn is_screen(&self) -> bool {
        self.screen
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn byte_len(&self) -> usize {
        (self.width as usize) * (self.height as usize) * 4
    }

    /// Replace the content with a flat color.
    pub fn fill(&self, color: Rgba8Premul) -> ResurfaceResult<()> {
        let mut st = self.lock();
        let texture = st.live_texture()?;
        st.pixels = None;
        st.base_color = Some(color);
        st.history.clear();
        self.backend.fill(texture, color)?;
        Ok(())
    }

    /// Composite `source` onto this image and record the draw for later replay.
    ///
    /// `parts` is evaluated before any lock is taken. A selection that resolves to no quads is a
    /// no-op. The history record is kept even when the backend call fails.
    pub fn draw_image(
        &self,
        source: &Arc<ImageStore>,
        parts: &dyn ImageParts,
        params: DrawParams,
    ) -> ResurfaceResult<()> {
        if std::ptr::eq(self, Arc::as_ptr(source)) {
            return Err(ResurfaceError::invalid_operand(
                "an image cannot be drawn onto itself",
            ));
        }

        let quads = textured_quads(parts, source.width, source.height);
        if quads.is_empty() {
            return Ok(());
        }
        let src_texture = source.settle_for_draw()?;

        let mut st = self.lock();
        let texture = st.live_texture()?;
        let result = self
            .backend
            .composite_draw(texture, src_texture, &quads, &params);
        st.history.push(DrawRecord::new(source, quads, params));
        result.map_err(ResurfaceError::from)
    }

    /// Pixel at `(x, y)`. Out-of-range coordinates and disposed images read as transparent.
    ///
    /// # Panics
    ///
    /// Panics when the backend has no live context: sampling needs a readback, and calling this
    /// before the context exists is a sequencing bug in the caller.
    pub fn at(&self, x: i32, y: i32) -> ResurfaceResult<Rgba8Premul> {
        let Some(context) = self.backend.current_context() else {
            panic!("ImageStore::at called before the rendering context was initialized");
        };

        let mut st = self.lock();
        if st.disposed {
            return Ok(Rgba8Premul::transparent());
        }
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return Ok(Rgba8Premul::transparent());
        }
        self.ensure_cache(&mut st, context)?;

        let idx = 4 * (x as usize + (y as usize) * (self.width as usize));
        let px = st.pixels.as_deref().unwrap_or_default();
        Ok(px
            .get(idx..idx + 4)
            .map(|p| Rgba8Premul::from_array([p[0], p[1], p[2], p[3]]))
            .unwrap_or_default())
    }

    /// Copy of the whole image as premultiplied RGBA8. Disposed images read as transparent.
    pub fn read_pixels(&self) -> ResurfaceResult<Vec<u8>> {
        let context = self
            .backend
            .current_context()
            .ok_or(BackendError::NoContext)?;
        let mut st = self.lock();
        if st.disposed {
            return Ok(vec![0; self.byte_len()]);
        }
        self.ensure_cache(&mut st, context)?;
        Ok(st.pixels.clone().unwrap_or_default())
    }

    /// Overwrite the whole image with `bytes` (premultiplied RGBA8, `4 * width * height`).
    pub fn replace_pixels(&self, bytes: &[u8]) -> ResurfaceResult<()> {
        let expected = self.byte_len();
        if bytes.len() != expected {
            return Err(ResurfaceError::size_mismatch(expected, bytes.len()));
        }

        let mut st = self.lock();
        let texture = st.live_texture()?;
        match st.pixels.as_mut() {
            Some(cache) => cache.copy_from_slice(bytes),
            None => st.pixels = Some(bytes.to_vec()),
        }
        st.base_color = None;
        st.history.clear();
        self.backend.replace_pixels(texture, bytes)?;
        Ok(())
    }

    /// Flatten this image if its history draws from `target`.
    ///
    /// Returns whether a flatten happened. Readback failures are logged and swallowed; the
    /// history is then left in place.
    pub fn reset_history_if_needed(&self, target: &ImageStore) -> bool {
        let mut st = self.lock();
        if st.disposed || st.history.is_empty() || !st.history.references(target) {
            return false;
        }
        match self.flatten(&mut st) {
            Ok(()) => {
                st.base_color = None;
                tracing::debug!(
                    width = self.width,
                    height = self.height,
                    "flattened draw history ahead of source mutation"
                );
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "draw history flatten failed; keeping history");
                false
            }
        }
    }

    /// Reset a volatile image to transparent at a frame boundary.
    pub fn clear_if_volatile(&self) -> ResurfaceResult<()> {
        if !self.volatile {
            return Ok(());
        }
        let mut st = self.lock();
        if st.disposed {
            return Ok(());
        }
        let texture = st.live_texture()?;
        st.pixels = None;
        st.base_color = None;
        st.history.clear();
        self.backend.fill(texture, Rgba8Premul::transparent())?;
        tracing::debug!(width = self.width, height = self.height, "cleared volatile image");
        Ok(())
    }

    /// Rebuild the texture under a freshly created `context`.
    ///
    /// History sources that have not been restored yet are rebuilt on demand, so images may be
    /// restored in any order. If a replay fails, the stale texture handle and the history are kept
    /// and a later call can retry.
    ///
    /// # Panics
    ///
    /// Panics if a history source still has pending history of its own. Sources are flattened
    /// before they are drawn from and whenever they change, so this indicates a broken caller.
    #[tracing::instrument(skip(self), fields(width = self.width, height = self.height))]
    pub fn restore(&self, context: ContextId) -> ResurfaceResult<RestoreOutcome> {
        let (seed, records) = {
            let mut st = self.lock();
            if st.disposed {
                return Ok(RestoreOutcome::Skipped);
            }
            if !self.is_stale(&st, context) {
                return Ok(RestoreOutcome::Current);
            }
            if self.screen || self.volatile || st.history.is_empty() {
                return self.rebuild_locked(&mut st);
            }
            (self.seed_pixels(&st), st.history.to_vec())
        };

        let mut sources = Vec::with_capacity(records.len());
        for record in &records {
            let texture = match record.source.upgrade() {
                Some(source) => source.texture_for_replay(context)?,
                None => None,
            };
            if texture.is_none() {
                tracing::warn!("draw history source is gone; skipping replay");
            }
            sources.push(texture);
        }

        let texture =
            self.backend
                .create_texture_from_pixels(self.width, self.height, &seed, self.filter)?;
        let mut replayed = 0;
        for (record, source) in records.iter().zip(sources) {
            let Some(src_texture) = source else {
                continue;
            };
            if let Err(err) =
                self.backend
                    .composite_draw(texture, src_texture, &record.quads, &record.params)
            {
                self.discard_texture(texture);
                return Err(err.into());
            }
            replayed += 1;
        }

        let mut st = self.lock();
        if st.disposed {
            self.discard_texture(texture);
            return Ok(RestoreOutcome::Skipped);
        }
        st.texture = Some(texture);
        st.pixels = Some(self.backend.read_pixels(texture, context)?);
        st.base_color = None;
        st.history.clear();
        Ok(RestoreOutcome::Rebuilt { replayed })
    }

    /// Release the texture and drop all cached state.
    pub fn dispose(&self) -> ResurfaceResult<()> {
        let mut st = self.lock();
        if st.disposed {
            return Err(ResurfaceError::AlreadyDisposed);
        }
        if let Some(texture) = st.texture {
            self.release_texture(texture)?;
        }
        st.texture = None;
        st.disposed = true;
        st.pixels = None;
        st.base_color = None;
        st.history.clear();
        Ok(())
    }

    pub fn is_disposed(&self) -> bool {
        self.lock().disposed
    }

    /// True when the texture does not survive in `context`. Disposed images have nothing to
    /// restore and report `false`.
    pub fn is_invalidated(&self, context: ContextId) -> bool {
        let st = self.lock();
        match st.texture {
            Some(texture) if !st.disposed => self.backend.is_invalidated(texture, context),
            _ => false,
        }
    }

    pub fn has_history(&self) -> bool {
        !self.lock().history.is_empty()
    }

    /// True when some pending draw record uses `target` as its source.
    pub fn has_history_with(&self, target: &ImageStore) -> bool {
        self.lock().history.references(target)
    }

    pub fn history_len(&self) -> usize {
        self.lock().history.len()
    }

    pub fn has_pixel_cache(&self) -> bool {
        self.lock().pixels.is_some()
    }

    pub fn base_color(&self) -> Option<Rgba8Premul> {
        self.lock().base_color
    }

    /// Make this image self-contained before it is used as a draw source, returning its texture.
    fn settle_for_draw(&self) -> ResurfaceResult<TextureId> {
        let mut st = self.lock();
        if st.disposed {
            return Err(ResurfaceError::invalid_operand(
                "cannot draw from a disposed image",
            ));
        }
        if !st.history.is_empty() {
            self.flatten(&mut st)?;
            st.base_color = None;
        }
        st.live_texture()
    }

    /// Texture to replay from, rebuilt first when it did not survive `context`.
    fn texture_for_replay(&self, context: ContextId) -> ResurfaceResult<Option<TextureId>> {
        let mut st = self.lock();
        if st.disposed {
            return Ok(None);
        }
        assert!(
            st.history.is_empty(),
            "draw history source still has pending history during restore"
        );
        if self.is_stale(&st, context) {
            tracing::debug!(
                width = self.width,
                height = self.height,
                "restoring draw source ahead of its dependent"
            );
            self.rebuild_locked(&mut st)?;
        }
        Ok(st.texture)
    }

    fn is_stale(&self, st: &StoreState, context: ContextId) -> bool {
        match st.texture {
            Some(texture) => self.backend.is_invalidated(texture, context),
            None => true,
        }
    }

    /// Restore that needs no other image: screen, volatile, or persistent without history.
    fn rebuild_locked(&self, st: &mut StoreState) -> ResurfaceResult<RestoreOutcome> {
        if self.screen {
            st.texture = Some(
                self.backend
                    .create_screen_framebuffer(self.width, self.height)?,
            );
            return Ok(RestoreOutcome::Rebound);
        }

        if self.volatile {
            st.texture = Some(
                self.backend
                    .create_texture(self.width, self.height, self.filter)?,
            );
            st.pixels = None;
            st.base_color = None;
            st.history.clear();
            return Ok(RestoreOutcome::Reallocated);
        }

        let seed = self.seed_pixels(st);
        st.texture = Some(
            self.backend
                .create_texture_from_pixels(self.width, self.height, &seed, self.filter)?,
        );
        Ok(RestoreOutcome::Rebuilt { replayed: 0 })
    }

    /// Pixel cache, else base color, else transparent.
    fn seed_pixels(&self, st: &StoreState) -> Vec<u8> {
        match (&st.pixels, st.base_color) {
            (Some(px), _) => px.clone(),
            (None, Some(color)) => pixels::solid(self.width, self.height, color),
            (None, None) => vec![0; self.byte_len()],
        }
    }

    fn discard_texture(&self, texture: TextureId) {
        if let Err(err) = self.backend.dispose_texture(texture) {
            tracing::warn!(error = %err, "could not release partially restored texture");
        }
    }

    fn ensure_cache(&self, st: &mut StoreState, context: ContextId) -> ResurfaceResult<()> {
        if st.pixels.is_none() || !st.history.is_empty() {
            let texture = st.live_texture()?;
            st.pixels = Some(self.backend.read_pixels(texture, context)?);
            st.history.clear();
        }
        Ok(())
    }

    /// Read the texture back into the pixel cache and drop the history it subsumes.
    fn flatten(&self, st: &mut StoreState) -> ResurfaceResult<()> {
        let context = self
            .backend
            .current_context()
            .ok_or(BackendError::NoContext)?;
        let texture = st.live_texture()?;
        st.pixels = Some(self.backend.read_pixels(texture, context)?);
        st.history.clear();
        Ok(())
    }

    fn release_texture(&self, texture: TextureId) -> ResurfaceResult<()> {
        if self.screen {
            return Ok(());
        }
        let Some(context) = self.backend.current_context() else {
            return Ok(());
        };
        if self.backend.is_invalidated(texture, context) {
            return Ok(());
        }
        self.backend.dispose_texture(texture)?;
        Ok(())
    }
}

impl StoreState {
    fn live_texture(&self) -> ResurfaceResult<TextureId> {
        match self.texture {
            Some(texture) if !self.disposed => Ok(texture),
            _ => Err(ResurfaceError::AlreadyDisposed),
        }
    }
}

impl Drop for ImageStore {
    fn drop(&mut self) {
        let st = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if st.disposed {
            return;
        }
        st.disposed = true;
        st.pixels = None;
        st.history.clear();
        let texture = st.texture.take();

        tracing::debug!(
            width = self.width,
            height = self.height,
            "image dropped without dispose; releasing texture"
        );
        if let Some(texture) = texture
            && let Err(err) = self.release_texture(texture)
        {
            tracing::warn!(error = %err, "finalizer could not release texture");
        }
    }
}

impl std::fmt::Debug for ImageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageStore")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("filter", &self.filter)
            .field("volatile", &self.volatile)
            .field("screen", &self.screen)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/image/store.rs"]
mod tests;
