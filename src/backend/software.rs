use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use anyhow::anyhow;

use crate::{
    backend::{
        composite::{PremulRgba8, blend_in_place},
        texture::{
            BackendError, BackendResult, ContextId, DrawParams, TextureBackend, TextureId,
            TexturedQuad,
        },
    },
    foundation::core::{Filter, Point, Rect, Rgba8Premul, rgba8_len},
    transform::affine::{bounding_box, checked_inverse},
};

/// Limits for [`SoftwareBackend`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SoftwareBackendOpts {
    /// Largest accepted texture edge, in pixels.
    pub max_texture_size: u32,
}

impl Default for SoftwareBackendOpts {
    fn default() -> Self {
        Self {
            max_texture_size: 4096,
        }
    }
}

/// In-memory [`TextureBackend`] with simulated context loss.
///
/// Textures are premultiplied RGBA8 buffers tagged with the context generation that created
/// them. [`SoftwareBackend::lose_context`] drops every texture, the way a device reset does.
pub struct SoftwareBackend {
    opts: SoftwareBackendOpts,
    state: Mutex<SoftwareState>,
}

struct SoftwareState {
    context: Option<ContextId>,
    generation: u64,
    next_texture: u64,
    textures: HashMap<TextureId, SoftTexture>,
    fail_composites: bool,
}

struct SoftTexture {
    width: u32,
    height: u32,
    filter: Filter,
    context: ContextId,
    screen: bool,
    pixels: Vec<u8>,
}

impl SoftwareBackend {
    /// Backend with a live context.
    pub fn new(opts: SoftwareBackendOpts) -> Self {
        let backend = Self::uninitialized(opts);
        backend.init_context();
        backend
    }

    /// Backend whose context has not been created yet.
    pub fn uninitialized(opts: SoftwareBackendOpts) -> Self {
        Self {
            opts,
            state: Mutex::new(SoftwareState {
                context: None,
                generation: 0,
                next_texture: 1,
                textures: HashMap::new(),
                fail_composites: false,
            }),
        }
    }

    /// Create a fresh context generation and make it current.
    pub fn init_context(&self) -> ContextId {
        let mut st = self.lock();
        st.generation += 1;
        let ctx = ContextId(st.generation);
        st.context = Some(ctx);
        ctx
    }

    /// Drop every texture and the current context.
    pub fn lose_context(&self) {
        let mut st = self.lock();
        tracing::debug!(textures = st.textures.len(), "software context lost");
        st.textures.clear();
        st.context = None;
    }

    /// [`Self::lose_context`] followed by [`Self::init_context`].
    pub fn reset_context(&self) -> ContextId {
        self.lose_context();
        self.init_context()
    }

    /// Number of textures (including screen framebuffers) alive in the current context.
    pub fn live_textures(&self) -> usize {
        let st = self.lock();
        st.textures
            .values()
            .filter(|t| Some(t.context) == st.context)
            .count()
    }

    /// Make every subsequent [`TextureBackend::composite_draw`] fail until cleared.
    pub fn set_fail_composites(&self, fail: bool) {
        self.lock().fail_composites = fail;
    }

    fn lock(&self) -> MutexGuard<'_, SoftwareState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_size(&self, width: u32, height: u32) -> BackendResult<usize> {
        let max = self.opts.max_texture_size;
        if width == 0 || height == 0 || width > max || height > max {
            return Err(BackendError::Other(anyhow!(
                "texture size {width}x{height} outside 1..={max}"
            )));
        }
        rgba8_len(width, height)
            .ok_or_else(|| BackendError::Other(anyhow!("texture size {width}x{height} overflows")))
    }

    fn insert(&self, texture: SoftTexture) -> TextureId {
        let mut st = self.lock();
        let id = TextureId::from_u64(st.next_texture);
        st.next_texture += 1;
        st.textures.insert(id, texture);
        id
    }
}

impl SoftwareState {
    fn live_context(&self) -> BackendResult<ContextId> {
        self.context.ok_or(BackendError::NoContext)
    }

    fn texture(&self, id: TextureId) -> BackendResult<&SoftTexture> {
        let ctx = self.live_context()?;
        let tex = self
            .textures
            .get(&id)
            .ok_or(BackendError::InvalidTexture(id))?;
        if tex.context != ctx {
            return Err(BackendError::ContextLost { texture: id });
        }
        Ok(tex)
    }

    fn texture_mut(&mut self, id: TextureId) -> BackendResult<&mut SoftTexture> {
        let ctx = self.live_context()?;
        let tex = self
            .textures
            .get_mut(&id)
            .ok_or(BackendError::InvalidTexture(id))?;
        if tex.context != ctx {
            return Err(BackendError::ContextLost { texture: id });
        }
        Ok(tex)
    }
}

impl TextureBackend for SoftwareBackend {
    fn current_context(&self) -> Option<ContextId> {
        self.lock().context
    }

    fn create_texture(&self, width: u32, height: u32, filter: Filter) -> BackendResult<TextureId> {
        let len = self.check_size(width, height)?;
        let context = self.lock().live_context()?;
        Ok(self.insert(SoftTexture {
            width,
            height,
            filter,
            context,
            screen: false,
            pixels: vec![0; len],
        }))
    }

    fn create_texture_from_pixels(
        &self,
        width: u32,
        height: u32,
        pixels: &[u8],
        filter: Filter,
    ) -> BackendResult<TextureId> {
        let len = self.check_size(width, height)?;
        if pixels.len() != len {
            return Err(BackendError::SizeMismatch {
                expected: len,
                actual: pixels.len(),
            });
        }
        let context = self.lock().live_context()?;
        Ok(self.insert(SoftTexture {
            width,
            height,
            filter,
            context,
            screen: false,
            pixels: pixels.to_vec(),
        }))
    }

    fn create_screen_framebuffer(&self, width: u32, height: u32) -> BackendResult<TextureId> {
        let len = self.check_size(width, height)?;
        let context = self.lock().live_context()?;
        Ok(self.insert(SoftTexture {
            width,
            height,
            filter: Filter::Nearest,
            context,
            screen: true,
            pixels: vec![0; len],
        }))
    }

    fn fill(&self, texture: TextureId, color: Rgba8Premul) -> BackendResult<()> {
        let mut st = self.lock();
        let tex = st.texture_mut(texture)?;
        let px = color.to_array();
        for chunk in tex.pixels.chunks_exact_mut(4) {
            chunk.copy_from_slice(&px);
        }
        Ok(())
    }

    fn composite_draw(
        &self,
        dst: TextureId,
        src: TextureId,
        quads: &[TexturedQuad],
        params: &DrawParams,
    ) -> BackendResult<()> {
        let mut st = self.lock();
        if st.fail_composites {
            return Err(BackendError::Other(anyhow!("injected composite failure")));
        }
        if dst == src {
            return Err(BackendError::Other(anyhow!(
                "texture {dst} cannot be composited onto itself"
            )));
        }

        let source = {
            let s = st.texture(src)?;
            Sampler {
                width: s.width,
                height: s.height,
                filter: s.filter,
                pixels: s.pixels.clone(),
            }
        };
        let target = st.texture_mut(dst)?;

        let Some(inv) = checked_inverse(params.geom) else {
            return Ok(());
        };
        let bounds = Rect::new(0.0, 0.0, f64::from(target.width), f64::from(target.height));

        for quad in quads {
            if quad.dst.width() <= 0.0 || quad.dst.height() <= 0.0 {
                continue;
            }
            let area = bounding_box(params.geom, quad.dst).intersect(bounds);
            if area.width() <= 0.0 || area.height() <= 0.0 {
                continue;
            }
            let sx = quad.src.width() / quad.dst.width();
            let sy = quad.src.height() / quad.dst.height();

            let (x0, x1) = (area.x0.floor() as u32, area.x1.ceil() as u32);
            let (y0, y1) = (area.y0.floor() as u32, area.y1.ceil() as u32);
            for y in y0..y1.min(target.height) {
                for x in x0..x1.min(target.width) {
                    let local = inv * Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
                    if local.x < quad.dst.x0
                        || local.x >= quad.dst.x1
                        || local.y < quad.dst.y0
                        || local.y >= quad.dst.y1
                    {
                        continue;
                    }
                    let u = quad.src.x0 + (local.x - quad.dst.x0) * sx;
                    let v = quad.src.y0 + (local.y - quad.dst.y0) * sy;
                    let sample = source.sample(u, v, quad.src);
                    let colored = params.color_m.apply(Rgba8Premul::from_array(sample));
                    let idx = ((y as usize) * (target.width as usize) + (x as usize)) * 4;
                    blend_in_place(params.mode, &mut target.pixels, idx, colored.to_array());
                }
            }
        }
        Ok(())
    }

    fn replace_pixels(&self, texture: TextureId, pixels: &[u8]) -> BackendResult<()> {
        let mut st = self.lock();
        let tex = st.texture_mut(texture)?;
        if pixels.len() != tex.pixels.len() {
            return Err(BackendError::SizeMismatch {
                expected: tex.pixels.len(),
                actual: pixels.len(),
            });
        }
        tex.pixels.copy_from_slice(pixels);
        Ok(())
    }

    fn read_pixels(&self, texture: TextureId, context: ContextId) -> BackendResult<Vec<u8>> {
        let st = self.lock();
        if st.context != Some(context) {
            return Err(BackendError::ContextLost { texture });
        }
        Ok(st.texture(texture)?.pixels.clone())
    }

    fn dispose_texture(&self, texture: TextureId) -> BackendResult<()> {
        let mut st = self.lock();
        match st.textures.remove(&texture) {
            Some(tex) if tex.screen => {
                tracing::debug!(%texture, "disposed screen framebuffer binding");
                Ok(())
            }
            Some(_) => Ok(()),
            None => Err(BackendError::InvalidTexture(texture)),
        }
    }

    fn is_invalidated(&self, texture: TextureId, context: ContextId) -> bool {
        let st = self.lock();
        if st.context != Some(context) {
            return true;
        }
        !st.textures
            .get(&texture)
            .is_some_and(|t| t.context == context)
    }
}

struct Sampler {
    width: u32,
    height: u32,
    filter: Filter,
    pixels: Vec<u8>,
}

impl Sampler {
    /// Sample at texel-space `(u, v)`, clamped to `region` (and the texture).
    fn sample(&self, u: f64, v: f64, region: Rect) -> PremulRgba8 {
        let min_x = region.x0.max(0.0).floor() as i64;
        let min_y = region.y0.max(0.0).floor() as i64;
        let max_x = (region.x1.ceil() as i64).min(i64::from(self.width)) - 1;
        let max_y = (region.y1.ceil() as i64).min(i64::from(self.height)) - 1;
        if max_x < min_x || max_y < min_y {
            return [0; 4];
        }
        let clamp_x = |x: i64| x.clamp(min_x, max_x);
        let clamp_y = |y: i64| y.clamp(min_y, max_y);

        match self.filter {
            Filter::Nearest => self.texel(clamp_x(u.floor() as i64), clamp_y(v.floor() as i64)),
            Filter::Linear => {
                let fx = u - 0.5;
                let fy = v - 0.5;
                let bx = fx.floor();
                let by = fy.floor();
                let tx = fx - bx;
                let ty = fy - by;
                let (bx, by) = (bx as i64, by as i64);

                let p00 = self.texel(clamp_x(bx), clamp_y(by));
                let p10 = self.texel(clamp_x(bx + 1), clamp_y(by));
                let p01 = self.texel(clamp_x(bx), clamp_y(by + 1));
                let p11 = self.texel(clamp_x(bx + 1), clamp_y(by + 1));

                let mut out = [0u8; 4];
                for i in 0..4 {
                    let top = f64::from(p00[i]) * (1.0 - tx) + f64::from(p10[i]) * tx;
                    let bottom = f64::from(p01[i]) * (1.0 - tx) + f64::from(p11[i]) * tx;
                    out[i] = (top * (1.0 - ty) + bottom * ty).round().clamp(0.0, 255.0) as u8;
                }
                out
            }
        }
    }

    fn texel(&self, x: i64, y: i64) -> PremulRgba8 {
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        [
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        ]
    }
}

#[cfg(test)]
#[path = "../../tests/unit/backend/software.rs"]
mod tests;
