//! The `Renderer` owns the resource caches, binding slots and render state of one
//! graphics context, and exposes the per-resource and frame level operations.
//!
//! Logical resources are never owned by the renderer. It only keys its caches on their
//! `ResourceId`, so the objects could be shared by any number of visuals:
//!
//! ```rust,ignore
//! let mut renderer = Renderer::new(HeadlessDevice::new(), RendererSettings::default())?;
//! renderer.bind(&*vertex_buffer)?;
//! renderer.draw(Some(&camera), &visual)?;
//! renderer.swap_frame_buffer()?;
//! ```

pub mod cache;
pub mod slot;
pub mod state;

mod draw;

pub use self::draw::DrawStats;

use crate::backends::{Adapter, Capabilities, DepthRange, Device, MapAdapter, Mappable, Viewport};
use crate::buffer::*;
use crate::errors::*;
use crate::math::Color;
use crate::resource::{Resource, ResourceId, ResourceKind, TextureUnit};
use crate::sampler::Sampler;
use crate::settings::RendererSettings;
use crate::shader::Shader;
use crate::state::StateChange;
use crate::texture::*;
use crate::vertex::VertexFormat;

use self::cache::ResourceCache;
use self::slot::BindingSlots;
use self::state::RenderStateManager;

/// The size and depth range of the window being rendered into.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub width: u32,
    pub height: u32,
    pub near: f32,
    pub far: f32,
}

/// One cache per kind of resource a `Device` could realize.
pub struct ResourceCaches<D: Device> {
    vertex_formats: ResourceCache<VertexFormat, D>,
    vertex_buffers: ResourceCache<VertexBuffer, D>,
    index_buffers: ResourceCache<IndexBuffer, D>,
    shader_buffers: ResourceCache<ShaderBuffer, D>,
    textures_1d: ResourceCache<Texture1D, D>,
    textures_2d: ResourceCache<Texture2D, D>,
    textures_2d_array: ResourceCache<Texture2DArray, D>,
    textures_3d: ResourceCache<Texture3D, D>,
    samplers: ResourceCache<Sampler, D>,
    shaders: ResourceCache<Shader, D>,
}

impl<D: Device> ResourceCaches<D> {
    fn new() -> Self {
        ResourceCaches {
            vertex_formats: ResourceCache::new(),
            vertex_buffers: ResourceCache::new(),
            index_buffers: ResourceCache::new(),
            shader_buffers: ResourceCache::new(),
            textures_1d: ResourceCache::new(),
            textures_2d: ResourceCache::new(),
            textures_2d_array: ResourceCache::new(),
            textures_3d: ResourceCache::new(),
            samplers: ResourceCache::new(),
            shaders: ResourceCache::new(),
        }
    }

    /// Destroys every backend representation. Returns the number of failures.
    fn clear(&mut self, device: &mut D) -> usize {
        self.vertex_formats.clear(device)
            + self.vertex_buffers.clear(device)
            + self.index_buffers.clear(device)
            + self.shader_buffers.clear(device)
            + self.textures_1d.clear(device)
            + self.textures_2d.clear(device)
            + self.textures_2d_array.clear(device)
            + self.textures_3d.clear(device)
            + self.samplers.clear(device)
            + self.shaders.clear(device)
    }
}

/// A logical resource the renderer keeps a cache for.
pub trait Cacheable<D>: Resource + Sized
where
    D: Device + Adapter<Self>,
{
    fn cache(caches: &ResourceCaches<D>) -> &ResourceCache<Self, D>;

    fn cache_mut(caches: &mut ResourceCaches<D>) -> &mut ResourceCache<Self, D>;

    /// Empties the binding slot this resource occupies at `binding`.
    fn reset_slot(slots: &mut BindingSlots, binding: Self::Binding);

    /// Refuses kinds the device does not implement.
    fn check_supported(_: &Capabilities) -> Result<()> {
        Ok(())
    }
}

macro_rules! impl_cacheable {
    ($name: ident, $field: ident, |$slots: ident, $binding: pat| $reset: expr) => {
        impl<D: Device> Cacheable<D> for $name {
            #[inline]
            fn cache(caches: &ResourceCaches<D>) -> &ResourceCache<Self, D> {
                &caches.$field
            }

            #[inline]
            fn cache_mut(caches: &mut ResourceCaches<D>) -> &mut ResourceCache<Self, D> {
                &mut caches.$field
            }

            fn reset_slot($slots: &mut BindingSlots, $binding: Self::Binding) {
                $reset;
            }
        }
    };
}

impl_cacheable!(VertexFormat, vertex_formats, |slots, _| {
    slots.vertex_format.reset();
    slots.reset_vertex_input();
});

impl_cacheable!(VertexBuffer, vertex_buffers, |slots, binding| {
    slots.vertex_buffer(binding.index).reset();
});

impl_cacheable!(IndexBuffer, index_buffers, |slots, _| {
    slots.index_buffer.reset();
});

impl_cacheable!(ShaderBuffer, shader_buffers, |slots, _| {
    slots.shader_buffer.reset();
});

impl_cacheable!(Texture1D, textures_1d, |slots, unit| {
    if let Ok(v) = slots.texture_unit(unit) {
        v.texture.reset();
    }
});

impl_cacheable!(Texture2D, textures_2d, |slots, unit| {
    if let Ok(v) = slots.texture_unit(unit) {
        v.texture.reset();
    }
});

impl_cacheable!(Texture2DArray, textures_2d_array, |slots, unit| {
    if let Ok(v) = slots.texture_unit(unit) {
        v.texture.reset();
    }
});

impl_cacheable!(Sampler, samplers, |slots, unit| {
    if let Ok(v) = slots.texture_unit(unit) {
        v.sampler.reset();
    }
});

impl_cacheable!(Shader, shaders, |slots, _| {
    slots.shader.reset();
});

impl<D: Device> Cacheable<D> for Texture3D {
    #[inline]
    fn cache(caches: &ResourceCaches<D>) -> &ResourceCache<Self, D> {
        &caches.textures_3d
    }

    #[inline]
    fn cache_mut(caches: &mut ResourceCaches<D>) -> &mut ResourceCache<Self, D> {
        &mut caches.textures_3d
    }

    fn reset_slot(slots: &mut BindingSlots, unit: TextureUnit) {
        if let Ok(v) = slots.texture_unit(unit) {
            v.texture.reset();
        }
    }

    fn check_supported(capabilities: &Capabilities) -> Result<()> {
        if capabilities.texture_3d {
            Ok(())
        } else {
            Err(Error::UnsupportedKind(ResourceKind::Texture3D))
        }
    }
}

/// The device together with the caches of the objects it created.
pub(crate) struct Backend<D: Device> {
    pub device: D,
    pub caches: ResourceCaches<D>,
    pub capabilities: Capabilities,
}

impl<D: Device> Backend<D> {
    pub fn bind<R>(&mut self, resource: &R) -> Result<bool>
    where
        R: Cacheable<D>,
        D: Adapter<R>,
    {
        R::check_supported(&self.capabilities)?;
        R::cache_mut(&mut self.caches).bind(&mut self.device, resource)
    }

    pub fn unbind<R>(&mut self, resource: &R) -> Result<bool>
    where
        R: Cacheable<D>,
        D: Adapter<R>,
    {
        R::cache_mut(&mut self.caches).unbind(&mut self.device, resource.id())
    }

    pub fn enable<R>(&mut self, resource: &R, binding: R::Binding) -> Result<()>
    where
        R: Cacheable<D>,
        D: Adapter<R>,
    {
        R::check_supported(&self.capabilities)?;
        R::cache_mut(&mut self.caches).enable(&mut self.device, resource, binding)
    }

    pub fn disable<R>(&mut self, resource: &R, binding: R::Binding) -> Result<()>
    where
        R: Cacheable<D>,
        D: Adapter<R>,
    {
        R::check_supported(&self.capabilities)?;
        R::cache_mut(&mut self.caches).disable(&mut self.device, resource, binding)
    }

    pub fn disable_id<R>(&mut self, id: ResourceId, binding: R::Binding) -> Result<()>
    where
        R: Cacheable<D>,
        D: Adapter<R>,
    {
        R::cache_mut(&mut self.caches).disable_id(&mut self.device, id, binding)
    }

    pub fn apply_states(&mut self, changes: &[StateChange]) -> Result<()> {
        for &v in changes {
            self.device.apply_state(v)?;
        }

        Ok(())
    }
}

/// The rendering core of one graphics context.
pub struct Renderer<D: Device> {
    backend: Backend<D>,
    slots: BindingSlots,
    states: RenderStateManager,
    window: Option<Window>,
    viewport: Option<Viewport>,
    changes: Vec<StateChange>,
}

impl<D: Device> Renderer<D> {
    /// Creates a renderer on `device`. The context is reset to the default render states,
    /// and the window and viewport of `settings` are applied.
    pub fn new(mut device: D, settings: RendererSettings) -> Result<Self> {
        settings.validate()?;

        let capabilities = device.capabilities();
        info!("Creates renderer with {:?}.", capabilities);

        let mut changes = Vec::new();
        let states = RenderStateManager::new(&mut changes);
        for &v in &changes {
            device.apply_state(v)?;
        }

        changes.clear();

        let units = settings.max_texture_units.min(capabilities.max_texture_units);
        let mut renderer = Renderer {
            backend: Backend {
                device,
                caches: ResourceCaches::new(),
                capabilities,
            },
            slots: BindingSlots::new(units),
            states,
            window: None,
            viewport: None,
            changes,
        };

        let w = settings.window;
        renderer.set_window(w.width, w.height, w.near, w.far)?;

        if let Some(vp) = settings.viewport {
            renderer.set_viewport(vp.x, vp.y, vp.width, vp.height)?;
        }

        Ok(renderer)
    }

    #[inline]
    pub fn device(&self) -> &D {
        &self.backend.device
    }

    #[inline]
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.backend.device
    }

    #[inline]
    pub fn capabilities(&self) -> &Capabilities {
        &self.backend.capabilities
    }

    #[inline]
    pub fn slots(&self) -> &BindingSlots {
        &self.slots
    }

    #[inline]
    pub fn states(&self) -> &RenderStateManager {
        &self.states
    }

    /// Whether `resource` currently has a backend representation.
    pub fn is_bound<R>(&self, resource: &R) -> bool
    where
        R: Cacheable<D>,
        D: Adapter<R>,
    {
        R::cache(&self.backend.caches).contains(resource.id())
    }

    /// Creates the backend representation of `resource` if there is none.
    pub fn bind<R>(&mut self, resource: &R) -> Result<()>
    where
        R: Cacheable<D>,
        D: Adapter<R>,
    {
        self.backend.bind(resource).map(|_| ())
    }

    /// Destroys the backend representation of `resource`, if any. Binding slots holding
    /// it are emptied.
    pub fn unbind<R>(&mut self, resource: &R) -> Result<()>
    where
        R: Cacheable<D>,
        D: Adapter<R>,
    {
        self.slots.forget(resource.id());
        self.backend.unbind(resource).map(|_| ())
    }

    /// Activates `resource` at `binding` unconditionally, creating its backend
    /// representation on demand.
    pub fn enable<R>(&mut self, resource: &R, binding: R::Binding) -> Result<()>
    where
        R: Cacheable<D>,
        D: Adapter<R>,
    {
        R::reset_slot(&mut self.slots, binding);
        self.backend.enable(resource, binding)
    }

    /// Deactivates `resource` at `binding` unconditionally.
    pub fn disable<R>(&mut self, resource: &R, binding: R::Binding) -> Result<()>
    where
        R: Cacheable<D>,
        D: Adapter<R>,
    {
        R::reset_slot(&mut self.slots, binding);
        self.backend.disable(resource, binding)
    }

    pub fn map<'a, R>(&'a mut self, resource: &R, params: MapParams) -> Result<&'a mut [u8]>
    where
        R: Cacheable<D> + Mappable + 'a,
        D: MapAdapter<R>,
    {
        R::check_supported(&self.backend.capabilities)?;

        let backend = &mut self.backend;
        R::cache_mut(&mut backend.caches).map(&mut backend.device, resource, params)
    }

    pub fn flush<R>(&mut self, resource: &R, offset: usize, size: usize) -> Result<()>
    where
        R: Cacheable<D> + Mappable,
        D: MapAdapter<R>,
    {
        let backend = &mut self.backend;
        R::cache_mut(&mut backend.caches).flush(&mut backend.device, resource, offset, size)
    }

    pub fn unmap<R>(&mut self, resource: &R) -> Result<()>
    where
        R: Cacheable<D> + Mappable,
        D: MapAdapter<R>,
    {
        let backend = &mut self.backend;
        R::cache_mut(&mut backend.caches).unmap(&mut backend.device, resource)
    }

    /// Uploads the live region of the host mirror of `resource`, starting at its data offset.
    fn update<R>(
        &mut self,
        resource: &R,
        buffer: &Buffer,
        access: AccessMode,
        flush: FlushMode,
        sync: SyncMode,
    ) -> Result<()>
    where
        R: Cacheable<D> + Mappable,
        D: MapAdapter<R>,
    {
        let data = buffer
            .data()
            .ok_or_else(|| Error::InvalidState(format!("{} has no host storage", buffer.id())))?;

        let offset = buffer.data_offset();
        let size = buffer.live_size_bytes().min(buffer.capacity_bytes() - offset);
        if size == 0 {
            trace!("Skips updating {}, its live region is empty.", buffer.id());
            return Ok(());
        }

        let params = MapParams {
            access,
            flush,
            sync,
            offset,
            size,
        };

        self.map(resource, params)?
            .copy_from_slice(&data[offset..offset + size]);

        if params.requires_flush() {
            self.flush(resource, 0, size)?;
        }

        self.unmap(resource)
    }

    /// Binds a buffer of any kind.
    pub fn bind_buffer<'a, T: Into<BufferRef<'a>>>(&mut self, buffer: T) -> Result<()> {
        match buffer.into() {
            BufferRef::Vertex(v) => self.bind(v),
            BufferRef::Index(v) => self.bind(v),
            BufferRef::Shader(v) => self.bind(v),
            BufferRef::Untyped(v) => Err(Error::InvalidBufferType(v.id())),
        }
    }

    pub fn unbind_buffer<'a, T: Into<BufferRef<'a>>>(&mut self, buffer: T) -> Result<()> {
        match buffer.into() {
            BufferRef::Vertex(v) => self.unbind(v),
            BufferRef::Index(v) => self.unbind(v),
            BufferRef::Shader(v) => self.unbind(v),
            BufferRef::Untyped(v) => Err(Error::InvalidBufferType(v.id())),
        }
    }

    pub fn map_buffer<'a, T: Into<BufferRef<'a>>>(
        &mut self,
        buffer: T,
        params: MapParams,
    ) -> Result<&mut [u8]> {
        match buffer.into() {
            BufferRef::Vertex(v) => self.map(v, params),
            BufferRef::Index(v) => self.map(v, params),
            BufferRef::Shader(v) => self.map(v, params),
            BufferRef::Untyped(v) => Err(Error::InvalidBufferType(v.id())),
        }
    }

    pub fn flush_buffer<'a, T: Into<BufferRef<'a>>>(
        &mut self,
        buffer: T,
        offset: usize,
        size: usize,
    ) -> Result<()> {
        match buffer.into() {
            BufferRef::Vertex(v) => self.flush(v, offset, size),
            BufferRef::Index(v) => self.flush(v, offset, size),
            BufferRef::Shader(v) => self.flush(v, offset, size),
            BufferRef::Untyped(v) => Err(Error::InvalidBufferType(v.id())),
        }
    }

    pub fn unmap_buffer<'a, T: Into<BufferRef<'a>>>(&mut self, buffer: T) -> Result<()> {
        match buffer.into() {
            BufferRef::Vertex(v) => self.unmap(v),
            BufferRef::Index(v) => self.unmap(v),
            BufferRef::Shader(v) => self.unmap(v),
            BufferRef::Untyped(v) => Err(Error::InvalidBufferType(v.id())),
        }
    }

    /// Uploads the live region of a host-visible buffer: maps it, copies the host mirror,
    /// flushes if required and unmaps.
    pub fn update_buffer<'a, T: Into<BufferRef<'a>>>(
        &mut self,
        buffer: T,
        access: AccessMode,
        flush: FlushMode,
        sync: SyncMode,
    ) -> Result<()> {
        match buffer.into() {
            BufferRef::Vertex(v) => self.update(v, v, access, flush, sync),
            BufferRef::Index(v) => self.update(v, v, access, flush, sync),
            BufferRef::Shader(v) => self.update(v, v, access, flush, sync),
            BufferRef::Untyped(v) => Err(Error::InvalidBufferType(v.id())),
        }
    }

    /// Binds a texture of any dimensionality.
    pub fn bind_texture<'a, T: Into<Texture<'a>>>(&mut self, texture: T) -> Result<()> {
        match texture.into() {
            Texture::D1(v) => self.bind(v),
            Texture::D2(v) => self.bind(v),
            Texture::D2Array(v) => self.bind(v),
            Texture::D3(v) => self.bind(v),
            Texture::Cube(_) => Err(Error::UnsupportedKind(ResourceKind::TextureCube)),
        }
    }

    pub fn unbind_texture<'a, T: Into<Texture<'a>>>(&mut self, texture: T) -> Result<()> {
        match texture.into() {
            Texture::D1(v) => self.unbind(v),
            Texture::D2(v) => self.unbind(v),
            Texture::D2Array(v) => self.unbind(v),
            Texture::D3(v) => self.unbind(v),
            Texture::Cube(_) => Err(Error::UnsupportedKind(ResourceKind::TextureCube)),
        }
    }

    pub fn enable_texture<'a, T: Into<Texture<'a>>>(
        &mut self,
        texture: T,
        unit: TextureUnit,
    ) -> Result<()> {
        match texture.into() {
            Texture::D1(v) => self.enable(v, unit),
            Texture::D2(v) => self.enable(v, unit),
            Texture::D2Array(v) => self.enable(v, unit),
            Texture::D3(v) => self.enable(v, unit),
            Texture::Cube(_) => Err(Error::UnsupportedKind(ResourceKind::TextureCube)),
        }
    }

    pub fn disable_texture<'a, T: Into<Texture<'a>>>(
        &mut self,
        texture: T,
        unit: TextureUnit,
    ) -> Result<()> {
        match texture.into() {
            Texture::D1(v) => self.disable(v, unit),
            Texture::D2(v) => self.disable(v, unit),
            Texture::D2Array(v) => self.disable(v, unit),
            Texture::D3(v) => self.disable(v, unit),
            Texture::Cube(_) => Err(Error::UnsupportedKind(ResourceKind::TextureCube)),
        }
    }

    /// Uploads the host mirror of a texture.
    pub fn update_texture<'a, T: Into<Texture<'a>>>(
        &mut self,
        texture: T,
        flush: FlushMode,
        sync: SyncMode,
    ) -> Result<()> {
        match texture.into() {
            Texture::D1(v) => self.update_image(v, v, flush, sync),
            Texture::D2(v) => self.update_image(v, v, flush, sync),
            Texture::D2Array(v) => self.update_image(v, v, flush, sync),
            Texture::D3(v) => self.update_image(v, v, flush, sync),
            Texture::Cube(_) => Err(Error::UnsupportedKind(ResourceKind::TextureCube)),
        }
    }

    fn update_image<R>(
        &mut self,
        resource: &R,
        image: &TextureImage,
        flush: FlushMode,
        sync: SyncMode,
    ) -> Result<()>
    where
        R: Cacheable<D> + Mappable,
        D: MapAdapter<R>,
    {
        let data = image
            .data()
            .ok_or_else(|| Error::InvalidState(format!("{} has no host storage", image.id())))?;

        let params = MapParams {
            access: AccessMode::Write,
            flush,
            sync,
            offset: 0,
            size: image.size_bytes(),
        };

        self.map(resource, params)?.copy_from_slice(&data);

        if params.requires_flush() {
            self.flush(resource, 0, params.size)?;
        }

        self.unmap(resource)
    }

    /// Sets the size and depth range of the window. The viewport is reset to cover it.
    pub fn set_window(&mut self, width: u32, height: u32, near: f32, far: f32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidSize(format!(
                "window of {}x{} pixels",
                width, height
            )));
        }

        self.window = Some(Window {
            width,
            height,
            near,
            far,
        });

        self.set_viewport(0, 0, width, height)
    }

    #[inline]
    pub fn window(&self) -> Option<Window> {
        self.window
    }

    /// Sets the viewport of subsequent draws, in window pixels.
    pub fn set_viewport(&mut self, x: u32, y: u32, width: u32, height: u32) -> Result<()> {
        let window = self
            .window
            .ok_or_else(|| Error::InvalidState("viewport is set before the window".into()))?;

        let viewport = Viewport {
            x,
            y,
            width,
            height,
        };

        let depth = DepthRange {
            near: window.near,
            far: window.far,
        };

        self.backend.device.set_viewport(viewport, depth)?;
        self.viewport = Some(viewport);
        Ok(())
    }

    #[inline]
    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    pub fn clear_color_buffer(&mut self, color: Color<f32>) -> Result<()> {
        self.clear(Some(color), None, None)
    }

    pub fn clear_depth_buffer(&mut self, depth: f32) -> Result<()> {
        self.clear(None, Some(depth), None)
    }

    pub fn clear_stencil_buffer(&mut self, stencil: i32) -> Result<()> {
        self.clear(None, None, Some(stencil))
    }

    pub fn clear_frame_buffer(&mut self, color: Color<f32>, depth: f32, stencil: i32) -> Result<()> {
        self.clear(Some(color), Some(depth), Some(stencil))
    }

    fn clear(
        &mut self,
        color: Option<Color<f32>>,
        depth: Option<f32>,
        stencil: Option<i32>,
    ) -> Result<()> {
        // Writes masked by the last pass would mask the clear as well.
        self.changes.clear();
        self.states
            .unmask_clear(depth.is_some(), stencil.is_some(), &mut self.changes);
        self.backend.apply_states(&self.changes)?;

        self.backend.device.clear(color, depth, stencil)
    }

    pub fn swap_frame_buffer(&mut self) -> Result<()> {
        self.backend.device.swap_frame_buffer()
    }

    /// Forgets the binding slots and re-emits the default render states, after the context
    /// has been used by someone else.
    pub fn reset_context(&mut self) -> Result<()> {
        self.slots.reset();
        self.changes.clear();
        self.states.restore(&mut self.changes);
        self.backend.apply_states(&self.changes)
    }
}

impl<D: Device> Drop for Renderer<D> {
    fn drop(&mut self) {
        let backend = &mut self.backend;
        let failures = backend.caches.clear(&mut backend.device);
        if failures > 0 {
            warn!("{} backend objects failed to be destroyed.", failures);
        }
    }
}
