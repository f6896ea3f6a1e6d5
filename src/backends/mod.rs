//! The backend of renderer, which should be responsible for only one thing: realizing
//! logical resources as API objects and submitting state changes and draw-calls to a
//! graphics context.
//!
//! Implementing `Device` for a new graphics API is the only integration surface.

pub mod headless;

#[cfg(not(target_arch = "wasm32"))]
pub mod gl;

use crate::buffer::*;
use crate::errors::*;
use crate::math::Color;
use crate::resource::Resource;
use crate::sampler::Sampler;
use crate::shader::{Shader, UniformLocation, UniformValue};
use crate::state::StateChange;
use crate::texture::*;
use crate::vertex::VertexFormat;
use crate::visual::PrimitiveType;

/// Realizes one kind of logical resource.
pub trait Adapter<R: Resource> {
    /// The backend representation, exclusively owned by the resource cache.
    type Object;

    fn create(&mut self, resource: &R) -> Result<Self::Object>;

    fn enable(&mut self, object: &mut Self::Object, resource: &R, binding: R::Binding)
        -> Result<()>;

    fn disable(&mut self, object: &mut Self::Object, binding: R::Binding) -> Result<()>;

    fn destroy(&mut self, object: Self::Object) -> Result<()>;
}

/// A logical resource with host-addressable storage.
pub trait Mappable: Resource {
    fn capacity_bytes(&self) -> usize;
}

impl Mappable for VertexBuffer {
    fn capacity_bytes(&self) -> usize {
        Buffer::capacity_bytes(self)
    }
}

impl Mappable for IndexBuffer {
    fn capacity_bytes(&self) -> usize {
        Buffer::capacity_bytes(self)
    }
}

impl Mappable for ShaderBuffer {
    fn capacity_bytes(&self) -> usize {
        Buffer::capacity_bytes(self)
    }
}

macro_rules! impl_mappable_texture {
    ($($name: ident),+) => {
        $(
            impl Mappable for $name {
                fn capacity_bytes(&self) -> usize {
                    self.size_bytes()
                }
            }
        )+
    };
}

impl_mappable_texture!(Texture1D, Texture2D, Texture2DArray, Texture3D);

/// Realizes a kind of logical resource whose storage could be mapped into host memory.
pub trait MapAdapter<R: Mappable>: Adapter<R> {
    /// Maps `[params.offset, params.offset + params.size)` of the storage. The returned
    /// memory is valid until `unmap`.
    fn map<'a>(&'a mut self, object: &'a mut Self::Object, params: MapParams)
        -> Result<&'a mut [u8]>;

    /// Publishes a written range, relative to the start of the mapped range.
    fn flush(&mut self, object: &mut Self::Object, offset: usize, size: usize) -> Result<()>;

    fn unmap(&mut self, object: &mut Self::Object) -> Result<()>;
}

/// Features of the active backend that could be missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub texture_3d: bool,
    pub shader_buffers: bool,
    pub max_texture_units: usize,
    pub max_vertex_attributes: usize,
}

impl Default for Capabilities {
    fn default() -> Self {
        Capabilities {
            texture_3d: true,
            shader_buffers: true,
            max_texture_units: 16,
            max_vertex_attributes: 16,
        }
    }
}

/// A rectangle of the window, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// The depth range of the window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthRange {
    pub near: f32,
    pub far: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexedDraw {
    pub format: IndexFormat,
    pub count: usize,
    /// Byte offset of the first index in the enabled index buffer.
    pub offset: usize,
}

/// One draw submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    pub primitive: PrimitiveType,
    pub first_vertex: usize,
    pub vertex_count: usize,
    pub index: Option<IndexedDraw>,
    pub instances: usize,
}

/// A graphics context able to realize every kind of resource the renderer deals with.
///
/// Cube map textures are representable but have no adapter, the renderer refuses them.
pub trait Device:
    Adapter<VertexFormat>
    + MapAdapter<VertexBuffer>
    + MapAdapter<IndexBuffer>
    + MapAdapter<ShaderBuffer>
    + MapAdapter<Texture1D>
    + MapAdapter<Texture2D>
    + MapAdapter<Texture2DArray>
    + MapAdapter<Texture3D>
    + Adapter<Sampler>
    + Adapter<Shader>
{
    fn capabilities(&self) -> Capabilities;

    fn apply_state(&mut self, change: StateChange) -> Result<()>;

    /// Looks up an uniform of a linked program.
    fn uniform_location(
        &mut self,
        shader: &<Self as Adapter<Shader>>::Object,
        name: &str,
    ) -> Option<UniformLocation>;

    /// Pushes an uniform value into the currently enabled program.
    fn update_uniform(&mut self, location: UniformLocation, value: &UniformValue) -> Result<()>;

    fn draw(&mut self, call: &DrawCall) -> Result<()>;

    /// Clears the selected buffers of the default framebuffer.
    fn clear(
        &mut self,
        color: Option<Color<f32>>,
        depth: Option<f32>,
        stencil: Option<i32>,
    ) -> Result<()>;

    fn set_viewport(&mut self, viewport: Viewport, depth: DepthRange) -> Result<()>;

    fn swap_frame_buffer(&mut self) -> Result<()>;
}
