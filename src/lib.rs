//! A backend-independent rendering core. It realizes logical resources (buffers,
//! textures, samplers, shaders) as backend objects lazily, remembers what is bound
//! at every binding point and emits only the render state changes that matter.
//!
//! The `Renderer` is an explicit context object, created once per graphics context:
//!
//! ```rust,ignore
//! use pastel::prelude::*;
//!
//! let mut renderer = Renderer::new(HeadlessDevice::new(), RendererSettings::default())?;
//! renderer.clear_frame_buffer(Color::black(), 1.0, 0)?;
//! renderer.draw(Some(&camera), &visual)?;
//! renderer.swap_frame_buffer()?;
//! ```

#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;
#[macro_use]
extern crate serde;

extern crate cgmath;
extern crate serde_json;
extern crate smallvec;

#[cfg(not(target_arch = "wasm32"))]
extern crate gl;

#[cfg(test)]
extern crate rand;

pub mod errors;
pub mod math;
pub mod resource;
pub mod settings;

pub mod buffer;
pub mod sampler;
pub mod shader;
pub mod state;
pub mod texture;
pub mod vertex;
pub mod visual;

pub mod backends;
pub mod renderer;

pub mod prelude {
    pub use crate::backends::headless::HeadlessDevice;
    pub use crate::backends::{Adapter, Capabilities, Device, MapAdapter};
    pub use crate::buffer::{
        AccessMode, Buffer, BufferRef, BufferUsage, FlushMode, IndexBuffer, IndexFormat,
        MapParams, ShaderBuffer, StorageMode, SyncMode, VertexBinding, VertexBuffer,
    };
    pub use crate::errors::{Error, Result};
    pub use crate::math::Color;
    pub use crate::resource::{Resource, ResourceId, TextureUnit};
    pub use crate::renderer::{DrawStats, Renderer};
    pub use crate::sampler::{Sampler, SamplerParams, TextureFilter, TextureWrap};
    pub use crate::settings::RendererSettings;
    pub use crate::shader::{Shader, Uniform, UniformValue};
    pub use crate::state::*;
    pub use crate::texture::{
        Texture1D, Texture2D, Texture2DArray, Texture3D, TextureCube, TextureFormat,
        TextureParams,
    };
    pub use crate::vertex::{VertexAttributeType, VertexFormat, VertexGroup};
    pub use crate::visual::{Camera, Effect, FixedCamera, Pass, PassStates, PrimitiveType, Visual};
}
