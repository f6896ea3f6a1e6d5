//! Identity of logical resources.
//!
//! A logical resource is owned by whatever higher-level object created it (a mesh,
//! a material, an effect). The renderer never owns one, it only remembers its
//! `ResourceId` as a cache key and as the content of binding slots.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// The identity of a logical resource. Ids are allocated once per logical resource
/// and are never recycled, so a stale id can never alias a newer resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId(u64);

static NEXT_RESOURCE_ID: AtomicUsize = AtomicUsize::new(1);

impl ResourceId {
    /// Allocates a fresh id.
    pub fn next() -> Self {
        ResourceId(NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed) as u64)
    }

    #[inline]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ResourceId({})", self.0)
    }
}

/// The kind of a logical resource. It is fixed once the resource is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    VertexFormat,
    VertexBuffer,
    IndexBuffer,
    ShaderBuffer,
    UntypedBuffer,
    Texture1D,
    Texture2D,
    Texture2DArray,
    Texture3D,
    TextureCube,
    Sampler,
    Shader,
}

/// A logical resource that could be realized by a backend object.
pub trait Resource {
    /// Extra parameters of an `Enable`/`Disable` call, e.g. the texture unit.
    type Binding: Copy + PartialEq + fmt::Debug;

    const KIND: ResourceKind;

    fn id(&self) -> ResourceId;
}

/// Texture unit a texture or sampler is enabled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextureUnit(pub u32);

impl TextureUnit {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}
