//! Textures of several dimensionalities. A texture is a container of one or more images, it
//! could be the source of a texture access from a shader when enabled on a texture unit.

use std::cell::{Ref, RefCell};
use std::ops::Deref;
use std::rc::Rc;

use crate::buffer::{BufferUsage, StorageMode};
use crate::errors::*;
use crate::resource::{Resource, ResourceId, ResourceKind, TextureUnit};

/// List of all the possible formats of texels.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum TextureFormat {
    R8,
    RG8,
    RGB8,
    RGBA8,
    R16F,
    RG16F,
    RGBA16F,
    R32F,
    RG32F,
    RGBA32F,
}

impl TextureFormat {
    /// Size in bytes of one texel.
    pub fn texel_size(self) -> usize {
        match self {
            TextureFormat::R8 => 1,
            TextureFormat::RG8 => 2,
            TextureFormat::RGB8 => 3,
            TextureFormat::RGBA8 => 4,
            TextureFormat::R16F => 2,
            TextureFormat::RG16F => 4,
            TextureFormat::RGBA16F => 8,
            TextureFormat::R32F => 4,
            TextureFormat::RG32F => 8,
            TextureFormat::RGBA32F => 16,
        }
    }
}

/// The parameters of a texture object beside its dimensions.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureParams {
    /// Sets the format of data.
    pub format: TextureFormat,
    /// Number of mipmap levels, including the base level.
    pub mipmap_levels: u32,
    /// Hint abouts the intended update strategy of the data.
    pub usage: BufferUsage,
    pub storage: StorageMode,
}

impl Default for TextureParams {
    fn default() -> Self {
        TextureParams {
            format: TextureFormat::RGBA8,
            mipmap_levels: 1,
            usage: BufferUsage::Static,
            storage: StorageMode::Host,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum TextureKind {
    D1,
    D2,
    D2Array,
    D3,
    Cube,
}

impl TextureKind {
    pub fn resource_kind(self) -> ResourceKind {
        match self {
            TextureKind::D1 => ResourceKind::Texture1D,
            TextureKind::D2 => ResourceKind::Texture2D,
            TextureKind::D2Array => ResourceKind::Texture2DArray,
            TextureKind::D3 => ResourceKind::Texture3D,
            TextureKind::Cube => ResourceKind::TextureCube,
        }
    }
}

/// Dimensions and storage shared by every kind of texture.
#[derive(Debug)]
pub struct TextureImage {
    id: ResourceId,
    dimensions: [u32; 3],
    params: TextureParams,
    data: Option<RefCell<Vec<u8>>>,
}

impl TextureImage {
    fn new(dimensions: [u32; 3], params: TextureParams) -> Result<Self> {
        if dimensions.iter().any(|&v| v < 1) {
            return Err(Error::InvalidSize(format!(
                "texture dimensions {:?} must be positive",
                dimensions
            )));
        }

        if params.mipmap_levels < 1 {
            return Err(Error::InvalidSize("texture without mipmap levels".into()));
        }

        let len = dimensions.iter().map(|&v| v as usize).product::<usize>()
            * params.format.texel_size();

        let data = match params.storage {
            StorageMode::Host => Some(RefCell::new(vec![0; len])),
            StorageMode::Device => None,
        };

        Ok(TextureImage {
            id: ResourceId::next(),
            dimensions,
            params,
            data,
        })
    }

    #[inline]
    pub fn id(&self) -> ResourceId {
        self.id
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.dimensions[0]
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.dimensions[1]
    }

    #[inline]
    pub fn depth(&self) -> u32 {
        self.dimensions[2]
    }

    #[inline]
    pub fn dimensions(&self) -> [u32; 3] {
        self.dimensions
    }

    #[inline]
    pub fn format(&self) -> TextureFormat {
        self.params.format
    }

    #[inline]
    pub fn mipmap_levels(&self) -> u32 {
        self.params.mipmap_levels
    }

    #[inline]
    pub fn usage(&self) -> BufferUsage {
        self.params.usage
    }

    #[inline]
    pub fn storage(&self) -> StorageMode {
        self.params.storage
    }

    /// Size in bytes of the base level.
    pub fn size_bytes(&self) -> usize {
        self.dimensions.iter().map(|&v| v as usize).product::<usize>()
            * self.params.format.texel_size()
    }

    /// The host mirror of the base level, `None` for device-only storage.
    pub fn data(&self) -> Option<Ref<[u8]>> {
        self.data
            .as_ref()
            .map(|v| Ref::map(v.borrow(), |v| v.as_slice()))
    }

    /// Copies `bytes` into the host mirror at `offset`.
    pub fn write(&self, offset: usize, bytes: &[u8]) -> Result<()> {
        Error::check_range(offset, bytes.len(), self.size_bytes())?;

        let data = self.data.as_ref().ok_or_else(|| {
            Error::InvalidState(format!("{} has no host storage", self.id))
        })?;

        data.borrow_mut()[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}

macro_rules! impl_texture {
    ($name: ident, $kind: ident) => {
        #[derive(Debug)]
        pub struct $name(TextureImage);

        impl Deref for $name {
            type Target = TextureImage;

            fn deref(&self) -> &TextureImage {
                &self.0
            }
        }

        impl Resource for $name {
            type Binding = TextureUnit;
            const KIND: ResourceKind = ResourceKind::$kind;

            fn id(&self) -> ResourceId {
                self.0.id
            }
        }
    };
}

impl_texture!(Texture1D, Texture1D);
impl_texture!(Texture2D, Texture2D);
impl_texture!(Texture2DArray, Texture2DArray);
impl_texture!(Texture3D, Texture3D);
impl_texture!(TextureCube, TextureCube);

impl Texture1D {
    pub fn new(width: u32, params: TextureParams) -> Result<Self> {
        Ok(Texture1D(TextureImage::new([width, 1, 1], params)?))
    }
}

impl Texture2D {
    pub fn new(width: u32, height: u32, params: TextureParams) -> Result<Self> {
        Ok(Texture2D(TextureImage::new([width, height, 1], params)?))
    }
}

impl Texture2DArray {
    pub fn new(width: u32, height: u32, layers: u32, params: TextureParams) -> Result<Self> {
        Ok(Texture2DArray(TextureImage::new(
            [width, height, layers],
            params,
        )?))
    }

    #[inline]
    pub fn layers(&self) -> u32 {
        self.0.depth()
    }
}

impl Texture3D {
    pub fn new(width: u32, height: u32, depth: u32, params: TextureParams) -> Result<Self> {
        Ok(Texture3D(TextureImage::new([width, height, depth], params)?))
    }
}

impl TextureCube {
    /// Creates a cube map with six square faces.
    pub fn new(size: u32, params: TextureParams) -> Result<Self> {
        Ok(TextureCube(TextureImage::new([size, size, 6], params)?))
    }
}

/// A reference to any kind of texture.
#[derive(Debug, Clone, Copy)]
pub enum Texture<'a> {
    D1(&'a Texture1D),
    D2(&'a Texture2D),
    D2Array(&'a Texture2DArray),
    D3(&'a Texture3D),
    Cube(&'a TextureCube),
}

impl<'a> Texture<'a> {
    pub fn kind(&self) -> TextureKind {
        match *self {
            Texture::D1(_) => TextureKind::D1,
            Texture::D2(_) => TextureKind::D2,
            Texture::D2Array(_) => TextureKind::D2Array,
            Texture::D3(_) => TextureKind::D3,
            Texture::Cube(_) => TextureKind::Cube,
        }
    }

    pub fn image(&self) -> &'a TextureImage {
        match *self {
            Texture::D1(v) => &v.0,
            Texture::D2(v) => &v.0,
            Texture::D2Array(v) => &v.0,
            Texture::D3(v) => &v.0,
            Texture::Cube(v) => &v.0,
        }
    }

    #[inline]
    pub fn id(&self) -> ResourceId {
        self.image().id
    }
}

macro_rules! impl_texture_ref {
    ($name: ident, $variant: ident) => {
        impl<'a> From<&'a $name> for Texture<'a> {
            fn from(v: &'a $name) -> Self {
                Texture::$variant(v)
            }
        }
    };
}

impl_texture_ref!(Texture1D, D1);
impl_texture_ref!(Texture2D, D2);
impl_texture_ref!(Texture2DArray, D2Array);
impl_texture_ref!(Texture3D, D3);
impl_texture_ref!(TextureCube, Cube);

/// An owned texture of any kind, as stored in a pass.
#[derive(Debug, Clone)]
pub enum TextureHandle {
    D1(Rc<Texture1D>),
    D2(Rc<Texture2D>),
    D2Array(Rc<Texture2DArray>),
    D3(Rc<Texture3D>),
    Cube(Rc<TextureCube>),
}

impl TextureHandle {
    pub fn as_texture(&self) -> Texture {
        match *self {
            TextureHandle::D1(ref v) => Texture::D1(v),
            TextureHandle::D2(ref v) => Texture::D2(v),
            TextureHandle::D2Array(ref v) => Texture::D2Array(v),
            TextureHandle::D3(ref v) => Texture::D3(v),
            TextureHandle::Cube(ref v) => Texture::Cube(v),
        }
    }
}

macro_rules! impl_texture_handle {
    ($name: ident, $variant: ident) => {
        impl From<Rc<$name>> for TextureHandle {
            fn from(v: Rc<$name>) -> Self {
                TextureHandle::$variant(v)
            }
        }
    };
}

impl_texture_handle!(Texture1D, D1);
impl_texture_handle!(Texture2D, D2);
impl_texture_handle!(Texture2DArray, D2Array);
impl_texture_handle!(Texture3D, D3);
impl_texture_handle!(TextureCube, Cube);
