//! Memory-backed logical resources: vertex, index and shader storage buffers.
//!
//! A `Buffer` has a fixed capacity decided at construction and a live size that
//! could shrink or grow within that capacity, e.g. when a dynamic batch writes
//! fewer vertices than it predicted.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::ops::Deref;

use crate::errors::*;
use crate::resource::{Resource, ResourceId, ResourceKind};

/// Hint abouts the frequency of updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BufferUsage {
    /// Written once and drawn many times.
    Static,
    /// Written once and drawn at most a few times.
    Stream,
    /// Written repeatedly and drawn many times.
    Dynamic,
}

/// Where the data mirror of a buffer lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageMode {
    /// A host-side mirror is allocated, so the buffer contents could be prepared
    /// on CPU and uploaded with `Renderer::update_buffer`.
    Host,
    /// No host allocation, the storage only exists on device.
    Device,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessMode {
    Read,
    Write,
    ReadWrite,
}

impl AccessMode {
    #[inline]
    pub fn is_writable(self) -> bool {
        self != AccessMode::Read
    }
}

/// Whether written ranges must be published explicitly with `Flush` before `Unmap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlushMode {
    Automatic,
    Explicit,
}

/// Whether `Map` waits for the device to finish consuming the mapped range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMode {
    Synchronized,
    Unsynchronized,
}

/// The parameters of one `Map` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapParams {
    pub access: AccessMode,
    pub flush: FlushMode,
    pub sync: SyncMode,
    pub offset: usize,
    pub size: usize,
}

impl MapParams {
    /// Whether the mapped range has to be flushed explicitly before unmapping.
    #[inline]
    pub fn requires_flush(&self) -> bool {
        self.access.is_writable() && self.flush == FlushMode::Explicit
    }
}

/// A fixed-capacity, typed block of storage.
#[derive(Debug)]
pub struct Buffer {
    id: ResourceId,
    capacity: usize,
    stride: usize,
    usage: BufferUsage,
    storage: StorageMode,
    len: Cell<usize>,
    data_offset: Cell<usize>,
    data: Option<RefCell<Vec<u8>>>,
}

impl Buffer {
    /// Creates a buffer of `len` elements, `stride` bytes each.
    pub fn new(len: usize, stride: usize, usage: BufferUsage, storage: StorageMode) -> Result<Self> {
        if len < 1 {
            return Err(Error::InvalidSize(format!(
                "buffer requires at least one element, got {}",
                len
            )));
        }

        if stride < 1 {
            return Err(Error::InvalidSize("buffer element stride is zero".into()));
        }

        let capacity = len.checked_mul(stride).ok_or_else(|| {
            Error::InvalidSize(format!("{} elements of {} bytes overflows", len, stride))
        })?;

        let data = match storage {
            StorageMode::Host => Some(RefCell::new(vec![0; capacity])),
            StorageMode::Device => None,
        };

        Ok(Buffer {
            id: ResourceId::next(),
            capacity,
            stride,
            usage,
            storage,
            len: Cell::new(len),
            data_offset: Cell::new(0),
            data,
        })
    }

    #[inline]
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// The physical size in bytes.
    #[inline]
    pub fn capacity_bytes(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn capacity_elements(&self) -> usize {
        self.capacity / self.stride
    }

    #[inline]
    pub fn element_stride(&self) -> usize {
        self.stride
    }

    /// The number of logically valid elements.
    #[inline]
    pub fn element_count(&self) -> usize {
        self.len.get()
    }

    /// Sets the number of logically valid elements without touching the capacity.
    pub fn set_element_count(&self, len: usize) -> Result<()> {
        if len > self.capacity_elements() {
            return Err(Error::InvalidSize(format!(
                "{} elements exceed the capacity of {}",
                len,
                self.capacity_elements()
            )));
        }

        self.len.set(len);
        Ok(())
    }

    /// The logically valid size in bytes.
    #[inline]
    pub fn live_size_bytes(&self) -> usize {
        self.len.get() * self.stride
    }

    /// Byte offset where the currently relevant region begins.
    #[inline]
    pub fn data_offset(&self) -> usize {
        self.data_offset.get()
    }

    pub fn set_data_offset(&self, offset: usize) -> Result<()> {
        if offset > self.capacity {
            return Err(Error::Range {
                offset,
                end: offset,
                capacity: self.capacity,
            });
        }

        self.data_offset.set(offset);
        Ok(())
    }

    /// The data offset counted in elements.
    #[inline]
    pub fn element_offset(&self) -> usize {
        self.data_offset.get() / self.stride
    }

    #[inline]
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    #[inline]
    pub fn storage(&self) -> StorageMode {
        self.storage
    }

    #[inline]
    pub fn is_host_visible(&self) -> bool {
        self.storage == StorageMode::Host
    }

    /// The host mirror, `None` for device-only storage.
    pub fn data(&self) -> Option<Ref<[u8]>> {
        self.data
            .as_ref()
            .map(|v| Ref::map(v.borrow(), |v| v.as_slice()))
    }

    pub fn data_mut(&self) -> Option<RefMut<[u8]>> {
        self.data
            .as_ref()
            .map(|v| RefMut::map(v.borrow_mut(), |v| v.as_mut_slice()))
    }

    /// Copies `bytes` into the host mirror at `offset`.
    pub fn write(&self, offset: usize, bytes: &[u8]) -> Result<()> {
        Error::check_range(offset, bytes.len(), self.capacity)?;

        let mut data = self.data_mut().ok_or_else(|| {
            Error::InvalidState(format!("{} has no host storage", self.id))
        })?;

        data[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}

/// Binding of a vertex buffer to a vertex-input binding index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexBinding {
    pub index: u32,
    pub offset: usize,
    pub stride: usize,
}

/// Per-vertex attribute storage.
#[derive(Debug)]
pub struct VertexBuffer(Buffer);

impl VertexBuffer {
    pub fn new(len: usize, stride: usize, usage: BufferUsage, storage: StorageMode) -> Result<Self> {
        Ok(VertexBuffer(Buffer::new(len, stride, usage, storage)?))
    }
}

impl Deref for VertexBuffer {
    type Target = Buffer;

    fn deref(&self) -> &Buffer {
        &self.0
    }
}

impl Resource for VertexBuffer {
    type Binding = VertexBinding;
    const KIND: ResourceKind = ResourceKind::VertexBuffer;

    fn id(&self) -> ResourceId {
        self.0.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexFormat {
    U16,
    U32,
}

impl IndexFormat {
    pub fn stride(self) -> usize {
        match self {
            IndexFormat::U16 => 2,
            IndexFormat::U32 => 4,
        }
    }
}

/// Index storage of a primitive.
#[derive(Debug)]
pub struct IndexBuffer {
    buffer: Buffer,
    format: IndexFormat,
}

impl IndexBuffer {
    pub fn new(
        len: usize,
        format: IndexFormat,
        usage: BufferUsage,
        storage: StorageMode,
    ) -> Result<Self> {
        let buffer = Buffer::new(len, format.stride(), usage, storage)?;
        Ok(IndexBuffer { buffer, format })
    }

    #[inline]
    pub fn format(&self) -> IndexFormat {
        self.format
    }
}

impl Deref for IndexBuffer {
    type Target = Buffer;

    fn deref(&self) -> &Buffer {
        &self.buffer
    }
}

impl Resource for IndexBuffer {
    type Binding = ();
    const KIND: ResourceKind = ResourceKind::IndexBuffer;

    fn id(&self) -> ResourceId {
        self.buffer.id
    }
}

/// Shader storage buffer attached to an indexed binding point.
#[derive(Debug)]
pub struct ShaderBuffer {
    buffer: Buffer,
    binding_point: u32,
}

impl ShaderBuffer {
    pub fn new(
        len: usize,
        stride: usize,
        binding_point: u32,
        usage: BufferUsage,
        storage: StorageMode,
    ) -> Result<Self> {
        let buffer = Buffer::new(len, stride, usage, storage)?;
        Ok(ShaderBuffer {
            buffer,
            binding_point,
        })
    }

    #[inline]
    pub fn binding_point(&self) -> u32 {
        self.binding_point
    }
}

impl Deref for ShaderBuffer {
    type Target = Buffer;

    fn deref(&self) -> &Buffer {
        &self.buffer
    }
}

impl Resource for ShaderBuffer {
    type Binding = ();
    const KIND: ResourceKind = ResourceKind::ShaderBuffer;

    fn id(&self) -> ResourceId {
        self.buffer.id
    }
}

/// A reference to any kind of buffer, for the type-erased entry points of the renderer.
#[derive(Debug, Clone, Copy)]
pub enum BufferRef<'a> {
    Vertex(&'a VertexBuffer),
    Index(&'a IndexBuffer),
    Shader(&'a ShaderBuffer),
    Untyped(&'a Buffer),
}

impl<'a> BufferRef<'a> {
    pub fn buffer(&self) -> &'a Buffer {
        match *self {
            BufferRef::Vertex(v) => &v.0,
            BufferRef::Index(v) => &v.buffer,
            BufferRef::Shader(v) => &v.buffer,
            BufferRef::Untyped(v) => v,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match *self {
            BufferRef::Vertex(_) => ResourceKind::VertexBuffer,
            BufferRef::Index(_) => ResourceKind::IndexBuffer,
            BufferRef::Shader(_) => ResourceKind::ShaderBuffer,
            BufferRef::Untyped(_) => ResourceKind::UntypedBuffer,
        }
    }
}

impl<'a> From<&'a VertexBuffer> for BufferRef<'a> {
    fn from(v: &'a VertexBuffer) -> Self {
        BufferRef::Vertex(v)
    }
}

impl<'a> From<&'a IndexBuffer> for BufferRef<'a> {
    fn from(v: &'a IndexBuffer) -> Self {
        BufferRef::Index(v)
    }
}

impl<'a> From<&'a ShaderBuffer> for BufferRef<'a> {
    fn from(v: &'a ShaderBuffer) -> Self {
        BufferRef::Shader(v)
    }
}

impl<'a> From<&'a Buffer> for BufferRef<'a> {
    fn from(v: &'a Buffer) -> Self {
        BufferRef::Untyped(v)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn capacity() {
        let vb = VertexBuffer::new(1024, 32, BufferUsage::Static, StorageMode::Host).unwrap();
        assert_eq!(vb.capacity_bytes(), 32768);
        assert_eq!(vb.live_size_bytes(), 32768);

        vb.set_element_count(500).unwrap();
        assert_eq!(vb.live_size_bytes(), 16000);
        assert_eq!(vb.capacity_bytes(), 32768);
        assert_eq!(vb.element_count(), 500);

        assert!(vb.set_element_count(1025).is_err());
        assert_eq!(vb.element_count(), 500);
    }

    #[test]
    fn invalid_size() {
        match Buffer::new(0, 4, BufferUsage::Static, StorageMode::Host) {
            Err(Error::InvalidSize(_)) => {}
            other => panic!("unexpected {:?}", other),
        }

        assert!(Buffer::new(4, 0, BufferUsage::Static, StorageMode::Host).is_err());
    }

    #[test]
    fn storage() {
        let host = Buffer::new(4, 4, BufferUsage::Dynamic, StorageMode::Host).unwrap();
        assert_eq!(host.data().unwrap().len(), 16);

        host.write(4, &[1, 2, 3, 4]).unwrap();
        assert_eq!(&host.data().unwrap()[4..8], &[1, 2, 3, 4]);
        assert!(host.write(14, &[0; 4]).is_err());

        let device = Buffer::new(4, 4, BufferUsage::Dynamic, StorageMode::Device).unwrap();
        assert!(device.data().is_none());
        assert!(device.write(0, &[0]).is_err());
    }

    #[test]
    fn data_offset() {
        let ib = IndexBuffer::new(6, IndexFormat::U16, BufferUsage::Stream, StorageMode::Host)
            .unwrap();
        assert_eq!(ib.capacity_bytes(), 12);

        ib.set_data_offset(4).unwrap();
        assert_eq!(ib.element_offset(), 2);
        assert!(ib.set_data_offset(13).is_err());
        assert_eq!(ib.data_offset(), 4);
    }

    #[test]
    fn buffer_ref() {
        let sb = ShaderBuffer::new(2, 16, 3, BufferUsage::Dynamic, StorageMode::Device).unwrap();
        let r: BufferRef = (&sb).into();
        assert_eq!(r.kind(), ResourceKind::ShaderBuffer);
        assert_eq!(r.buffer().id(), sb.id());
        assert_eq!(sb.binding_point(), 3);
    }
}
