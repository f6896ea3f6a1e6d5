//! Vertex formats describe how a shader reads its attributes out of the vertex buffers
//! of a `VertexGroup`.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::buffer::{VertexBinding, VertexBuffer};
use crate::errors::*;
use crate::resource::{Resource, ResourceId, ResourceKind};

pub const MAX_VERTEX_ATTRIBUTES: usize = 16;

/// The scalar type of each component of a vertex attribute.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum VertexScalar {
    Byte,
    UByte,
    Int,
    UInt,
    Float,
}

impl VertexScalar {
    pub fn size(self) -> usize {
        match self {
            VertexScalar::Byte | VertexScalar::UByte => 1,
            VertexScalar::Int | VertexScalar::UInt | VertexScalar::Float => 4,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum VertexAttributeType {
    Float,
    FloatVec2,
    FloatVec3,
    FloatVec4,
    Int,
    IntVec2,
    IntVec3,
    IntVec4,
    UInt,
    UIntVec2,
    UIntVec3,
    UIntVec4,
    /// Four bytes, e.g. packed colors.
    UByteVec4,
    ByteVec4,
}

impl VertexAttributeType {
    pub fn scalar(self) -> VertexScalar {
        use self::VertexAttributeType::*;
        match self {
            Float | FloatVec2 | FloatVec3 | FloatVec4 => VertexScalar::Float,
            Int | IntVec2 | IntVec3 | IntVec4 => VertexScalar::Int,
            UInt | UIntVec2 | UIntVec3 | UIntVec4 => VertexScalar::UInt,
            UByteVec4 => VertexScalar::UByte,
            ByteVec4 => VertexScalar::Byte,
        }
    }

    pub fn components(self) -> u8 {
        use self::VertexAttributeType::*;
        match self {
            Float | Int | UInt => 1,
            FloatVec2 | IntVec2 | UIntVec2 => 2,
            FloatVec3 | IntVec3 | UIntVec3 => 3,
            FloatVec4 | IntVec4 | UIntVec4 | UByteVec4 | ByteVec4 => 4,
        }
    }

    /// Size in bytes of the whole attribute.
    #[inline]
    pub fn size(self) -> usize {
        self.scalar().size() * self.components() as usize
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexAttribute {
    pub location: u32,
    pub name: String,
    pub attribute_type: VertexAttributeType,
    /// Whether integer data are mapped to [0, 1] (or [-1, 1]) when read as floats.
    pub normalized: bool,
    /// Byte offset relative to the start of a vertex in its binding.
    pub offset: usize,
    pub binding: u32,
}

/// The layout of vertex attributes, shared by every visual drawn with it.
#[derive(Debug)]
pub struct VertexFormat {
    id: ResourceId,
    attributes: Vec<VertexAttribute>,
}

impl VertexFormat {
    pub fn build() -> VertexFormatBuilder {
        VertexFormatBuilder::default()
    }

    #[inline]
    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&VertexAttribute> {
        self.attributes.iter().find(|v| v.name == name)
    }

    /// The size of a vertex in the buffer attached to `binding`.
    pub fn stride(&self, binding: u32) -> usize {
        self.attributes
            .iter()
            .filter(|v| v.binding == binding)
            .map(|v| v.attribute_type.size())
            .sum()
    }

    /// The binding indices referred by this format, in ascending order.
    pub fn bindings(&self) -> Vec<u32> {
        let mut bindings: Vec<_> = self.attributes.iter().map(|v| v.binding).collect();
        bindings.sort();
        bindings.dedup();
        bindings
    }
}

impl Resource for VertexFormat {
    type Binding = ();
    const KIND: ResourceKind = ResourceKind::VertexFormat;

    fn id(&self) -> ResourceId {
        self.id
    }
}

#[derive(Default)]
pub struct VertexFormatBuilder {
    attributes: Vec<VertexAttribute>,
}

impl VertexFormatBuilder {
    /// Appends an attribute to `binding`. Locations are assigned in declaration order and
    /// offsets are packed tightly per binding.
    pub fn with<T: Into<String>>(
        mut self,
        name: T,
        attribute_type: VertexAttributeType,
        normalized: bool,
        binding: u32,
    ) -> Self {
        let offset = self
            .attributes
            .iter()
            .filter(|v| v.binding == binding)
            .map(|v| v.attribute_type.size())
            .sum();

        let location = self.attributes.len() as u32;
        self.attributes.push(VertexAttribute {
            location,
            name: name.into(),
            attribute_type,
            normalized,
            offset,
            binding,
        });

        self
    }

    pub fn finish(self) -> Result<VertexFormat> {
        if self.attributes.is_empty() {
            return Err(Error::InvalidSize("vertex format without attributes".into()));
        }

        if self.attributes.len() > MAX_VERTEX_ATTRIBUTES {
            return Err(Error::InvalidSize(format!(
                "{} vertex attributes exceed the limit {}",
                self.attributes.len(),
                MAX_VERTEX_ATTRIBUTES
            )));
        }

        for (i, v) in self.attributes.iter().enumerate() {
            if self.attributes[..i].iter().any(|w| w.name == v.name) {
                return Err(Error::InvalidState(format!(
                    "vertex attribute {} is declared twice",
                    v.name
                )));
            }
        }

        Ok(VertexFormat {
            id: ResourceId::next(),
            attributes: self.attributes,
        })
    }
}

/// A vertex buffer attached to one binding index of a `VertexGroup`.
#[derive(Debug, Clone)]
pub struct VertexBufferBinding {
    pub buffer: Rc<VertexBuffer>,
    pub offset: usize,
    pub stride: usize,
}

/// Vertex buffers of a visual keyed by their binding index.
#[derive(Debug, Clone, Default)]
pub struct VertexGroup {
    bindings: BTreeMap<u32, VertexBufferBinding>,
}

impl VertexGroup {
    pub fn new() -> Self {
        Default::default()
    }

    /// Attaches `buffer` to `index`, replacing whatever was attached before.
    pub fn set_vertex_buffer(
        &mut self,
        index: u32,
        buffer: Rc<VertexBuffer>,
        offset: usize,
        stride: usize,
    ) -> Result<()> {
        if stride == 0 {
            return Err(Error::InvalidSize(format!(
                "zero stride at binding {}",
                index
            )));
        }

        if offset >= buffer.capacity_bytes() {
            return Err(Error::Range {
                offset,
                end: offset,
                capacity: buffer.capacity_bytes(),
            });
        }

        self.bindings.insert(
            index,
            VertexBufferBinding {
                buffer,
                offset,
                stride,
            },
        );

        Ok(())
    }

    pub fn remove_vertex_buffer(&mut self, index: u32) -> Option<VertexBufferBinding> {
        self.bindings.remove(&index)
    }

    #[inline]
    pub fn get(&self, index: u32) -> Option<&VertexBufferBinding> {
        self.bindings.get(&index)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Iterates bindings in ascending binding index.
    pub fn iter(&self) -> impl Iterator<Item = (VertexBinding, &VertexBuffer)> {
        self.bindings.iter().map(|(&index, v)| {
            let binding = VertexBinding {
                index,
                offset: v.offset,
                stride: v.stride,
            };

            (binding, &*v.buffer)
        })
    }

    /// The live vertex count of the buffer at the lowest binding index, clamped to the
    /// vertices that fit behind the offset of the binding.
    pub fn vertex_count(&self) -> usize {
        self.bindings
            .values()
            .next()
            .map(|v| {
                let fit = (v.buffer.capacity_bytes() - v.offset) / v.stride;
                v.buffer.element_count().min(fit)
            })
            .unwrap_or(0)
    }
}
