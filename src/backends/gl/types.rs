use gl::types::*;

use crate::buffer::{AccessMode, BufferUsage, FlushMode, IndexFormat, MapParams, SyncMode};
use crate::sampler::{SamplerParams, TextureFilter, TextureWrap};
use crate::state::{BlendFactor, Comparison, CullFace, FrontFaceOrder, StencilOperation};
use crate::texture::{TextureFormat, TextureKind};
use crate::vertex::{VertexAttributeType, VertexScalar};
use crate::visual::PrimitiveType;

impl From<BufferUsage> for GLenum {
    fn from(usage: BufferUsage) -> Self {
        match usage {
            BufferUsage::Static => gl::STATIC_DRAW,
            BufferUsage::Stream => gl::STREAM_DRAW,
            BufferUsage::Dynamic => gl::DYNAMIC_DRAW,
        }
    }
}

impl From<Comparison> for GLenum {
    fn from(cmp: Comparison) -> Self {
        match cmp {
            Comparison::Never => gl::NEVER,
            Comparison::Less => gl::LESS,
            Comparison::LessOrEqual => gl::LEQUAL,
            Comparison::Greater => gl::GREATER,
            Comparison::GreaterOrEqual => gl::GEQUAL,
            Comparison::Equal => gl::EQUAL,
            Comparison::NotEqual => gl::NOTEQUAL,
            Comparison::Always => gl::ALWAYS,
        }
    }
}

impl From<BlendFactor> for GLenum {
    fn from(factor: BlendFactor) -> Self {
        match factor {
            BlendFactor::Zero => gl::ZERO,
            BlendFactor::One => gl::ONE,
            BlendFactor::SourceColor => gl::SRC_COLOR,
            BlendFactor::OneMinusSourceColor => gl::ONE_MINUS_SRC_COLOR,
            BlendFactor::SourceAlpha => gl::SRC_ALPHA,
            BlendFactor::OneMinusSourceAlpha => gl::ONE_MINUS_SRC_ALPHA,
            BlendFactor::DestinationColor => gl::DST_COLOR,
            BlendFactor::OneMinusDestinationColor => gl::ONE_MINUS_DST_COLOR,
            BlendFactor::DestinationAlpha => gl::DST_ALPHA,
            BlendFactor::OneMinusDestinationAlpha => gl::ONE_MINUS_DST_ALPHA,
            BlendFactor::ConstantColor => gl::CONSTANT_COLOR,
            BlendFactor::OneMinusConstantColor => gl::ONE_MINUS_CONSTANT_COLOR,
            BlendFactor::ConstantAlpha => gl::CONSTANT_ALPHA,
            BlendFactor::OneMinusConstantAlpha => gl::ONE_MINUS_CONSTANT_ALPHA,
        }
    }
}

impl From<CullFace> for GLenum {
    fn from(face: CullFace) -> Self {
        match face {
            CullFace::Front => gl::FRONT,
            CullFace::Back => gl::BACK,
            CullFace::FrontAndBack => gl::FRONT_AND_BACK,
        }
    }
}

impl From<FrontFaceOrder> for GLenum {
    fn from(order: FrontFaceOrder) -> Self {
        match order {
            FrontFaceOrder::Clockwise => gl::CW,
            FrontFaceOrder::CounterClockwise => gl::CCW,
        }
    }
}

impl From<StencilOperation> for GLenum {
    fn from(op: StencilOperation) -> Self {
        match op {
            StencilOperation::Keep => gl::KEEP,
            StencilOperation::Zero => gl::ZERO,
            StencilOperation::Replace => gl::REPLACE,
            StencilOperation::Increment => gl::INCR,
            StencilOperation::IncrementWrap => gl::INCR_WRAP,
            StencilOperation::Decrement => gl::DECR,
            StencilOperation::DecrementWrap => gl::DECR_WRAP,
            StencilOperation::Invert => gl::INVERT,
        }
    }
}

impl From<PrimitiveType> for GLenum {
    fn from(primitive: PrimitiveType) -> Self {
        match primitive {
            PrimitiveType::Points => gl::POINTS,
            PrimitiveType::Lines => gl::LINES,
            PrimitiveType::LineStrip => gl::LINE_STRIP,
            PrimitiveType::Triangles => gl::TRIANGLES,
            PrimitiveType::TriangleStrip => gl::TRIANGLE_STRIP,
        }
    }
}

impl From<IndexFormat> for GLenum {
    fn from(format: IndexFormat) -> Self {
        match format {
            IndexFormat::U16 => gl::UNSIGNED_SHORT,
            IndexFormat::U32 => gl::UNSIGNED_INT,
        }
    }
}

impl From<VertexScalar> for GLenum {
    fn from(scalar: VertexScalar) -> Self {
        match scalar {
            VertexScalar::Byte => gl::BYTE,
            VertexScalar::UByte => gl::UNSIGNED_BYTE,
            VertexScalar::Int => gl::INT,
            VertexScalar::UInt => gl::UNSIGNED_INT,
            VertexScalar::Float => gl::FLOAT,
        }
    }
}

impl From<TextureWrap> for GLenum {
    fn from(wrap: TextureWrap) -> Self {
        match wrap {
            TextureWrap::Repeat => gl::REPEAT,
            TextureWrap::Mirror => gl::MIRRORED_REPEAT,
            TextureWrap::Clamp => gl::CLAMP_TO_EDGE,
        }
    }
}

impl From<TextureKind> for GLenum {
    fn from(kind: TextureKind) -> Self {
        match kind {
            TextureKind::D1 => gl::TEXTURE_1D,
            TextureKind::D2 => gl::TEXTURE_2D,
            TextureKind::D2Array => gl::TEXTURE_2D_ARRAY,
            TextureKind::D3 => gl::TEXTURE_3D,
            TextureKind::Cube => gl::TEXTURE_CUBE_MAP,
        }
    }
}

/// Whether an attribute is read by the shader as integers.
pub fn is_integer_attribute(tp: VertexAttributeType, normalized: bool) -> bool {
    match tp.scalar() {
        VertexScalar::Int | VertexScalar::UInt => !normalized,
        _ => false,
    }
}

/// Internal format, pixel format and pixel type of a texture format.
pub fn texture_format(format: TextureFormat) -> (GLenum, GLenum, GLenum) {
    match format {
        TextureFormat::R8 => (gl::R8, gl::RED, gl::UNSIGNED_BYTE),
        TextureFormat::RG8 => (gl::RG8, gl::RG, gl::UNSIGNED_BYTE),
        TextureFormat::RGB8 => (gl::RGB8, gl::RGB, gl::UNSIGNED_BYTE),
        TextureFormat::RGBA8 => (gl::RGBA8, gl::RGBA, gl::UNSIGNED_BYTE),
        TextureFormat::R16F => (gl::R16F, gl::RED, gl::HALF_FLOAT),
        TextureFormat::RG16F => (gl::RG16F, gl::RG, gl::HALF_FLOAT),
        TextureFormat::RGBA16F => (gl::RGBA16F, gl::RGBA, gl::HALF_FLOAT),
        TextureFormat::R32F => (gl::R32F, gl::RED, gl::FLOAT),
        TextureFormat::RG32F => (gl::RG32F, gl::RG, gl::FLOAT),
        TextureFormat::RGBA32F => (gl::RGBA32F, gl::RGBA, gl::FLOAT),
    }
}

/// Minification and magnification filters of a sampler.
pub fn sampler_filters(params: &SamplerParams) -> (GLenum, GLenum) {
    let min = match (params.minification, params.mipmap) {
        (TextureFilter::Nearest, None) => gl::NEAREST,
        (TextureFilter::Linear, None) => gl::LINEAR,
        (TextureFilter::Nearest, Some(TextureFilter::Nearest)) => gl::NEAREST_MIPMAP_NEAREST,
        (TextureFilter::Nearest, Some(TextureFilter::Linear)) => gl::NEAREST_MIPMAP_LINEAR,
        (TextureFilter::Linear, Some(TextureFilter::Nearest)) => gl::LINEAR_MIPMAP_NEAREST,
        (TextureFilter::Linear, Some(TextureFilter::Linear)) => gl::LINEAR_MIPMAP_LINEAR,
    };

    let mag = match params.magnification {
        TextureFilter::Nearest => gl::NEAREST,
        TextureFilter::Linear => gl::LINEAR,
    };

    (min, mag)
}

/// The access bits of `glMapBufferRange`.
pub fn map_access(params: &MapParams) -> GLbitfield {
    let mut bits = match params.access {
        AccessMode::Read => gl::MAP_READ_BIT,
        AccessMode::Write => gl::MAP_WRITE_BIT,
        AccessMode::ReadWrite => gl::MAP_READ_BIT | gl::MAP_WRITE_BIT,
    };

    if params.requires_flush() {
        bits |= gl::MAP_FLUSH_EXPLICIT_BIT;
    }

    if params.sync == SyncMode::Unsynchronized {
        bits |= gl::MAP_UNSYNCHRONIZED_BIT;
    }

    if params.access == AccessMode::Write && params.flush == FlushMode::Automatic {
        bits |= gl::MAP_INVALIDATE_RANGE_BIT;
    }

    bits
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn access() {
        let mut params = MapParams {
            access: AccessMode::Write,
            flush: FlushMode::Explicit,
            sync: SyncMode::Unsynchronized,
            offset: 0,
            size: 16,
        };

        assert_eq!(
            map_access(&params),
            gl::MAP_WRITE_BIT | gl::MAP_FLUSH_EXPLICIT_BIT | gl::MAP_UNSYNCHRONIZED_BIT
        );

        params.access = AccessMode::Read;
        params.sync = SyncMode::Synchronized;
        assert_eq!(map_access(&params), gl::MAP_READ_BIT);
    }

    #[test]
    fn filters() {
        let mut params = SamplerParams::default();
        assert_eq!(sampler_filters(&params), (gl::LINEAR, gl::LINEAR));

        params.minification = TextureFilter::Nearest;
        params.mipmap = Some(TextureFilter::Linear);
        assert_eq!(sampler_filters(&params).0, gl::NEAREST_MIPMAP_LINEAR);
    }

    #[test]
    fn integer_attributes() {
        assert!(is_integer_attribute(VertexAttributeType::IntVec2, false));
        assert!(!is_integer_attribute(VertexAttributeType::IntVec2, true));
        assert!(!is_integer_attribute(VertexAttributeType::UByteVec4, false));
    }
}
