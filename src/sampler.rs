//! Sampler objects decouple the sampling parameters from the texture they are used with.

use crate::resource::{Resource, ResourceId, ResourceKind, TextureUnit};

/// Specify how the texture is used whenever the pixel being sampled.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum TextureFilter {
    /// Returns the value of the texture element that is nearest (in Manhattan distance)
    /// to the center of the pixel being textured.
    Nearest,
    /// Returns the weighted average of the four texture elements that are closest to the
    /// center of the pixel being textured.
    Linear,
}

/// Sets the wrap parameter for texture.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum TextureWrap {
    /// Samples at coord x + 1 map to coord x.
    Repeat,
    /// Samples at coord x + 1 map to coord 1 - x.
    Mirror,
    /// Samples at coord x + 1 map to coord 1.
    Clamp,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerParams {
    pub minification: TextureFilter,
    pub magnification: TextureFilter,
    /// Filter between mipmap levels, `None` samples the base level only.
    pub mipmap: Option<TextureFilter>,
    pub wrap_s: TextureWrap,
    pub wrap_t: TextureWrap,
    pub wrap_r: TextureWrap,
}

impl Default for SamplerParams {
    fn default() -> Self {
        SamplerParams {
            minification: TextureFilter::Linear,
            magnification: TextureFilter::Linear,
            mipmap: None,
            wrap_s: TextureWrap::Clamp,
            wrap_t: TextureWrap::Clamp,
            wrap_r: TextureWrap::Clamp,
        }
    }
}

#[derive(Debug)]
pub struct Sampler {
    id: ResourceId,
    params: SamplerParams,
}

impl Sampler {
    pub fn new(params: SamplerParams) -> Self {
        Sampler {
            id: ResourceId::next(),
            params,
        }
    }

    #[inline]
    pub fn params(&self) -> &SamplerParams {
        &self.params
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Sampler::new(SamplerParams::default())
    }
}

impl Resource for Sampler {
    type Binding = TextureUnit;
    const KIND: ResourceKind = ResourceKind::Sampler;

    fn id(&self) -> ResourceId {
        self.id
    }
}
