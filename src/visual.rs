//! Drawables and the multi-pass effects they are shaded with. These are built by the
//! content layer and only read by the renderer.

use std::rc::Rc;

use smallvec::SmallVec;

use crate::buffer::{IndexBuffer, ShaderBuffer};
use crate::errors::*;
use crate::math::{Matrix4, SquareMatrix};
use crate::resource::TextureUnit;
use crate::sampler::Sampler;
use crate::shader::{Shader, Uniform};
use crate::state::*;
use crate::texture::TextureHandle;
use crate::vertex::{VertexFormat, VertexGroup};

/// Primitive topology.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum PrimitiveType {
    Points,
    Lines,
    LineStrip,
    Triangles,
    TriangleStrip,
}

/// Supplies the view and projection transforms of a draw.
pub trait Camera {
    fn view_matrix(&self) -> Matrix4<f32>;
    fn projection_matrix(&self) -> Matrix4<f32>;
}

/// A camera with fixed matrices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedCamera {
    pub view: Matrix4<f32>,
    pub projection: Matrix4<f32>,
}

impl Camera for FixedCamera {
    fn view_matrix(&self) -> Matrix4<f32> {
        self.view
    }

    fn projection_matrix(&self) -> Matrix4<f32> {
        self.projection
    }
}

/// Per-pass overrides of the render states, `None` inherits the renderer default.
#[derive(Debug, Clone, Default)]
pub struct PassStates {
    pub blend: Option<Rc<BlendState>>,
    pub cull: Option<Rc<CullState>>,
    pub depth_test: Option<Rc<DepthTestState>>,
    pub offset: Option<Rc<OffsetState>>,
    pub stencil: Option<Rc<StencilTestState>>,
    pub wireframe: Option<Rc<WireframeState>>,
}

/// One ordered step of an effect.
#[derive(Debug)]
pub struct Pass {
    shader: Rc<Shader>,
    shader_buffer: Option<Rc<ShaderBuffer>>,
    textures: SmallVec<[(TextureUnit, TextureHandle); 4]>,
    samplers: SmallVec<[(TextureUnit, Rc<Sampler>); 4]>,
    uniforms: Vec<Uniform>,
    states: PassStates,
    instances: usize,
}

impl Pass {
    pub fn new(shader: Rc<Shader>) -> Self {
        Pass {
            shader,
            shader_buffer: None,
            textures: SmallVec::new(),
            samplers: SmallVec::new(),
            uniforms: Vec::new(),
            states: PassStates::default(),
            instances: 1,
        }
    }

    #[inline]
    pub fn shader(&self) -> &Rc<Shader> {
        &self.shader
    }

    /// Sets the texture of `unit`, replacing the previous one.
    pub fn set_texture<T: Into<TextureHandle>>(&mut self, unit: TextureUnit, texture: T) {
        let texture = texture.into();
        match self.textures.iter_mut().find(|v| v.0 == unit) {
            Some(v) => v.1 = texture,
            None => self.textures.push((unit, texture)),
        }

        self.textures.sort_by_key(|v| v.0);
    }

    pub fn set_sampler(&mut self, unit: TextureUnit, sampler: Rc<Sampler>) {
        match self.samplers.iter_mut().find(|v| v.0 == unit) {
            Some(v) => v.1 = sampler,
            None => self.samplers.push((unit, sampler)),
        }

        self.samplers.sort_by_key(|v| v.0);
    }

    #[inline]
    pub fn textures(&self) -> &[(TextureUnit, TextureHandle)] {
        &self.textures
    }

    #[inline]
    pub fn samplers(&self) -> &[(TextureUnit, Rc<Sampler>)] {
        &self.samplers
    }

    pub fn set_shader_buffer(&mut self, buffer: Option<Rc<ShaderBuffer>>) {
        self.shader_buffer = buffer;
    }

    #[inline]
    pub fn shader_buffer(&self) -> Option<&Rc<ShaderBuffer>> {
        self.shader_buffer.as_ref()
    }

    pub fn add_uniform(&mut self, uniform: Uniform) {
        self.uniforms.push(uniform);
    }

    #[inline]
    pub fn uniforms(&self) -> &[Uniform] {
        &self.uniforms
    }

    pub fn uniform(&self, name: &str) -> Option<&Uniform> {
        self.uniforms.iter().find(|v| v.name() == name)
    }

    #[inline]
    pub fn states(&self) -> &PassStates {
        &self.states
    }

    #[inline]
    pub fn states_mut(&mut self) -> &mut PassStates {
        &mut self.states
    }

    /// Sets the number of instances drawn by this pass.
    pub fn set_instances(&mut self, instances: usize) -> Result<()> {
        if instances < 1 {
            return Err(Error::InvalidSize("a pass draws at least one instance".into()));
        }

        self.instances = instances;
        Ok(())
    }

    #[inline]
    pub fn instances(&self) -> usize {
        self.instances
    }
}

/// An ordered list of passes.
#[derive(Debug, Default)]
pub struct Effect {
    passes: Vec<Pass>,
}

impl Effect {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_pass(mut self, pass: Pass) -> Self {
        self.passes.push(pass);
        self
    }

    pub fn add_pass(&mut self, pass: Pass) {
        self.passes.push(pass);
    }

    #[inline]
    pub fn passes(&self) -> &[Pass] {
        &self.passes
    }
}

/// Geometry plus the effects it is drawn with.
#[derive(Debug, Clone)]
pub struct Visual {
    primitive: PrimitiveType,
    vertex_format: Option<Rc<VertexFormat>>,
    vertex_group: VertexGroup,
    index_buffer: Option<Rc<IndexBuffer>>,
    vertex_count: Option<usize>,
    transform: Matrix4<f32>,
    effects: Vec<Rc<Effect>>,
}

impl Visual {
    pub fn new(primitive: PrimitiveType) -> Self {
        Visual {
            primitive,
            vertex_format: None,
            vertex_group: VertexGroup::new(),
            index_buffer: None,
            vertex_count: None,
            transform: Matrix4::identity(),
            effects: Vec::new(),
        }
    }

    #[inline]
    pub fn primitive(&self) -> PrimitiveType {
        self.primitive
    }

    pub fn set_vertex_format(&mut self, format: Rc<VertexFormat>) {
        self.vertex_format = Some(format);
    }

    #[inline]
    pub fn vertex_format(&self) -> Option<&Rc<VertexFormat>> {
        self.vertex_format.as_ref()
    }

    #[inline]
    pub fn vertex_group(&self) -> &VertexGroup {
        &self.vertex_group
    }

    #[inline]
    pub fn vertex_group_mut(&mut self) -> &mut VertexGroup {
        &mut self.vertex_group
    }

    pub fn set_index_buffer(&mut self, buffer: Option<Rc<IndexBuffer>>) {
        self.index_buffer = buffer;
    }

    #[inline]
    pub fn index_buffer(&self) -> Option<&Rc<IndexBuffer>> {
        self.index_buffer.as_ref()
    }

    /// Overrides the number of vertices drawn by a non-indexed draw.
    pub fn set_vertex_count(&mut self, count: Option<usize>) {
        self.vertex_count = count;
    }

    /// The number of vertices drawn by a non-indexed draw.
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
            .unwrap_or_else(|| self.vertex_group.vertex_count())
    }

    pub fn set_transform(&mut self, transform: Matrix4<f32>) {
        self.transform = transform;
    }

    #[inline]
    pub fn transform(&self) -> Matrix4<f32> {
        self.transform
    }

    pub fn add_effect(&mut self, effect: Rc<Effect>) {
        self.effects.push(effect);
    }

    #[inline]
    pub fn effects(&self) -> &[Rc<Effect>] {
        &self.effects
    }

    /// Iterates the passes of every effect, in order.
    pub fn passes(&self) -> impl Iterator<Item = &Pass> {
        self.effects.iter().flat_map(|v| v.passes().iter())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::texture::{Texture2D, TextureParams};

    fn shader() -> Rc<Shader> {
        Rc::new(Shader::new("void main() {}", "void main() {}").unwrap())
    }

    #[test]
    fn pass_tables() {
        let mut pass = Pass::new(shader());

        let a = Rc::new(Texture2D::new(1, 1, TextureParams::default()).unwrap());
        let b = Rc::new(Texture2D::new(1, 1, TextureParams::default()).unwrap());
        pass.set_texture(TextureUnit(2), a.clone());
        pass.set_texture(TextureUnit(0), a.clone());
        pass.set_texture(TextureUnit(2), b.clone());

        let units: Vec<_> = pass.textures().iter().map(|v| v.0).collect();
        assert_eq!(units, vec![TextureUnit(0), TextureUnit(2)]);
        assert_eq!(pass.textures()[1].1.as_texture().id(), crate::resource::Resource::id(&*b));

        assert!(pass.set_instances(0).is_err());
        pass.set_instances(4).unwrap();
        assert_eq!(pass.instances(), 4);
    }

    #[test]
    fn passes_in_order() {
        let first = Effect::new().with_pass(Pass::new(shader())).with_pass(Pass::new(shader()));
        let second = Effect::new().with_pass(Pass::new(shader()));

        let mut visual = Visual::new(PrimitiveType::Triangles);
        visual.add_effect(Rc::new(first));
        visual.add_effect(Rc::new(second));

        assert_eq!(visual.passes().count(), 3);
        assert_eq!(visual.vertex_count(), 0);

        visual.set_vertex_count(Some(3));
        assert_eq!(visual.vertex_count(), 3);
    }
}
