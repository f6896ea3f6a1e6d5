//! Shader programs and the uniform descriptors that feed them.

use std::cell::Cell;
use std::fmt;

use crate::errors::*;
use crate::math::{Color, Matrix3, Matrix4, Vector2, Vector3, Vector4};
use crate::resource::{Resource, ResourceId, ResourceKind};
use crate::visual::{Camera, Visual};

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum ShaderStage {
    Vertex,
    Geometry,
    Fragment,
}

/// The sources of a program. The backend compiles and links them when the shader is bound.
#[derive(Debug)]
pub struct Shader {
    id: ResourceId,
    vs: String,
    gs: Option<String>,
    fs: String,
}

impl Shader {
    pub fn new<T1, T2>(vs: T1, fs: T2) -> Result<Self>
    where
        T1: Into<String>,
        T2: Into<String>,
    {
        let vs = vs.into();
        let fs = fs.into();

        if vs.trim().is_empty() {
            return Err(Error::InvalidState("vertex shader source is empty".into()));
        }

        if fs.trim().is_empty() {
            return Err(Error::InvalidState("fragment shader source is empty".into()));
        }

        Ok(Shader {
            id: ResourceId::next(),
            vs,
            gs: None,
            fs,
        })
    }

    pub fn with_geometry<T: Into<String>>(mut self, gs: T) -> Self {
        self.gs = Some(gs.into());
        self
    }

    pub fn source(&self, stage: ShaderStage) -> Option<&str> {
        match stage {
            ShaderStage::Vertex => Some(&self.vs),
            ShaderStage::Geometry => self.gs.as_ref().map(|v| v.as_str()),
            ShaderStage::Fragment => Some(&self.fs),
        }
    }

    /// Iterates the stages present in this program, in pipeline order.
    pub fn stages(&self) -> impl Iterator<Item = (ShaderStage, &str)> {
        let stages = [ShaderStage::Vertex, ShaderStage::Geometry, ShaderStage::Fragment];
        stages
            .iter()
            .filter_map(move |&v| self.source(v).map(|s| (v, s)))
            .collect::<Vec<_>>()
            .into_iter()
    }
}

impl Resource for Shader {
    type Binding = ();
    const KIND: ResourceKind = ResourceKind::Shader;

    fn id(&self) -> ResourceId {
        self.id
    }
}

/// The backend location of an uniform inside a linked program.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct UniformLocation(pub i32);

/// Uniform variable for program object. Matrices are supplied in column major order.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    I32(i32),
    U32(u32),
    F32(f32),
    Vector2f([f32; 2]),
    Vector3f([f32; 3]),
    Vector4f([f32; 4]),
    Matrix3f([[f32; 3]; 3]),
    Matrix4f([[f32; 4]; 4]),
}

macro_rules! impl_uniform_value {
    ($ty: ty, $variant: ident) => {
        impl From<$ty> for UniformValue {
            fn from(v: $ty) -> Self {
                UniformValue::$variant(v.into())
            }
        }
    };
}

impl_uniform_value!(i32, I32);
impl_uniform_value!(u32, U32);
impl_uniform_value!(f32, F32);
impl_uniform_value!([f32; 2], Vector2f);
impl_uniform_value!([f32; 3], Vector3f);
impl_uniform_value!([f32; 4], Vector4f);
impl_uniform_value!([[f32; 3]; 3], Matrix3f);
impl_uniform_value!([[f32; 4]; 4], Matrix4f);
impl_uniform_value!(Vector2<f32>, Vector2f);
impl_uniform_value!(Vector3<f32>, Vector3f);
impl_uniform_value!(Vector4<f32>, Vector4f);
impl_uniform_value!(Matrix3<f32>, Matrix3f);
impl_uniform_value!(Matrix4<f32>, Matrix4f);

impl From<Color<f32>> for UniformValue {
    fn from(v: Color<f32>) -> Self {
        UniformValue::Vector4f(v.rgba())
    }
}

pub type UniformFn = Box<dyn Fn(Option<&dyn Camera>, &Visual) -> UniformValue>;

/// Where the value of an uniform comes from.
pub enum UniformSource {
    /// A value set by the user, never recomputed.
    Constant(Cell<UniformValue>),
    /// A value recomputed on every use from the camera and the visual being drawn.
    Computed(UniformFn),
}

/// A named uniform of a pass. The location is resolved against the bound shader on
/// first use and cached afterwards.
pub struct Uniform {
    name: String,
    location: Cell<Option<UniformLocation>>,
    source: UniformSource,
}

impl Uniform {
    pub fn constant<T1, T2>(name: T1, value: T2) -> Self
    where
        T1: Into<String>,
        T2: Into<UniformValue>,
    {
        Uniform {
            name: name.into(),
            location: Cell::new(None),
            source: UniformSource::Constant(Cell::new(value.into())),
        }
    }

    pub fn computed<T, F>(name: T, func: F) -> Self
    where
        T: Into<String>,
        F: Fn(Option<&dyn Camera>, &Visual) -> UniformValue + 'static,
    {
        Uniform {
            name: name.into(),
            location: Cell::new(None),
            source: UniformSource::Computed(Box::new(func)),
        }
    }

    /// The world transform of the visual, projected by the camera if any.
    pub fn model_view_projection<T: Into<String>>(name: T) -> Self {
        Uniform::computed(name, |camera, visual| {
            let mvp = match camera {
                Some(camera) => {
                    camera.projection_matrix() * camera.view_matrix() * visual.transform()
                }
                None => visual.transform(),
            };

            mvp.into()
        })
    }

    /// The world transform of the visual.
    pub fn model<T: Into<String>>(name: T) -> Self {
        Uniform::computed(name, |_, visual| visual.transform().into())
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn location(&self) -> Option<UniformLocation> {
        self.location.get()
    }

    #[inline]
    pub(crate) fn set_location(&self, location: UniformLocation) {
        self.location.set(Some(location));
    }

    #[inline]
    pub fn is_computed(&self) -> bool {
        match self.source {
            UniformSource::Computed(_) => true,
            UniformSource::Constant(_) => false,
        }
    }

    /// Updates a constant uniform.
    pub fn set_value<T: Into<UniformValue>>(&self, value: T) -> Result<()> {
        match self.source {
            UniformSource::Constant(ref v) => {
                v.set(value.into());
                Ok(())
            }
            UniformSource::Computed(_) => Err(Error::InvalidState(format!(
                "uniform {} is computed and can not be set",
                self.name
            ))),
        }
    }

    /// The value to push for `visual`, recomputed when the source is computed.
    pub fn value(&self, camera: Option<&dyn Camera>, visual: &Visual) -> UniformValue {
        match self.source {
            UniformSource::Constant(ref v) => v.get(),
            UniformSource::Computed(ref func) => func(camera, visual),
        }
    }
}

impl fmt::Debug for Uniform {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Uniform")
            .field("name", &self.name)
            .field("location", &self.location.get())
            .field("computed", &self.is_computed())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn stages() {
        let shader = Shader::new("void main() {}", "void main() {}")
            .unwrap()
            .with_geometry("void main() {}");

        let stages: Vec<_> = shader.stages().map(|(v, _)| v).collect();
        assert_eq!(
            stages,
            vec![ShaderStage::Vertex, ShaderStage::Geometry, ShaderStage::Fragment]
        );

        assert!(Shader::new("", "void main() {}").is_err());
    }

    #[test]
    fn constant() {
        let uniform = Uniform::constant("u_Alpha", 0.5f32);
        assert!(!uniform.is_computed());
        assert!(uniform.location().is_none());

        uniform.set_value(1.0f32).unwrap();
        uniform.set_location(UniformLocation(3));
        assert_eq!(uniform.location(), Some(UniformLocation(3)));

        let mvp = Uniform::model_view_projection("u_MVP");
        assert!(mvp.is_computed());
        assert!(mvp.set_value(1.0f32).is_err());
    }

    #[test]
    fn conversions() {
        let m = Matrix4::from_scale(2.0f32);
        match UniformValue::from(m) {
            UniformValue::Matrix4f(v) => assert_eq!(v[0][0], 2.0),
            _ => unreachable!(),
        }

        assert_eq!(
            UniformValue::from(Vector3::new(1.0f32, 2.0, 3.0)),
            UniformValue::Vector3f([1.0, 2.0, 3.0])
        );
    }
}
