//! A device without graphics context. It keeps buffer storage in host memory and records
//! every call it receives, which makes it suitable for tests and tools.

use std::collections::HashMap;

use super::*;
use crate::resource::{ResourceId, ResourceKind, TextureUnit};

/// A call received by the `HeadlessDevice`.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Create {
        kind: ResourceKind,
        id: ResourceId,
        serial: u64,
    },
    Enable {
        kind: ResourceKind,
        id: ResourceId,
        serial: u64,
        /// Vertex binding index or texture unit.
        slot: Option<u32>,
    },
    Disable {
        kind: ResourceKind,
        id: ResourceId,
        serial: u64,
        slot: Option<u32>,
    },
    Destroy {
        kind: ResourceKind,
        id: ResourceId,
        serial: u64,
    },
    Map {
        id: ResourceId,
        params: MapParams,
    },
    Flush {
        id: ResourceId,
        offset: usize,
        size: usize,
    },
    Unmap {
        id: ResourceId,
    },
    State(StateChange),
    Uniform(UniformLocation, UniformValue),
    Draw(DrawCall),
    Clear {
        color: Option<Color<f32>>,
        depth: Option<f32>,
        stencil: Option<i32>,
    },
    Viewport(Viewport, DepthRange),
    Swap,
}

impl Command {
    pub fn kind(&self) -> Option<ResourceKind> {
        match *self {
            Command::Create { kind, .. }
            | Command::Enable { kind, .. }
            | Command::Disable { kind, .. }
            | Command::Destroy { kind, .. } => Some(kind),
            _ => None,
        }
    }

    pub fn is_draw(&self) -> bool {
        match *self {
            Command::Draw(_) => true,
            _ => false,
        }
    }
}

/// The backend representation of every kind of resource of `HeadlessDevice`.
#[derive(Debug)]
pub struct HeadlessObject {
    kind: ResourceKind,
    id: ResourceId,
    serial: u64,
    memory: Vec<u8>,
    mapped: Option<MapParams>,
    uniforms: Vec<String>,
}

impl HeadlessObject {
    /// The creation order of this object, unique during the lifetime of its device.
    #[inline]
    pub fn serial(&self) -> u64 {
        self.serial
    }

    #[inline]
    pub fn memory(&self) -> &[u8] {
        &self.memory
    }
}

pub struct HeadlessDevice {
    capabilities: Capabilities,
    commands: Vec<Command>,
    serials: u64,
    alive: HashMap<u64, ResourceId>,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        HeadlessDevice::with_capabilities(Capabilities::default())
    }

    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        HeadlessDevice {
            capabilities,
            commands: Vec::new(),
            serials: 0,
            alive: HashMap::new(),
        }
    }

    /// Every command received since the last `take_commands`.
    #[inline]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<Command> {
        ::std::mem::replace(&mut self.commands, Vec::new())
    }

    /// Number of objects created but not destroyed yet.
    #[inline]
    pub fn alive(&self) -> usize {
        self.alive.len()
    }

    fn create_object(&mut self, kind: ResourceKind, id: ResourceId, memory: usize) -> HeadlessObject {
        self.serials += 1;
        let serial = self.serials;

        self.alive.insert(serial, id);
        self.commands.push(Command::Create { kind, id, serial });

        HeadlessObject {
            kind,
            id,
            serial,
            memory: vec![0; memory],
            mapped: None,
            uniforms: Vec::new(),
        }
    }

    fn enable_object(&mut self, object: &HeadlessObject, slot: Option<u32>) {
        self.commands.push(Command::Enable {
            kind: object.kind,
            id: object.id,
            serial: object.serial,
            slot,
        });
    }

    fn disable_object(&mut self, object: &HeadlessObject, slot: Option<u32>) {
        self.commands.push(Command::Disable {
            kind: object.kind,
            id: object.id,
            serial: object.serial,
            slot,
        });
    }

    fn destroy_object(&mut self, object: HeadlessObject) -> Result<()> {
        if self.alive.remove(&object.serial).is_none() {
            return Err(Error::Backend(format!(
                "object {} of {} is destroyed twice",
                object.serial, object.id
            )));
        }

        self.commands.push(Command::Destroy {
            kind: object.kind,
            id: object.id,
            serial: object.serial,
        });

        Ok(())
    }

    fn map_object<'a>(
        &mut self,
        object: &'a mut HeadlessObject,
        params: MapParams,
    ) -> Result<&'a mut [u8]> {
        Error::check_range(params.offset, params.size, object.memory.len())?;

        self.commands.push(Command::Map {
            id: object.id,
            params,
        });

        object.mapped = Some(params);
        Ok(&mut object.memory[params.offset..params.offset + params.size])
    }

    fn flush_object(&mut self, object: &mut HeadlessObject, offset: usize, size: usize) -> Result<()> {
        let params = object
            .mapped
            .ok_or_else(|| Error::NotMapped(object.kind, object.id))?;

        Error::check_range(offset, size, params.size)?;
        self.commands.push(Command::Flush {
            id: object.id,
            offset,
            size,
        });

        Ok(())
    }

    fn unmap_object(&mut self, object: &mut HeadlessObject) -> Result<()> {
        if object.mapped.take().is_none() {
            return Err(Error::NotMapped(object.kind, object.id));
        }

        self.commands.push(Command::Unmap { id: object.id });
        Ok(())
    }
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        HeadlessDevice::new()
    }
}

/// Collects the names of `uniform` declarations, e.g. `uniform mat4 u_MVP;`.
fn parse_uniforms(source: &str, names: &mut Vec<String>) {
    for statement in source.split(';') {
        let mut tokens = statement.split_whitespace();
        while let Some(token) = tokens.next() {
            if token != "uniform" {
                continue;
            }

            let rest: Vec<_> = tokens.by_ref().collect();
            if let Some(&name) = rest.last() {
                let name = name.split('[').next().unwrap_or(name);
                if !name.is_empty() && !names.iter().any(|v| v == name) {
                    names.push(name.to_owned());
                }
            }
        }
    }
}

impl Adapter<VertexFormat> for HeadlessDevice {
    type Object = HeadlessObject;

    fn create(&mut self, format: &VertexFormat) -> Result<HeadlessObject> {
        if format.attributes().len() > self.capabilities.max_vertex_attributes {
            return Err(Error::InvalidSize(format!(
                "{} vertex attributes exceed the device limit",
                format.attributes().len()
            )));
        }

        Ok(self.create_object(ResourceKind::VertexFormat, format.id(), 0))
    }

    fn enable(&mut self, object: &mut HeadlessObject, _: &VertexFormat, _: ()) -> Result<()> {
        self.enable_object(object, None);
        Ok(())
    }

    fn disable(&mut self, object: &mut HeadlessObject, _: ()) -> Result<()> {
        self.disable_object(object, None);
        Ok(())
    }

    fn destroy(&mut self, object: HeadlessObject) -> Result<()> {
        self.destroy_object(object)
    }
}

impl Adapter<VertexBuffer> for HeadlessDevice {
    type Object = HeadlessObject;

    fn create(&mut self, buffer: &VertexBuffer) -> Result<HeadlessObject> {
        Ok(self.create_object(ResourceKind::VertexBuffer, buffer.id(), buffer.capacity_bytes()))
    }

    fn enable(
        &mut self,
        object: &mut HeadlessObject,
        _: &VertexBuffer,
        binding: VertexBinding,
    ) -> Result<()> {
        self.enable_object(object, Some(binding.index));
        Ok(())
    }

    fn disable(&mut self, object: &mut HeadlessObject, binding: VertexBinding) -> Result<()> {
        self.disable_object(object, Some(binding.index));
        Ok(())
    }

    fn destroy(&mut self, object: HeadlessObject) -> Result<()> {
        self.destroy_object(object)
    }
}

impl Adapter<IndexBuffer> for HeadlessDevice {
    type Object = HeadlessObject;

    fn create(&mut self, buffer: &IndexBuffer) -> Result<HeadlessObject> {
        Ok(self.create_object(ResourceKind::IndexBuffer, buffer.id(), buffer.capacity_bytes()))
    }

    fn enable(&mut self, object: &mut HeadlessObject, _: &IndexBuffer, _: ()) -> Result<()> {
        self.enable_object(object, None);
        Ok(())
    }

    fn disable(&mut self, object: &mut HeadlessObject, _: ()) -> Result<()> {
        self.disable_object(object, None);
        Ok(())
    }

    fn destroy(&mut self, object: HeadlessObject) -> Result<()> {
        self.destroy_object(object)
    }
}

impl Adapter<ShaderBuffer> for HeadlessDevice {
    type Object = HeadlessObject;

    fn create(&mut self, buffer: &ShaderBuffer) -> Result<HeadlessObject> {
        if !self.capabilities.shader_buffers {
            return Err(Error::UnsupportedKind(ResourceKind::ShaderBuffer));
        }

        Ok(self.create_object(ResourceKind::ShaderBuffer, buffer.id(), buffer.capacity_bytes()))
    }

    fn enable(&mut self, object: &mut HeadlessObject, buffer: &ShaderBuffer, _: ()) -> Result<()> {
        self.enable_object(object, Some(buffer.binding_point()));
        Ok(())
    }

    fn disable(&mut self, object: &mut HeadlessObject, _: ()) -> Result<()> {
        self.disable_object(object, None);
        Ok(())
    }

    fn destroy(&mut self, object: HeadlessObject) -> Result<()> {
        self.destroy_object(object)
    }
}

macro_rules! impl_headless_texture {
    ($name: ident, $kind: ident) => {
        impl Adapter<$name> for HeadlessDevice {
            type Object = HeadlessObject;

            fn create(&mut self, texture: &$name) -> Result<HeadlessObject> {
                Ok(self.create_object(ResourceKind::$kind, texture.id(), texture.size_bytes()))
            }

            fn enable(
                &mut self,
                object: &mut HeadlessObject,
                _: &$name,
                unit: TextureUnit,
            ) -> Result<()> {
                if unit.index() >= self.capabilities.max_texture_units {
                    return Err(Error::InvalidState(format!("{:?} is out of range", unit)));
                }

                self.enable_object(object, Some(unit.0));
                Ok(())
            }

            fn disable(&mut self, object: &mut HeadlessObject, unit: TextureUnit) -> Result<()> {
                self.disable_object(object, Some(unit.0));
                Ok(())
            }

            fn destroy(&mut self, object: HeadlessObject) -> Result<()> {
                self.destroy_object(object)
            }
        }
    };
}

impl_headless_texture!(Texture1D, Texture1D);
impl_headless_texture!(Texture2D, Texture2D);
impl_headless_texture!(Texture2DArray, Texture2DArray);
impl_headless_texture!(Texture3D, Texture3D);

macro_rules! impl_headless_map {
    ($($name: ident),+) => {
        $(
            impl MapAdapter<$name> for HeadlessDevice {
                fn map<'a>(
                    &'a mut self,
                    object: &'a mut HeadlessObject,
                    params: MapParams,
                ) -> Result<&'a mut [u8]> {
                    self.map_object(object, params)
                }

                fn flush(&mut self, object: &mut HeadlessObject, offset: usize, size: usize) -> Result<()> {
                    self.flush_object(object, offset, size)
                }

                fn unmap(&mut self, object: &mut HeadlessObject) -> Result<()> {
                    self.unmap_object(object)
                }
            }
        )+
    };
}

impl_headless_map!(
    VertexBuffer,
    IndexBuffer,
    ShaderBuffer,
    Texture1D,
    Texture2D,
    Texture2DArray,
    Texture3D
);

impl Adapter<Sampler> for HeadlessDevice {
    type Object = HeadlessObject;

    fn create(&mut self, sampler: &Sampler) -> Result<HeadlessObject> {
        Ok(self.create_object(ResourceKind::Sampler, sampler.id(), 0))
    }

    fn enable(&mut self, object: &mut HeadlessObject, _: &Sampler, unit: TextureUnit) -> Result<()> {
        self.enable_object(object, Some(unit.0));
        Ok(())
    }

    fn disable(&mut self, object: &mut HeadlessObject, unit: TextureUnit) -> Result<()> {
        self.disable_object(object, Some(unit.0));
        Ok(())
    }

    fn destroy(&mut self, object: HeadlessObject) -> Result<()> {
        self.destroy_object(object)
    }
}

impl Adapter<Shader> for HeadlessDevice {
    type Object = HeadlessObject;

    fn create(&mut self, shader: &Shader) -> Result<HeadlessObject> {
        let mut object = self.create_object(ResourceKind::Shader, shader.id(), 0);
        for (_, source) in shader.stages() {
            parse_uniforms(source, &mut object.uniforms);
        }

        Ok(object)
    }

    fn enable(&mut self, object: &mut HeadlessObject, _: &Shader, _: ()) -> Result<()> {
        self.enable_object(object, None);
        Ok(())
    }

    fn disable(&mut self, object: &mut HeadlessObject, _: ()) -> Result<()> {
        self.disable_object(object, None);
        Ok(())
    }

    fn destroy(&mut self, object: HeadlessObject) -> Result<()> {
        self.destroy_object(object)
    }
}

impl Device for HeadlessDevice {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn apply_state(&mut self, change: StateChange) -> Result<()> {
        self.commands.push(Command::State(change));
        Ok(())
    }

    fn uniform_location(&mut self, shader: &HeadlessObject, name: &str) -> Option<UniformLocation> {
        shader
            .uniforms
            .iter()
            .position(|v| v == name)
            .map(|v| UniformLocation(v as i32))
    }

    fn update_uniform(&mut self, location: UniformLocation, value: &UniformValue) -> Result<()> {
        self.commands.push(Command::Uniform(location, *value));
        Ok(())
    }

    fn draw(&mut self, call: &DrawCall) -> Result<()> {
        self.commands.push(Command::Draw(*call));
        Ok(())
    }

    fn clear(
        &mut self,
        color: Option<Color<f32>>,
        depth: Option<f32>,
        stencil: Option<i32>,
    ) -> Result<()> {
        self.commands.push(Command::Clear {
            color,
            depth,
            stencil,
        });

        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport, depth: DepthRange) -> Result<()> {
        self.commands.push(Command::Viewport(viewport, depth));
        Ok(())
    }

    fn swap_frame_buffer(&mut self) -> Result<()> {
        self.commands.push(Command::Swap);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn uniforms() {
        let mut names = Vec::new();
        parse_uniforms(
            "#version 430\nuniform mat4 u_MVP;\nlayout(location = 0) uniform vec4 u_Color;\n\
             uniform sampler2D u_Textures[4]; in vec3 a_Position; uniform mat4 u_MVP;",
            &mut names,
        );

        assert_eq!(names, vec!["u_MVP", "u_Color", "u_Textures"]);
    }

    #[test]
    fn lifecycle() {
        let mut device = HeadlessDevice::new();
        let vb = VertexBuffer::new(4, 4, BufferUsage::Static, StorageMode::Host).unwrap();

        let mut object = Adapter::<VertexBuffer>::create(&mut device, &vb).unwrap();
        assert_eq!(object.memory().len(), 16);
        assert_eq!(device.alive(), 1);

        let params = MapParams {
            access: AccessMode::Write,
            flush: FlushMode::Explicit,
            sync: SyncMode::Synchronized,
            offset: 4,
            size: 8,
        };

        MapAdapter::<VertexBuffer>::map(&mut device, &mut object, params)
            .unwrap()
            .copy_from_slice(&[1; 8]);
        MapAdapter::<VertexBuffer>::flush(&mut device, &mut object, 0, 8).unwrap();
        assert!(MapAdapter::<VertexBuffer>::flush(&mut device, &mut object, 4, 8).is_err());
        MapAdapter::<VertexBuffer>::unmap(&mut device, &mut object).unwrap();
        assert!(MapAdapter::<VertexBuffer>::unmap(&mut device, &mut object).is_err());
        assert_eq!(&object.memory()[4..12], &[1; 8]);

        Adapter::<VertexBuffer>::destroy(&mut device, object).unwrap();
        assert_eq!(device.alive(), 0);
        assert_eq!(device.commands().len(), 5);
    }
}
