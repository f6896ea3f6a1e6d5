use std::ffi::CString;
use std::os::raw::c_void;
use std::ptr;
use std::slice;

use gl::types::*;
use smallvec::SmallVec;

use super::capabilities::GLCapabilities;
use super::types;
use super::GLSurface;

use crate::backends::{Adapter, Capabilities, DepthRange, Device, DrawCall, MapAdapter, Viewport};
use crate::buffer::*;
use crate::errors::*;
use crate::math::Color;
use crate::resource::{Resource, TextureUnit};
use crate::sampler::Sampler;
use crate::shader::{Shader, ShaderStage, UniformLocation, UniformValue};
use crate::state::StateChange;
use crate::texture::*;
use crate::vertex::VertexFormat;

/// A vertex array object, recording the attribute layout of a `VertexFormat`.
#[derive(Debug)]
pub struct GLVertexArray {
    id: GLuint,
}

#[derive(Debug)]
pub struct GLBuffer {
    id: GLuint,
    capacity: usize,
    binding_point: GLuint,
    mapped: Option<MapParams>,
}

/// An immutable texture storage. Host writes are staged through a pixel buffer, which
/// is allocated on the first map and uploaded into the base level on unmap.
#[derive(Debug)]
pub struct GLTexture {
    id: GLuint,
    kind: TextureKind,
    target: GLenum,
    dimensions: [u32; 3],
    format: TextureFormat,
    levels: u32,
    size: usize,
    pixels: GLuint,
    mapped: Option<MapParams>,
}

#[derive(Debug)]
pub struct GLSampler {
    id: GLuint,
}

#[derive(Debug)]
pub struct GLProgram {
    id: GLuint,
}

/// A `Device` on top of an OpenGL 3.3+ (or ES 3.1+) context.
///
/// Every adapter call touches the context of the surface, which must stay current on
/// the thread that owns the device.
pub struct GLDevice {
    surface: Box<dyn GLSurface>,
    capabilities: GLCapabilities,
    active_unit: u32,
    units: SmallVec<[Option<(GLenum, GLuint)>; 8]>,
    vertex_array: GLuint,
    program: GLuint,
}

impl GLDevice {
    /// Loads the GL functions from `surface` and checks that the context supports
    /// everything the renderer relies on.
    ///
    /// # Safety
    ///
    /// The context of `surface` must be current on the calling thread.
    pub unsafe fn new<S: GLSurface + 'static>(surface: S) -> Result<Self> {
        gl::load_with(|symbol| surface.get_proc_address(symbol));

        let capabilities = GLCapabilities::parse()?;
        info!("GLDevice {:#?}", capabilities);
        capabilities.check()?;

        gl::PixelStorei(gl::UNPACK_ALIGNMENT, 1);
        check()?;

        Ok(GLDevice {
            surface: Box::new(surface),
            capabilities,
            active_unit: 0,
            units: SmallVec::new(),
            vertex_array: 0,
            program: 0,
        })
    }

    pub fn gl_capabilities(&self) -> &GLCapabilities {
        &self.capabilities
    }

    fn check_unit(&self, unit: TextureUnit) -> Result<()> {
        if unit.0 >= self.capabilities.max_combined_texture_image_units {
            return Err(Error::InvalidState(format!(
                "texture unit {} exceeds the {} units of context",
                unit.0, self.capabilities.max_combined_texture_image_units
            )));
        }

        Ok(())
    }

    unsafe fn active_texture(&mut self, unit: u32) {
        if self.active_unit != unit {
            gl::ActiveTexture(gl::TEXTURE0 + unit);
            self.active_unit = unit;
        }
    }

    unsafe fn bind_texture(&mut self, unit: u32, target: GLenum, id: GLuint) -> Result<()> {
        self.active_texture(unit);
        gl::BindTexture(target, id);

        let index = unit as usize;
        if self.units.len() <= index {
            self.units.resize(index + 1, None);
        }

        self.units[index] = if id == 0 { None } else { Some((target, id)) };
        check()
    }

    /// Binds `texture` on the active unit while `func` runs, then restores what the
    /// unit had for that target.
    unsafe fn with_texture<F>(&mut self, texture: &GLTexture, func: F) -> Result<()>
    where
        F: FnOnce() -> Result<()>,
    {
        gl::BindTexture(texture.target, texture.id);
        let result = func();

        let previous = match self.units.get(self.active_unit as usize) {
            Some(&Some((target, id))) if target == texture.target => id,
            _ => 0,
        };

        gl::BindTexture(texture.target, previous);
        result
    }

    unsafe fn create_texture(&mut self, image: &TextureImage, kind: TextureKind) -> Result<GLTexture> {
        let mut id = 0;
        gl::GenTextures(1, &mut id);
        if id == 0 {
            return Err(Error::Backend("[GL] Failed to generate texture.".into()));
        }

        let texture = GLTexture {
            id,
            kind,
            target: kind.into(),
            dimensions: image.dimensions(),
            format: image.format(),
            levels: image.mipmap_levels().max(1),
            size: image.size_bytes(),
            pixels: 0,
            mapped: None,
        };

        let (internal, _, _) = types::texture_format(texture.format);
        let [w, h, d] = texture.dimensions;
        let levels = texture.levels as GLsizei;

        let result = self.with_texture(&texture, || {
            match kind {
                TextureKind::D1 => gl::TexStorage1D(texture.target, levels, internal, w as GLsizei),
                TextureKind::D2 => gl::TexStorage2D(
                    texture.target,
                    levels,
                    internal,
                    w as GLsizei,
                    h as GLsizei,
                ),
                TextureKind::D2Array | TextureKind::D3 => gl::TexStorage3D(
                    texture.target,
                    levels,
                    internal,
                    w as GLsizei,
                    h as GLsizei,
                    d as GLsizei,
                ),
                TextureKind::Cube => return Err(Error::UnsupportedKind(kind.resource_kind())),
            }

            check()
        });

        if let Err(err) = result {
            gl::DeleteTextures(1, &texture.id);
            return Err(err);
        }

        Ok(texture)
    }

    /// Uploads the whole pixel buffer into the base level.
    unsafe fn upload_texture(&mut self, texture: &GLTexture) -> Result<()> {
        let (_, format, tp) = types::texture_format(texture.format);
        let [w, h, d] = texture.dimensions;

        gl::BindBuffer(gl::PIXEL_UNPACK_BUFFER, texture.pixels);
        let result = self.with_texture(texture, || {
            match texture.kind {
                TextureKind::D1 => {
                    gl::TexSubImage1D(texture.target, 0, 0, w as GLsizei, format, tp, ptr::null())
                }
                TextureKind::D2 => gl::TexSubImage2D(
                    texture.target,
                    0,
                    0,
                    0,
                    w as GLsizei,
                    h as GLsizei,
                    format,
                    tp,
                    ptr::null(),
                ),
                _ => gl::TexSubImage3D(
                    texture.target,
                    0,
                    0,
                    0,
                    0,
                    w as GLsizei,
                    h as GLsizei,
                    d as GLsizei,
                    format,
                    tp,
                    ptr::null(),
                ),
            }

            if texture.levels > 1 {
                gl::GenerateMipmap(texture.target);
            }

            check()
        });

        gl::BindBuffer(gl::PIXEL_UNPACK_BUFFER, 0);
        result
    }

    fn destroy_texture(&mut self, texture: GLTexture) -> Result<()> {
        unsafe {
            for unit in self.units.iter_mut() {
                if *unit == Some((texture.target, texture.id)) {
                    *unit = None;
                }
            }

            if texture.pixels != 0 {
                gl::DeleteBuffers(1, &texture.pixels);
            }

            gl::DeleteTextures(1, &texture.id);
            check()
        }
    }

    fn map_texture<'a>(
        &mut self,
        texture: &'a mut GLTexture,
        params: MapParams,
    ) -> Result<&'a mut [u8]> {
        Error::check_range(params.offset, params.size, texture.size)?;

        unsafe {
            if texture.pixels == 0 {
                texture.pixels = create_buffer(texture.size, BufferUsage::Stream)?;
            }

            let memory = map_range(texture.pixels, params)?;
            texture.mapped = Some(params);
            Ok(memory)
        }
    }

    fn unmap_texture(&mut self, texture: &mut GLTexture) -> Result<()> {
        let params = texture
            .mapped
            .take()
            .ok_or_else(|| Error::Backend(format!("[GL] Texture {} is not mapped.", texture.id)))?;

        unsafe {
            unmap_range(texture.pixels)?;
            if params.access.is_writable() {
                self.upload_texture(texture)?;
            }
        }

        Ok(())
    }
}

impl Drop for GLDevice {
    fn drop(&mut self) {
        unsafe {
            gl::UseProgram(0);
            gl::BindVertexArray(0);
        }
    }
}

/// Checks the error flag of the context.
unsafe fn check() -> Result<()> {
    let message = match gl::GetError() {
        gl::NO_ERROR => return Ok(()),
        gl::INVALID_ENUM => "[GL] An unacceptable value is specified for an enumerated argument.",
        gl::INVALID_VALUE => "[GL] A numeric argument is out of range.",
        gl::INVALID_OPERATION => "[GL] The specified operation is not allowed in the current state.",
        gl::INVALID_FRAMEBUFFER_OPERATION => {
            "[GL] The framebuffer object is not complete."
        }
        gl::OUT_OF_MEMORY => "[GL] There is not enough memory left to execute the command.",
        _ => "[GL] Oops, Unknown OpenGL error.",
    };

    Err(Error::Backend(message.into()))
}

// Buffers are created and mapped through the copy-write target, which nothing else in
// the renderer binds. That keeps the element buffer of the enabled vertex array intact.

unsafe fn create_buffer(capacity: usize, usage: BufferUsage) -> Result<GLuint> {
    let mut id = 0;
    gl::GenBuffers(1, &mut id);
    if id == 0 {
        return Err(Error::Backend("[GL] Failed to generate buffer.".into()));
    }

    gl::BindBuffer(gl::COPY_WRITE_BUFFER, id);
    gl::BufferData(
        gl::COPY_WRITE_BUFFER,
        capacity as GLsizeiptr,
        ptr::null(),
        usage.into(),
    );
    gl::BindBuffer(gl::COPY_WRITE_BUFFER, 0);

    if let Err(err) = check() {
        gl::DeleteBuffers(1, &id);
        return Err(err);
    }

    Ok(id)
}

unsafe fn map_range<'a>(id: GLuint, params: MapParams) -> Result<&'a mut [u8]> {
    gl::BindBuffer(gl::COPY_WRITE_BUFFER, id);
    let memory = gl::MapBufferRange(
        gl::COPY_WRITE_BUFFER,
        params.offset as GLintptr,
        params.size as GLsizeiptr,
        types::map_access(&params),
    );
    gl::BindBuffer(gl::COPY_WRITE_BUFFER, 0);
    check()?;

    if memory.is_null() {
        return Err(Error::Backend(format!("[GL] Failed to map buffer {}.", id)));
    }

    Ok(slice::from_raw_parts_mut(memory as *mut u8, params.size))
}

unsafe fn flush_range(id: GLuint, offset: usize, size: usize) -> Result<()> {
    gl::BindBuffer(gl::COPY_WRITE_BUFFER, id);
    gl::FlushMappedBufferRange(gl::COPY_WRITE_BUFFER, offset as GLintptr, size as GLsizeiptr);
    gl::BindBuffer(gl::COPY_WRITE_BUFFER, 0);
    check()
}

unsafe fn unmap_range(id: GLuint) -> Result<()> {
    gl::BindBuffer(gl::COPY_WRITE_BUFFER, id);
    let intact = gl::UnmapBuffer(gl::COPY_WRITE_BUFFER);
    gl::BindBuffer(gl::COPY_WRITE_BUFFER, 0);
    check()?;

    // The data store could be corrupted by a mode switch of the screen while mapped.
    if intact == gl::FALSE {
        return Err(Error::Backend(format!("[GL] Contents of buffer {} are lost.", id)));
    }

    Ok(())
}

fn info_log(len: GLint, read: impl FnOnce(GLint, *mut GLchar)) -> String {
    if len <= 0 {
        return String::new();
    }

    let mut buf = vec![0u8; len as usize];
    read(len, buf.as_mut_ptr() as *mut GLchar);
    String::from_utf8_lossy(&buf)
        .trim_end_matches('\0')
        .to_owned()
}

unsafe fn compile(stage: ShaderStage, source: &str) -> Result<GLuint> {
    let source = CString::new(source.as_bytes())
        .map_err(|_| Error::Backend(format!("[GL] {:?} shader contains NUL bytes.", stage)))?;

    let shader = gl::CreateShader(match stage {
        ShaderStage::Vertex => gl::VERTEX_SHADER,
        ShaderStage::Geometry => gl::GEOMETRY_SHADER,
        ShaderStage::Fragment => gl::FRAGMENT_SHADER,
    });

    gl::ShaderSource(shader, 1, &source.as_ptr(), ptr::null());
    gl::CompileShader(shader);

    let mut status = GLint::from(gl::FALSE);
    gl::GetShaderiv(shader, gl::COMPILE_STATUS, &mut status);

    if status != GLint::from(gl::TRUE) {
        let mut len = 0;
        gl::GetShaderiv(shader, gl::INFO_LOG_LENGTH, &mut len);
        let log = info_log(len, |len, buf| gl::GetShaderInfoLog(shader, len, ptr::null_mut(), buf));

        gl::DeleteShader(shader);
        return Err(Error::Backend(format!(
            "[GL] Failed to compile {:?} shader.\n{}",
            stage, log
        )));
    }

    Ok(shader)
}

unsafe fn link(shaders: &[GLuint]) -> Result<GLuint> {
    let program = gl::CreateProgram();
    for &shader in shaders {
        gl::AttachShader(program, shader);
    }

    gl::LinkProgram(program);

    for &shader in shaders {
        gl::DetachShader(program, shader);
    }

    let mut status = GLint::from(gl::FALSE);
    gl::GetProgramiv(program, gl::LINK_STATUS, &mut status);

    if status != GLint::from(gl::TRUE) {
        let mut len = 0;
        gl::GetProgramiv(program, gl::INFO_LOG_LENGTH, &mut len);
        let log = info_log(len, |len, buf| {
            gl::GetProgramInfoLog(program, len, ptr::null_mut(), buf)
        });

        gl::DeleteProgram(program);
        return Err(Error::Backend(format!("[GL] Failed to link program.\n{}", log)));
    }

    Ok(program)
}

unsafe fn toggle(capability: GLenum, enabled: bool) {
    if enabled {
        gl::Enable(capability);
    } else {
        gl::Disable(capability);
    }
}

fn boolean(v: bool) -> GLboolean {
    if v {
        gl::TRUE
    } else {
        gl::FALSE
    }
}

impl Adapter<VertexFormat> for GLDevice {
    type Object = GLVertexArray;

    fn create(&mut self, format: &VertexFormat) -> Result<GLVertexArray> {
        for v in format.attributes() {
            if v.location >= self.capabilities.max_vertex_attribs {
                return Err(Error::InvalidState(format!(
                    "attribute {} at location {} exceeds the {} attributes of context",
                    v.name, v.location, self.capabilities.max_vertex_attribs
                )));
            }
        }

        unsafe {
            let mut id = 0;
            gl::GenVertexArrays(1, &mut id);
            if id == 0 {
                return Err(Error::Backend("[GL] Failed to generate vertex array.".into()));
            }

            gl::BindVertexArray(id);
            for v in format.attributes() {
                let components = GLint::from(v.attribute_type.components());
                let scalar: GLenum = v.attribute_type.scalar().into();

                gl::EnableVertexAttribArray(v.location);
                if types::is_integer_attribute(v.attribute_type, v.normalized) {
                    gl::VertexAttribIFormat(v.location, components, scalar, v.offset as GLuint);
                } else {
                    gl::VertexAttribFormat(
                        v.location,
                        components,
                        scalar,
                        boolean(v.normalized),
                        v.offset as GLuint,
                    );
                }

                gl::VertexAttribBinding(v.location, v.binding);
            }

            gl::BindVertexArray(self.vertex_array);

            if let Err(err) = check() {
                gl::DeleteVertexArrays(1, &id);
                return Err(err);
            }

            Ok(GLVertexArray { id })
        }
    }

    fn enable(&mut self, object: &mut GLVertexArray, _: &VertexFormat, _: ()) -> Result<()> {
        unsafe {
            gl::BindVertexArray(object.id);
            self.vertex_array = object.id;
            check()
        }
    }

    fn disable(&mut self, _: &mut GLVertexArray, _: ()) -> Result<()> {
        unsafe {
            gl::BindVertexArray(0);
            self.vertex_array = 0;
            check()
        }
    }

    fn destroy(&mut self, object: GLVertexArray) -> Result<()> {
        unsafe {
            if self.vertex_array == object.id {
                gl::BindVertexArray(0);
                self.vertex_array = 0;
            }

            gl::DeleteVertexArrays(1, &object.id);
            check()
        }
    }
}

fn create_gl_buffer(buffer: &Buffer, binding_point: GLuint) -> Result<GLBuffer> {
    let id = unsafe { create_buffer(buffer.capacity_bytes(), buffer.usage())? };

    Ok(GLBuffer {
        id,
        capacity: buffer.capacity_bytes(),
        binding_point,
        mapped: None,
    })
}

fn destroy_gl_buffer(object: GLBuffer) -> Result<()> {
    unsafe {
        gl::DeleteBuffers(1, &object.id);
        check()
    }
}

impl Adapter<VertexBuffer> for GLDevice {
    type Object = GLBuffer;

    fn create(&mut self, buffer: &VertexBuffer) -> Result<GLBuffer> {
        create_gl_buffer(buffer, 0)
    }

    fn enable(&mut self, object: &mut GLBuffer, _: &VertexBuffer, binding: VertexBinding) -> Result<()> {
        unsafe {
            gl::BindVertexBuffer(
                binding.index,
                object.id,
                binding.offset as GLintptr,
                binding.stride as GLsizei,
            );

            check()
        }
    }

    fn disable(&mut self, _: &mut GLBuffer, binding: VertexBinding) -> Result<()> {
        unsafe {
            gl::BindVertexBuffer(binding.index, 0, 0, binding.stride as GLsizei);
            check()
        }
    }

    fn destroy(&mut self, object: GLBuffer) -> Result<()> {
        destroy_gl_buffer(object)
    }
}

impl Adapter<IndexBuffer> for GLDevice {
    type Object = GLBuffer;

    fn create(&mut self, buffer: &IndexBuffer) -> Result<GLBuffer> {
        create_gl_buffer(buffer, 0)
    }

    fn enable(&mut self, object: &mut GLBuffer, _: &IndexBuffer, _: ()) -> Result<()> {
        unsafe {
            gl::BindBuffer(gl::ELEMENT_ARRAY_BUFFER, object.id);
            check()
        }
    }

    fn disable(&mut self, _: &mut GLBuffer, _: ()) -> Result<()> {
        unsafe {
            gl::BindBuffer(gl::ELEMENT_ARRAY_BUFFER, 0);
            check()
        }
    }

    fn destroy(&mut self, object: GLBuffer) -> Result<()> {
        destroy_gl_buffer(object)
    }
}

impl Adapter<ShaderBuffer> for GLDevice {
    type Object = GLBuffer;

    fn create(&mut self, buffer: &ShaderBuffer) -> Result<GLBuffer> {
        if !self.capabilities.shader_buffers() {
            return Err(Error::UnsupportedKind(ShaderBuffer::KIND));
        }

        if buffer.binding_point() >= self.capabilities.max_shader_storage_buffer_bindings {
            return Err(Error::InvalidState(format!(
                "binding point {} exceeds the {} storage bindings of context",
                buffer.binding_point(),
                self.capabilities.max_shader_storage_buffer_bindings
            )));
        }

        create_gl_buffer(buffer, buffer.binding_point())
    }

    fn enable(&mut self, object: &mut GLBuffer, _: &ShaderBuffer, _: ()) -> Result<()> {
        unsafe {
            gl::BindBufferBase(gl::SHADER_STORAGE_BUFFER, object.binding_point, object.id);
            check()
        }
    }

    fn disable(&mut self, object: &mut GLBuffer, _: ()) -> Result<()> {
        unsafe {
            gl::BindBufferBase(gl::SHADER_STORAGE_BUFFER, object.binding_point, 0);
            check()
        }
    }

    fn destroy(&mut self, object: GLBuffer) -> Result<()> {
        destroy_gl_buffer(object)
    }
}

macro_rules! impl_gl_buffer_map {
    ($($name: ident),+) => {
        $(
            impl MapAdapter<$name> for GLDevice {
                fn map<'a>(
                    &'a mut self,
                    object: &'a mut GLBuffer,
                    params: MapParams,
                ) -> Result<&'a mut [u8]> {
                    Error::check_range(params.offset, params.size, object.capacity)?;

                    let memory = unsafe { map_range(object.id, params)? };
                    object.mapped = Some(params);
                    Ok(memory)
                }

                fn flush(&mut self, object: &mut GLBuffer, offset: usize, size: usize) -> Result<()> {
                    let params = object.mapped.ok_or_else(|| {
                        Error::Backend(format!("[GL] Buffer {} is not mapped.", object.id))
                    })?;

                    Error::check_range(offset, size, params.size)?;
                    unsafe { flush_range(object.id, offset, size) }
                }

                fn unmap(&mut self, object: &mut GLBuffer) -> Result<()> {
                    object.mapped = None;
                    unsafe { unmap_range(object.id) }
                }
            }
        )+
    };
}

impl_gl_buffer_map!(VertexBuffer, IndexBuffer, ShaderBuffer);

macro_rules! impl_gl_texture {
    ($name: ident, $kind: ident) => {
        impl Adapter<$name> for GLDevice {
            type Object = GLTexture;

            fn create(&mut self, texture: &$name) -> Result<GLTexture> {
                unsafe { self.create_texture(texture, TextureKind::$kind) }
            }

            fn enable(&mut self, object: &mut GLTexture, _: &$name, unit: TextureUnit) -> Result<()> {
                self.check_unit(unit)?;
                unsafe { self.bind_texture(unit.0, object.target, object.id) }
            }

            fn disable(&mut self, object: &mut GLTexture, unit: TextureUnit) -> Result<()> {
                self.check_unit(unit)?;
                unsafe { self.bind_texture(unit.0, object.target, 0) }
            }

            fn destroy(&mut self, object: GLTexture) -> Result<()> {
                self.destroy_texture(object)
            }
        }

        impl MapAdapter<$name> for GLDevice {
            fn map<'a>(
                &'a mut self,
                object: &'a mut GLTexture,
                params: MapParams,
            ) -> Result<&'a mut [u8]> {
                self.map_texture(object, params)
            }

            fn flush(&mut self, object: &mut GLTexture, offset: usize, size: usize) -> Result<()> {
                let params = object.mapped.ok_or_else(|| {
                    Error::Backend(format!("[GL] Texture {} is not mapped.", object.id))
                })?;

                Error::check_range(offset, size, params.size)?;
                unsafe { flush_range(object.pixels, offset, size) }
            }

            fn unmap(&mut self, object: &mut GLTexture) -> Result<()> {
                self.unmap_texture(object)
            }
        }
    };
}

impl_gl_texture!(Texture1D, D1);
impl_gl_texture!(Texture2D, D2);
impl_gl_texture!(Texture2DArray, D2Array);
impl_gl_texture!(Texture3D, D3);

impl Adapter<Sampler> for GLDevice {
    type Object = GLSampler;

    fn create(&mut self, sampler: &Sampler) -> Result<GLSampler> {
        let params = sampler.params();
        let (min, mag) = types::sampler_filters(params);

        unsafe {
            let mut id = 0;
            gl::GenSamplers(1, &mut id);
            if id == 0 {
                return Err(Error::Backend("[GL] Failed to generate sampler.".into()));
            }

            gl::SamplerParameteri(id, gl::TEXTURE_MIN_FILTER, min as GLint);
            gl::SamplerParameteri(id, gl::TEXTURE_MAG_FILTER, mag as GLint);
            gl::SamplerParameteri(id, gl::TEXTURE_WRAP_S, GLenum::from(params.wrap_s) as GLint);
            gl::SamplerParameteri(id, gl::TEXTURE_WRAP_T, GLenum::from(params.wrap_t) as GLint);
            gl::SamplerParameteri(id, gl::TEXTURE_WRAP_R, GLenum::from(params.wrap_r) as GLint);

            if let Err(err) = check() {
                gl::DeleteSamplers(1, &id);
                return Err(err);
            }

            Ok(GLSampler { id })
        }
    }

    fn enable(&mut self, object: &mut GLSampler, _: &Sampler, unit: TextureUnit) -> Result<()> {
        self.check_unit(unit)?;

        unsafe {
            gl::BindSampler(unit.0, object.id);
            check()
        }
    }

    fn disable(&mut self, _: &mut GLSampler, unit: TextureUnit) -> Result<()> {
        self.check_unit(unit)?;

        unsafe {
            gl::BindSampler(unit.0, 0);
            check()
        }
    }

    fn destroy(&mut self, object: GLSampler) -> Result<()> {
        unsafe {
            gl::DeleteSamplers(1, &object.id);
            check()
        }
    }
}

impl Adapter<Shader> for GLDevice {
    type Object = GLProgram;

    fn create(&mut self, shader: &Shader) -> Result<GLProgram> {
        unsafe {
            let mut shaders: SmallVec<[GLuint; 3]> = SmallVec::new();
            let mut result = Ok(());

            for (stage, source) in shader.stages() {
                match compile(stage, source) {
                    Ok(v) => shaders.push(v),
                    Err(err) => {
                        result = Err(err);
                        break;
                    }
                }
            }

            let program = result.and_then(|_| link(&shaders));
            for &v in &shaders {
                gl::DeleteShader(v);
            }

            let id = program?;
            check()?;

            Ok(GLProgram { id })
        }
    }

    fn enable(&mut self, object: &mut GLProgram, _: &Shader, _: ()) -> Result<()> {
        unsafe {
            gl::UseProgram(object.id);
            self.program = object.id;
            check()
        }
    }

    fn disable(&mut self, _: &mut GLProgram, _: ()) -> Result<()> {
        unsafe {
            gl::UseProgram(0);
            self.program = 0;
            check()
        }
    }

    fn destroy(&mut self, object: GLProgram) -> Result<()> {
        unsafe {
            if self.program == object.id {
                gl::UseProgram(0);
                self.program = 0;
            }

            gl::DeleteProgram(object.id);
            check()
        }
    }
}

impl Device for GLDevice {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            texture_3d: true,
            shader_buffers: self.capabilities.shader_buffers(),
            max_texture_units: self.capabilities.max_combined_texture_image_units as usize,
            max_vertex_attributes: self.capabilities.max_vertex_attribs as usize,
        }
    }

    fn apply_state(&mut self, change: StateChange) -> Result<()> {
        unsafe {
            match change {
                StateChange::BlendEnabled(v) => toggle(gl::BLEND, v),
                StateChange::BlendFunction {
                    source,
                    destination,
                } => gl::BlendFunc(source.into(), destination.into()),
                StateChange::BlendColor(c) => gl::BlendColor(c.r, c.g, c.b, c.a),
                StateChange::CullEnabled(v) => toggle(gl::CULL_FACE, v),
                StateChange::CullFace(face) => gl::CullFace(face.into()),
                StateChange::FrontFace(order) => gl::FrontFace(order.into()),
                StateChange::DepthTestEnabled(v) => toggle(gl::DEPTH_TEST, v),
                StateChange::DepthFunction(cmp) => gl::DepthFunc(cmp.into()),
                StateChange::DepthWrite(v) => gl::DepthMask(boolean(v)),
                StateChange::OffsetFill(v) => toggle(gl::POLYGON_OFFSET_FILL, v),
                StateChange::OffsetLine(v) => toggle(gl::POLYGON_OFFSET_LINE, v),
                StateChange::OffsetPoint(v) => toggle(gl::POLYGON_OFFSET_POINT, v),
                StateChange::PolygonOffset { factor, units } => gl::PolygonOffset(factor, units),
                StateChange::StencilEnabled(v) => toggle(gl::STENCIL_TEST, v),
                StateChange::StencilFunction {
                    function,
                    reference,
                    mask,
                } => gl::StencilFunc(function.into(), reference, mask),
                StateChange::StencilWriteMask(mask) => gl::StencilMask(mask),
                StateChange::StencilOperation {
                    stencil_fail,
                    depth_fail,
                    depth_pass,
                } => gl::StencilOp(stencil_fail.into(), depth_fail.into(), depth_pass.into()),
                StateChange::Wireframe(v) => {
                    gl::PolygonMode(gl::FRONT_AND_BACK, if v { gl::LINE } else { gl::FILL })
                }
            }

            check()
        }
    }

    fn uniform_location(&mut self, program: &GLProgram, name: &str) -> Option<UniformLocation> {
        let name = CString::new(name).ok()?;
        let location = unsafe { gl::GetUniformLocation(program.id, name.as_ptr()) };

        if location < 0 {
            None
        } else {
            Some(UniformLocation(location))
        }
    }

    fn update_uniform(&mut self, location: UniformLocation, value: &UniformValue) -> Result<()> {
        let location = location.0;

        unsafe {
            match *value {
                UniformValue::I32(v) => gl::Uniform1i(location, v),
                UniformValue::U32(v) => gl::Uniform1ui(location, v),
                UniformValue::F32(v) => gl::Uniform1f(location, v),
                UniformValue::Vector2f(v) => gl::Uniform2f(location, v[0], v[1]),
                UniformValue::Vector3f(v) => gl::Uniform3f(location, v[0], v[1], v[2]),
                UniformValue::Vector4f(v) => gl::Uniform4f(location, v[0], v[1], v[2], v[3]),
                UniformValue::Matrix3f(v) => {
                    gl::UniformMatrix3fv(location, 1, gl::FALSE, v[0].as_ptr())
                }
                UniformValue::Matrix4f(v) => {
                    gl::UniformMatrix4fv(location, 1, gl::FALSE, v[0].as_ptr())
                }
            }

            check()
        }
    }

    fn draw(&mut self, call: &DrawCall) -> Result<()> {
        let primitive: GLenum = call.primitive.into();

        unsafe {
            match call.index {
                Some(index) => gl::DrawElementsInstanced(
                    primitive,
                    index.count as GLsizei,
                    index.format.into(),
                    index.offset as *const c_void,
                    call.instances as GLsizei,
                ),
                None => gl::DrawArraysInstanced(
                    primitive,
                    call.first_vertex as GLint,
                    call.vertex_count as GLsizei,
                    call.instances as GLsizei,
                ),
            }

            check()
        }
    }

    fn clear(
        &mut self,
        color: Option<Color<f32>>,
        depth: Option<f32>,
        stencil: Option<i32>,
    ) -> Result<()> {
        unsafe {
            let mut bits = 0;
            if let Some(v) = color {
                bits |= gl::COLOR_BUFFER_BIT;
                gl::ClearColor(v.r, v.g, v.b, v.a);
            }

            if let Some(v) = depth {
                bits |= gl::DEPTH_BUFFER_BIT;
                gl::ClearDepth(f64::from(v));
            }

            if let Some(v) = stencil {
                bits |= gl::STENCIL_BUFFER_BIT;
                gl::ClearStencil(v);
            }

            if bits != 0 {
                gl::Clear(bits);
            }

            check()
        }
    }

    fn set_viewport(&mut self, viewport: Viewport, depth: DepthRange) -> Result<()> {
        unsafe {
            gl::Viewport(
                viewport.x as GLint,
                viewport.y as GLint,
                viewport.width as GLsizei,
                viewport.height as GLsizei,
            );

            gl::DepthRange(f64::from(depth.near), f64::from(depth.far));
            check()
        }
    }

    fn swap_frame_buffer(&mut self) -> Result<()> {
        self.surface.swap_buffers()
    }
}
