use std::cmp;
use std::ffi;

use gl::types::*;

use crate::errors::*;

/// Describes the OpenGL context profile.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Profile {
    /// The context uses only future-compatible functions and definitions.
    Core,
    /// The context includes all immediate mode functions and definitions.
    Compatibility,
}

/// Describes a version.
///
/// A version can only be compared to another version if they belong to the same API.
/// For example, both `Version::GL(3, 0) >= Version::ES(3, 0)` and `Version::ES(3, 0) >=
/// Version::GL(3, 0)` return `false`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Version {
    /// Regular OpenGL.
    GL(u8, u8),
    /// OpenGL embedded system.
    ES(u8, u8),
}

impl PartialOrd for Version {
    #[inline]
    fn partial_cmp(&self, other: &Version) -> Option<cmp::Ordering> {
        let (es1, major1, minor1) = match *self {
            Version::GL(major, minor) => (false, major, minor),
            Version::ES(major, minor) => (true, major, minor),
        };

        let (es2, major2, minor2) = match *other {
            Version::GL(major, minor) => (false, major, minor),
            Version::ES(major, minor) => (true, major, minor),
        };

        if es1 != es2 {
            None
        } else {
            match major1.cmp(&major2) {
                cmp::Ordering::Equal => Some(minor1.cmp(&minor2)),
                v => Some(v),
            }
        }
    }
}

impl Version {
    /// Obtains the OpenGL version of the current context using the loaded functions.
    ///
    /// # Unsafe
    ///
    /// You must ensure that the functions belong to the current context, otherwise you will get
    /// an undefined behavior.
    pub unsafe fn parse() -> Result<Version> {
        let desc = parse_str(gl::VERSION)?;
        Version::from_desc(&desc)
    }

    /// Parses a `GL_VERSION` string, e.g. `4.3.0 NVIDIA 390.77` or `OpenGL ES 3.0 Mesa`.
    pub fn from_desc(desc: &str) -> Result<Version> {
        let malformed = || Error::Backend(format!("[GL] Version string {:?} is malformed.", desc));

        let (es, rest) = if desc.starts_with("OpenGL ES-") {
            (true, desc.get(13..).unwrap_or(""))
        } else if desc.starts_with("OpenGL ES ") {
            (true, &desc[10..])
        } else {
            (false, desc)
        };

        let number = rest.split(' ').next().ok_or_else(malformed)?;
        let mut iter = number.split('.');

        let major = iter
            .next()
            .and_then(|v| v.parse().ok())
            .ok_or_else(malformed)?;

        let minor = iter
            .next()
            .and_then(|v| v.parse().ok())
            .ok_or_else(malformed)?;

        if es {
            Ok(Version::ES(major, minor))
        } else {
            Ok(Version::GL(major, minor))
        }
    }
}

macro_rules! extensions {
    ($($string:expr => $field:ident,)+) => {
        /// Contains data about the list of extensions.
        #[derive(Debug, Clone, Copy, Default)]
        pub struct Extensions {
            $(
                pub $field: bool,
            )+
        }

        impl Extensions {
            /// Returns the list of extensions supported by the backend.
            ///
            /// *Safety*: the OpenGL context must be current in the thread.
            pub unsafe fn parse(version: Version) -> Result<Extensions> {
                let strings: Vec<String> = if version >= Version::GL(3, 0) || version >= Version::ES(3, 0) {
                    let mut num = 0;
                    gl::GetIntegerv(gl::NUM_EXTENSIONS, &mut num);

                    let mut strings = Vec::with_capacity(num.max(0) as usize);
                    for i in 0..num {
                        let ext = gl::GetStringi(gl::EXTENSIONS, i as GLuint);
                        if !ext.is_null() {
                            let ext = ffi::CStr::from_ptr(ext as *const _);
                            strings.push(ext.to_string_lossy().into_owned());
                        }
                    }

                    strings
                } else {
                    parse_str(gl::EXTENSIONS)?
                        .split(' ')
                        .map(|e| e.to_owned())
                        .collect()
                };

                Ok(Extensions::from_names(strings.iter().map(|v| v.as_str())))
            }

            pub fn from_names<'a, T: Iterator<Item = &'a str>>(names: T) -> Extensions {
                let mut extensions = Extensions::default();
                for extension in names {
                    match extension {
                        $(
                            $string => extensions.$field = true,
                        )+
                        _ => ()
                    }
                }

                extensions
            }
        }
    }
}

extensions! {
    "GL_ARB_vertex_array_object" => gl_arb_vertex_array_object,
    "GL_ARB_vertex_attrib_binding" => gl_arb_vertex_attrib_binding,
    "GL_ARB_map_buffer_range" => gl_arb_map_buffer_range,
    "GL_ARB_pixel_buffer_object" => gl_arb_pixel_buffer_object,
    "GL_ARB_sampler_objects" => gl_arb_sampler_objects,
    "GL_ARB_texture_storage" => gl_arb_texture_storage,
    "GL_ARB_shader_storage_buffer_object" => gl_arb_shader_storage_buffer_object,
    "GL_ARB_draw_instanced" => gl_arb_draw_instanced,
}

/// Represents the capabilities of the context.
///
/// Contrary to the state, these values never change.
#[derive(Debug)]
pub struct GLCapabilities {
    /// Returns a version or release number. Vendor-specific information may follow the version
    /// number.
    pub version: Version,

    /// The company responsible for this GL implementation.
    pub vendor: String,

    /// The list of OpenGL extensions support by this implementation.
    pub extensions: Extensions,

    /// The name of the renderer. This name is typically specific to a particular
    /// configuration of a hardware platform.
    pub renderer: String,

    /// The OpenGL context profile if available.
    ///
    /// The context profile is available from OpenGL 3.2 onwards. `None` if not supported.
    pub profile: Option<Profile>,

    /// The context is in debug mode, which may have additional error and performance issue
    /// reporting functionality.
    pub debug: bool,

    /// Maximum width and height of `glViewport`.
    pub max_viewport_dims: (u32, u32),

    /// Maximum number of textures that can be bound to a program.
    pub max_combined_texture_image_units: u32,

    pub max_vertex_attribs: u32,

    /// Number of available binding points for `GL_SHADER_STORAGE_BUFFER`, zero if shader
    /// storage buffers are unsupported.
    pub max_shader_storage_buffer_bindings: u32,
}

impl GLCapabilities {
    pub unsafe fn parse() -> Result<GLCapabilities> {
        let version = Version::parse()?;
        let extensions = Extensions::parse(version)?;

        let debug = if version >= Version::GL(3, 0) {
            let val = get_integer(gl::CONTEXT_FLAGS) as GLenum;
            (val & gl::CONTEXT_FLAG_DEBUG_BIT) != 0
        } else {
            false
        };

        let max_shader_storage_buffer_bindings =
            if version >= Version::GL(4, 3) || extensions.gl_arb_shader_storage_buffer_object {
                get_integer(gl::MAX_SHADER_STORAGE_BUFFER_BINDINGS) as u32
            } else {
                0
            };

        Ok(GLCapabilities {
            version,
            extensions,
            vendor: parse_str(gl::VENDOR)?,
            renderer: parse_str(gl::RENDERER)?,
            profile: parse_profile(version),
            debug,
            max_viewport_dims: parse_viewport_dims(),
            max_combined_texture_image_units: get_integer(gl::MAX_COMBINED_TEXTURE_IMAGE_UNITS)
                as u32,
            max_vertex_attribs: get_integer(gl::MAX_VERTEX_ATTRIBS) as u32,
            max_shader_storage_buffer_bindings,
        })
    }

    /// Refuses contexts missing any feature the device is built on.
    pub fn check(&self) -> Result<()> {
        let v = self.version;
        let exts = &self.extensions;

        let mut missing = Vec::new();
        if v < Version::GL(3, 0) && !exts.gl_arb_vertex_array_object {
            missing.push("vertex array objects");
        }

        if v < Version::GL(3, 0) && !exts.gl_arb_map_buffer_range {
            missing.push("mapping buffer ranges");
        }

        if v < Version::GL(2, 1) && !exts.gl_arb_pixel_buffer_object {
            missing.push("pixel buffer objects");
        }

        if v < Version::GL(3, 1) && !exts.gl_arb_draw_instanced {
            missing.push("instanced drawing");
        }

        if v < Version::GL(3, 3) && !exts.gl_arb_sampler_objects {
            missing.push("sampler objects");
        }

        if v < Version::GL(4, 2) && !exts.gl_arb_texture_storage {
            missing.push("immutable texture storage");
        }

        if v < Version::GL(4, 3) && !exts.gl_arb_vertex_attrib_binding {
            missing.push("separate vertex attribute formats");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Backend(format!(
                "[GL] {:?} does not support {}.",
                v,
                missing.join(", ")
            )))
        }
    }

    #[inline]
    pub fn shader_buffers(&self) -> bool {
        self.max_shader_storage_buffer_bindings > 0
    }
}

#[inline]
unsafe fn get_integer(id: GLenum) -> GLint {
    let mut val = 0;
    gl::GetIntegerv(id, &mut val);
    val
}

unsafe fn parse_str(id: GLenum) -> Result<String> {
    let s = gl::GetString(id);
    if s.is_null() {
        return Err(Error::Backend(format!("[GL] String of {} is null.", id)));
    }

    String::from_utf8(ffi::CStr::from_ptr(s as *const _).to_bytes().to_vec())
        .map_err(|_| Error::Backend(format!("[GL] String of {} is malformed.", id)))
}

unsafe fn parse_viewport_dims() -> (u32, u32) {
    let mut val: [GLint; 2] = [0, 0];
    gl::GetIntegerv(gl::MAX_VIEWPORT_DIMS, val.as_mut_ptr());
    (val[0] as u32, val[1] as u32)
}

unsafe fn parse_profile(version: Version) -> Option<Profile> {
    if version >= Version::GL(3, 2) {
        let val = get_integer(gl::CONTEXT_PROFILE_MASK) as GLenum;
        if (val & gl::CONTEXT_COMPATIBILITY_PROFILE_BIT) != 0 {
            Some(Profile::Compatibility)
        } else if (val & gl::CONTEXT_CORE_PROFILE_BIT) != 0 {
            Some(Profile::Core)
        } else {
            None
        }
    } else {
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn version() {
        assert_eq!(
            Version::from_desc("4.3.0 NVIDIA 390.77").unwrap(),
            Version::GL(4, 3)
        );

        assert_eq!(
            Version::from_desc("OpenGL ES 3.0 Mesa 18.0.5").unwrap(),
            Version::ES(3, 0)
        );

        assert!(Version::from_desc("").is_err());
        assert!(Version::from_desc("four.three").is_err());

        assert!(Version::GL(4, 3) > Version::GL(3, 3));
        assert!(Version::GL(4, 3) >= Version::GL(4, 3));
        assert!(!(Version::GL(3, 0) >= Version::ES(3, 0)));
        assert!(!(Version::ES(3, 0) >= Version::GL(3, 0)));
    }

    #[test]
    fn extensions() {
        let names = ["GL_ARB_texture_storage", "GL_KHR_debug"];
        let exts = Extensions::from_names(names.iter().cloned());
        assert!(exts.gl_arb_texture_storage);
        assert!(!exts.gl_arb_vertex_attrib_binding);
    }

    fn capabilities(version: Version, extensions: Extensions) -> GLCapabilities {
        GLCapabilities {
            version,
            vendor: String::new(),
            extensions,
            renderer: String::new(),
            profile: None,
            debug: false,
            max_viewport_dims: (4096, 4096),
            max_combined_texture_image_units: 16,
            max_vertex_attribs: 16,
            max_shader_storage_buffer_bindings: 0,
        }
    }

    #[test]
    fn check() {
        assert!(capabilities(Version::GL(4, 3), Extensions::default())
            .check()
            .is_ok());

        assert!(capabilities(Version::GL(4, 1), Extensions::default())
            .check()
            .is_err());

        let mut exts = Extensions::default();
        exts.gl_arb_texture_storage = true;
        exts.gl_arb_vertex_attrib_binding = true;
        assert!(capabilities(Version::GL(4, 1), exts).check().is_ok());
    }
}
