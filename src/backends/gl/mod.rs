//! OpenGL 4.3 core backend.
//!
//! Creating the context and presenting frames belong to the windowing layer, which
//! plugs in through `GLSurface`.

pub mod capabilities;
pub mod types;

mod device;

pub use self::device::{GLBuffer, GLDevice, GLProgram, GLSampler, GLTexture, GLVertexArray};

use std::os::raw::c_void;

use crate::errors::*;

/// A window or offscreen target owning a current OpenGL context.
pub trait GLSurface {
    /// Resolves an OpenGL function of the context.
    fn get_proc_address(&self, symbol: &str) -> *const c_void;

    /// Presents the back buffer.
    fn swap_buffers(&self) -> Result<()>;
}
