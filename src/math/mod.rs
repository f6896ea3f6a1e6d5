//! Linear algebra used by uniform values, cameras and render states. Mostly comes from `cgmath`.

pub use cgmath::*;

pub mod color;
pub use self::color::Color;
