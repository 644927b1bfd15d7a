//! GPU-side resources
//!
//! Skybox geometry and the textures the bake writes.

mod mesh;
mod texture;

pub use mesh::*;
pub use texture::*;
