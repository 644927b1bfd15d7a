//! Cloud skybox render passes
//!
//! Each frame records at most one bake tile into a face target, then draws the skybox cube
//! sampling all six faces. Both passes go on the same frame encoder, bake first.

pub mod bake_pass;
pub mod skybox_pass;

pub use bake_pass::{CloudBakePass, CLOUD_BAKE_SHADER};
pub use skybox_pass::{skybox_orientation, SkyboxPass, SKYBOX_SHADER};
