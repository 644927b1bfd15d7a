//! Viewer state
//!
//! The skybox has no scene graph; the viewer is a projection plus a head orientation driven by
//! mouse drag.

mod camera;
mod camera_controller;

pub use camera::*;
pub use camera_controller::*;
