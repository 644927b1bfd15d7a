//! egui overlay for the parameter panel
//!
//! Input goes through egui-winit and the tessellated UI is drawn on top of the skybox with
//! egui-wgpu, on the same frame encoder.

mod overlay;

pub use self::overlay::EguiOverlay;
