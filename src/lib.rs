//! Cloud Skybox - procedural volumetric clouds baked into a cube map
//!
//! The sky is ray-marched through a tiled 3D noise volume, one 128x128 tile per frame, into six
//! face textures. The finished faces are drawn every frame as a slowly rotating skybox.
//!
//! # Features
//! - Incremental tile-by-tile bake that restarts whenever parameters or noise change
//! - wgpu backend for native and web (WebGL2, or WebGPU where available)
//! - CPU reference bake with PNG export of the six faces
//! - egui parameter panel with live sliders and hex color fields

pub mod backend;
pub mod clouds;
pub mod egui_integration;
pub mod engine;
pub mod host;
pub mod pipeline;
pub mod resources;
pub mod scene;
pub mod ui;

// Web-specific modules
#[cfg(target_arch = "wasm32")]
pub mod web;

#[cfg(target_arch = "wasm32")]
mod web_demo;

pub use clouds::{CloudParams, CloudSky, ExternalInputs, SkyboxLayout};
pub use egui_integration::EguiOverlay;
pub use engine::Engine;
pub use host::{HostControl, SkyHost};
pub use ui::{PanelAction, ParameterPanel};

// Re-export wgpu backend for direct access
pub use backend::wgpu_backend::WgpuBackend;

/// Configuration for initializing the cloud skybox engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Window title
    pub title: String,
    /// Initial window width
    pub width: u32,
    /// Initial window height
    pub height: u32,
    /// Enable vsync
    pub vsync: bool,
    /// Face tiling of the baked skybox
    pub layout: SkyboxLayout,
    /// Seed for the initial noise volume; random when unset
    pub noise_seed: Option<u64>,
    /// Ambient skybox spin in radians per second
    pub skybox_rotation_speed: f32,
    /// Vertical field of view in degrees
    pub fov_y_degrees: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: "Cloud Skybox".to_string(),
            width: 1280,
            height: 720,
            vsync: true,
            layout: SkyboxLayout::default(),
            noise_seed: None,
            skybox_rotation_speed: 0.02,
            fov_y_degrees: 60.0,
        }
    }
}

// Web initialization helper
#[cfg(target_arch = "wasm32")]
pub fn init_web_logging() {
    // Set up panic hook for better error messages in console
    console_error_panic_hook::set_once();
    // A second init (e.g. hot reload) leaves the first logger in place
    if console_log::init_with_level(log::Level::Info).is_err() {
        log::warn!("Console logger was already initialized");
    }
}
