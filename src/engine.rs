//! Main engine orchestrator
//!
//! Owns the cloud sky state, the GPU passes and the backend. One call to [`Engine::frame`]
//! advances the bake by at most one tile and redraws the skybox.

use crate::backend::traits::*;
use crate::backend::wgpu_backend::WgpuBackend;
use crate::clouds::{CloudSky, ExternalInputs};
use crate::pipeline::{CloudBakePass, SkyboxPass};
use crate::scene::{HeadOrientation, Projection};
use crate::EngineConfig;
use glam::Vec3;
use std::sync::Arc;
use winit::window::Window as WinitWindow;

/// Converts host timestamps in milliseconds into per-frame deltas in seconds
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    last_ms: Option<f64>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds since the previous tick. The first tick, and any backwards step, yields 0.
    pub fn tick(&mut self, timestamp_ms: f64) -> f32 {
        let dt = match self.last_ms {
            Some(last) if timestamp_ms > last => ((timestamp_ms - last) / 1000.0) as f32,
            _ => 0.0,
        };
        self.last_ms = Some(timestamp_ms);
        dt
    }
}

/// The cloud skybox engine
pub struct Engine<B: GraphicsBackend = WgpuBackend> {
    backend: B,
    sky: CloudSky,
    bake_pass: CloudBakePass,
    skybox_pass: SkyboxPass,
    projection: Projection,
    head: HeadOrientation,
    clock: FrameClock,
    width: u32,
    height: u32,
    config: EngineConfig,
    current_view: Option<TextureViewHandle>,
}

impl Engine<WgpuBackend> {
    /// Create a new engine (native only - use new_async on web)
    #[cfg(not(target_arch = "wasm32"))]
    pub fn new(window: Arc<WinitWindow>, config: EngineConfig) -> BackendResult<Self> {
        let backend = WgpuBackend::new(window, config.vsync)?;
        Self::from_backend(backend, config)
    }

    /// Create a new engine asynchronously (required on web)
    pub async fn new_async(window: Arc<WinitWindow>, config: EngineConfig) -> BackendResult<Self> {
        let backend = WgpuBackend::new_async(window, config.vsync).await?;
        Self::from_backend(backend, config)
    }
}

impl<B: GraphicsBackend> Engine<B> {
    /// Build the sky state and GPU passes on an existing backend
    pub fn from_backend(mut backend: B, config: EngineConfig) -> BackendResult<Self> {
        let seed = config.noise_seed.unwrap_or_else(rand::random);
        let sky = CloudSky::new(config.layout, seed);
        log::info!(
            "Cloud sky: {}x{} faces, {} tiles per bake, noise seed {}",
            config.layout.face_width(),
            config.layout.face_height(),
            config.layout.tiles_per_bake(),
            seed
        );

        let bake_pass = CloudBakePass::new(&mut backend, &sky)?;
        let target_format = backend.swapchain_format();
        let skybox_pass = SkyboxPass::new(
            &mut backend,
            &bake_pass,
            target_format,
            config.skybox_rotation_speed,
        )?;

        let (width, height) = backend.surface_size();
        let mut projection = Projection::perspective(config.fov_y_degrees, 1.0);
        projection.set_viewport(width, height);

        Ok(Self {
            backend,
            sky,
            bake_pass,
            skybox_pass,
            projection,
            head: HeadOrientation::default(),
            clock: FrameClock::new(),
            width,
            height,
            config,
            current_view: None,
        })
    }

    /// Copy a UI snapshot into the cloud parameters and restart the bake
    pub fn apply_inputs(&mut self, inputs: &ExternalInputs) {
        self.sky.set_from_external_inputs(inputs);
    }

    /// Fresh random noise and a full rebake
    pub fn reset_noise_and_rebake(&mut self) {
        self.sky.reset_noise_and_rebake();
    }

    pub fn set_sun_direction(&mut self, direction: Vec3) {
        self.sky.set_sun_direction(direction);
    }

    pub fn set_head_orientation(&mut self, head: HeadOrientation) {
        self.head = head;
    }

    pub fn head_orientation(&self) -> HeadOrientation {
        self.head
    }

    /// Handle window resize
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.backend.resize(width, height);

        // The surface may be clamped by device limits (WebGL2 caps at 2048)
        let (actual_width, actual_height) = self.backend.surface_size();
        if actual_width == self.width && actual_height == self.height {
            return;
        }
        self.width = actual_width;
        self.height = actual_height;
        self.projection.set_viewport(actual_width, actual_height);
        log::debug!("Surface resized to {}x{}", actual_width, actual_height);
    }

    /// Render a frame (convenience method that calls render_frame + end_frame)
    pub fn frame(&mut self, timestamp_ms: f64) -> BackendResult<()> {
        self.render_frame(timestamp_ms)?;
        self.end_frame()
    }

    /// Bake the next tile and draw the skybox without presenting. Call end_frame() after to
    /// present; overlays such as egui go in between.
    pub fn render_frame(&mut self, timestamp_ms: f64) -> BackendResult<()> {
        let dt = self.clock.tick(timestamp_ms);
        self.skybox_pass.advance_rotation(dt);

        let frame = self.backend.begin_frame()?;
        self.current_view = Some(frame.swapchain_view);

        self.bake_pass.sync(&mut self.backend, &self.sky);
        if let Some(job) = self.sky.advance() {
            self.bake_pass.render_tile(&mut self.backend, &job);
        }

        self.skybox_pass.draw(
            &mut self.backend,
            frame.swapchain_view,
            &self.projection,
            self.head,
        );

        Ok(())
    }

    /// End the frame and present to the screen.
    pub fn end_frame(&mut self) -> BackendResult<()> {
        self.current_view = None;
        self.backend.end_frame()
    }

    /// Swapchain view of the frame in flight, between render_frame and end_frame
    pub fn current_view(&self) -> Option<TextureViewHandle> {
        self.current_view
    }

    pub fn sky(&self) -> &CloudSky {
        &self.sky
    }

    /// `(tiles_done, tiles_total)` of the current bake
    pub fn bake_progress(&self) -> (u32, u32) {
        self.sky.bake_progress()
    }

    pub fn ambient_angle(&self) -> f32 {
        self.skybox_pass.ambient_angle()
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Get current dimensions
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get access to the backend for advanced operations (like egui rendering)
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Get mutable access to the backend
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::FrameClock;

    #[test]
    fn first_tick_is_zero() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.tick(1234.0), 0.0);
        assert!((clock.tick(1250.0) - 0.016).abs() < 1e-6);
    }

    #[test]
    fn backwards_timestamps_do_not_rewind() {
        let mut clock = FrameClock::new();
        clock.tick(100.0);
        assert_eq!(clock.tick(50.0), 0.0);
        assert!((clock.tick(150.0) - 0.1).abs() < 1e-6);
    }
}
