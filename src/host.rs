//! Windowed host shared by the native demo and the web entry point
//!
//! Routes winit events to egui first, then to drag-look, and draws one frame per redraw with the
//! parameter panel on top of the skybox.

use crate::backend::traits::{BackendError, GraphicsBackend};
use crate::egui_integration::EguiOverlay;
use crate::engine::Engine;
use crate::scene::{CameraInput, DragLookController};
use crate::ui::{PanelAction, ParameterPanel};
use crate::ExternalInputs;
use glam::Vec2;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::window::Window;

/// What the event loop should do after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostControl {
    Continue,
    Exit,
}

pub struct SkyHost {
    engine: Engine,
    overlay: EguiOverlay,
    panel: ParameterPanel,
    input: CameraInput,
    look: DragLookController,
    show_panel: bool,
    frame_count: u64,
}

impl SkyHost {
    pub fn new(engine: Engine, window: &Window) -> Self {
        let mut overlay = EguiOverlay::new(engine.backend(), window);
        let window_size = window.inner_size();
        overlay.set_surface_scale(
            (window_size.width, window_size.height),
            engine.backend().surface_size(),
        );
        let panel = ParameterPanel::new(ExternalInputs::from(engine.sky().params()));

        Self {
            engine,
            overlay,
            panel,
            input: CameraInput::new(),
            look: DragLookController::new(),
            show_panel: true,
            frame_count: 0,
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn set_panel_visible(&mut self, visible: bool) {
        self.show_panel = visible;
    }

    /// Handle one window event. Redraws are driven separately through [`SkyHost::redraw`].
    pub fn handle_window_event(&mut self, window: &Window, event: &WindowEvent) -> HostControl {
        let egui_consumed = self.show_panel && self.overlay.on_window_event(window, event);

        match event {
            WindowEvent::CloseRequested => return HostControl::Exit,
            WindowEvent::Resized(size) => self.resize(size.width, size.height),
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                let pressed = *state == ElementState::Pressed;
                // A press that lands on the panel belongs to egui
                if !pressed || !(egui_consumed || self.overlay.wants_pointer_input()) {
                    self.input.dragging = pressed;
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.input
                    .cursor_moved(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::CursorLeft { .. } | WindowEvent::Focused(false) => self.input.release(),
            _ => {}
        }
        HostControl::Continue
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.engine.resize(width, height);
        self.overlay
            .set_surface_scale((width, height), self.engine.backend().surface_size());
    }

    /// Bake one tile, draw the sky and the panel, and present
    pub fn redraw(&mut self, window: &Window, timestamp_ms: f64) -> Result<(), BackendError> {
        self.look.update(&self.input);
        self.input.reset_deltas();
        self.engine.set_head_orientation(self.look.orientation());

        if self.show_panel {
            let progress = self.engine.bake_progress();
            let panel = &mut self.panel;
            let action = self.overlay.run(window, |ctx| panel.show(ctx, progress));
            match action {
                PanelAction::Apply => self.engine.apply_inputs(self.panel.inputs()),
                PanelAction::ResetNoise => {
                    self.engine.apply_inputs(self.panel.inputs());
                    self.engine.reset_noise_and_rebake();
                }
                PanelAction::None => {}
            }
        }

        if let Err(err) = self.engine.render_frame(timestamp_ms) {
            if matches!(err, BackendError::SurfaceLost) {
                let size = window.inner_size();
                log::warn!("Surface lost, reconfiguring at {}x{}", size.width, size.height);
                self.resize(size.width, size.height);
                return Ok(());
            }
            return Err(err);
        }

        if self.show_panel && self.engine.current_view().is_some() {
            let size = self.engine.backend().surface_size();
            self.overlay.paint(self.engine.backend_mut(), size);
        }

        self.engine.end_frame()?;

        self.frame_count += 1;
        if self.frame_count == 1 {
            log::info!("First frame presented");
        }
        Ok(())
    }
}
