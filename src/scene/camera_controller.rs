//! Mouse-drag look controller
//!
//! Turns drag deltas into yaw and pitch. Movement is not part of the skybox view, only rotation.

use glam::Vec2;

use super::HeadOrientation;

/// Input state gathered from window events between frames
#[derive(Debug, Clone, Default)]
pub struct CameraInput {
    /// Mouse delta since last frame (in pixels)
    pub mouse_delta: Vec2,

    /// Whether a drag is in progress (left mouse button held)
    pub dragging: bool,

    last_cursor: Option<Vec2>,
}

impl CameraInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset per-frame deltas (call after update)
    pub fn reset_deltas(&mut self) {
        self.mouse_delta = Vec2::ZERO;
    }

    /// Record an absolute cursor position; motion only counts while dragging
    pub fn cursor_moved(&mut self, position: Vec2) {
        if let Some(last) = self.last_cursor {
            if self.dragging {
                self.mouse_delta += position - last;
            }
        }
        self.last_cursor = Some(position);
    }

    /// Cursor left the window or focus was lost
    pub fn release(&mut self) {
        self.dragging = false;
        self.last_cursor = None;
        self.mouse_delta = Vec2::ZERO;
    }
}

/// Drag-to-look controller
pub struct DragLookController {
    pub yaw: f32,
    pub pitch: f32,
    /// Radians per pixel
    pub sensitivity: f32,
    /// Pitch stays within +/- this angle
    pub max_pitch: f32,
}

impl Default for DragLookController {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            sensitivity: 0.004,
            max_pitch: std::f32::consts::FRAC_PI_2 - 0.01,
        }
    }
}

impl DragLookController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sensitivity(mut self, sensitivity: f32) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    /// Dragging right turns toward +X, dragging up looks up
    pub fn update(&mut self, input: &CameraInput) {
        if !input.dragging || input.mouse_delta == Vec2::ZERO {
            return;
        }
        self.yaw -= input.mouse_delta.x * self.sensitivity;
        self.pitch -= input.mouse_delta.y * self.sensitivity;
        self.pitch = self.pitch.clamp(-self.max_pitch, self.max_pitch);
        self.yaw %= std::f32::consts::TAU;
    }

    pub fn orientation(&self) -> HeadOrientation {
        HeadOrientation::new(self.yaw, self.pitch)
    }

    pub fn reset(&mut self) {
        self.yaw = 0.0;
        self.pitch = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_motion_without_drag() {
        let mut controller = DragLookController::new();
        let input = CameraInput {
            mouse_delta: Vec2::new(50.0, 10.0),
            dragging: false,
            ..Default::default()
        };
        controller.update(&input);
        assert_eq!(controller.orientation(), HeadOrientation::default());
    }

    #[test]
    fn pitch_is_clamped() {
        let mut controller = DragLookController::new();
        let input = CameraInput {
            mouse_delta: Vec2::new(0.0, -100_000.0),
            dragging: true,
            ..Default::default()
        };
        controller.update(&input);
        assert_eq!(controller.pitch, controller.max_pitch);
    }

    #[test]
    fn cursor_motion_accumulates_only_while_dragging() {
        let mut input = CameraInput::new();
        input.cursor_moved(Vec2::new(10.0, 10.0));
        input.cursor_moved(Vec2::new(30.0, 10.0));
        assert_eq!(input.mouse_delta, Vec2::ZERO);

        input.dragging = true;
        input.cursor_moved(Vec2::new(35.0, 4.0));
        input.cursor_moved(Vec2::new(40.0, 0.0));
        assert_eq!(input.mouse_delta, Vec2::new(10.0, -10.0));

        let mut controller = DragLookController::new();
        controller.update(&input);
        assert!(controller.yaw < 0.0);
        assert!(controller.pitch > 0.0);
    }
}
