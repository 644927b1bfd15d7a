//! Viewer projection and head orientation

use glam::Mat4;

/// Perspective projection for the skybox view
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            fov_y: 60f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 10.0,
        }
    }
}

impl Projection {
    pub fn perspective(fov_y_degrees: f32, aspect: f32) -> Self {
        Self {
            fov_y: fov_y_degrees.to_radians(),
            aspect,
            ..Self::default()
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    /// Follow the surface size. Zero-sized surfaces keep the previous aspect.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }
}

/// Where the viewer is looking, in radians
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HeadOrientation {
    pub yaw: f32,
    pub pitch: f32,
}

impl HeadOrientation {
    pub fn new(yaw: f32, pitch: f32) -> Self {
        Self { yaw, pitch }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_sets_aspect() {
        let mut projection = Projection::default();
        projection.set_viewport(800, 400);
        assert_eq!(projection.aspect, 2.0);
        projection.set_viewport(0, 400);
        assert_eq!(projection.aspect, 2.0);
    }
}
