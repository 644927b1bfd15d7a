//! Cube face orientation for the skybox
//!
//! Every face is rendered as if looking down -Z, then rotated into place. Panel order is
//! fixed: `-Z, +X, +Z, -X, +Y, -Y`.

use glam::{Mat3, Vec2, Vec3};
use std::f32::consts::{FRAC_PI_2, PI};

/// One of the six skybox faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeFace {
    NegZ,
    PosX,
    PosZ,
    NegX,
    PosY,
    NegY,
}

impl CubeFace {
    /// All faces in bake order
    pub const ALL: [CubeFace; 6] = [
        CubeFace::NegZ,
        CubeFace::PosX,
        CubeFace::PosZ,
        CubeFace::NegX,
        CubeFace::PosY,
        CubeFace::NegY,
    ];

    pub fn from_panel(panel_index: u32) -> Option<Self> {
        Self::ALL.get(panel_index as usize).copied()
    }

    pub fn panel_index(self) -> u32 {
        match self {
            CubeFace::NegZ => 0,
            CubeFace::PosX => 1,
            CubeFace::PosZ => 2,
            CubeFace::NegX => 3,
            CubeFace::PosY => 4,
            CubeFace::NegY => 5,
        }
    }

    /// Short name used for file names and labels
    pub fn name(self) -> &'static str {
        match self {
            CubeFace::NegZ => "neg_z",
            CubeFace::PosX => "pos_x",
            CubeFace::PosZ => "pos_z",
            CubeFace::NegX => "neg_x",
            CubeFace::PosY => "pos_y",
            CubeFace::NegY => "neg_y",
        }
    }

    /// Face-to-world rotation. Maps the -Z view axis onto the face's outward direction.
    pub fn rotation(self) -> Mat3 {
        match self {
            CubeFace::NegZ => Mat3::IDENTITY,
            CubeFace::PosX => Mat3::from_rotation_y(-FRAC_PI_2),
            CubeFace::PosZ => Mat3::from_rotation_y(PI),
            CubeFace::NegX => Mat3::from_rotation_y(FRAC_PI_2),
            CubeFace::PosY => Mat3::from_rotation_x(FRAC_PI_2),
            CubeFace::NegY => Mat3::from_rotation_x(-FRAC_PI_2),
        }
    }

    /// World-space direction through the face center
    pub fn outward(self) -> Vec3 {
        self.rotation() * Vec3::NEG_Z
    }

    /// World-space view ray through a clip-space point of this face
    pub fn ray_direction(self, clip: Vec2) -> Vec3 {
        (self.rotation() * clip.extend(-1.0)).normalize()
    }

    /// Corner positions on the unit cube with their texture coordinates.
    ///
    /// Ordered top-left, top-right, bottom-right, bottom-left as seen from inside the cube.
    /// Texture row 0 is the top edge, matching how tiles are laid out during the bake.
    pub fn corners(self) -> [(Vec3, Vec2); 4] {
        let rotation = self.rotation();
        [
            (Vec2::new(-1.0, 1.0), Vec2::new(0.0, 0.0)),
            (Vec2::new(1.0, 1.0), Vec2::new(1.0, 0.0)),
            (Vec2::new(1.0, -1.0), Vec2::new(1.0, 1.0)),
            (Vec2::new(-1.0, -1.0), Vec2::new(0.0, 1.0)),
        ]
        .map(|(clip, uv)| (rotation * clip.extend(-1.0), uv))
    }
}

/// Clip-space position of a texel center on a `width x height` face
pub fn texel_to_clip(px: u32, py: u32, width: u32, height: u32) -> Vec2 {
    Vec2::new(
        (px as f32 + 0.5) / width as f32 * 2.0 - 1.0,
        1.0 - (py as f32 + 0.5) / height as f32 * 2.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotations_map_view_axis_to_face_normal() {
        let expected = [
            Vec3::NEG_Z,
            Vec3::X,
            Vec3::Z,
            Vec3::NEG_X,
            Vec3::Y,
            Vec3::NEG_Y,
        ];
        for (face, dir) in CubeFace::ALL.iter().zip(expected) {
            assert!(
                face.outward().abs_diff_eq(dir, 1e-5),
                "{:?} faces {:?}",
                face,
                face.outward()
            );
        }
    }

    #[test]
    fn panel_index_round_trips() {
        for face in CubeFace::ALL {
            assert_eq!(CubeFace::from_panel(face.panel_index()), Some(face));
        }
        assert_eq!(CubeFace::from_panel(6), None);
    }

    #[test]
    fn texel_centers_stay_inside_clip_space() {
        let first = texel_to_clip(0, 0, 4, 4);
        let last = texel_to_clip(3, 3, 4, 4);
        assert!((first - Vec2::new(-0.75, 0.75)).length() < 1e-6);
        assert!((last - Vec2::new(0.75, -0.75)).length() < 1e-6);
    }

    #[test]
    fn center_ray_points_out_of_the_face() {
        for face in CubeFace::ALL {
            assert!(face.ray_direction(Vec2::ZERO).abs_diff_eq(face.outward(), 1e-5));
        }
        // Top-left texel of -Z looks up and to the left
        let dir = CubeFace::NegZ.ray_direction(texel_to_clip(0, 0, 2, 2));
        assert!((dir.length() - 1.0).abs() < 1e-5);
        assert!(dir.x < 0.0 && dir.y > 0.0 && dir.z < 0.0);
    }

    #[test]
    fn corners_lie_on_the_face_plane() {
        for face in CubeFace::ALL {
            let normal = face.outward();
            for (position, _) in face.corners() {
                assert!((position.dot(normal) - 1.0).abs() < 1e-5);
            }
        }
    }
}
