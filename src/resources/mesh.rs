//! Static skybox geometry

use crate::backend::types::{VertexAttribute, VertexBufferLayout, VertexFormat};
use crate::clouds::CubeFace;
use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

/// Skybox vertex: cube corner and face texture coordinate
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SkyVertex {
    pub position: Vec3,
    pub uv: Vec2,
}

impl SkyVertex {
    pub fn layout() -> VertexBufferLayout {
        VertexBufferLayout {
            array_stride: std::mem::size_of::<SkyVertex>() as u64,
            attributes: vec![
                VertexAttribute {
                    location: 0,
                    format: VertexFormat::Float32x3,
                    offset: 0,
                },
                VertexAttribute {
                    location: 1,
                    format: VertexFormat::Float32x2,
                    offset: VertexFormat::Float32x3.size(),
                },
            ],
        }
    }
}

/// Inside-out unit cube with one quad per face, in panel order
#[derive(Debug, Clone)]
pub struct SkyboxMesh {
    pub vertices: Vec<SkyVertex>,
    pub indices: Vec<u16>,
}

/// Indices per face quad
pub const INDICES_PER_FACE: u32 = 6;

impl SkyboxMesh {
    pub fn cube() -> Self {
        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for face in CubeFace::ALL {
            let base = vertices.len() as u16;
            for (position, uv) in face.corners() {
                vertices.push(SkyVertex { position, uv });
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self { vertices, indices }
    }

    /// Index range drawing one face
    pub fn face_indices(face: CubeFace) -> std::ops::Range<u32> {
        let start = face.panel_index() * INDICES_PER_FACE;
        start..start + INDICES_PER_FACE
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Index bytes, padded to a multiple of 4 for buffer uploads
    pub fn index_bytes(&self) -> Vec<u8> {
        let mut bytes = bytemuck::cast_slice::<u16, u8>(&self.indices).to_vec();
        bytes.resize(bytes.len().next_multiple_of(4), 0);
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_has_one_quad_per_face() {
        let mesh = SkyboxMesh::cube();
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);
        assert_eq!(std::mem::size_of::<SkyVertex>(), 20);
        assert_eq!(SkyboxMesh::face_indices(CubeFace::NegY), 30..36);
    }

    #[test]
    fn face_quads_use_their_own_vertices() {
        let mesh = SkyboxMesh::cube();
        for face in CubeFace::ALL {
            let range = SkyboxMesh::face_indices(face);
            for &index in &mesh.indices[range.start as usize..range.end as usize] {
                assert_eq!(u32::from(index) / 4, face.panel_index());
            }
        }
    }
}
