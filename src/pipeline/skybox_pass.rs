//! Skybox presentation pass
//!
//! Draws the six baked faces as an inside-out cube around the viewer every frame, whether or not
//! the bake has finished.

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::clouds::CubeFace;
use crate::pipeline::CloudBakePass;
use crate::resources::{SkyVertex, SkyboxMesh};
use crate::scene::{HeadOrientation, Projection};
use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Vec4};

/// Head rotation followed by the slow ambient spin around the vertical axis
pub fn skybox_orientation(yaw: f32, pitch: f32, ambient_angle: f32) -> Mat3 {
    Mat3::from_rotation_x(-pitch)
        * Mat3::from_rotation_y(-yaw)
        * Mat3::from_rotation_y(ambient_angle)
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SkyUniform {
    pub view_proj: Mat4,
    /// x: 1 when the target re-encodes to sRGB on write
    pub output: Vec4,
}

pub struct SkyboxPass {
    pipeline: RenderPipelineHandle,
    uniform_buffer: BufferHandle,
    camera_bind_group: BindGroupHandle,
    face_bind_groups: Vec<BindGroupHandle>,
    vertex_buffer: BufferHandle,
    index_buffer: BufferHandle,
    srgb_target: bool,
    ambient_angle: f32,
    rotation_speed: f32,
}

impl SkyboxPass {
    pub fn new<B: GraphicsBackend>(
        backend: &mut B,
        bake: &CloudBakePass,
        target_format: TextureFormat,
        rotation_speed: f32,
    ) -> BackendResult<Self> {
        let mesh = SkyboxMesh::cube();
        let vertex_buffer = backend.create_buffer_init(
            &BufferDescriptor {
                label: "Skybox Vertices".into(),
                size: mesh.vertex_bytes().len() as u64,
                role: BufferRole::Vertex,
            },
            mesh.vertex_bytes(),
        )?;
        let index_bytes = mesh.index_bytes();
        let index_buffer = backend.create_buffer_init(
            &BufferDescriptor {
                label: "Skybox Indices".into(),
                size: index_bytes.len() as u64,
                role: BufferRole::Index,
            },
            &index_bytes,
        )?;

        let uniform_buffer = backend.create_buffer(&BufferDescriptor {
            label: "Skybox Uniforms".into(),
            size: std::mem::size_of::<SkyUniform>() as u64,
            role: BufferRole::Uniform,
        })?;

        let camera_layout = backend.create_bind_group_layout(&[BindGroupLayoutEntry {
            binding: 0,
            visibility: ShaderVisibility::VertexFragment,
            ty: BindingType::UniformBuffer,
        }])?;
        let face_layout = backend.create_bind_group_layout(&[
            BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderVisibility::Fragment,
                ty: BindingType::Texture,
            },
            BindGroupLayoutEntry {
                binding: 1,
                visibility: ShaderVisibility::Fragment,
                ty: BindingType::Sampler,
            },
        ])?;

        let camera_bind_group = backend
            .create_bind_group(camera_layout, &[(0, BindGroupEntry::Buffer(uniform_buffer))])?;

        let sampler = backend.create_sampler("Skybox Sampler")?;

        // One bind group per face; the draw loop swaps them between quads
        let face_bind_groups = CubeFace::ALL
            .iter()
            .map(|&face| {
                backend.create_bind_group(
                    face_layout,
                    &[
                        (0, BindGroupEntry::Texture(bake.face_view(face))),
                        (1, BindGroupEntry::Sampler(sampler)),
                    ],
                )
            })
            .collect::<BackendResult<Vec<_>>>()?;

        let pipeline = backend.create_render_pipeline(&RenderPipelineDescriptor {
            label: "Skybox Pipeline".into(),
            shader: SKYBOX_SHADER,
            vertex_layouts: vec![SkyVertex::layout()],
            bind_group_layouts: vec![camera_layout, face_layout],
            target_format,
        })?;

        Ok(Self {
            pipeline,
            uniform_buffer,
            camera_bind_group,
            face_bind_groups,
            vertex_buffer,
            index_buffer,
            srgb_target: target_format.is_srgb(),
            ambient_angle: 0.0,
            rotation_speed,
        })
    }

    /// Advance the ambient spin by `dt` seconds. The angle is left unbounded.
    pub fn advance_rotation(&mut self, dt: f32) {
        self.ambient_angle += self.rotation_speed * dt;
    }

    pub fn ambient_angle(&self) -> f32 {
        self.ambient_angle
    }

    pub fn draw<B: GraphicsBackend>(
        &self,
        backend: &mut B,
        target: TextureViewHandle,
        projection: &Projection,
        head: HeadOrientation,
    ) {
        let orientation = skybox_orientation(head.yaw, head.pitch, self.ambient_angle);
        let uniform = SkyUniform {
            view_proj: projection.matrix() * Mat4::from_mat3(orientation),
            output: Vec4::new(if self.srgb_target { 1.0 } else { 0.0 }, 0.0, 0.0, 0.0),
        };
        backend.write_buffer(self.uniform_buffer, bytemuck::bytes_of(&uniform));

        backend.begin_render_pass(&RenderPassDescriptor {
            label: "Skybox Pass".into(),
            target,
            load_op: LoadOp::Clear([0.0, 0.0, 0.0, 1.0]),
        });
        backend.set_render_pipeline(self.pipeline);
        backend.set_bind_group(0, self.camera_bind_group);
        backend.set_vertex_buffer(self.vertex_buffer);
        backend.set_index_buffer(self.index_buffer);
        for (face, bind_group) in CubeFace::ALL.iter().zip(&self.face_bind_groups) {
            backend.set_bind_group(1, *bind_group);
            backend.draw_indexed(SkyboxMesh::face_indices(*face));
        }
        backend.end_render_pass();
    }
}

pub const SKYBOX_SHADER: &str = r#"
struct SkyUniforms {
    view_proj: mat4x4<f32>,
    output: vec4<f32>,
}

@group(0) @binding(0) var<uniform> sky: SkyUniforms;
@group(1) @binding(0) var face_texture: texture_2d<f32>;
@group(1) @binding(1) var face_sampler: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) uv: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var output: VertexOutput;
    output.clip_position = sky.view_proj * vec4<f32>(input.position, 1.0);
    output.uv = input.uv;
    return output;
}

// Baked texels are display-ready; undo the encode an sRGB target applies on write
fn srgb_to_linear(c: vec3<f32>) -> vec3<f32> {
    let low = c / 12.92;
    let high = pow((c + 0.055) / 1.055, vec3<f32>(2.4));
    return select(high, low, c <= vec3<f32>(0.04045));
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let texel = textureSample(face_texture, face_sampler, input.uv);
    var color = texel.rgb;
    if (sky.output.x > 0.5) {
        color = srgb_to_linear(color);
    }
    return vec4<f32>(color, 1.0);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn neutral_orientation_is_identity() {
        assert!(skybox_orientation(0.0, 0.0, 0.0).abs_diff_eq(Mat3::IDENTITY, 1e-6));
    }

    #[test]
    fn yaw_turns_the_view_toward_pos_x() {
        // Looking right by a quarter turn brings the +X face to the view axis
        let view = skybox_orientation(-FRAC_PI_2, 0.0, 0.0);
        assert!((view * Vec3::X).abs_diff_eq(Vec3::NEG_Z, 1e-5));
    }

    #[test]
    fn sky_uniform_is_80_bytes() {
        assert_eq!(std::mem::size_of::<SkyUniform>(), 80);
    }
}
