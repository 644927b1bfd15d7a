//! Cloud bake pass
//!
//! Renders one scheduler tile per call into one of the six face targets. The fragment shader
//! runs the same ray march as `clouds::density`.

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::clouds::{CloudParams, CloudSky, CubeFace, NoiseLayout, TileJob, NOISE_LAYER_COUNT};
use crate::resources::GpuTexture;
use bytemuck::{Pod, Zeroable};
use glam::Mat4;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct NoiseLayerUniform {
    /// xyz translation, w scale
    pub transform: [f32; 4],
    /// x slope, y offset
    pub response: [f32; 4],
}

/// Mirrors `CloudParams` in the bake shader
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct CloudParamsUniform {
    /// t_min, density falloff distance, t_max, step size
    pub march: [f32; 4],
    /// t_max to sun, sun step size, light absorption, fog
    pub sun_march: [f32; 4],
    pub sun_direction: [f32; 4],
    pub sky: [f32; 4],
    pub dark: [f32; 4],
    pub light: [f32; 4],
    /// base dimension, row length, texture dimension
    pub noise_info: [f32; 4],
    pub layers: [NoiseLayerUniform; NOISE_LAYER_COUNT],
}

impl CloudParamsUniform {
    pub fn new(params: &CloudParams, noise: NoiseLayout) -> Self {
        let m = &params.march;
        let p = &params.palette;
        Self {
            march: [m.t_min, m.density_falloff_distance, m.t_max, m.step_size],
            sun_march: [m.t_max_to_sun, m.step_size_to_sun, m.light_absorption, m.fog],
            sun_direction: params.sun_direction.extend(0.0).to_array(),
            sky: p.sky.extend(1.0).to_array(),
            dark: p.dark.extend(1.0).to_array(),
            light: p.light.extend(1.0).to_array(),
            noise_info: [
                noise.base_dimension as f32,
                noise.row_length as f32,
                noise.texture_dimension() as f32,
                0.0,
            ],
            layers: params.layers.map(|layer| NoiseLayerUniform {
                transform: layer.translation.extend(layer.scale).to_array(),
                response: [layer.slope, layer.offset, 0.0, 0.0],
            }),
        }
    }
}

/// Mirrors `TileParams` in the bake shader
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct TileUniform {
    pub rotation: Mat4,
    /// Pixel rectangle: x, y, width, height
    pub rect: [f32; 4],
    /// Face width, face height, panel index, lightning stage
    pub face: [f32; 4],
}

impl TileUniform {
    pub fn new(job: &TileJob, face_width: u32, face_height: u32) -> Self {
        Self {
            rotation: Mat4::from_mat3(job.rotation),
            rect: [
                job.rect.x as f32,
                job.rect.y as f32,
                job.rect.width as f32,
                job.rect.height as f32,
            ],
            face: [
                face_width as f32,
                face_height as f32,
                job.face.panel_index() as f32,
                job.stage as f32,
            ],
        }
    }
}

pub struct CloudBakePass {
    faces: Vec<GpuTexture>,
    noise_texture: GpuTexture,
    params_buffer: BufferHandle,
    tile_buffer: BufferHandle,
    bind_group: BindGroupHandle,
    pipeline: RenderPipelineHandle,
    uploaded_params_revision: Option<u64>,
    uploaded_noise_revision: Option<u64>,
}

impl CloudBakePass {
    pub fn new<B: GraphicsBackend>(backend: &mut B, sky: &CloudSky) -> BackendResult<Self> {
        let layout = sky.layout();
        let noise_layout = sky.noise().layout();

        let faces = CubeFace::ALL
            .iter()
            .map(|face| {
                GpuTexture::create_render_target(
                    backend,
                    &format!("cloud_face_{}", face.name()),
                    layout.face_width(),
                    layout.face_height(),
                )
            })
            .collect::<BackendResult<Vec<_>>>()?;

        let noise_dim = noise_layout.texture_dimension();
        let noise_texture =
            GpuTexture::create_uploadable(backend, "cloud_noise", noise_dim, noise_dim)?;

        let params_buffer = backend.create_buffer(&BufferDescriptor {
            label: "Cloud Params".into(),
            size: std::mem::size_of::<CloudParamsUniform>() as u64,
            role: BufferRole::Uniform,
        })?;
        let tile_buffer = backend.create_buffer(&BufferDescriptor {
            label: "Cloud Tile".into(),
            size: std::mem::size_of::<TileUniform>() as u64,
            role: BufferRole::Uniform,
        })?;

        let bind_group_layout = backend.create_bind_group_layout(&[
            BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderVisibility::Fragment,
                ty: BindingType::UniformBuffer,
            },
            BindGroupLayoutEntry {
                binding: 1,
                visibility: ShaderVisibility::VertexFragment,
                ty: BindingType::UniformBuffer,
            },
            BindGroupLayoutEntry {
                binding: 2,
                visibility: ShaderVisibility::Fragment,
                ty: BindingType::Texture,
            },
        ])?;

        let bind_group = backend.create_bind_group(
            bind_group_layout,
            &[
                (0, BindGroupEntry::Buffer(params_buffer)),
                (1, BindGroupEntry::Buffer(tile_buffer)),
                (2, BindGroupEntry::Texture(noise_texture.view)),
            ],
        )?;

        // The tile quad is placed by the vertex shader, so no vertex buffers
        let pipeline = backend.create_render_pipeline(&RenderPipelineDescriptor {
            label: "Cloud Bake Pipeline".into(),
            shader: CLOUD_BAKE_SHADER,
            vertex_layouts: vec![],
            bind_group_layouts: vec![bind_group_layout],
            target_format: TextureFormat::Rgba8Unorm,
        })?;

        log::info!(
            "Cloud bake targets: 6 x {}x{}, noise {}x{}",
            layout.face_width(),
            layout.face_height(),
            noise_dim,
            noise_dim
        );

        Ok(Self {
            faces,
            noise_texture,
            params_buffer,
            tile_buffer,
            bind_group,
            pipeline,
            uploaded_params_revision: None,
            uploaded_noise_revision: None,
        })
    }

    /// Upload parameters and noise that changed since the last sync
    pub fn sync<B: GraphicsBackend>(&mut self, backend: &mut B, sky: &CloudSky) {
        if self.uploaded_params_revision != Some(sky.params_revision()) {
            let uniform = CloudParamsUniform::new(sky.params(), sky.noise().layout());
            backend.write_buffer(self.params_buffer, bytemuck::bytes_of(&uniform));
            self.uploaded_params_revision = Some(sky.params_revision());
        }

        if self.uploaded_noise_revision != Some(sky.noise_revision()) {
            self.noise_texture.upload(backend, sky.noise().bytes());
            self.uploaded_noise_revision = Some(sky.noise_revision());
        }
    }

    /// Record one tile. The tile uniform is a single buffer, so at most one tile per frame.
    pub fn render_tile<B: GraphicsBackend>(&self, backend: &mut B, job: &TileJob) {
        let face = &self.faces[job.face.panel_index() as usize];
        let tile = TileUniform::new(job, face.width, face.height);
        backend.write_buffer(self.tile_buffer, bytemuck::bytes_of(&tile));

        backend.begin_render_pass(&RenderPassDescriptor {
            label: "Cloud Bake Pass".into(),
            target: face.view,
            load_op: LoadOp::Load,
        });
        backend.set_render_pipeline(self.pipeline);
        backend.set_bind_group(0, self.bind_group);
        backend.draw(0..6);
        backend.end_render_pass();
    }

    pub fn face_view(&self, face: CubeFace) -> TextureViewHandle {
        self.faces[face.panel_index() as usize].view
    }
}

pub const CLOUD_BAKE_SHADER: &str = r#"
const MAX_VIEW_STEPS: i32 = 512;
const MAX_SUN_STEPS: i32 = 64;
const LAYER_COUNT: i32 = 5;
const DENSITY_THRESHOLD: f32 = 0.01;

struct NoiseLayer {
    transform: vec4<f32>,
    response: vec4<f32>,
}

struct CloudParams {
    march: vec4<f32>,
    sun_march: vec4<f32>,
    sun_direction: vec4<f32>,
    sky: vec4<f32>,
    dark: vec4<f32>,
    light: vec4<f32>,
    noise_info: vec4<f32>,
    layers: array<NoiseLayer, 5>,
}

struct TileParams {
    rotation: mat4x4<f32>,
    rect: vec4<f32>,
    face: vec4<f32>,
}

@group(0) @binding(0) var<uniform> cloud: CloudParams;
@group(0) @binding(1) var<uniform> tile: TileParams;
@group(0) @binding(2) var noise_texture: texture_2d<f32>;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
}

@vertex
fn vs_main(@builtin(vertex_index) vertex_index: u32) -> VertexOutput {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(0.0, 0.0),
        vec2<f32>(1.0, 0.0),
        vec2<f32>(0.0, 1.0),
        vec2<f32>(0.0, 1.0),
        vec2<f32>(1.0, 0.0),
        vec2<f32>(1.0, 1.0),
    );
    let pixel = tile.rect.xy + corners[vertex_index] * tile.rect.zw;
    let ndc = vec2<f32>(pixel.x / tile.face.x * 2.0 - 1.0, 1.0 - pixel.y / tile.face.y * 2.0);

    var output: VertexOutput;
    output.position = vec4<f32>(ndc, 0.0, 1.0);
    return output;
}

fn lattice_gradient(cell: vec3<i32>) -> vec3<f32> {
    let base = i32(cloud.noise_info.x);
    let row_length = i32(cloud.noise_info.y);
    let wrapped = ((cell % vec3<i32>(base)) + vec3<i32>(base)) % vec3<i32>(base);
    let col = wrapped.z % row_length;
    let row = wrapped.z / row_length;
    let texel = vec2<i32>(col * base + wrapped.x, row * base + wrapped.y);
    return textureLoad(noise_texture, texel, 0).rgb * 2.0 - 1.0;
}

fn corner_contribution(cell: vec3<i32>, f: vec3<f32>, offset: vec3<i32>) -> f32 {
    return dot(lattice_gradient(cell + offset), f - vec3<f32>(offset));
}

fn gradient_noise(p: vec3<f32>) -> f32 {
    let cell_floor = floor(p);
    let cell = vec3<i32>(cell_floor);
    let f = p - cell_floor;

    let n000 = corner_contribution(cell, f, vec3<i32>(0, 0, 0));
    let n100 = corner_contribution(cell, f, vec3<i32>(1, 0, 0));
    let n010 = corner_contribution(cell, f, vec3<i32>(0, 1, 0));
    let n110 = corner_contribution(cell, f, vec3<i32>(1, 1, 0));
    let n001 = corner_contribution(cell, f, vec3<i32>(0, 0, 1));
    let n101 = corner_contribution(cell, f, vec3<i32>(1, 0, 1));
    let n011 = corner_contribution(cell, f, vec3<i32>(0, 1, 1));
    let n111 = corner_contribution(cell, f, vec3<i32>(1, 1, 1));

    let u = f * f * (vec3<f32>(3.0) - 2.0 * f);
    let x00 = mix(n000, n100, u.x);
    let x10 = mix(n010, n110, u.x);
    let x01 = mix(n001, n101, u.x);
    let x11 = mix(n011, n111, u.x);
    let y0 = mix(x00, x10, u.y);
    let y1 = mix(x01, x11, u.y);
    return mix(y0, y1, u.z);
}

fn layered_density(p: vec3<f32>) -> f32 {
    var total: f32 = 0.0;
    for (var i: i32 = 0; i < LAYER_COUNT; i = i + 1) {
        let layer = cloud.layers[i];
        let q = p * layer.transform.w + layer.transform.xyz;
        total = total + clamp(gradient_noise(q) * layer.response.x + layer.response.y, 0.0, 1.0);
    }
    return clamp(total, 0.0, 1.0);
}

fn falloff_multiplier(from_center: f32) -> f32 {
    let t_min = cloud.march.x;
    let falloff_distance = cloud.march.y;
    if (from_center >= falloff_distance) {
        return 1.0;
    }
    let span = falloff_distance - t_min;
    if (span <= 0.0) {
        return 0.0;
    }
    return clamp((from_center - t_min) / span, 0.0, 1.0);
}

fn density_at(p: vec3<f32>) -> f32 {
    return layered_density(p) * falloff_multiplier(length(p));
}

fn density_to_sun(p: vec3<f32>) -> f32 {
    let toward_sun = -cloud.sun_direction.xyz;
    let t_max_to_sun = cloud.sun_march.x;
    let sun_step = cloud.sun_march.y;
    var accumulated: f32 = 0.0;
    var s: f32 = sun_step;
    for (var i: i32 = 0; i < MAX_SUN_STEPS; i = i + 1) {
        if (s > t_max_to_sun) {
            break;
        }
        accumulated = accumulated + density_at(p + toward_sun * s) * sun_step;
        s = s + sun_step;
    }
    return clamp(accumulated, 0.0, 1.0);
}

fn shade_ray(origin: vec3<f32>, direction: vec3<f32>) -> vec4<f32> {
    let t_min = cloud.march.x;
    let t_max = cloud.march.z;
    let view_step = cloud.march.w;
    let absorption = cloud.sun_march.z;
    let fog = cloud.sun_march.w;

    var color = vec3<f32>(0.0, 0.0, 0.0);
    var alpha: f32 = 0.0;
    var t: f32 = t_min;
    for (var i: i32 = 0; i < MAX_VIEW_STEPS; i = i + 1) {
        if (t > t_max) {
            break;
        }
        let p = origin + direction * t;
        let density = density_at(p);
        if (density > DENSITY_THRESHOLD) {
            let to_sun = density_to_sun(p);
            let brightness = exp(-absorption * to_sun);
            let lit = mix(cloud.dark.rgb, cloud.light.rgb, vec3<f32>(brightness));
            let point_color = mix(cloud.sky.rgb, lit, vec3<f32>(exp(-fog * t)));

            let weight = density * (1.0 - alpha);
            color = clamp(color + point_color * weight, vec3<f32>(0.0), vec3<f32>(1.0));
            alpha = clamp(alpha + weight, 0.0, 1.0);
            if (alpha >= 1.0) {
                break;
            }
        }
        t = t + view_step;
    }

    return vec4<f32>(color + cloud.sky.rgb * (1.0 - alpha), 1.0);
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let clip = vec2<f32>(
        input.position.x / tile.face.x * 2.0 - 1.0,
        1.0 - input.position.y / tile.face.y * 2.0,
    );
    let rotation = mat3x3<f32>(tile.rotation[0].xyz, tile.rotation[1].xyz, tile.rotation[2].xyz);
    let direction = normalize(rotation * vec3<f32>(clip, -1.0));
    return shade_ray(vec3<f32>(0.0, 0.0, 0.0), direction);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_sizes_match_shader_layout() {
        assert_eq!(std::mem::size_of::<NoiseLayerUniform>(), 32);
        assert_eq!(std::mem::size_of::<CloudParamsUniform>(), 272);
        assert_eq!(std::mem::size_of::<TileUniform>(), 96);
    }

    #[test]
    fn params_uniform_packs_layers() {
        let params = CloudParams::default();
        let uniform = CloudParamsUniform::new(&params, NoiseLayout::default());
        assert_eq!(uniform.noise_info[..3], [16.0, 4.0, 64.0]);
        assert_eq!(uniform.layers[1].transform, [13.2, 4.1, 7.7, 0.11]);
        assert_eq!(uniform.layers[1].response[..2], [0.9, -0.05]);
    }
}
