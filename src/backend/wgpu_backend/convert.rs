//! Mapping from backend descriptor types to wgpu

use crate::backend::traits::*;
use crate::backend::types::*;

pub(super) fn texture_format(format: TextureFormat) -> wgpu::TextureFormat {
    match format {
        TextureFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        TextureFormat::Rgba8UnormSrgb => wgpu::TextureFormat::Rgba8UnormSrgb,
        TextureFormat::Bgra8Unorm => wgpu::TextureFormat::Bgra8Unorm,
        TextureFormat::Bgra8UnormSrgb => wgpu::TextureFormat::Bgra8UnormSrgb,
    }
}

/// None for formats the skybox pipeline cannot target
pub(super) fn texture_format_from_wgpu(format: wgpu::TextureFormat) -> Option<TextureFormat> {
    match format {
        wgpu::TextureFormat::Rgba8Unorm => Some(TextureFormat::Rgba8Unorm),
        wgpu::TextureFormat::Rgba8UnormSrgb => Some(TextureFormat::Rgba8UnormSrgb),
        wgpu::TextureFormat::Bgra8Unorm => Some(TextureFormat::Bgra8Unorm),
        wgpu::TextureFormat::Bgra8UnormSrgb => Some(TextureFormat::Bgra8UnormSrgb),
        _ => None,
    }
}

/// First supported sRGB format, else the first supported one. Surfaces list their
/// preferred format first.
pub(super) fn pick_surface_format(
    formats: &[wgpu::TextureFormat],
) -> Option<wgpu::TextureFormat> {
    let supported = || {
        formats
            .iter()
            .copied()
            .filter(|&f| texture_format_from_wgpu(f).is_some())
    };
    supported().find(|f| f.is_srgb()).or_else(|| supported().next())
}

pub(super) fn texture_usages(role: TextureRole) -> wgpu::TextureUsages {
    match role {
        TextureRole::Upload => {
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST
        }
        TextureRole::RenderTarget => {
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING
        }
    }
}

pub(super) fn buffer_usages(role: BufferRole) -> wgpu::BufferUsages {
    match role {
        BufferRole::Uniform => wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        BufferRole::Vertex => wgpu::BufferUsages::VERTEX,
        BufferRole::Index => wgpu::BufferUsages::INDEX,
    }
}

pub(super) fn vertex_format(format: VertexFormat) -> wgpu::VertexFormat {
    match format {
        VertexFormat::Float32x2 => wgpu::VertexFormat::Float32x2,
        VertexFormat::Float32x3 => wgpu::VertexFormat::Float32x3,
    }
}

pub(super) fn shader_stages(visibility: ShaderVisibility) -> wgpu::ShaderStages {
    match visibility {
        ShaderVisibility::Fragment => wgpu::ShaderStages::FRAGMENT,
        ShaderVisibility::VertexFragment => wgpu::ShaderStages::VERTEX_FRAGMENT,
    }
}

pub(super) fn binding_type(ty: BindingType) -> wgpu::BindingType {
    match ty {
        BindingType::UniformBuffer => wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        BindingType::Texture => wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        BindingType::Sampler => wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
    }
}

pub(super) fn load_op(op: &LoadOp) -> wgpu::LoadOp<wgpu::Color> {
    match op {
        LoadOp::Clear([r, g, b, a]) => wgpu::LoadOp::Clear(wgpu::Color {
            r: *r as f64,
            g: *g as f64,
            b: *b as f64,
            a: *a as f64,
        }),
        LoadOp::Load => wgpu::LoadOp::Load,
    }
}
