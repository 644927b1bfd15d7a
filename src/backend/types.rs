//! Descriptor types shared by the cloud passes and the backends
//!
//! Every texture a pass owns is RGBA8 unorm: the noise volume, and the six faces the bake
//! renders into. Only the swapchain comes in other formats.

/// Bytes per texel of the RGBA8 textures
pub const TEXEL_BYTES: u32 = 4;

/// Color formats a pipeline can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    Bgra8UnormSrgb,
}

impl TextureFormat {
    /// Whether writes are re-encoded to sRGB by the hardware
    pub fn is_srgb(&self) -> bool {
        matches!(
            self,
            TextureFormat::Rgba8UnormSrgb | TextureFormat::Bgra8UnormSrgb
        )
    }
}

/// What a texture is used for, which fixes its GPU usage flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureRole {
    /// Filled from the CPU, sampled by shaders
    Upload,
    /// Rendered into tile by tile, sampled by the skybox
    RenderTarget,
}

#[derive(Debug, Clone)]
pub struct TextureDescriptor {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub role: TextureRole,
}

/// What a buffer holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferRole {
    /// Rewritten through `write_buffer` whenever its contents change
    Uniform,
    Vertex,
    /// `u16` indices
    Index,
}

#[derive(Debug, Clone)]
pub struct BufferDescriptor {
    pub label: String,
    pub size: u64,
    pub role: BufferRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexFormat {
    Float32x2,
    Float32x3,
}

impl VertexFormat {
    pub fn size(&self) -> u64 {
        match self {
            VertexFormat::Float32x2 => 8,
            VertexFormat::Float32x3 => 12,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VertexAttribute {
    pub location: u32,
    pub format: VertexFormat,
    pub offset: u64,
}

/// Per-vertex buffer layout
#[derive(Debug, Clone)]
pub struct VertexBufferLayout {
    pub array_stride: u64,
    pub attributes: Vec<VertexAttribute>,
}
