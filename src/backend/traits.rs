//! Core backend abstraction traits
//!
//! The bake and skybox passes only talk to the GPU through [`GraphicsBackend`], so the
//! same pass code drives wgpu at runtime and a recording backend in tests.

use crate::backend::types::*;
use std::ops::Range;
use std::sync::Arc;
use thiserror::Error;

/// Backend error type
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Failed to initialize backend: {0}")]
    InitializationFailed(String),
    #[error("Failed to create surface: {0}")]
    SurfaceCreationFailed(String),
    #[error("Failed to create device: {0}")]
    DeviceCreationFailed(String),
    #[error("Failed to acquire next image: {0}")]
    AcquireImageFailed(String),
    #[error("Failed to create texture: {0}")]
    TextureCreationFailed(String),
    #[error("Failed to create pipeline: {0}")]
    PipelineCreationFailed(String),
    #[error("Surface lost")]
    SurfaceLost,
    #[error("Out of memory")]
    OutOfMemory,
}

pub type BackendResult<T> = Result<T, BackendError>;

macro_rules! gpu_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(pub(crate) u64);

        impl $name {
            /// Wrap a backend-assigned id.
            pub const fn from_raw(id: u64) -> Self {
                Self(id)
            }

            pub const fn raw(self) -> u64 {
                self.0
            }
        }
    };
}

gpu_handle!(BufferHandle);
gpu_handle!(TextureHandle);
gpu_handle!(
    /// A texture view, or the swapchain image of the frame in flight
    TextureViewHandle
);
gpu_handle!(SamplerHandle);
gpu_handle!(RenderPipelineHandle);
gpu_handle!(BindGroupHandle);
gpu_handle!(BindGroupLayoutHandle);

/// Resource bound at one slot of a bind group
#[derive(Debug, Clone, Copy)]
pub enum BindGroupEntry {
    /// Whole uniform buffer
    Buffer(BufferHandle),
    Texture(TextureViewHandle),
    Sampler(SamplerHandle),
}

/// Shader stages that see a binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderVisibility {
    Fragment,
    VertexFragment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingType {
    UniformBuffer,
    /// Filterable float 2D texture
    Texture,
    /// Filtering sampler
    Sampler,
}

#[derive(Debug, Clone)]
pub struct BindGroupLayoutEntry {
    pub binding: u32,
    pub visibility: ShaderVisibility,
    pub ty: BindingType,
}

/// Render pipeline descriptor
///
/// `shader` is a WGSL module with `vs_main` and `fs_main` entry points. Pipelines draw
/// triangle lists without culling, blending or depth into a single color target: the skybox
/// is seen from inside and the bake overwrites whole tiles.
#[derive(Debug, Clone)]
pub struct RenderPipelineDescriptor {
    pub label: String,
    pub shader: &'static str,
    pub vertex_layouts: Vec<VertexBufferLayout>,
    pub bind_group_layouts: Vec<BindGroupLayoutHandle>,
    pub target_format: TextureFormat,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOp {
    Clear([f32; 4]),
    Load,
}

/// A render pass into one color target. The result is always stored.
#[derive(Debug, Clone)]
pub struct RenderPassDescriptor {
    pub label: String,
    pub target: TextureViewHandle,
    pub load_op: LoadOp,
}

/// Frame context returned when beginning a frame
pub struct FrameContext {
    pub swapchain_view: TextureViewHandle,
    pub width: u32,
    pub height: u32,
}

/// Main graphics backend trait
pub trait GraphicsBackend: Sized {
    /// Create a new backend instance
    fn new(window: Arc<winit::window::Window>, vsync: bool) -> BackendResult<Self>;

    /// Resize the swapchain
    fn resize(&mut self, width: u32, height: u32);

    /// Get the actual surface size (may be clamped by device limits)
    fn surface_size(&self) -> (u32, u32);

    /// Acquire the next swapchain image and start recording
    fn begin_frame(&mut self) -> BackendResult<FrameContext>;

    /// Submit everything recorded since begin_frame and present
    fn end_frame(&mut self) -> BackendResult<()>;

    fn swapchain_format(&self) -> TextureFormat;

    // Resources

    fn create_buffer(&mut self, desc: &BufferDescriptor) -> BackendResult<BufferHandle>;

    fn create_buffer_init(&mut self, desc: &BufferDescriptor, data: &[u8])
        -> BackendResult<BufferHandle>;

    /// Overwrite a buffer from its start. Takes effect before the next submitted frame.
    fn write_buffer(&mut self, buffer: BufferHandle, data: &[u8]);

    /// Create an RGBA8 unorm texture
    fn create_texture(&mut self, desc: &TextureDescriptor) -> BackendResult<TextureHandle>;

    fn create_texture_view(&mut self, texture: TextureHandle) -> BackendResult<TextureViewHandle>;

    /// Replace the whole contents of an RGBA8 texture
    fn write_texture(&mut self, texture: TextureHandle, data: &[u8], width: u32, height: u32);

    /// Linear sampler clamped at the edges, so neighboring faces do not bleed into each other
    fn create_sampler(&mut self, label: &str) -> BackendResult<SamplerHandle>;

    // Pipelines

    fn create_bind_group_layout(
        &mut self,
        entries: &[BindGroupLayoutEntry],
    ) -> BackendResult<BindGroupLayoutHandle>;

    fn create_bind_group(
        &mut self,
        layout: BindGroupLayoutHandle,
        entries: &[(u32, BindGroupEntry)],
    ) -> BackendResult<BindGroupHandle>;

    fn create_render_pipeline(
        &mut self,
        desc: &RenderPipelineDescriptor,
    ) -> BackendResult<RenderPipelineHandle>;

    // Recording. Commands between begin_render_pass and end_render_pass belong to that pass.

    fn begin_render_pass(&mut self, desc: &RenderPassDescriptor);

    fn end_render_pass(&mut self);

    fn set_render_pipeline(&mut self, pipeline: RenderPipelineHandle);

    fn set_bind_group(&mut self, index: u32, bind_group: BindGroupHandle);

    /// Bind the vertex buffer at slot 0
    fn set_vertex_buffer(&mut self, buffer: BufferHandle);

    /// Bind a buffer of `u16` indices
    fn set_index_buffer(&mut self, buffer: BufferHandle);

    /// Draw one instance
    fn draw(&mut self, vertices: Range<u32>);

    /// Draw one instance from the bound index buffer
    fn draw_indexed(&mut self, indices: Range<u32>);
}
