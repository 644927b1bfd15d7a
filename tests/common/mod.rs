//! Common utilities for integration tests.
//!
//! [`RecordingBackend`] implements `GraphicsBackend` without a GPU. It hands out fresh handles
//! and logs every recorded command so tests can check what a frame did and in which order.

#![allow(dead_code)]

use std::ops::Range;
use std::sync::Arc;

use cloud_skybox::backend::*;
use cloud_skybox::{EngineConfig, SkyboxLayout};

/// One command as the engine recorded it
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    BeginFrame,
    EndFrame,
    BeginPass {
        label: String,
        target: TextureViewHandle,
        load_op: LoadOp,
    },
    EndPass,
    WriteBuffer {
        buffer: BufferHandle,
        len: usize,
    },
    WriteTexture {
        texture: TextureHandle,
        width: u32,
        height: u32,
    },
    Draw {
        vertices: Range<u32>,
    },
    DrawIndexed {
        indices: Range<u32>,
    },
}

pub struct RecordingBackend {
    width: u32,
    height: u32,
    next_id: u64,
    in_frame: bool,
    lose_next_frame: bool,
    swapchain_view: TextureViewHandle,
    commands: Vec<Command>,
}

impl RecordingBackend {
    pub fn headless(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            next_id: 1,
            in_frame: false,
            lose_next_frame: false,
            swapchain_view: TextureViewHandle::from_raw(0),
            commands: Vec::new(),
        }
    }

    fn next(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Make the next begin_frame fail as if the surface went away
    pub fn lose_surface_once(&mut self) {
        self.lose_next_frame = true;
    }

    pub fn swapchain_view(&self) -> TextureViewHandle {
        self.swapchain_view
    }

    /// Drain the command log
    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }
}

/// Labels of the passes in `commands`, in recording order
pub fn pass_labels(commands: &[Command]) -> Vec<String> {
    commands
        .iter()
        .filter_map(|command| match command {
            Command::BeginPass { label, .. } => Some(label.clone()),
            _ => None,
        })
        .collect()
}

pub fn count_passes(commands: &[Command], label: &str) -> usize {
    pass_labels(commands).iter().filter(|l| *l == label).count()
}

pub fn indexed_draws(commands: &[Command]) -> Vec<Range<u32>> {
    commands
        .iter()
        .filter_map(|command| match command {
            Command::DrawIndexed { indices } => Some(indices.clone()),
            _ => None,
        })
        .collect()
}

pub const BAKE_PASS: &str = "Cloud Bake Pass";
pub const SKYBOX_PASS: &str = "Skybox Pass";

/// 4px tiles, 2x2 per face: 24 tiles per bake
pub fn small_config() -> EngineConfig {
    EngineConfig {
        layout: SkyboxLayout::new(4, 2, 2, 1),
        noise_seed: Some(7),
        ..EngineConfig::default()
    }
}

impl GraphicsBackend for RecordingBackend {
    fn new(_window: Arc<winit::window::Window>, _vsync: bool) -> BackendResult<Self> {
        Err(BackendError::InitializationFailed(
            "recording backend is headless".into(),
        ))
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.width = width;
            self.height = height;
        }
    }

    fn surface_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn begin_frame(&mut self) -> BackendResult<FrameContext> {
        if std::mem::take(&mut self.lose_next_frame) {
            return Err(BackendError::SurfaceLost);
        }
        let view = self.next();
        self.swapchain_view = TextureViewHandle::from_raw(view);
        self.in_frame = true;
        self.commands.push(Command::BeginFrame);
        Ok(FrameContext {
            swapchain_view: self.swapchain_view,
            width: self.width,
            height: self.height,
        })
    }

    fn end_frame(&mut self) -> BackendResult<()> {
        self.in_frame = false;
        self.commands.push(Command::EndFrame);
        Ok(())
    }

    fn swapchain_format(&self) -> TextureFormat {
        TextureFormat::Bgra8UnormSrgb
    }

    fn create_buffer(&mut self, _desc: &BufferDescriptor) -> BackendResult<BufferHandle> {
        Ok(BufferHandle::from_raw(self.next()))
    }

    fn create_buffer_init(
        &mut self,
        desc: &BufferDescriptor,
        _data: &[u8],
    ) -> BackendResult<BufferHandle> {
        self.create_buffer(desc)
    }

    fn write_buffer(&mut self, buffer: BufferHandle, data: &[u8]) {
        self.commands.push(Command::WriteBuffer {
            buffer,
            len: data.len(),
        });
    }

    fn create_texture(&mut self, _desc: &TextureDescriptor) -> BackendResult<TextureHandle> {
        Ok(TextureHandle::from_raw(self.next()))
    }

    fn create_texture_view(&mut self, _texture: TextureHandle) -> BackendResult<TextureViewHandle> {
        Ok(TextureViewHandle::from_raw(self.next()))
    }

    fn write_texture(&mut self, texture: TextureHandle, _data: &[u8], width: u32, height: u32) {
        self.commands.push(Command::WriteTexture {
            texture,
            width,
            height,
        });
    }

    fn create_sampler(&mut self, _label: &str) -> BackendResult<SamplerHandle> {
        Ok(SamplerHandle::from_raw(self.next()))
    }

    fn create_bind_group_layout(
        &mut self,
        _entries: &[BindGroupLayoutEntry],
    ) -> BackendResult<BindGroupLayoutHandle> {
        Ok(BindGroupLayoutHandle::from_raw(self.next()))
    }

    fn create_bind_group(
        &mut self,
        _layout: BindGroupLayoutHandle,
        _entries: &[(u32, BindGroupEntry)],
    ) -> BackendResult<BindGroupHandle> {
        Ok(BindGroupHandle::from_raw(self.next()))
    }

    fn create_render_pipeline(
        &mut self,
        _desc: &RenderPipelineDescriptor,
    ) -> BackendResult<RenderPipelineHandle> {
        Ok(RenderPipelineHandle::from_raw(self.next()))
    }

    fn begin_render_pass(&mut self, desc: &RenderPassDescriptor) {
        assert!(self.in_frame, "render pass outside a frame");
        self.commands.push(Command::BeginPass {
            label: desc.label.clone(),
            target: desc.target,
            load_op: desc.load_op.clone(),
        });
    }

    fn end_render_pass(&mut self) {
        self.commands.push(Command::EndPass);
    }

    fn set_render_pipeline(&mut self, _pipeline: RenderPipelineHandle) {}

    fn set_bind_group(&mut self, _index: u32, _bind_group: BindGroupHandle) {}

    fn set_vertex_buffer(&mut self, _buffer: BufferHandle) {}

    fn set_index_buffer(&mut self, _buffer: BufferHandle) {}

    fn draw(&mut self, vertices: Range<u32>) {
        self.commands.push(Command::Draw { vertices });
    }

    fn draw_indexed(&mut self, indices: Range<u32>) {
        self.commands.push(Command::DrawIndexed { indices });
    }
}
