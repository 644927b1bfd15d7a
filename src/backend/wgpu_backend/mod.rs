//! wgpu backend
//!
//! Drives the cloud passes on native (any wgpu backend, WebGL2 limits) and on the web
//! (WebGL2 first, WebGPU as fallback).

mod convert;
mod pass;
mod store;

use crate::backend::traits::*;
use crate::backend::types::*;
use pass::{PassCommand, PendingPass};
use std::ops::Range;
use std::sync::Arc;
use store::ResourceStore;
use wgpu::util::DeviceExt;

/// Device and surface as they come out of adapter selection
struct GpuContext {
    instance: wgpu::Instance,
    surface: wgpu::Surface<'static>,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
}

/// wgpu backend implementation
pub struct WgpuBackend {
    // The surface was created from this instance
    _instance: wgpu::Instance,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_config: wgpu::SurfaceConfiguration,
    swapchain_format: TextureFormat,

    frame: Option<wgpu::SurfaceTexture>,
    // Handle id standing for the swapchain image of `frame`
    frame_view_id: u64,
    encoder: Option<wgpu::CommandEncoder>,
    pending_pass: Option<PendingPass>,

    store: ResourceStore,
}

/// Clamp a surface size to the device limit, keeping the aspect ratio
fn clamp_to_limit(width: u32, height: u32, max_size: u32) -> (u32, u32) {
    if width > max_size || height > max_size {
        let scale = (max_size as f32 / width as f32).min(max_size as f32 / height as f32);
        (
            ((width as f32 * scale) as u32).max(1),
            ((height as f32 * scale) as u32).max(1),
        )
    } else {
        (width.max(1), height.max(1))
    }
}

impl WgpuBackend {
    /// Async initialization - used directly on web, wrapped by `new` on native
    pub async fn new_async(window: Arc<winit::window::Window>, vsync: bool) -> BackendResult<Self> {
        #[cfg(target_arch = "wasm32")]
        let gpu = Self::open_web(window.clone()).await?;

        #[cfg(not(target_arch = "wasm32"))]
        let gpu = Self::open_gpu(
            window.clone(),
            wgpu::util::backend_bits_from_env().unwrap_or_else(wgpu::Backends::all),
            // WebGL2 limits on native too, so desktop runs catch what the browser would reject
            |adapter| wgpu::Limits::downlevel_webgl2_defaults().using_resolution(adapter.limits()),
        )
        .await?;

        let GpuContext {
            instance,
            surface,
            adapter,
            device,
            queue,
        } = gpu;

        let caps = surface.get_capabilities(&adapter);
        let format = convert::pick_surface_format(&caps.formats).ok_or_else(|| {
            BackendError::SurfaceCreationFailed(format!(
                "No 8-bit RGBA/BGRA surface format among {:?}",
                caps.formats
            ))
        })?;
        let swapchain_format = convert::texture_format_from_wgpu(format)
            .ok_or_else(|| BackendError::SurfaceCreationFailed(format!("{:?}", format)))?;

        let size = window.inner_size();
        let (width, height) = clamp_to_limit(
            size.width,
            size.height,
            device.limits().max_texture_dimension_2d,
        );
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: if vsync {
                wgpu::PresentMode::AutoVsync
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);
        log::info!("Surface {}x{} {:?}", width, height, format);

        Ok(Self {
            _instance: instance,
            surface,
            device,
            queue,
            surface_config,
            swapchain_format,
            frame: None,
            frame_view_id: 0,
            encoder: None,
            pending_pass: None,
            store: ResourceStore::new(),
        })
    }

    /// WebGL2 is the default on the web; WebGPU only when no GL context is available
    #[cfg(target_arch = "wasm32")]
    async fn open_web(window: Arc<winit::window::Window>) -> BackendResult<GpuContext> {
        match Self::open_gpu(window.clone(), wgpu::Backends::GL, |_| {
            wgpu::Limits::downlevel_webgl2_defaults()
        })
        .await
        {
            Ok(gpu) => return Ok(gpu),
            Err(e) => log::warn!("WebGL2 unavailable ({}), trying WebGPU", e),
        }

        Self::open_gpu(window, wgpu::Backends::BROWSER_WEBGPU, |_| wgpu::Limits::default())
            .await
            .map_err(|e| {
                BackendError::InitializationFailed(format!(
                    "Neither WebGL2 nor WebGPU could be initialized: {}",
                    e
                ))
            })
    }

    async fn open_gpu(
        window: Arc<winit::window::Window>,
        backends: wgpu::Backends,
        limits: impl FnOnce(&wgpu::Adapter) -> wgpu::Limits,
    ) -> BackendResult<GpuContext> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .map_err(|e| BackendError::SurfaceCreationFailed(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| {
                BackendError::InitializationFailed(format!("No adapter for {:?}", backends))
            })?;

        let info = adapter.get_info();
        log::info!("Selected GPU: {} ({:?} backend)", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Cloud Skybox Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: limits(&adapter),
                },
                None,
            )
            .await
            .map_err(|e| BackendError::DeviceCreationFailed(e.to_string()))?;

        Ok(GpuContext {
            instance,
            surface,
            adapter,
            device,
            queue,
        })
    }

    fn push(&mut self, command: PassCommand) {
        pass::record(&mut self.pending_pass, command);
    }
}

impl GraphicsBackend for WgpuBackend {
    #[cfg(not(target_arch = "wasm32"))]
    fn new(window: Arc<winit::window::Window>, vsync: bool) -> BackendResult<Self> {
        pollster::block_on(Self::new_async(window, vsync))
    }

    #[cfg(target_arch = "wasm32")]
    fn new(_window: Arc<winit::window::Window>, _vsync: bool) -> BackendResult<Self> {
        Err(BackendError::InitializationFailed(
            "Use WgpuBackend::new_async() on web platform".into(),
        ))
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        let max_size = self.device.limits().max_texture_dimension_2d;
        let (width, height) = clamp_to_limit(width, height, max_size);
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);
    }

    fn surface_size(&self) -> (u32, u32) {
        (self.surface_config.width, self.surface_config.height)
    }

    fn begin_frame(&mut self) -> BackendResult<FrameContext> {
        let frame = self.surface.get_current_texture().map_err(|e| match e {
            wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => BackendError::SurfaceLost,
            wgpu::SurfaceError::OutOfMemory => BackendError::OutOfMemory,
            _ => BackendError::AcquireImageFailed(e.to_string()),
        })?;

        self.frame = Some(frame);
        self.frame_view_id = self.store.allocate_id();
        self.encoder = Some(
            self.device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Frame Encoder"),
                }),
        );

        Ok(FrameContext {
            swapchain_view: TextureViewHandle(self.frame_view_id),
            width: self.surface_config.width,
            height: self.surface_config.height,
        })
    }

    fn end_frame(&mut self) -> BackendResult<()> {
        if let Some(encoder) = self.encoder.take() {
            self.queue.submit(std::iter::once(encoder.finish()));
        }
        if let Some(frame) = self.frame.take() {
            frame.present();
        }
        Ok(())
    }

    fn swapchain_format(&self) -> TextureFormat {
        self.swapchain_format
    }

    fn create_buffer(&mut self, desc: &BufferDescriptor) -> BackendResult<BufferHandle> {
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(desc.label.as_str()),
            size: desc.size,
            usage: convert::buffer_usages(desc.role),
            mapped_at_creation: false,
        });
        let id = self.store.allocate_id();
        self.store.buffers.insert(id, buffer);
        Ok(BufferHandle(id))
    }

    fn create_buffer_init(
        &mut self,
        desc: &BufferDescriptor,
        data: &[u8],
    ) -> BackendResult<BufferHandle> {
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(desc.label.as_str()),
                contents: data,
                usage: convert::buffer_usages(desc.role),
            });
        let id = self.store.allocate_id();
        self.store.buffers.insert(id, buffer);
        Ok(BufferHandle(id))
    }

    fn write_buffer(&mut self, buffer: BufferHandle, data: &[u8]) {
        match self.store.buffers.get(&buffer.0) {
            Some(target) => self.queue.write_buffer(target, 0, data),
            None => log::error!("write_buffer to unknown {:?}", buffer),
        }
    }

    fn create_texture(&mut self, desc: &TextureDescriptor) -> BackendResult<TextureHandle> {
        // Faces are 1024 wide by default, which WebGL2's 2048 limit still fits
        let max_size = self.device.limits().max_texture_dimension_2d;
        if desc.width > max_size || desc.height > max_size {
            return Err(BackendError::TextureCreationFailed(format!(
                "{} is {}x{}, device limit is {}",
                desc.label, desc.width, desc.height, max_size
            )));
        }

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(desc.label.as_str()),
            size: wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: convert::texture_usages(desc.role),
            view_formats: &[],
        });
        let id = self.store.allocate_id();
        self.store.textures.insert(id, texture);
        Ok(TextureHandle(id))
    }

    fn create_texture_view(&mut self, texture: TextureHandle) -> BackendResult<TextureViewHandle> {
        let view = self
            .store
            .textures
            .get(&texture.0)
            .ok_or_else(|| {
                BackendError::TextureCreationFailed(format!("{:?} not found", texture))
            })?
            .create_view(&wgpu::TextureViewDescriptor::default());
        let id = self.store.allocate_id();
        self.store.views.insert(id, view);
        Ok(TextureViewHandle(id))
    }

    fn write_texture(&mut self, texture: TextureHandle, data: &[u8], width: u32, height: u32) {
        let Some(target) = self.store.textures.get(&texture.0) else {
            log::error!("write_texture to unknown {:?}", texture);
            return;
        };
        let extent = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        self.queue.write_texture(
            target.as_image_copy(),
            data,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(width * TEXEL_BYTES),
                rows_per_image: Some(height),
            },
            extent,
        );
    }

    fn create_sampler(&mut self, label: &str) -> BackendResult<SamplerHandle> {
        let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let id = self.store.allocate_id();
        self.store.samplers.insert(id, sampler);
        Ok(SamplerHandle(id))
    }

    fn create_bind_group_layout(
        &mut self,
        entries: &[BindGroupLayoutEntry],
    ) -> BackendResult<BindGroupLayoutHandle> {
        let entries: Vec<_> = entries
            .iter()
            .map(|entry| wgpu::BindGroupLayoutEntry {
                binding: entry.binding,
                visibility: convert::shader_stages(entry.visibility),
                ty: convert::binding_type(entry.ty),
                count: None,
            })
            .collect();
        let layout = self
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: None,
                entries: &entries,
            });
        let id = self.store.allocate_id();
        self.store.bind_group_layouts.insert(id, layout);
        Ok(BindGroupLayoutHandle(id))
    }

    fn create_bind_group(
        &mut self,
        layout: BindGroupLayoutHandle,
        entries: &[(u32, BindGroupEntry)],
    ) -> BackendResult<BindGroupHandle> {
        let bind_group = {
            let store = &self.store;
            let layout = store.bind_group_layouts.get(&layout.0).ok_or_else(|| {
                BackendError::PipelineCreationFailed(format!("{:?} not found", layout))
            })?;
            let entries = entries
                .iter()
                .map(|(binding, entry)| {
                    Ok(wgpu::BindGroupEntry {
                        binding: *binding,
                        resource: store.binding_resource(entry)?,
                    })
                })
                .collect::<BackendResult<Vec<_>>>()?;

            self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: None,
                layout,
                entries: &entries,
            })
        };
        let id = self.store.allocate_id();
        self.store.bind_groups.insert(id, bind_group);
        Ok(BindGroupHandle(id))
    }

    fn create_render_pipeline(
        &mut self,
        desc: &RenderPipelineDescriptor,
    ) -> BackendResult<RenderPipelineHandle> {
        let shader = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(desc.label.as_str()),
                source: wgpu::ShaderSource::Wgsl(desc.shader.into()),
            });

        let bind_group_layouts = desc
            .bind_group_layouts
            .iter()
            .map(|handle| {
                self.store.bind_group_layouts.get(&handle.0).ok_or_else(|| {
                    BackendError::PipelineCreationFailed(format!("{:?} not found", handle))
                })
            })
            .collect::<BackendResult<Vec<_>>>()?;
        let layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(desc.label.as_str()),
                bind_group_layouts: &bind_group_layouts,
                push_constant_ranges: &[],
            });

        // wgpu layouts borrow their attribute slices
        let attributes: Vec<Vec<wgpu::VertexAttribute>> = desc
            .vertex_layouts
            .iter()
            .map(|layout| {
                layout
                    .attributes
                    .iter()
                    .map(|a| wgpu::VertexAttribute {
                        format: convert::vertex_format(a.format),
                        offset: a.offset,
                        shader_location: a.location,
                    })
                    .collect()
            })
            .collect();
        let vertex_buffers: Vec<_> = desc
            .vertex_layouts
            .iter()
            .zip(&attributes)
            .map(|(layout, attributes)| wgpu::VertexBufferLayout {
                array_stride: layout.array_stride,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes,
            })
            .collect();

        let targets = [Some(wgpu::ColorTargetState {
            format: convert::texture_format(desc.target_format),
            blend: None,
            write_mask: wgpu::ColorWrites::ALL,
        })];

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(desc.label.as_str()),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: "vs_main",
                    buffers: &vertex_buffers,
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: "fs_main",
                    targets: &targets,
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
            });
        let id = self.store.allocate_id();
        self.store.pipelines.insert(id, pipeline);
        Ok(RenderPipelineHandle(id))
    }

    fn begin_render_pass(&mut self, desc: &RenderPassDescriptor) {
        if let Some(open) = &self.pending_pass {
            log::warn!(
                "{} began while {} was open, dropping the open pass",
                desc.label,
                open.descriptor.label
            );
        }
        self.pending_pass = Some(PendingPass::new(desc));
    }

    fn end_render_pass(&mut self) {
        let Some(pending) = self.pending_pass.take() else {
            return;
        };
        let Some(mut encoder) = self.encoder.take() else {
            log::warn!("{} ended outside a frame, dropped", pending.descriptor.label);
            return;
        };

        {
            let swapchain_view = self
                .frame
                .as_ref()
                .map(|frame| frame.texture.create_view(&wgpu::TextureViewDescriptor::default()));
            let target = pending.descriptor.target;
            let view = if target.0 == self.frame_view_id {
                swapchain_view.as_ref()
            } else {
                self.store.views.get(&target.0)
            };

            match view {
                Some(view) => {
                    let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some(pending.descriptor.label.as_str()),
                        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                            view,
                            resolve_target: None,
                            ops: wgpu::Operations {
                                load: convert::load_op(&pending.descriptor.load_op),
                                store: wgpu::StoreOp::Store,
                            },
                        })],
                        depth_stencil_attachment: None,
                        timestamp_writes: None,
                        occlusion_query_set: None,
                    });
                    self.store.replay(&mut render_pass, &pending.commands);
                }
                None => log::error!(
                    "{} targets unknown {:?}, dropped",
                    pending.descriptor.label,
                    target
                ),
            }
        }

        self.encoder = Some(encoder);
    }

    fn set_render_pipeline(&mut self, pipeline: RenderPipelineHandle) {
        self.push(PassCommand::SetPipeline(pipeline));
    }

    fn set_bind_group(&mut self, index: u32, bind_group: BindGroupHandle) {
        self.push(PassCommand::SetBindGroup(index, bind_group));
    }

    fn set_vertex_buffer(&mut self, buffer: BufferHandle) {
        self.push(PassCommand::SetVertexBuffer(buffer));
    }

    fn set_index_buffer(&mut self, buffer: BufferHandle) {
        self.push(PassCommand::SetIndexBuffer(buffer));
    }

    fn draw(&mut self, vertices: Range<u32>) {
        self.push(PassCommand::Draw(vertices));
    }

    fn draw_indexed(&mut self, indices: Range<u32>) {
        self.push(PassCommand::DrawIndexed(indices));
    }
}

// The egui overlay drives wgpu directly
impl WgpuBackend {
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn wgpu_surface_format(&self) -> wgpu::TextureFormat {
        self.surface_config.format
    }

    /// Device, queue and the frame encoder; the encoder is None outside a frame
    pub fn device_queue_encoder(
        &mut self,
    ) -> (&wgpu::Device, &wgpu::Queue, Option<&mut wgpu::CommandEncoder>) {
        (&self.device, &self.queue, self.encoder.as_mut())
    }

    /// Handle to the current swapchain view; None outside begin_frame/end_frame.
    pub fn current_swapchain_view(&self) -> Option<TextureViewHandle> {
        self.frame
            .as_ref()
            .map(|_| TextureViewHandle(self.frame_view_id))
    }

    /// Paint egui on top of the swapchain image of the frame in flight
    pub fn render_egui(
        &mut self,
        renderer: &egui_wgpu::Renderer,
        paint_jobs: &[egui::ClippedPrimitive],
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
    ) {
        let (Some(encoder), Some(frame)) = (self.encoder.as_mut(), self.frame.as_ref()) else {
            return;
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("egui Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        renderer.render(&mut render_pass, paint_jobs, screen_descriptor);
    }
}

#[cfg(test)]
mod tests {
    use super::clamp_to_limit;

    #[test]
    fn surface_within_limit_is_untouched() {
        assert_eq!(clamp_to_limit(1280, 720, 2048), (1280, 720));
    }

    #[test]
    fn oversized_surface_keeps_aspect() {
        assert_eq!(clamp_to_limit(4096, 2048, 2048), (2048, 1024));
    }

    #[test]
    fn zero_sized_surface_is_at_least_one_pixel() {
        assert_eq!(clamp_to_limit(0, 0, 2048), (1, 1));
    }
}
