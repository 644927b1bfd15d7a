//! wgpu objects behind the backend handles
//!
//! All handle kinds draw from one id counter, so an id never names two objects. Swapchain
//! views take ids from the same counter without being stored.

use crate::backend::traits::*;
use std::collections::HashMap;

use super::pass::PassCommand;

#[derive(Default)]
pub(super) struct ResourceStore {
    next_id: u64,
    pub buffers: HashMap<u64, wgpu::Buffer>,
    pub textures: HashMap<u64, wgpu::Texture>,
    pub views: HashMap<u64, wgpu::TextureView>,
    pub samplers: HashMap<u64, wgpu::Sampler>,
    pub bind_group_layouts: HashMap<u64, wgpu::BindGroupLayout>,
    pub bind_groups: HashMap<u64, wgpu::BindGroup>,
    pub pipelines: HashMap<u64, wgpu::RenderPipeline>,
}

impl ResourceStore {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Default::default()
        }
    }

    pub fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Resolve one bind group slot, failing on handles this backend never issued
    pub fn binding_resource(
        &self,
        entry: &BindGroupEntry,
    ) -> BackendResult<wgpu::BindingResource<'_>> {
        let missing = |what: &str, id: u64| {
            BackendError::PipelineCreationFailed(format!("{} {} not found", what, id))
        };
        Ok(match entry {
            BindGroupEntry::Buffer(buffer) => self
                .buffers
                .get(&buffer.0)
                .ok_or_else(|| missing("Buffer", buffer.0))?
                .as_entire_binding(),
            BindGroupEntry::Texture(view) => wgpu::BindingResource::TextureView(
                self.views.get(&view.0).ok_or_else(|| missing("View", view.0))?,
            ),
            BindGroupEntry::Sampler(sampler) => wgpu::BindingResource::Sampler(
                self.samplers
                    .get(&sampler.0)
                    .ok_or_else(|| missing("Sampler", sampler.0))?,
            ),
        })
    }

    /// Replay buffered commands. Unknown handles are skipped.
    pub fn replay<'p>(&'p self, pass: &mut wgpu::RenderPass<'p>, commands: &[PassCommand]) {
        for command in commands {
            match command {
                PassCommand::SetPipeline(handle) => {
                    if let Some(pipeline) = self.pipelines.get(&handle.0) {
                        pass.set_pipeline(pipeline);
                    }
                }
                PassCommand::SetBindGroup(index, handle) => {
                    if let Some(bind_group) = self.bind_groups.get(&handle.0) {
                        pass.set_bind_group(*index, bind_group, &[]);
                    }
                }
                PassCommand::SetVertexBuffer(handle) => {
                    if let Some(buffer) = self.buffers.get(&handle.0) {
                        pass.set_vertex_buffer(0, buffer.slice(..));
                    }
                }
                PassCommand::SetIndexBuffer(handle) => {
                    if let Some(buffer) = self.buffers.get(&handle.0) {
                        pass.set_index_buffer(buffer.slice(..), wgpu::IndexFormat::Uint16);
                    }
                }
                PassCommand::Draw(vertices) => pass.draw(vertices.clone(), 0..1),
                PassCommand::DrawIndexed(indices) => pass.draw_indexed(indices.clone(), 0, 0..1),
            }
        }
    }
}
