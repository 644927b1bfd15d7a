//! Buffered render pass recording
//!
//! wgpu render passes borrow their target and every bound resource for the pass lifetime,
//! so commands are collected here and replayed in one go when the pass ends.

use crate::backend::traits::*;
use std::ops::Range;

#[derive(Debug, Clone)]
pub(super) enum PassCommand {
    SetPipeline(RenderPipelineHandle),
    SetBindGroup(u32, BindGroupHandle),
    SetVertexBuffer(BufferHandle),
    SetIndexBuffer(BufferHandle),
    Draw(Range<u32>),
    DrawIndexed(Range<u32>),
}

pub(super) struct PendingPass {
    pub descriptor: RenderPassDescriptor,
    pub commands: Vec<PassCommand>,
}

impl PendingPass {
    pub fn new(descriptor: &RenderPassDescriptor) -> Self {
        Self {
            descriptor: descriptor.clone(),
            commands: Vec::new(),
        }
    }
}

/// Append to the open pass. Commands outside a pass are dropped with a warning.
pub(super) fn record(pending: &mut Option<PendingPass>, command: PassCommand) {
    match pending {
        Some(pass) => pass.commands.push(command),
        None => log::warn!("{:?} recorded outside a render pass, dropped", command),
    }
}
