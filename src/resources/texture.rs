//! GPU textures for the noise volume and the baked faces

use crate::backend::traits::*;
use crate::backend::types::*;

/// RGBA8 texture with its default view
pub struct GpuTexture {
    pub handle: TextureHandle,
    pub view: TextureViewHandle,
    pub width: u32,
    pub height: u32,
    pub name: String,
}

impl GpuTexture {
    /// Create a sampled texture that is filled from the CPU
    pub fn create_uploadable<B: GraphicsBackend>(
        backend: &mut B,
        name: &str,
        width: u32,
        height: u32,
    ) -> BackendResult<Self> {
        Self::create(backend, name, width, height, TextureRole::Upload)
    }

    /// Create a texture that passes render into and later passes sample from
    pub fn create_render_target<B: GraphicsBackend>(
        backend: &mut B,
        name: &str,
        width: u32,
        height: u32,
    ) -> BackendResult<Self> {
        Self::create(backend, name, width, height, TextureRole::RenderTarget)
    }

    fn create<B: GraphicsBackend>(
        backend: &mut B,
        name: &str,
        width: u32,
        height: u32,
        role: TextureRole,
    ) -> BackendResult<Self> {
        let handle = backend.create_texture(&TextureDescriptor {
            label: name.to_string(),
            width,
            height,
            role,
        })?;
        let view = backend.create_texture_view(handle)?;

        Ok(Self {
            handle,
            view,
            width,
            height,
            name: name.to_string(),
        })
    }

    /// Replace the whole texture. `data` must hold `width * height` RGBA8 texels.
    pub fn upload<B: GraphicsBackend>(&self, backend: &mut B, data: &[u8]) {
        let expected = (self.width * self.height * TEXEL_BYTES) as usize;
        if data.len() != expected {
            log::error!(
                "Upload to {} has {} bytes, expected {}",
                self.name,
                data.len(),
                expected
            );
            return;
        }
        backend.write_texture(self.handle, data, self.width, self.height);
    }
}
