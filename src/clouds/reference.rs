//! CPU reference bake
//!
//! Renders tiles with the host density model into plain RGBA images. Used for tests and for
//! exporting a skybox without a GPU.

use std::path::Path;

use glam::Vec3;
use image::{ImageResult, Rgba, RgbaImage};

use super::bake::{SkyboxLayout, TileJob};
use super::density::{shade_ray, to_rgba8};
use super::faces::{texel_to_clip, CubeFace};
use super::CloudSky;

/// Six face images, in panel order
pub struct CpuSkybox {
    layout: SkyboxLayout,
    faces: Vec<RgbaImage>,
}

impl CpuSkybox {
    /// Faces start transparent black, like freshly created GPU targets
    pub fn new(layout: SkyboxLayout) -> Self {
        let faces = CubeFace::ALL
            .iter()
            .map(|_| RgbaImage::new(layout.face_width(), layout.face_height()))
            .collect();
        Self { layout, faces }
    }

    pub fn layout(&self) -> SkyboxLayout {
        self.layout
    }

    pub fn face(&self, face: CubeFace) -> &RgbaImage {
        &self.faces[face.panel_index() as usize]
    }

    /// Shade every texel of one tile
    pub fn render_tile(&mut self, sky: &CloudSky, job: &TileJob) {
        let width = self.layout.face_width();
        let height = self.layout.face_height();
        let image = &mut self.faces[job.face.panel_index() as usize];

        for py in job.rect.y..(job.rect.y + job.rect.height).min(height) {
            for px in job.rect.x..(job.rect.x + job.rect.width).min(width) {
                let clip = texel_to_clip(px, py, width, height);
                let direction = job.face.ray_direction(clip);
                let color = shade_ray(sky.noise(), sky.params(), Vec3::ZERO, direction);
                image.put_pixel(px, py, Rgba(to_rgba8(color)));
            }
        }
    }

    /// Drive `sky` until its bake completes. Returns the number of tiles rendered.
    pub fn bake_all(&mut self, sky: &mut CloudSky) -> u32 {
        let mut tiles = 0;
        while let Some(job) = sky.advance() {
            self.render_tile(sky, &job);
            tiles += 1;
        }
        tiles
    }

    /// Write `cloud_<face>.png` for every face into `dir`
    pub fn save_png(&self, dir: &Path) -> ImageResult<()> {
        std::fs::create_dir_all(dir)?;
        for face in CubeFace::ALL {
            let path = dir.join(format!("cloud_{}.png", face.name()));
            self.face(face).save(&path)?;
            log::info!("Wrote {}", path.display());
        }
        Ok(())
    }
}
