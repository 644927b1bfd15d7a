//! Random gradient lattice for 3D noise
//!
//! The lattice is a cube of side `base_dimension` stored as a 2D RGBA8 image: z-slices are laid
//! out row-major on a `row_length x row_length` grid. WebGL2 has no writable 3D textures, so the
//! bake shader reads the same image with `textureLoad`.

use glam::{IVec3, UVec2, Vec3};
use rand::{RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use thiserror::Error;

/// Packing of the 3D lattice into a 2D texture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoiseLayout {
    pub base_dimension: u32,
    pub row_length: u32,
}

impl Default for NoiseLayout {
    fn default() -> Self {
        Self {
            base_dimension: 16,
            row_length: 4,
        }
    }
}

impl NoiseLayout {
    /// Side of the square backing texture
    pub fn texture_dimension(&self) -> u32 {
        self.row_length * self.base_dimension
    }

    /// The slice grid must hold every z-slice of the lattice.
    pub fn is_valid(&self) -> bool {
        self.base_dimension > 0 && self.row_length * self.row_length >= self.base_dimension
    }

    /// Top-left texel of slice `z`
    pub fn slice_origin(&self, z: u32) -> UVec2 {
        UVec2::new(
            (z % self.row_length) * self.base_dimension,
            (z / self.row_length) * self.base_dimension,
        )
    }

    /// Texel holding lattice point `cell`, wrapping every axis
    pub fn texel_for(&self, cell: IVec3) -> UVec2 {
        let base = self.base_dimension as i32;
        let x = cell.x.rem_euclid(base) as u32;
        let y = cell.y.rem_euclid(base) as u32;
        let z = cell.z.rem_euclid(base) as u32;
        self.slice_origin(z) + UVec2::new(x, y)
    }
}

/// A slice grid too small for the lattice it packs
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("noise layout {0:?} cannot hold its slices")]
pub struct NoiseLayoutError(pub NoiseLayout);

/// Source of per-lattice-point gradient vectors
pub trait GradientLattice {
    /// Gradient at an integer lattice point, each component in `[-1, 1]`
    fn gradient(&self, cell: IVec3) -> Vec3;
}

/// CPU copy of the noise texture
#[derive(Debug, Clone)]
pub struct NoiseVolume {
    layout: NoiseLayout,
    seed: u64,
    texels: Vec<u8>,
}

impl NoiseVolume {
    /// Fails when `layout` cannot hold every z-slice, since lookups would then run off the texture
    pub fn new(layout: NoiseLayout, seed: u64) -> Result<Self, NoiseLayoutError> {
        if !layout.is_valid() {
            return Err(NoiseLayoutError(layout));
        }
        Ok(Self::generate(layout, seed))
    }

    pub fn with_default_layout(seed: u64) -> Self {
        Self::generate(NoiseLayout::default(), seed)
    }

    fn generate(layout: NoiseLayout, seed: u64) -> Self {
        let mut volume = Self {
            layout,
            seed,
            texels: Vec::new(),
        };
        volume.regenerate_with_seed(seed);
        volume
    }

    /// Replace every byte with fresh random data
    pub fn regenerate(&mut self) {
        self.regenerate_with_seed(rand::random());
    }

    pub fn regenerate_with_seed(&mut self, seed: u64) {
        let dim = self.layout.texture_dimension() as usize;
        let mut texels = vec![0u8; dim * dim * 4];
        Xoshiro256PlusPlus::seed_from_u64(seed).fill_bytes(&mut texels);
        self.texels = texels;
        self.seed = seed;
        log::debug!("Regenerated {}x{} noise volume (seed {})", dim, dim, seed);
    }

    pub fn layout(&self) -> NoiseLayout {
        self.layout
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// RGBA8 texel data, row-major
    pub fn bytes(&self) -> &[u8] {
        &self.texels
    }
}

impl GradientLattice for NoiseVolume {
    fn gradient(&self, cell: IVec3) -> Vec3 {
        let texel = self.layout.texel_for(cell);
        let index = ((texel.y * self.layout.texture_dimension() + texel.x) * 4) as usize;
        let rgb = &self.texels[index..index + 3];
        Vec3::new(rgb[0] as f32, rgb[1] as f32, rgb[2] as f32) / 255.0 * 2.0 - 1.0
    }
}

fn fade(t: Vec3) -> Vec3 {
    t * t * (3.0 - 2.0 * t)
}

/// Gradient noise at `p`: trilinear blend of the eight corner contributions
pub fn gradient_noise<L: GradientLattice + ?Sized>(lattice: &L, p: Vec3) -> f32 {
    let cell_floor = p.floor();
    let cell = cell_floor.as_ivec3();
    let f = p - cell_floor;

    let corner = |offset: IVec3| {
        lattice
            .gradient(cell + offset)
            .dot(f - offset.as_vec3())
    };

    let n000 = corner(IVec3::new(0, 0, 0));
    let n100 = corner(IVec3::new(1, 0, 0));
    let n010 = corner(IVec3::new(0, 1, 0));
    let n110 = corner(IVec3::new(1, 1, 0));
    let n001 = corner(IVec3::new(0, 0, 1));
    let n101 = corner(IVec3::new(1, 0, 1));
    let n011 = corner(IVec3::new(0, 1, 1));
    let n111 = corner(IVec3::new(1, 1, 1));

    let u = fade(f);
    let x00 = n000 + (n100 - n000) * u.x;
    let x10 = n010 + (n110 - n010) * u.x;
    let x01 = n001 + (n101 - n001) * u.x;
    let x11 = n011 + (n111 - n011) * u.x;
    let y0 = x00 + (x10 - x00) * u.y;
    let y1 = x01 + (x11 - x01) * u.y;
    y0 + (y1 - y0) * u.z
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_is_64_square() {
        let layout = NoiseLayout::default();
        assert!(layout.is_valid());
        assert_eq!(layout.texture_dimension(), 64);
    }

    #[test]
    fn undersized_slice_grid_is_invalid() {
        let layout = NoiseLayout {
            base_dimension: 16,
            row_length: 3,
        };
        assert!(!layout.is_valid());
        assert_eq!(NoiseVolume::new(layout, 1).err(), Some(NoiseLayoutError(layout)));

        let empty = NoiseLayout {
            base_dimension: 0,
            row_length: 4,
        };
        assert!(NoiseVolume::new(empty, 1).is_err());
    }

    #[test]
    fn slices_tile_the_texture_without_overlap() {
        let layout = NoiseLayout::default();
        let dim = layout.texture_dimension();
        let mut hits = vec![0u32; (dim * dim) as usize];
        let base = layout.base_dimension as i32;
        for z in 0..base {
            for y in 0..base {
                for x in 0..base {
                    let texel = layout.texel_for(IVec3::new(x, y, z));
                    assert!(texel.x < dim && texel.y < dim);
                    hits[(texel.y * dim + texel.x) as usize] += 1;
                }
            }
        }
        assert!(hits.iter().all(|&h| h == 1));
    }

    #[test]
    fn lattice_wraps_negative_cells() {
        let layout = NoiseLayout::default();
        assert_eq!(
            layout.texel_for(IVec3::new(-1, -1, -1)),
            layout.texel_for(IVec3::new(15, 15, 15))
        );
        assert_eq!(
            layout.texel_for(IVec3::new(16, 0, 17)),
            layout.texel_for(IVec3::new(0, 0, 1))
        );
    }

    #[test]
    fn same_seed_reproduces_volume() {
        let a = NoiseVolume::with_default_layout(7);
        let b = NoiseVolume::with_default_layout(7);
        let c = NoiseVolume::with_default_layout(8);
        assert_eq!(a.bytes(), b.bytes());
        assert_ne!(a.bytes(), c.bytes());
        assert_eq!(a.bytes().len(), 64 * 64 * 4);
    }

    #[test]
    fn gradients_are_in_unit_range() {
        let volume = NoiseVolume::with_default_layout(3);
        for i in -20..20 {
            let g = volume.gradient(IVec3::new(i, i * 3, -i));
            assert!(g.abs().max_element() <= 1.0);
        }
    }

    #[test]
    fn noise_vanishes_on_lattice_points() {
        let volume = NoiseVolume::with_default_layout(11);
        for cell in [IVec3::ZERO, IVec3::new(3, -2, 9), IVec3::new(-7, 5, 1)] {
            assert_eq!(gradient_noise(&volume, cell.as_vec3()), 0.0);
        }
    }
}
