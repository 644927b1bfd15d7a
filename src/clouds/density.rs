//! Host-side cloud density and lighting model
//!
//! Mirrors the bake shader step for step so CPU renders match the GPU bake. Used by tests and
//! offline export.

use glam::{Vec3, Vec4};

use super::noise::{gradient_noise, GradientLattice};
use super::params::{CloudParams, NoiseLayerConfig, RayMarchConfig};

/// Samples at or below this density are skipped
pub const DENSITY_THRESHOLD: f32 = 0.01;
/// Iteration cap for the view ray
pub const MAX_VIEW_STEPS: u32 = 512;
/// Iteration cap for the shadow ray
pub const MAX_SUN_STEPS: u32 = 64;

fn layer_density<L: GradientLattice + ?Sized>(
    lattice: &L,
    layer: &NoiseLayerConfig,
    p: Vec3,
) -> f32 {
    let q = p * layer.scale + layer.translation;
    (gradient_noise(lattice, q) * layer.slope + layer.offset).clamp(0.0, 1.0)
}

/// Sum of all layers, clamped to `[0, 1]`
pub fn layered_density<L: GradientLattice + ?Sized>(
    lattice: &L,
    params: &CloudParams,
    p: Vec3,
) -> f32 {
    params
        .layers
        .iter()
        .map(|layer| layer_density(lattice, layer, p))
        .sum::<f32>()
        .clamp(0.0, 1.0)
}

/// Near-field attenuation: 0 at `t_min`, 1 from `density_falloff_distance` on
pub fn falloff_multiplier(march: &RayMarchConfig, distance: f32) -> f32 {
    if distance >= march.density_falloff_distance {
        return 1.0;
    }
    let span = march.density_falloff_distance - march.t_min;
    if span <= 0.0 {
        return 0.0;
    }
    ((distance - march.t_min) / span).clamp(0.0, 1.0)
}

/// Density at a point relative to the volume center
pub fn density_at<L: GradientLattice + ?Sized>(lattice: &L, params: &CloudParams, p: Vec3) -> f32 {
    layered_density(lattice, params, p) * falloff_multiplier(&params.march, p.length())
}

/// Density accumulated from `p` toward the sun, clamped to `[0, 1]`
pub fn density_to_sun<L: GradientLattice + ?Sized>(
    lattice: &L,
    params: &CloudParams,
    p: Vec3,
) -> f32 {
    let march = &params.march;
    let toward_sun = -params.sun_direction;
    let mut accumulated = 0.0;
    let mut s = march.step_size_to_sun;
    let mut steps = 0;
    while s <= march.t_max_to_sun && steps < MAX_SUN_STEPS {
        accumulated += density_at(lattice, params, p + toward_sun * s) * march.step_size_to_sun;
        s += march.step_size_to_sun;
        steps += 1;
    }
    accumulated.clamp(0.0, 1.0)
}

/// Premultiplied color and coverage gathered along one view ray
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarchResult {
    pub color: Vec3,
    pub alpha: f32,
}

/// Front-to-back composite along `direction`
pub fn march_ray<L: GradientLattice + ?Sized>(
    lattice: &L,
    params: &CloudParams,
    origin: Vec3,
    direction: Vec3,
) -> MarchResult {
    let march = &params.march;
    let palette = &params.palette;
    let mut color = Vec3::ZERO;
    let mut alpha = 0.0f32;
    let mut t = march.t_min;
    let mut steps = 0;

    while t <= march.t_max && steps < MAX_VIEW_STEPS {
        let p = origin + direction * t;
        let density = density_at(lattice, params, p);

        if density > DENSITY_THRESHOLD {
            let to_sun = density_to_sun(lattice, params, p);
            let brightness = (-march.light_absorption * to_sun).exp();
            let lit = palette.dark.lerp(palette.light, brightness);
            let point_color = palette.sky.lerp(lit, (-march.fog * t).exp());

            let weight = density * (1.0 - alpha);
            color = (color + point_color * weight).clamp(Vec3::ZERO, Vec3::ONE);
            alpha = (alpha + weight).clamp(0.0, 1.0);
            if alpha >= 1.0 {
                break;
            }
        }

        t += march.step_size;
        steps += 1;
    }

    MarchResult { color, alpha }
}

/// Final opaque sky color for one view ray
pub fn shade_ray<L: GradientLattice + ?Sized>(
    lattice: &L,
    params: &CloudParams,
    origin: Vec3,
    direction: Vec3,
) -> Vec4 {
    let result = march_ray(lattice, params, origin, direction);
    (result.color + params.palette.sky * (1.0 - result.alpha)).extend(1.0)
}

/// Quantize like an `Rgba8Unorm` render target
pub fn to_rgba8(color: Vec4) -> [u8; 4] {
    color
        .clamp(Vec4::ZERO, Vec4::ONE)
        .to_array()
        .map(|c| (c * 255.0).round() as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::IVec3;

    /// Every lattice point shares one gradient
    struct ConstantLattice(Vec3);

    impl GradientLattice for ConstantLattice {
        fn gradient(&self, _cell: IVec3) -> Vec3 {
            self.0
        }
    }

    fn flat_params(slope: f32, offset: f32) -> CloudParams {
        let mut params = CloudParams::default();
        for layer in params.layers.iter_mut() {
            layer.slope = slope;
            layer.offset = offset;
        }
        params
    }

    #[test]
    fn falloff_boundaries() {
        let march = RayMarchConfig::default();
        assert_eq!(falloff_multiplier(&march, march.t_min), 0.0);
        assert_eq!(falloff_multiplier(&march, march.density_falloff_distance), 1.0);
        assert_eq!(falloff_multiplier(&march, march.t_max), 1.0);
        let mid = (march.t_min + march.density_falloff_distance) * 0.5;
        assert!((falloff_multiplier(&march, mid) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn degenerate_falloff_span_is_zero() {
        let march = RayMarchConfig {
            t_min: 5.0,
            density_falloff_distance: 5.0,
            ..RayMarchConfig::default()
        };
        assert_eq!(falloff_multiplier(&march, 4.0), 0.0);
    }

    #[test]
    fn layered_density_is_clamped() {
        let lattice = ConstantLattice(Vec3::ONE);
        let saturated = flat_params(0.0, 0.9);
        assert_eq!(layered_density(&lattice, &saturated, Vec3::new(1.3, 2.7, -0.4)), 1.0);
        let empty = flat_params(0.0, -0.5);
        assert_eq!(layered_density(&lattice, &empty, Vec3::new(1.3, 2.7, -0.4)), 0.0);
    }

    #[test]
    fn empty_sky_shows_sky_color() {
        let lattice = ConstantLattice(Vec3::ZERO);
        let params = flat_params(0.0, 0.0);
        let color = shade_ray(&lattice, &params, Vec3::ZERO, Vec3::NEG_Z);
        assert_eq!(color, params.palette.sky.extend(1.0));
    }

    #[test]
    fn dense_clouds_saturate_alpha() {
        let lattice = ConstantLattice(Vec3::ZERO);
        let params = flat_params(0.0, 1.0);
        let result = march_ray(&lattice, &params, Vec3::ZERO, Vec3::X);
        assert_eq!(result.alpha, 1.0);
        assert!(result.color.max_element() <= 1.0);
    }

    #[test]
    fn shadowed_points_are_darker() {
        let lattice = ConstantLattice(Vec3::ZERO);
        let mut params = flat_params(0.0, 1.0);
        params.march.light_absorption = 5.0;
        let p = Vec3::new(0.0, 0.0, -20.0);
        assert_eq!(density_to_sun(&lattice, &params, p), 1.0);
        params.march.t_max_to_sun = 0.0;
        assert_eq!(density_to_sun(&lattice, &params, p), 0.0);
    }

    #[test]
    fn non_advancing_steps_terminate() {
        let lattice = ConstantLattice(Vec3::ZERO);
        let mut params = flat_params(0.0, 0.005);
        params.march.step_size = 0.0;
        params.march.step_size_to_sun = 0.0;
        let result = march_ray(&lattice, &params, Vec3::ZERO, Vec3::Y);
        assert_eq!(result.alpha, 0.0);
    }

    #[test]
    fn steep_layers_over_seeded_noise_stay_in_range() {
        use crate::clouds::NoiseVolume;
        use rand::{Rng, SeedableRng};
        use rand_xoshiro::Xoshiro256PlusPlus;

        let noise = NoiseVolume::with_default_layout(42);
        let mut params = CloudParams::default();
        let steep = [(80.0, 0.0), (-80.0, 0.5), (80.0, -0.3), (-80.0, 1.0), (40.0, 0.0)];
        for (layer, (slope, offset)) in params.layers.iter_mut().zip(steep) {
            layer.slope = slope;
            layer.offset = offset;
        }

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
        let mut any_cloud = false;
        for _ in 0..2000 {
            let p = Vec3::new(
                rng.random_range(-80.0..80.0),
                rng.random_range(-80.0..80.0),
                rng.random_range(-80.0..80.0),
            );
            let density = layered_density(&noise, &params, p);
            assert!((0.0..=1.0).contains(&density), "density {} at {}", density, p);
            any_cloud |= density > 0.0;
        }
        assert!(any_cloud);

        for _ in 0..16 {
            let direction = Vec3::new(
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
            )
            .try_normalize()
            .unwrap_or(Vec3::Z);
            let result = march_ray(&noise, &params, Vec3::ZERO, direction);
            assert!((0.0..=1.0).contains(&result.alpha), "alpha {}", result.alpha);
            assert!(result.color.cmpge(Vec3::ZERO).all() && result.color.cmple(Vec3::ONE).all());
        }
    }

    #[test]
    fn rgba8_quantization_rounds() {
        assert_eq!(to_rgba8(Vec4::new(0.0, 1.0, 0.5, 2.0)), [0, 255, 128, 255]);
    }
}
