//! Procedural cloud skybox state
//!
//! [`CloudSky`] owns the parameters, the noise volume and the bake scheduler. Every mutation
//! goes through it so a change can never leave a stale bake running.

mod bake;
mod density;
mod faces;
mod noise;
mod params;
mod reference;

pub use bake::*;
pub use density::*;
pub use faces::*;
pub use noise::*;
pub use params::*;
pub use reference::*;

use glam::Vec3;

/// Owned context for one cloud skybox
pub struct CloudSky {
    params: CloudParams,
    noise: NoiseVolume,
    scheduler: BakeScheduler,
    params_revision: u64,
    noise_revision: u64,
}

impl CloudSky {
    pub fn new(layout: SkyboxLayout, noise_seed: u64) -> Self {
        Self::from_parts(
            layout,
            NoiseVolume::with_default_layout(noise_seed),
            CloudParams::default(),
        )
    }

    /// Rejects a noise layout whose slice grid cannot hold the lattice
    pub fn with_params(
        layout: SkyboxLayout,
        noise_layout: NoiseLayout,
        noise_seed: u64,
        params: CloudParams,
    ) -> Result<Self, NoiseLayoutError> {
        let noise = NoiseVolume::new(noise_layout, noise_seed)?;
        Ok(Self::from_parts(layout, noise, params))
    }

    fn from_parts(layout: SkyboxLayout, noise: NoiseVolume, params: CloudParams) -> Self {
        Self {
            params,
            noise,
            scheduler: BakeScheduler::new(layout),
            params_revision: 0,
            noise_revision: 0,
        }
    }

    pub fn params(&self) -> &CloudParams {
        &self.params
    }

    pub fn noise(&self) -> &NoiseVolume {
        &self.noise
    }

    pub fn scheduler(&self) -> &BakeScheduler {
        &self.scheduler
    }

    pub fn layout(&self) -> SkyboxLayout {
        self.scheduler.layout()
    }

    /// Bumped on every parameter change
    pub fn params_revision(&self) -> u64 {
        self.params_revision
    }

    /// Bumped whenever the noise bytes change
    pub fn noise_revision(&self) -> u64 {
        self.noise_revision
    }

    pub fn set_from_external_inputs(&mut self, inputs: &ExternalInputs) {
        self.params.set_from_external_inputs(inputs);
        self.params_changed();
    }

    pub fn set_params(&mut self, params: CloudParams) {
        self.params = params;
        self.params_changed();
    }

    pub fn set_sun_direction(&mut self, direction: Vec3) {
        self.params.set_sun_direction(direction);
        self.params_changed();
    }

    /// New random noise, then a full rebake
    pub fn reset_noise_and_rebake(&mut self) {
        self.noise.regenerate();
        self.noise_changed();
    }

    pub fn reset_noise_with_seed_and_rebake(&mut self, seed: u64) {
        self.noise.regenerate_with_seed(seed);
        self.noise_changed();
    }

    pub fn request_rebake(&mut self) {
        self.scheduler.request_restart();
    }

    /// Next tile of the current bake, if any
    pub fn advance(&mut self) -> Option<TileJob> {
        self.scheduler.advance()
    }

    pub fn is_bake_complete(&self) -> bool {
        self.scheduler.is_complete()
    }

    pub fn bake_progress(&self) -> (u32, u32) {
        self.scheduler.progress()
    }

    fn params_changed(&mut self) {
        self.params_revision += 1;
        self.scheduler.request_restart();
    }

    fn noise_changed(&mut self) {
        self.noise_revision += 1;
        self.scheduler.request_restart();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_sky() -> CloudSky {
        CloudSky::new(SkyboxLayout::new(2, 2, 2, 1), 1)
    }

    fn finish(sky: &mut CloudSky) {
        while sky.advance().is_some() {}
    }

    #[test]
    fn parameter_change_restarts_bake() {
        let mut sky = small_sky();
        finish(&mut sky);
        assert!(sky.is_bake_complete());

        sky.set_from_external_inputs(&ExternalInputs::default());
        assert!(!sky.is_bake_complete());
        assert_eq!(sky.params_revision(), 1);
        let job = sky.advance().unwrap();
        assert_eq!((job.face, job.tile_x, job.tile_y), (CubeFace::NegZ, 0, 0));
    }

    #[test]
    fn noise_reset_changes_bytes_and_restarts() {
        let mut sky = small_sky();
        finish(&mut sky);
        let before = sky.noise().bytes().to_vec();

        sky.reset_noise_with_seed_and_rebake(2);
        assert_ne!(sky.noise().bytes(), before.as_slice());
        assert_eq!(sky.noise_revision(), 1);
        assert_eq!(sky.params_revision(), 0);
        assert_eq!(sky.bake_progress().0, 0);
    }

    #[test]
    fn undersized_noise_layout_is_rejected() {
        let layout = NoiseLayout {
            base_dimension: 16,
            row_length: 2,
        };
        let sky = CloudSky::with_params(
            SkyboxLayout::new(2, 2, 2, 1),
            layout,
            1,
            CloudParams::default(),
        );
        assert_eq!(sky.err(), Some(NoiseLayoutError(layout)));

        let wide = NoiseLayout {
            base_dimension: 8,
            row_length: 3,
        };
        let sky = CloudSky::with_params(SkyboxLayout::default(), wide, 1, CloudParams::default())
            .expect("3x3 grid holds 8 slices");
        assert_eq!(sky.noise().bytes().len(), 24 * 24 * 4);
    }

    #[test]
    fn sun_direction_change_restarts_bake() {
        let mut sky = small_sky();
        sky.advance();
        sky.set_sun_direction(Vec3::new(0.0, -1.0, 0.0));
        assert_eq!(sky.params().sun_direction, Vec3::NEG_Y);
        assert!(sky.scheduler().restart_pending());
    }
}
