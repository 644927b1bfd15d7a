//! Cloud look parameters
//!
//! [`CloudParams`] is the numeric state uploaded to the bake shader. [`ExternalInputs`] is the
//! flat snapshot a UI edits, with colors kept as hex strings.

use glam::Vec3;
use thiserror::Error;

/// Number of independently configured noise layers
pub const NOISE_LAYER_COUNT: usize = 5;

/// One noise layer: `clamp(noise(p * scale + translation) * slope + offset, 0, 1)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseLayerConfig {
    pub scale: f32,
    pub translation: Vec3,
    pub slope: f32,
    pub offset: f32,
}

impl NoiseLayerConfig {
    pub fn new(scale: f32, translation: Vec3, slope: f32, offset: f32) -> Self {
        Self {
            scale,
            translation,
            slope,
            offset,
        }
    }
}

/// Ray-march distances and lighting scalars
///
/// Density fades linearly from full at `density_falloff_distance` to zero at `t_min`.
/// Nothing enforces `t_min < density_falloff_distance < t_max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayMarchConfig {
    pub t_min: f32,
    pub density_falloff_distance: f32,
    pub t_max: f32,
    pub step_size: f32,
    pub t_max_to_sun: f32,
    pub step_size_to_sun: f32,
    pub light_absorption: f32,
    pub fog: f32,
}

impl Default for RayMarchConfig {
    fn default() -> Self {
        Self {
            t_min: 0.5,
            density_falloff_distance: 4.0,
            t_max: 48.0,
            step_size: 0.25,
            t_max_to_sun: 8.0,
            step_size_to_sun: 0.5,
            light_absorption: 3.0,
            fog: 0.04,
        }
    }
}

/// Linear RGB colors in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaletteConfig {
    pub sky: Vec3,
    pub dark: Vec3,
    pub light: Vec3,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            sky: rgb(0x7f, 0xa7, 0xd9),
            dark: rgb(0x4c, 0x55, 0x66),
            light: rgb(0xf4, 0xf1, 0xea),
        }
    }
}

fn rgb(r: u8, g: u8, b: u8) -> Vec3 {
    Vec3::new(r as f32, g as f32, b as f32) / 255.0
}

/// Everything the density model reads
#[derive(Debug, Clone, PartialEq)]
pub struct CloudParams {
    pub march: RayMarchConfig,
    pub palette: PaletteConfig,
    /// Direction the light travels; the shadow ray marches against it.
    pub sun_direction: Vec3,
    pub layers: [NoiseLayerConfig; NOISE_LAYER_COUNT],
}

impl Default for CloudParams {
    fn default() -> Self {
        Self {
            march: RayMarchConfig::default(),
            palette: PaletteConfig::default(),
            sun_direction: Vec3::new(0.4, -0.8, -0.45).normalize(),
            layers: [
                NoiseLayerConfig::new(0.045, Vec3::ZERO, 1.6, 0.05),
                NoiseLayerConfig::new(0.11, Vec3::new(13.2, 4.1, 7.7), 0.9, -0.05),
                NoiseLayerConfig::new(0.23, Vec3::new(3.5, 21.0, 9.4), 0.6, -0.1),
                NoiseLayerConfig::new(0.47, Vec3::new(17.0, 2.2, 5.1), 0.35, -0.08),
                NoiseLayerConfig::new(0.93, Vec3::new(8.8, 11.3, 30.0), 0.2, -0.05),
            ],
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorParseError {
    #[error("expected 3 or 6 hex digits, got {0:?}")]
    InvalidLength(String),
    #[error("invalid hex digit in {0:?}")]
    InvalidDigit(String),
}

/// Parse `#rrggbb`, `rrggbb` or `#rgb` into a `[0, 1]` color
pub fn parse_hex_color(input: &str) -> Result<Vec3, ColorParseError> {
    let trimmed = input.trim();
    let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);

    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ColorParseError::InvalidDigit(input.to_string()));
    }

    let channel = |s: &str| {
        u8::from_str_radix(s, 16).map_err(|_| ColorParseError::InvalidDigit(input.to_string()))
    };

    let (r, g, b) = match digits.len() {
        6 => (
            channel(&digits[0..2])?,
            channel(&digits[2..4])?,
            channel(&digits[4..6])?,
        ),
        // #rgb is shorthand for #rrggbb
        3 => (
            channel(&digits[0..1])? * 17,
            channel(&digits[1..2])? * 17,
            channel(&digits[2..3])? * 17,
        ),
        _ => return Err(ColorParseError::InvalidLength(input.to_string())),
    };

    Ok(rgb(r, g, b))
}

/// Encode a `[0, 1]` color as `#rrggbb`
pub fn to_hex_color(color: Vec3) -> String {
    let [r, g, b] = color
        .clamp(Vec3::ZERO, Vec3::ONE)
        .to_array()
        .map(|c| (c * 255.0).round() as u8);
    format!("#{:02x}{:02x}{:02x}", r, g, b)
}

fn parse_or_black(name: &str, input: &str) -> Vec3 {
    match parse_hex_color(input) {
        Ok(color) => color,
        Err(err) => {
            log::warn!("Ignoring {} color: {}", name, err);
            Vec3::ZERO
        }
    }
}

/// Per-layer fields as a UI presents them
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerInputs {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub scale: f32,
    pub slope: f32,
    pub offset: f32,
}

/// Snapshot of every externally editable value
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalInputs {
    pub t_min: f32,
    pub density_falloff: f32,
    pub t_max: f32,
    pub step_size: f32,
    pub t_max_to_sun: f32,
    pub sun_step_size: f32,
    pub light_absorption: f32,
    pub fog: f32,
    pub sky_color: String,
    pub dark_color: String,
    pub light_color: String,
    pub layers: [LayerInputs; NOISE_LAYER_COUNT],
}

impl From<&CloudParams> for ExternalInputs {
    fn from(params: &CloudParams) -> Self {
        let march = &params.march;
        Self {
            t_min: march.t_min,
            density_falloff: march.density_falloff_distance,
            t_max: march.t_max,
            step_size: march.step_size,
            t_max_to_sun: march.t_max_to_sun,
            sun_step_size: march.step_size_to_sun,
            light_absorption: march.light_absorption,
            fog: march.fog,
            sky_color: to_hex_color(params.palette.sky),
            dark_color: to_hex_color(params.palette.dark),
            light_color: to_hex_color(params.palette.light),
            layers: params.layers.map(|layer| LayerInputs {
                x: layer.translation.x,
                y: layer.translation.y,
                z: layer.translation.z,
                scale: layer.scale,
                slope: layer.slope,
                offset: layer.offset,
            }),
        }
    }
}

impl Default for ExternalInputs {
    fn default() -> Self {
        Self::from(&CloudParams::default())
    }
}

impl CloudParams {
    /// Copy a UI snapshot in. Values pass through unvalidated; bad colors become black.
    pub fn set_from_external_inputs(&mut self, inputs: &ExternalInputs) {
        self.march = RayMarchConfig {
            t_min: inputs.t_min,
            density_falloff_distance: inputs.density_falloff,
            t_max: inputs.t_max,
            step_size: inputs.step_size,
            t_max_to_sun: inputs.t_max_to_sun,
            step_size_to_sun: inputs.sun_step_size,
            light_absorption: inputs.light_absorption,
            fog: inputs.fog,
        };
        self.palette = PaletteConfig {
            sky: parse_or_black("sky", &inputs.sky_color),
            dark: parse_or_black("dark", &inputs.dark_color),
            light: parse_or_black("light", &inputs.light_color),
        };
        for (layer, input) in self.layers.iter_mut().zip(inputs.layers.iter()) {
            *layer = NoiseLayerConfig {
                scale: input.scale,
                translation: Vec3::new(input.x, input.y, input.z),
                slope: input.slope,
                offset: input.offset,
            };
        }
    }

    /// Normalized sun direction; a zero vector is kept and leaves the clouds unlit.
    pub fn set_sun_direction(&mut self, direction: Vec3) {
        self.sun_direction = direction.try_normalize().unwrap_or(Vec3::ZERO);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_forms() {
        let expected = Vec3::new(1.0, 0.0, 136.0 / 255.0);
        assert_eq!(parse_hex_color("#ff0088").unwrap(), expected);
        assert_eq!(parse_hex_color("ff0088").unwrap(), expected);
        assert_eq!(parse_hex_color("#f08").unwrap(), expected);
    }

    #[test]
    fn rejects_malformed_hex() {
        assert!(matches!(
            parse_hex_color("#12345"),
            Err(ColorParseError::InvalidLength(_))
        ));
        assert!(matches!(
            parse_hex_color("#zzzzzz"),
            Err(ColorParseError::InvalidDigit(_))
        ));
        assert!(parse_hex_color("").is_err());
    }

    #[test]
    fn malformed_color_becomes_black() {
        let mut params = CloudParams::default();
        let mut inputs = ExternalInputs::from(&params);
        inputs.dark_color = "not a color".into();
        params.set_from_external_inputs(&inputs);
        assert_eq!(params.palette.dark, Vec3::ZERO);
        assert_eq!(params.palette.sky, PaletteConfig::default().sky);
    }

    #[test]
    fn external_inputs_round_trip_defaults() {
        let defaults = CloudParams::default();
        let mut params = CloudParams::default();
        params.layers[2].scale = 99.0;
        params.set_from_external_inputs(&ExternalInputs::from(&defaults));
        assert_eq!(params.march, defaults.march);
        assert_eq!(params.layers, defaults.layers);
        assert!(params.palette.sky.abs_diff_eq(defaults.palette.sky, 1e-6));
    }

    #[test]
    fn inverted_ranges_pass_through() {
        let mut params = CloudParams::default();
        let mut inputs = ExternalInputs::from(&params);
        inputs.t_min = 10.0;
        inputs.t_max = 1.0;
        params.set_from_external_inputs(&inputs);
        assert_eq!(params.march.t_min, 10.0);
        assert_eq!(params.march.t_max, 1.0);
    }

    #[test]
    fn zero_sun_direction_is_kept() {
        let mut params = CloudParams::default();
        params.set_sun_direction(Vec3::ZERO);
        assert_eq!(params.sun_direction, Vec3::ZERO);
        params.set_sun_direction(Vec3::new(0.0, -3.0, 0.0));
        assert_eq!(params.sun_direction, Vec3::NEG_Y);
    }
}
