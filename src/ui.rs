//! egui parameter panel
//!
//! Edits an [`ExternalInputs`] snapshot. Slider moves apply at once; hex color fields apply when
//! they lose focus or when Apply is pressed, so half-typed colors never reach the bake.

use crate::clouds::{ExternalInputs, LayerInputs};
use std::ops::RangeInclusive;

/// What the host should do after a panel pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelAction {
    #[default]
    None,
    /// Push [`ParameterPanel::inputs`] into the engine
    Apply,
    /// Regenerate the noise volume and rebake
    ResetNoise,
}

impl PanelAction {
    /// Combine two actions from the same pass; a noise reset outranks an apply
    fn merge(self, other: PanelAction) -> PanelAction {
        match (self, other) {
            (PanelAction::ResetNoise, _) | (_, PanelAction::ResetNoise) => PanelAction::ResetNoise,
            (PanelAction::Apply, _) | (_, PanelAction::Apply) => PanelAction::Apply,
            _ => PanelAction::None,
        }
    }
}

pub struct ParameterPanel {
    inputs: ExternalInputs,
    colors_dirty: bool,
}

impl ParameterPanel {
    pub fn new(inputs: ExternalInputs) -> Self {
        Self {
            inputs,
            colors_dirty: false,
        }
    }

    pub fn inputs(&self) -> &ExternalInputs {
        &self.inputs
    }

    /// Draw the panel. `progress` is `(tiles_done, tiles_total)` of the running bake.
    pub fn show(&mut self, ctx: &egui::Context, progress: (u32, u32)) -> PanelAction {
        let mut action = PanelAction::None;

        egui::Window::new("Clouds")
            .default_pos([10.0, 10.0])
            .default_width(280.0)
            .show(ctx, |ui| {
                let (done, total) = progress;
                ui.add(
                    egui::ProgressBar::new(progress_fraction(progress))
                        .text(format!("Bake {}/{}", done, total)),
                );
                ui.separator();

                action = action.merge(self.march_section(ui));
                action = action.merge(self.palette_section(ui));
                for (index, layer) in self.inputs.layers.iter_mut().enumerate() {
                    egui::CollapsingHeader::new(format!("Layer {}", index + 1))
                        .id_source(("noise_layer", index))
                        .show(ui, |ui| {
                            if layer_controls(ui, layer) {
                                action = action.merge(PanelAction::Apply);
                            }
                        });
                }
                ui.separator();

                ui.horizontal(|ui| {
                    if ui.button("Apply").clicked() {
                        self.colors_dirty = false;
                        action = action.merge(PanelAction::Apply);
                    }
                    if ui.button("New noise").clicked() {
                        action = action.merge(PanelAction::ResetNoise);
                    }
                });
                ui.label("Drag to look around");
            });

        action
    }

    fn march_section(&mut self, ui: &mut egui::Ui) -> PanelAction {
        let inputs = &mut self.inputs;
        let mut changed = false;
        egui::CollapsingHeader::new("Ray march")
            .default_open(true)
            .show(ui, |ui| {
                changed |= slider(ui, &mut inputs.t_min, 0.0..=10.0, "t min");
                changed |= slider(ui, &mut inputs.density_falloff, 0.0..=20.0, "falloff");
                changed |= slider(ui, &mut inputs.t_max, 1.0..=128.0, "t max");
                changed |= slider(ui, &mut inputs.step_size, 0.05..=2.0, "step");
                changed |= slider(ui, &mut inputs.t_max_to_sun, 0.0..=32.0, "t max to sun");
                changed |= slider(ui, &mut inputs.sun_step_size, 0.05..=4.0, "sun step");
                changed |= slider(ui, &mut inputs.light_absorption, 0.0..=10.0, "absorption");
                changed |= slider(ui, &mut inputs.fog, 0.0..=0.5, "fog");
            });
        if changed {
            PanelAction::Apply
        } else {
            PanelAction::None
        }
    }

    fn palette_section(&mut self, ui: &mut egui::Ui) -> PanelAction {
        let inputs = &mut self.inputs;
        let mut edited = false;
        let mut committed = false;
        egui::CollapsingHeader::new("Colors")
            .default_open(true)
            .show(ui, |ui| {
                for (label, value) in [
                    ("sky", &mut inputs.sky_color),
                    ("dark", &mut inputs.dark_color),
                    ("light", &mut inputs.light_color),
                ] {
                    ui.horizontal(|ui| {
                        ui.label(label);
                        let response = ui.text_edit_singleline(value);
                        edited |= response.changed();
                        committed |= response.lost_focus();
                    });
                }
            });

        self.colors_dirty |= edited;
        if committed && self.colors_dirty {
            self.colors_dirty = false;
            PanelAction::Apply
        } else {
            PanelAction::None
        }
    }
}

fn slider(ui: &mut egui::Ui, value: &mut f32, range: RangeInclusive<f32>, text: &str) -> bool {
    ui.add(egui::Slider::new(value, range).text(text)).changed()
}

fn layer_controls(ui: &mut egui::Ui, layer: &mut LayerInputs) -> bool {
    let mut changed = false;
    ui.horizontal(|ui| {
        for (prefix, value) in [("x ", &mut layer.x), ("y ", &mut layer.y), ("z ", &mut layer.z)] {
            changed |= ui
                .add(egui::DragValue::new(value).speed(0.1).prefix(prefix))
                .changed();
        }
    });
    changed |= slider(ui, &mut layer.scale, 0.0..=2.0, "scale");
    changed |= slider(ui, &mut layer.slope, -4.0..=4.0, "slope");
    changed |= slider(ui, &mut layer.offset, -1.0..=1.0, "offset");
    changed
}

/// Bake completion in `[0, 1]`
pub fn progress_fraction((done, total): (u32, u32)) -> f32 {
    if total == 0 {
        return 1.0;
    }
    (done as f32 / total as f32).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_outranks_apply() {
        assert_eq!(
            PanelAction::Apply.merge(PanelAction::ResetNoise),
            PanelAction::ResetNoise
        );
        assert_eq!(PanelAction::None.merge(PanelAction::Apply), PanelAction::Apply);
        assert_eq!(PanelAction::None.merge(PanelAction::None), PanelAction::None);
    }

    #[test]
    fn progress_fraction_handles_bounds() {
        assert_eq!(progress_fraction((0, 384)), 0.0);
        assert_eq!(progress_fraction((192, 384)), 0.5);
        assert_eq!(progress_fraction((0, 0)), 1.0);
    }

    #[test]
    fn idle_panel_changes_nothing() {
        let ctx = egui::Context::default();
        let mut panel = ParameterPanel::new(ExternalInputs::default());

        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            assert_eq!(panel.show(ctx, (10, 384)), PanelAction::None);
        });
        assert_eq!(panel.inputs(), &ExternalInputs::default());
    }
}
