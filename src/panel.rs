//! Live parameter panel (feature `egui`).

use glam::Vec3;

use crate::events::Configurator;
use crate::params::SimulationParameters;

/// Swatches in the palette preview strip.
const PREVIEW_STEPS: usize = 64;

/// The "Parameters" window. Edits go through the [`Configurator`].
pub struct ParameterPanel {
    pending_count: u32,
}

impl ParameterPanel {
    pub fn new(params: &SimulationParameters) -> Self {
        Self {
            pending_count: params.particle_count,
        }
    }

    pub fn show(&mut self, ctx: &egui::Context, config: &mut Configurator, fps: f32) {
        let mut params = config.params().clone();

        egui::Window::new("Parameters")
            .default_width(280.0)
            .resizable(true)
            .show(ctx, |ui| {
                egui::CollapsingHeader::new("Display")
                    .default_open(true)
                    .show(ui, |ui| {
                        ui.add(
                            egui::Slider::new(&mut params.canvas_resolution, 1..=100)
                                .text("Resolution")
                                .suffix(" %"),
                        );
                        ui.checkbox(&mut params.with_hdpi, "HDPI");
                        ui.checkbox(&mut params.canvas_scale, "Full screen");
                        ui.checkbox(&mut params.canvas_smooth, "Canvas smooth");
                        ui.checkbox(&mut params.fps_display, "Display FPS");
                        if params.fps_display {
                            ui.label(format!("{:.1} fps", fps));
                        }
                    });

                egui::CollapsingHeader::new("Vector field")
                    .default_open(true)
                    .show(ui, |ui| {
                        drag(ui, "Frequence", &mut params.field_frequence, 0.01, 0.0..=f32::MAX);
                        ui.horizontal(|ui| {
                            ui.add(egui::DragValue::new(&mut params.field_octaves).range(1..=12));
                            ui.label("Octaves");
                        });
                        drag(ui, "Gain", &mut params.field_gain, 0.01, 0.0..=f32::MAX);
                        drag(ui, "Lacunarity", &mut params.field_lacunarity, 0.01, 0.0..=f32::MAX);
                        drag(ui, "Shift X", &mut params.field_shift_x, 0.01, f32::MIN..=f32::MAX);
                        drag(ui, "Shift Y", &mut params.field_shift_y, 0.01, f32::MIN..=f32::MAX);
                    });

                egui::CollapsingHeader::new("Color palette")
                    .default_open(true)
                    .show(ui, |ui| {
                        vec3(ui, "Luminosity", &mut params.palette_luminosity, 0.0..=1.0);
                        vec3(ui, "Contrast", &mut params.palette_contrast, 0.0..=1.0);
                        vec3(ui, "Frequence", &mut params.palette_freq, 0.0..=100.0);
                        vec3(ui, "Phase", &mut params.palette_phase, 0.0..=1.0);
                        palette_preview(ui, &params);

                        let mut background = params.background_color.to_array();
                        ui.horizontal(|ui| {
                            ui.color_edit_button_rgba_unmultiplied(&mut background);
                            ui.label("Background");
                        });
                        params.background_color = background.into();
                    });

                egui::CollapsingHeader::new("Simulation")
                    .default_open(true)
                    .show(ui, |ui| {
                        ui.horizontal(|ui| {
                            ui.add(
                                egui::DragValue::new(&mut params.speed_step)
                                    .speed(0.00001)
                                    .max_decimals(6),
                            );
                            ui.label("Speed step");
                        });
                        drag(ui, "Point size", &mut params.point_size, 0.1, 0.0..=64.0);
                        ui.checkbox(&mut params.trail_enabled, "Trails");
                        ui.add_enabled(
                            params.trail_enabled,
                            egui::Slider::new(&mut params.trail_fade_speed, 0.0..=1.0)
                                .text("Trail fade")
                                .logarithmic(true),
                        );
                        ui.horizontal(|ui| {
                            ui.add(
                                egui::DragValue::new(&mut self.pending_count)
                                    .range(1..=4_000_000)
                                    .speed(100),
                            );
                            if ui.button("Apply count").clicked() {
                                params.particle_count = self.pending_count;
                            }
                        });
                    });

                egui::CollapsingHeader::new("Animation")
                    .default_open(true)
                    .show(ui, |ui| {
                        ui.checkbox(&mut params.anim_run, "Run animation");
                    });
            });

        if &params != config.params() {
            config.update(params);
        }
    }
}

fn drag(
    ui: &mut egui::Ui,
    label: &str,
    value: &mut f32,
    speed: f64,
    range: std::ops::RangeInclusive<f32>,
) {
    ui.horizontal(|ui| {
        ui.add(egui::DragValue::new(value).speed(speed).range(range));
        ui.label(label);
    });
}

fn vec3(ui: &mut egui::Ui, label: &str, value: &mut Vec3, range: std::ops::RangeInclusive<f32>) {
    ui.horizontal(|ui| {
        for component in [&mut value.x, &mut value.y, &mut value.z] {
            ui.add(
                egui::DragValue::new(component)
                    .speed(0.01)
                    .range(range.clone()),
            );
        }
        ui.label(label);
    });
}

/// The palette across the particle index range, as the draw pass colors it.
fn palette_preview(ui: &mut egui::Ui, params: &SimulationParameters) {
    let palette = params.palette();
    let width = ui.available_width();
    let (rect, _) = ui.allocate_exact_size(egui::vec2(width, 14.0), egui::Sense::hover());
    let step = rect.width() / PREVIEW_STEPS as f32;

    for i in 0..PREVIEW_STEPS {
        let c = palette.color_at(i as f32 / PREVIEW_STEPS as f32);
        let color = egui::Color32::from_rgb(
            (c.x * 255.0) as u8,
            (c.y * 255.0) as u8,
            (c.z * 255.0) as u8,
        );
        let left = rect.left() + i as f32 * step;
        let swatch = egui::Rect::from_min_max(
            egui::pos2(left, rect.top()),
            egui::pos2(left + step + 0.5, rect.bottom()),
        );
        ui.painter().rect_filled(swatch, 0.0, color);
    }
}
