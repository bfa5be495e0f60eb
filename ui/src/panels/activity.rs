use crate::app::WheelApp;
use crate::types::{ActivityKind, AlertLevel};

use super::extract_time;

impl WheelApp {
    pub(crate) fn render_activity_panel(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("Clear").clicked() {
                self.activity.clear();
            }
            ui.checkbox(&mut self.activity_auto_scroll, "Auto-scroll");
            ui.separator();

            for kind in ActivityKind::ALL {
                if let Some(checked) = self.activity_filters.get_mut(&kind) {
                    ui.checkbox(checked, kind.key());
                }
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(format!("{} events", self.activity.len()));
            });
        });

        let scroll = egui::ScrollArea::vertical()
            .stick_to_bottom(self.activity_auto_scroll)
            .auto_shrink(false);
        scroll.show(ui, |ui| {
            let mono = |text: &str| egui::RichText::new(text).monospace().size(11.0);
            let dim = egui::Color32::from_rgb(140, 140, 140);
            let winner_color = egui::Color32::from_rgb(255, 221, 87);
            let warn_color = egui::Color32::from_rgb(255, 200, 60);
            let error_color = egui::Color32::from_rgb(255, 80, 80);

            egui::Grid::new("activity_grid")
                .num_columns(3)
                .min_col_width(0.0)
                .spacing(egui::vec2(12.0, 1.0))
                .show(ui, |ui| {
                    for entry in &self.activity {
                        if !self.activity_filters.get(&entry.kind).copied().unwrap_or(true) {
                            continue;
                        }
                        let color = match (entry.level, entry.kind) {
                            (Some(AlertLevel::Error), _) => Some(error_color),
                            (Some(AlertLevel::Warn), _) => Some(warn_color),
                            (None, ActivityKind::Winner) => Some(winner_color),
                            (None, _) => None,
                        };

                        ui.label(mono(&extract_time(&entry.timestamp)));
                        ui.label(mono(entry.kind.key()).color(dim));
                        let text = mono(&entry.text);
                        ui.label(match color {
                            Some(c) => text.color(c),
                            None => text,
                        });
                        ui.end_row();
                    }
                });
        });
    }
}
