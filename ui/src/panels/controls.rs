use crate::app::WheelApp;
use crate::net;
use std::collections::BTreeSet;

use crate::types::{BonusCategory, BonusMode, FilterSettings, SettingsUpdate, SpinSource};
use gamewheel::{MAX_SPIN_DURATION_MS, MAX_SPIN_TURNS, MIN_SPIN_DURATION_MS, MIN_SPIN_TURNS};

const BONUS_OPTIONS: &[(BonusMode, &str)] = &[
    (BonusMode::Exclude, "Exclude"),
    (BonusMode::Include, "Include"),
    (BonusMode::Only, "Only bonus"),
];

/// Editable copy of the server's filters. Polls refresh it until the
/// operator starts editing; saving posts the whole form as one update.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SettingsForm {
    pub(crate) loaded: bool,
    pub(crate) dirty: bool,
    pub(crate) include_suggestions: bool,
    pub(crate) console_filter: String,
    pub(crate) bonus_mode: BonusMode,
    /// `None` until the operator picks categories: every bonus title is excluded.
    pub(crate) bonus_exclusions: Option<BTreeSet<BonusCategory>>,
    pub(crate) spin_source: SpinSource,
    pub(crate) spin_duration_ms: u64,
    pub(crate) spin_turns: u32,
}

impl Default for SettingsForm {
    fn default() -> Self {
        let mut form = Self::from_settings(&FilterSettings::default());
        form.loaded = false;
        form
    }
}

impl SettingsForm {
    fn from_settings(s: &FilterSettings) -> Self {
        Self {
            loaded: true,
            dirty: false,
            include_suggestions: s.include_suggestions,
            console_filter: s.console_filter.clone(),
            bonus_mode: s.bonus_mode,
            bonus_exclusions: s.bonus_exclusions.clone(),
            spin_source: s.spin_source,
            spin_duration_ms: s.spin_duration_ms,
            spin_turns: s.spin_turns,
        }
    }

    /// Take the polled settings unless there are unsaved edits.
    pub(crate) fn load_from(&mut self, s: &FilterSettings) {
        if !self.dirty {
            *self = Self::from_settings(s);
        }
    }

    pub(crate) fn to_update(&self) -> SettingsUpdate {
        SettingsUpdate {
            include_suggestions: Some(self.include_suggestions),
            console_filter: Some(self.console_filter.trim().to_string()),
            bonus_mode: Some(self.bonus_mode),
            bonus_exclusions: self.bonus_exclusions.clone(),
            spin_source: Some(self.spin_source),
            spin_duration_ms: Some(self.spin_duration_ms),
            spin_turns: Some(self.spin_turns),
        }
    }
}

fn bonus_label(mode: BonusMode) -> &'static str {
    BONUS_OPTIONS
        .iter()
        .find(|(m, _)| *m == mode)
        .map(|(_, label)| *label)
        .unwrap_or(BONUS_OPTIONS[0].1)
}

/// One checkbox per category. Touching any of them switches the form from
/// "exclude all" to an explicit set.
fn exclusion_checkboxes(ui: &mut egui::Ui, exclusions: &mut Option<BTreeSet<BonusCategory>>) -> bool {
    let mut changed = false;
    ui.horizontal_wrapped(|ui| {
        for category in BonusCategory::ALL {
            let mut checked = exclusions.as_ref().is_none_or(|set| set.contains(&category));
            if ui.checkbox(&mut checked, category.to_string()).changed() {
                let set = exclusions.get_or_insert_with(|| BonusCategory::ALL.into_iter().collect());
                if checked {
                    set.insert(category);
                } else {
                    set.remove(&category);
                }
                changed = true;
            }
        }
    });
    changed
}

impl WheelApp {
    pub(crate) fn render_controls_panel(&mut self, ui: &mut egui::Ui) {
        let sync = self.poller.sync();
        ui.label(
            egui::RichText::new(format!(
                "{} on wheel / {} eligible",
                sync.sample().occupied_count(),
                sync.pool_size()
            ))
            .color(egui::Color32::from_rgb(140, 140, 140)),
        );
        ui.separator();

        ui.heading("Filters");
        let form = &mut self.settings;
        if !form.loaded {
            ui.label("waiting for server settings...");
            return;
        }
        let mut changed = false;

        changed |= ui
            .checkbox(&mut form.include_suggestions, "Include suggestions")
            .changed();

        ui.horizontal(|ui| {
            ui.label("Console");
            changed |= ui
                .add(egui::TextEdit::singleline(&mut form.console_filter).desired_width(120.0))
                .changed();
            if ui.small_button("All").clicked() {
                form.console_filter = gamewheel::CONSOLE_FILTER_ALL.into();
                changed = true;
            }
        });

        ui.horizontal(|ui| {
            ui.label("Bonus titles");
            egui::ComboBox::from_id_salt("bonus_mode")
                .width(100.0)
                .selected_text(bonus_label(form.bonus_mode))
                .show_ui(ui, |ui| {
                    for (mode, label) in BONUS_OPTIONS {
                        changed |= ui.selectable_value(&mut form.bonus_mode, *mode, *label).changed();
                    }
                });
        });
        if form.bonus_mode == BonusMode::Exclude {
            changed |= exclusion_checkboxes(ui, &mut form.bonus_exclusions);
        }

        ui.add_space(6.0);
        ui.heading("Spin");
        ui.horizontal(|ui| {
            ui.label("Winner from");
            changed |= ui
                .radio_value(&mut form.spin_source, SpinSource::Pool, "pool")
                .changed();
            changed |= ui
                .radio_value(&mut form.spin_source, SpinSource::Sample, "wheel")
                .changed();
        });
        changed |= ui
            .add(
                egui::Slider::new(
                    &mut form.spin_duration_ms,
                    MIN_SPIN_DURATION_MS..=MAX_SPIN_DURATION_MS,
                )
                .step_by(100.0)
                .suffix(" ms")
                .text("duration"),
            )
            .changed();
        changed |= ui
            .add(egui::Slider::new(&mut form.spin_turns, MIN_SPIN_TURNS..=MAX_SPIN_TURNS).text("turns"))
            .changed();

        if changed {
            form.dirty = true;
        }

        ui.add_space(8.0);
        let dirty = form.dirty;
        let mut save = false;
        let mut revert = false;
        ui.horizontal(|ui| {
            save = ui.add_enabled(dirty, egui::Button::new("Save")).clicked();
            revert = ui.add_enabled(dirty, egui::Button::new("Revert")).clicked();
        });

        if save {
            let update = self.settings.to_update();
            self.settings.dirty = false;
            net::post_settings(ui.ctx(), &self.pending, &update);
        } else if revert {
            self.settings.dirty = false;
            if let Some(s) = self.poller.settings() {
                self.settings.load_from(s);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polls_do_not_overwrite_unsaved_edits() {
        let mut form = SettingsForm::default();
        assert!(!form.loaded);

        let mut server = FilterSettings::default();
        server.console_filter = "SNES".into();
        form.load_from(&server);
        assert!(form.loaded);
        assert_eq!(form.console_filter, "SNES");

        form.console_filter = "NES".into();
        form.dirty = true;
        form.load_from(&FilterSettings::default());
        assert_eq!(form.console_filter, "NES");
    }

    #[test]
    fn update_carries_every_field() {
        let mut form = SettingsForm::default();
        form.console_filter = "  PS2 ".into();
        form.spin_turns = 12;
        let update = form.to_update();

        let mut applied = FilterSettings::default();
        applied.apply(&update);
        assert_eq!(applied.console_filter(), Some("PS2"));
        assert_eq!(applied.spin_turns, 12);
        assert_eq!(applied.bonus_mode, BonusMode::Exclude);
        assert_eq!(applied.bonus_exclusions, None);
    }

    #[test]
    fn exclusion_set_round_trips_through_the_form() {
        let mut server = FilterSettings::default();
        server.bonus_exclusions = Some(BTreeSet::from([BonusCategory::Demo]));
        let mut form = SettingsForm::default();
        form.load_from(&server);
        assert_eq!(form.bonus_exclusions, server.bonus_exclusions);

        let mut applied = FilterSettings::default();
        applied.apply(&form.to_update());
        assert!(applied.excludes_bonus(&[BonusCategory::Demo]));
        assert!(!applied.excludes_bonus(&[BonusCategory::Hack]));
    }
}
