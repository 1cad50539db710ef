//! Settings panel: navigation policy, log level and the active key bindings.

use super::{NoticeKind, Panel, UiApp};
use annotator_core::{IncompletePolicy, LogLevel};
use eframe::egui;

fn policy_label(policy: IncompletePolicy) -> &'static str {
    match policy {
        IncompletePolicy::Drop => "Discard silently",
        IncompletePolicy::Warn => "Discard and warn",
        IncompletePolicy::Block => "Stay on the image",
    }
}

fn log_level_label(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "Error",
        LogLevel::Warn => "Warn",
        LogLevel::Info => "Info",
        LogLevel::Debug => "Debug",
        LogLevel::Trace => "Trace",
    }
}

impl UiApp {
    /// Renders the settings screen.
    pub(super) fn render_settings_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Settings");
        ui.add_space(8.0);

        ui.horizontal(|ui| {
            ui.label("Partially labelled image on navigation");
            let mut selected = self.session.policy();
            egui::ComboBox::from_id_salt("incomplete-policy")
                .selected_text(policy_label(selected))
                .show_ui(ui, |ui| {
                    for policy in [
                        IncompletePolicy::Drop,
                        IncompletePolicy::Warn,
                        IncompletePolicy::Block,
                    ] {
                        ui.selectable_value(&mut selected, policy, policy_label(policy));
                    }
                });
            if selected != self.session.policy() {
                self.session.set_policy(selected);
                self.config.incomplete_policy = selected;
                self.status = format!("Navigation policy: {}", policy_label(selected));
            }
        });

        ui.add_space(12.0);
        ui.horizontal(|ui| {
            ui.label("Log level");
            let mut selected = self.config.log_level;
            egui::ComboBox::from_id_salt("log-level")
                .selected_text(log_level_label(selected))
                .show_ui(ui, |ui| {
                    for level in [
                        LogLevel::Error,
                        LogLevel::Warn,
                        LogLevel::Info,
                        LogLevel::Debug,
                        LogLevel::Trace,
                    ] {
                        ui.selectable_value(&mut selected, level, log_level_label(level));
                    }
                });
            if selected != self.config.log_level {
                self.config.log_level = selected;
                self.status = "Log level applies after restart".to_string();
            }
        });

        ui.add_space(12.0);
        ui.separator();
        ui.heading("Key bindings");
        let nav = self.session.navigation_keys();
        ui.label(format!("Next image: {}    Previous image: {}", nav.next, nav.previous));
        for scale in self.session.pickers().scales() {
            let bound: Vec<String> = scale
                .categories
                .iter()
                .filter_map(|c| c.key.map(|k| format!("{k} = {}", c.name)))
                .collect();
            if bound.is_empty() {
                ui.label(format!("{}: mouse only", scale.title));
            } else {
                ui.label(format!("{}: {}", scale.title, bound.join(", ")));
            }
        }
        ui.label("Scales and keys are edited in the config file.");

        ui.add_space(16.0);
        ui.separator();
        match self.config_path.clone() {
            Some(path) => {
                ui.label(format!("Config file: {}", path.display()));
                if ui.button("Save settings").clicked() {
                    match self.config.save(&path) {
                        Ok(()) => {
                            self.status = format!("Settings saved to {}", path.display());
                            self.panel = Panel::Annotate;
                        }
                        Err(err) => self.report(err),
                    }
                }
            }
            None => {
                ui.label("No config directory available; settings last for this session only.");
            }
        }

        ui.add_space(16.0);
        ui.separator();
        ui.label(format!("Version {}", env!("ANNOTATOR_VERSION")));
        if ui.small_button("About").clicked() {
            self.notify(
                NoticeKind::Info,
                "Skin Tone Annotator",
                "Label images on the Monk and Fitzpatrick scales. \
                 Click a swatch or press its key, then use the arrow keys to move on.",
            );
        }
    }
}
