mod keys;
mod settings;

use anyhow::{Context, Result};
use annotator_core::{
    AnnotatorConfig, AnnotatorError, KeyOutcome, NavigationOutcome, Rgb, SessionState,
    UpsertOutcome, default_file_name, default_scales,
};
use eframe::{App, Frame, egui};
use rfd::FileDialog;
use std::path::{Path, PathBuf};

const SWATCH_HEIGHT: f32 = 72.0;
const SWATCH_GAP: f32 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Panel {
    #[default]
    Annotate,
    Settings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NoticeKind {
    Info,
    Warning,
    Error,
}

/// A message shown in a modal until dismissed.
#[derive(Debug, Clone)]
struct Notice {
    kind: NoticeKind,
    title: String,
    body: String,
}

/// Decoded image for the current position. `Err` keeps the reason so a
/// missing or broken file is reported in place.
struct ShownImage {
    path: PathBuf,
    texture: Result<egui::TextureHandle, String>,
}

pub(crate) struct UiApp {
    session: SessionState,
    config: AnnotatorConfig,
    config_path: Option<PathBuf>,
    panel: Panel,
    status: String,
    notice: Option<Notice>,
    shown: Option<ShownImage>,
    last_folder: Option<PathBuf>,
}

impl UiApp {
    pub(crate) fn new(config: AnnotatorConfig, config_path: Option<PathBuf>) -> Self {
        let session = match SessionState::from_config(&config) {
            Ok(session) => session,
            Err(err) => {
                tracing::warn!("config rejected, using built-in scales: {err}");
                SessionState::new(default_scales(), config.incomplete_policy)
            }
        };
        Self {
            session,
            config,
            config_path,
            panel: Panel::default(),
            status: "Select a folder to start".to_string(),
            notice: None,
            shown: None,
            last_folder: None,
        }
    }

    fn notify(&mut self, kind: NoticeKind, title: impl Into<String>, body: impl Into<String>) {
        self.notice = Some(Notice {
            kind,
            title: title.into(),
            body: body.into(),
        });
    }

    fn report(&mut self, err: AnnotatorError) {
        if err.is_silent() {
            return;
        }
        tracing::warn!("{err}");
        self.status = err.to_string();
        self.notify(NoticeKind::Error, err.title(), err.to_string());
    }

    fn select_image_folder(&mut self) {
        let mut dialog = FileDialog::new().set_title("Select Image Folder");
        if let Some(dir) = &self.last_folder {
            dialog = dialog.set_directory(dir);
        }
        if let Err(err) = self.load_folder(dialog.pick_folder()) {
            self.report(err);
        }
    }

    fn load_folder(&mut self, choice: Option<PathBuf>) -> annotator_core::Result<()> {
        let dir = chosen(choice)?;
        let first = self.session.load_folder(&dir)?;
        self.status = format!("Loaded {}, showing {first}", dir.display());
        self.last_folder = dir.parent().map(Path::to_path_buf);
        Ok(())
    }

    fn create_annotations_file(&mut self) {
        let Some(folder) = self.session.folder() else {
            self.report(AnnotatorError::NoFolderSelected);
            return;
        };
        let choice = FileDialog::new()
            .set_title("Create Annotations File")
            .add_filter("CSV Files", &["csv"])
            .set_file_name(default_file_name(folder.folder_name()))
            .save_file();
        match chosen(choice).and_then(|path| self.session.create_store(&path)) {
            Ok(bound) => {
                self.status = format!("Annotations file: {}", bound.display());
                self.notify(
                    NoticeKind::Info,
                    "Success",
                    format!("Annotations file created successfully:\n{}", bound.display()),
                );
            }
            Err(err) => self.report(err),
        }
    }

    fn open_annotations_file(&mut self) {
        if self.session.folder().is_none() {
            self.report(AnnotatorError::NoFolderSelected);
            return;
        }
        let choice = FileDialog::new()
            .set_title("Open Annotations File")
            .add_filter("CSV Files", &["csv"])
            .pick_file();
        match chosen(choice).and_then(|path| {
            let count = self.session.open_store(&path)?;
            Ok((path, count))
        }) {
            Ok((path, count)) => {
                self.status = format!("{count} annotations loaded from {}", path.display());
            }
            Err(err) => self.report(err),
        }
    }

    /// Picker and navigation keys only act on the annotate screen, with no
    /// notice open and a folder loaded.
    fn session_keys_enabled(&self) -> bool {
        self.panel == Panel::Annotate && self.notice.is_none() && self.session.folder().is_some()
    }

    fn save_current(&mut self) {
        match self.session.save_current() {
            Ok(UpsertOutcome::Written) => self.status = "Annotation saved".to_string(),
            Ok(UpsertOutcome::Skipped) if !self.session.store().is_bound() => {
                self.status = "No annotations file; create or open one first".to_string();
            }
            Ok(UpsertOutcome::Skipped) => {
                self.status = "Select a category on every scale first".to_string();
            }
            Err(err) => self.report(err),
        }
    }

    fn after_navigation(&mut self, outcome: NavigationOutcome) {
        if outcome.dropped_incomplete {
            self.notify(
                NoticeKind::Warning,
                "Colors not selected",
                "The previous image was only partially labelled and was not saved.",
            );
        }
        self.status = match (outcome.saved_previous, outcome.restored) {
            (true, true) => format!("Saved; {} already annotated", outcome.image_name),
            (true, false) => "Saved".to_string(),
            (false, true) => format!("{} already annotated", outcome.image_name),
            (false, false) => String::new(),
        };
    }

    fn handle_input(&mut self, ctx: &egui::Context) {
        let shortcut = |key: egui::Key| {
            ctx.input_mut(|i| i.consume_key(egui::Modifiers::COMMAND, key))
        };
        if shortcut(egui::Key::I) {
            self.select_image_folder();
        }
        if shortcut(egui::Key::N) {
            self.create_annotations_file();
        }
        if shortcut(egui::Key::O) {
            self.open_annotations_file();
        }
        if shortcut(egui::Key::S) {
            self.save_current();
        }

        if ctx.wants_keyboard_input() || !self.session_keys_enabled() {
            return;
        }
        for key in keys::pressed_keys(ctx) {
            match self.session.handle_key(key) {
                Ok(KeyOutcome::Navigated(outcome)) => self.after_navigation(outcome),
                Ok(KeyOutcome::Picked(_)) | Ok(KeyOutcome::Ignored) => {}
                Err(err) => self.report(err),
            }
        }
    }

    /// Decodes the current image once per position change.
    fn sync_image(&mut self, ctx: &egui::Context) {
        let Some(path) = self.session.current_image_path() else {
            self.shown = None;
            return;
        };
        if self.shown.as_ref().is_some_and(|s| s.path == path) {
            return;
        }
        let texture = load_texture(ctx, &path).map_err(|e| {
            tracing::warn!("{e:#}");
            format!("{e:#}")
        });
        self.shown = Some(ShownImage { path, texture });
    }

    fn render_toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui
                .button("Select Image Folder")
                .on_hover_text("Ctrl+I")
                .clicked()
            {
                self.select_image_folder();
            }
            if ui
                .button("Create Annotations File")
                .on_hover_text("Ctrl+N")
                .clicked()
            {
                self.create_annotations_file();
            }
            if ui
                .button("Open Annotations File")
                .on_hover_text("Ctrl+O")
                .clicked()
            {
                self.open_annotations_file();
            }
            let can_save = self.session.store().is_bound() && self.session.pickers().is_complete();
            if ui
                .add_enabled(can_save, egui::Button::new("Save"))
                .on_hover_text("Ctrl+S")
                .clicked()
            {
                self.save_current();
            }
            ui.separator();
            ui.selectable_value(&mut self.panel, Panel::Annotate, "Annotate");
            ui.selectable_value(&mut self.panel, Panel::Settings, "Settings");
        });
    }

    fn render_annotate_panel(&mut self, ui: &mut egui::Ui) {
        let pickers_height = (SWATCH_HEIGHT + 32.0) * self.session.pickers().len() as f32;
        let image_height = (ui.available_height() - pickers_height - 40.0).max(120.0);
        let image_area = egui::vec2(ui.available_width(), image_height);

        ui.allocate_ui_with_layout(
            image_area,
            egui::Layout::centered_and_justified(egui::Direction::TopDown),
            |ui| match &self.shown {
                None => {
                    ui.heading("Select a folder to start");
                }
                Some(ShownImage {
                    texture: Ok(texture),
                    ..
                }) => {
                    let size = fit_size(texture.size_vec2(), image_area);
                    ui.image((texture.id(), size));
                }
                Some(ShownImage {
                    texture: Err(reason),
                    ..
                }) => {
                    ui.colored_label(
                        egui::Color32::LIGHT_RED,
                        format!("Could not display image: {reason}"),
                    );
                }
            },
        );

        if let Some(label) = self.session.position_label() {
            ui.vertical_centered(|ui| {
                ui.label(label);
            });
        }
        ui.add_space(8.0);

        let mut clicked = None;
        for (scale_idx, picker) in self.session.pickers().pickers().iter().enumerate() {
            ui.label(egui::RichText::new(&picker.scale().title).strong());
            let count = picker.scale().len().max(1) as f32;
            let width = (ui.available_width() - SWATCH_GAP * (count - 1.0)) / count;
            ui.horizontal(|ui| {
                ui.spacing_mut().item_spacing.x = SWATCH_GAP;
                for (cat_idx, category) in picker.scale().categories.iter().enumerate() {
                    let (resp, painter) = ui
                        .allocate_painter(egui::vec2(width, SWATCH_HEIGHT), egui::Sense::click());
                    let rect = resp.rect;
                    let rgb = Rgb::from_hex(&category.color).unwrap_or(Rgb(128, 128, 128));
                    painter.rect_filled(rect, 4.0, egui::Color32::from_rgb(rgb.0, rgb.1, rgb.2));
                    if picker.selected_index() == Some(cat_idx) {
                        painter.rect_stroke(
                            rect,
                            4.0,
                            egui::Stroke::new(4.0, egui::Color32::WHITE),
                            egui::StrokeKind::Inside,
                        );
                        painter.rect_stroke(
                            rect,
                            4.0,
                            egui::Stroke::new(3.0, egui::Color32::BLACK),
                            egui::StrokeKind::Outside,
                        );
                    } else {
                        painter.rect_stroke(
                            rect,
                            4.0,
                            egui::Stroke::new(1.0, egui::Color32::BLACK),
                            egui::StrokeKind::Inside,
                        );
                    }
                    let text = match category.key {
                        Some(key) => format!("{} [{key}]", category.name),
                        None => category.name.clone(),
                    };
                    let text_color = if rgb.is_light() {
                        egui::Color32::BLACK
                    } else {
                        egui::Color32::WHITE
                    };
                    painter.text(
                        rect.center(),
                        egui::Align2::CENTER_CENTER,
                        text,
                        egui::FontId::proportional(14.0),
                        text_color,
                    );
                    if resp.clicked() {
                        clicked = Some((scale_idx, cat_idx));
                    }
                }
            });
            ui.add_space(12.0);
        }
        if let Some((scale, category)) = clicked {
            self.session.click(scale, category);
        }
    }

    fn render_notice(&mut self, ctx: &egui::Context) {
        let Some(notice) = &self.notice else {
            return;
        };
        let color = match notice.kind {
            NoticeKind::Info => ctx.style().visuals.text_color(),
            NoticeKind::Warning => ctx.style().visuals.warn_fg_color,
            NoticeKind::Error => ctx.style().visuals.error_fg_color,
        };
        let mut dismissed = false;
        let modal = egui::Modal::new(egui::Id::new("notice")).show(ctx, |ui| {
            ui.set_min_width(320.0);
            ui.heading(egui::RichText::new(&notice.title).color(color));
            ui.add_space(6.0);
            ui.label(&notice.body);
            ui.add_space(10.0);
            if ui.button("OK").clicked() {
                dismissed = true;
            }
        });
        if dismissed || modal.should_close() {
            self.notice = None;
        }
    }
}

impl App for UiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        if self.notice.is_none() {
            self.handle_input(ctx);
        }
        self.sync_image(ctx);

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| self.render_toolbar(ui));

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                match self.session.store().path() {
                    Some(path) => ui.label(format!(
                        "{} ({} annotated)",
                        path.display(),
                        self.session.store().len()
                    )),
                    None => ui.label("No annotations file"),
                };
                if !self.status.is_empty() {
                    ui.separator();
                    ui.label(&self.status);
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| match self.panel {
            Panel::Annotate => self.render_annotate_panel(ui),
            Panel::Settings => self.render_settings_panel(ui),
        });

        self.render_notice(ctx);
    }
}

/// A dismissed dialog becomes `UserCancelled`, which is never reported.
fn chosen(choice: Option<PathBuf>) -> annotator_core::Result<PathBuf> {
    choice.ok_or(AnnotatorError::UserCancelled)
}

fn load_texture(ctx: &egui::Context, path: &Path) -> Result<egui::TextureHandle> {
    let img = image::open(path)
        .with_context(|| format!("cannot open image {}", path.display()))?
        .to_rgba8();
    let size = [img.width() as usize, img.height() as usize];
    let color = egui::ColorImage::from_rgba_unmultiplied(size, img.as_raw());
    let name = format!("image:{}", path.display());
    Ok(ctx.load_texture(name, color, egui::TextureOptions::LINEAR))
}

/// Largest size with the image's aspect ratio that fits in `bounds`.
fn fit_size(image: egui::Vec2, bounds: egui::Vec2) -> egui::Vec2 {
    if image.x <= 0.0 || image.y <= 0.0 {
        return egui::Vec2::ZERO;
    }
    let scale = (bounds.x / image.x).min(bounds.y / image.y);
    image * scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs::File;
    use tempfile::tempdir;

    fn app_with_folder() -> anyhow::Result<(UiApp, tempfile::TempDir)> {
        let dir = tempdir()?;
        File::create(dir.path().join("a.jpg"))?;
        File::create(dir.path().join("b.jpg"))?;
        let mut app = UiApp::new(AnnotatorConfig::default(), None);
        app.session.load_folder(dir.path())?;
        Ok((app, dir))
    }

    #[test]
    fn session_keys_only_on_annotate_panel() -> anyhow::Result<()> {
        let empty = UiApp::new(AnnotatorConfig::default(), None);
        assert!(!empty.session_keys_enabled());

        let (mut app, _dir) = app_with_folder()?;
        assert!(app.session_keys_enabled());
        app.panel = Panel::Settings;
        assert!(!app.session_keys_enabled());
        app.panel = Panel::Annotate;
        app.notify(NoticeKind::Info, "t", "b");
        assert!(!app.session_keys_enabled());
        Ok(())
    }

    #[test]
    fn cancelled_dialog_changes_nothing() -> anyhow::Result<()> {
        let (mut app, _dir) = app_with_folder()?;
        let status = app.status.clone();
        let err = app.load_folder(None).unwrap_err();
        assert!(matches!(err, AnnotatorError::UserCancelled));
        app.report(err);
        assert!(app.notice.is_none());
        assert_eq!(app.status, status);
        assert_eq!(app.session.current_image(), Some("a.jpg"));
        Ok(())
    }

    #[rstest]
    #[case(egui::vec2(400.0, 200.0), egui::vec2(200.0, 200.0), egui::vec2(200.0, 100.0))]
    #[case(egui::vec2(100.0, 300.0), egui::vec2(600.0, 600.0), egui::vec2(200.0, 600.0))]
    #[case(egui::vec2(0.0, 300.0), egui::vec2(600.0, 600.0), egui::Vec2::ZERO)]
    fn fit_keeps_aspect_ratio(
        #[case] image: egui::Vec2,
        #[case] bounds: egui::Vec2,
        #[case] expected: egui::Vec2,
    ) {
        assert_eq!(fit_size(image, bounds), expected);
    }
}
