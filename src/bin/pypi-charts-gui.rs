/*!
 * Desktop viewer for pypi-charts
 *
 * Loads the four download feeds of one project from a directory or a base URL
 * and shows them as charts, with version selection, date-range controls,
 * hover summaries, and CSV preview/export.
 *
 * Platform support: Windows, macOS, Linux
 */

use chrono::{NaiveDate, Utc};
use eframe::egui;
use pypi_charts::models::FeedKind;
use pypi_charts::series::{format_change, percent_change};
use pypi_charts::state::{AppState, RangeError, RangePreset, VersionView};
use pypi_charts::storage::{self, ExportError, FeedExport};
use pypi_charts::viz::{Chart, ChartConfig, Dataset, LegendMode, RenderPhase};
use pypi_charts::{DirSource, HttpSource, Source};
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

const CHART_W: u32 = 900;
const CHART_H: u32 = 420;

fn main() -> Result<(), eframe::Error> {
    env_logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1000.0, 800.0])
            .with_min_inner_size([700.0, 500.0])
            .with_title("PyPI Download Charts"),
        ..Default::default()
    };

    eframe::run_native(
        "PyPI Download Charts",
        options,
        Box::new(|_cc| Ok(Box::new(ChartsApp::new()))),
    )
}

#[derive(Debug, Clone, PartialEq)]
enum SourceMode {
    Directory,
    Url,
}

#[derive(Debug)]
enum LoadResult {
    Loaded { state: AppState, feeds: Vec<FeedKind> },
    Error(String),
}

/// A chart plus the texture it was last drawn into.
struct ChartPanel {
    chart: Chart,
    texture: Option<egui::TextureHandle>,
    dirty: bool,
    error: Option<String>,
}

impl ChartPanel {
    fn new(chart: Chart) -> Self {
        Self {
            chart,
            texture: None,
            dirty: true,
            error: None,
        }
    }

    /// Redraw into the existing texture, or create it on the first draw.
    fn refresh(&mut self, ctx: &egui::Context, name: &str) {
        if !self.dirty {
            return;
        }
        self.dirty = false;
        let (w, h) = (
            self.chart.config.width as usize,
            self.chart.config.height as usize,
        );
        let mut buf = vec![0u8; w * h * 3];
        match self.chart.render_rgb(&mut buf) {
            Ok(phase) => {
                let image = egui::ColorImage::from_rgb([w, h], &buf);
                match (phase, self.texture.as_mut()) {
                    (RenderPhase::Update, Some(tex)) => {
                        tex.set(image, egui::TextureOptions::LINEAR)
                    }
                    _ => {
                        self.texture =
                            Some(ctx.load_texture(name, image, egui::TextureOptions::LINEAR))
                    }
                }
                self.error = None;
            }
            Err(err) => self.error = Some(err.to_string()),
        }
    }

    fn show(&self, ui: &mut egui::Ui, hover: bool) {
        if let Some(err) = &self.error {
            ui.colored_label(egui::Color32::GRAY, err);
            return;
        }
        let Some(tex) = &self.texture else {
            return;
        };
        let response = ui.add(
            egui::Image::new(egui::load::SizedTexture::from_handle(tex))
                .max_width(ui.available_width())
                .sense(egui::Sense::hover()),
        );
        if !hover {
            return;
        }
        let (Some(pos), Some(extent)) = (response.hover_pos(), self.chart.x_extent()) else {
            return;
        };
        let rect = response.rect;
        let frac = ((pos.x - rect.left()) / rect.width()).clamp(0.0, 1.0) as f64;
        let ts = extent.min + (extent.span_millis() as f64 * frac) as i64;
        let Some(at) = pypi_charts::viz::nearest_timestamp(self.chart.datasets(), ts) else {
            return;
        };
        let tip = self.chart.tooltip_at(at);
        let day = day_text(at);
        // A single trend line also shows the change against the previous day.
        let change = match self.chart.datasets() {
            [only] => only
                .points
                .iter()
                .position(|p| p.timestamp == at)
                .map(|i| match i.checked_sub(1) {
                    Some(prev) => {
                        percent_change(only.points[prev].value, only.points[i].value)
                    }
                    None => None,
                })
                .map(format_change),
            _ => None,
        };
        response.on_hover_ui_at_pointer(|ui| {
            ui.strong(day);
            for line in tip.lines() {
                ui.label(line);
            }
            if let Some(c) = change {
                ui.label(c);
            }
        });
    }
}

/// Message window that stays up until OK is pressed.
#[derive(Debug, Clone)]
struct Notice {
    title: &'static str,
    text: String,
}

enum SelectionAction {
    Toggle(String),
    All,
    None,
    Latest,
}

enum RangeAction {
    Apply,
    Reset,
    Preset(RangePreset),
}

/// Main application state
struct ChartsApp {
    source_mode: SourceMode,
    data_dir: String,
    base_url: String,
    project: String,
    locale: String,

    state: AppState,
    trends: Option<ChartPanel>,
    versions: Option<ChartPanel>,
    installer: Option<ChartPanel>,
    country: Option<ChartPanel>,

    range_from: String,
    range_to: String,
    // Shown until acknowledged.
    notice: Option<Notice>,

    export_feed: FeedKind,
    preview: Option<String>,

    is_loading: bool,
    status_message: String,
    error_message: String,
    load_receiver: Option<mpsc::Receiver<LoadResult>>,
}

impl ChartsApp {
    fn new() -> Self {
        let home_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .to_string_lossy()
            .to_string();

        Self {
            source_mode: SourceMode::Directory,
            data_dir: home_dir,
            base_url: String::new(),
            project: String::new(),
            locale: "en".to_string(),

            state: AppState::default(),
            trends: None,
            versions: None,
            installer: None,
            country: None,

            range_from: String::new(),
            range_to: String::new(),
            notice: None,

            export_feed: FeedKind::Trends,
            preview: None,

            is_loading: false,
            status_message: String::new(),
            error_message: String::new(),
            load_receiver: None,
        }
    }

    fn start_load(&mut self, feeds: Vec<FeedKind>) {
        // A load already in flight wins; the button is disabled meanwhile.
        if self.is_loading {
            return;
        }
        let mode = self.source_mode.clone();
        let location = match mode {
            SourceMode::Directory => self.data_dir.trim().to_string(),
            SourceMode::Url => self.base_url.trim().to_string(),
        };
        if location.is_empty() {
            self.error_message = "Please choose a data directory or base URL".to_string();
            return;
        }

        self.is_loading = true;
        self.error_message.clear();
        self.status_message = format!("Loading from {}...", location);

        let (sender, receiver) = mpsc::channel();
        self.load_receiver = Some(receiver);

        thread::spawn(move || {
            let source: Box<dyn Source> = match mode {
                SourceMode::Directory => Box::new(DirSource::new(&location)),
                SourceMode::Url => match HttpSource::new(&location) {
                    Ok(s) => Box::new(s),
                    Err(err) => {
                        let _ = sender.send(LoadResult::Error(format!(
                            "Failed to create HTTP client: {}",
                            err
                        )));
                        return;
                    }
                },
            };
            let state = AppState::load(source.as_ref(), &feeds);
            let _ = sender.send(LoadResult::Loaded { state, feeds });
        });
    }

    fn check_load_result(&mut self) {
        if let Some(receiver) = &self.load_receiver
            && let Ok(result) = receiver.try_recv()
        {
            self.is_loading = false;
            self.load_receiver = None;

            match result {
                LoadResult::Loaded { state, feeds } => {
                    for feed in &feeds {
                        self.take_feed(&state, *feed);
                    }
                    let failed = self.state.failures().len();
                    self.status_message = if failed == 0 {
                        "All feeds loaded".to_string()
                    } else {
                        format!("{} of 4 feeds failed to load", failed)
                    };
                }
                LoadResult::Error(error) => {
                    self.error_message = error;
                    self.status_message.clear();
                }
            }
        }
    }

    /// Replace one feed with its freshly loaded state and rebuild its chart.
    fn take_feed(&mut self, loaded: &AppState, feed: FeedKind) {
        match feed {
            FeedKind::Trends => {
                self.state.trends = loaded.trends.clone();
                self.trends = None;
                let Some(t) = self.state.trends.data() else {
                    return;
                };
                let range = t.range;
                let visible = t.visible();
                if let Some(r) = range {
                    self.range_from = day_text(r.original.min);
                    self.range_to = day_text(r.original.max);
                }
                let config = ChartConfig {
                    x_range: range.map(|r| r.current),
                    ..self.chart_config(feed)
                };
                let datasets = vec![Dataset::new(self.series_label(), visible)];
                self.trends = Some(ChartPanel::new(Chart::line(config, datasets)));
            }
            FeedKind::Versions => {
                self.state.versions = loaded.versions.clone();
                self.versions = match self.state.versions.data() {
                    Some(view) if !view.is_hidden() => Some(ChartPanel::new(Chart::line(
                        self.chart_config(feed),
                        view.datasets().into_iter().map(Dataset::from).collect(),
                    ))),
                    _ => None,
                };
            }
            FeedKind::Installer => {
                self.state.installer = loaded.installer.clone();
                self.installer = self
                    .state
                    .installer
                    .data()
                    .map(|s| ChartPanel::new(Chart::pie(self.chart_config(feed), s.clone())));
            }
            FeedKind::Country => {
                self.state.country = loaded.country.clone();
                self.country = self
                    .state
                    .country
                    .data()
                    .map(|s| ChartPanel::new(Chart::pie(self.chart_config(feed), s.clone())));
            }
        }
    }

    fn series_label(&self) -> String {
        if self.project.trim().is_empty() {
            "downloads".to_string()
        } else {
            self.project.trim().to_string()
        }
    }

    fn chart_config(&self, feed: FeedKind) -> ChartConfig {
        let title = if self.project.trim().is_empty() {
            feed.title().to_string()
        } else {
            format!("{} - {}", self.project.trim(), feed.title())
        };
        ChartConfig {
            title,
            width: CHART_W,
            height: CHART_H,
            locale: self.locale.clone(),
            legend: LegendMode::Bottom,
            ..Default::default()
        }
    }

    fn apply_selection(&mut self, action: SelectionAction) {
        let Some(view) = self.state.versions.data_mut() else {
            return;
        };
        match action {
            SelectionAction::Toggle(key) => view.update(|s, _| s.toggle(&key)),
            SelectionAction::All => view.update(|s, c| s.select_all(c)),
            SelectionAction::None => view.update(|s, _| s.select_none()),
            SelectionAction::Latest => {
                view.update(|s, c| s.select_latest(c, pypi_charts::state::DEFAULT_LATEST))
            }
        }
        let datasets: Vec<Dataset> = view.datasets().into_iter().map(Dataset::from).collect();
        if let Some(panel) = self.versions.as_mut() {
            panel.chart.replace_datasets(datasets);
            panel.dirty = true;
        }
    }

    fn apply_range(&mut self, action: RangeAction) {
        let Some(trends) = self.state.trends.data_mut() else {
            return;
        };
        let outcome = match action {
            RangeAction::Apply => {
                let start = parse_day(&self.range_from);
                let end = parse_day(&self.range_to);
                trends.apply(|r, s| r.set_range(s, start, end))
            }
            RangeAction::Reset => trends.apply(|r, _| Ok(r.reset())),
            RangeAction::Preset(p) => trends.apply(|r, s| r.set_preset(s, p)),
        };
        match outcome {
            Ok(()) => {
                if let Some(r) = trends.range {
                    self.range_from = day_text(r.current.min);
                    self.range_to = day_text(r.current.max);
                }
                let visible = trends.visible();
                let range = trends.range.map(|r| r.current);
                let label = self.series_label();
                if let Some(panel) = self.trends.as_mut() {
                    panel.chart.set_x_range(range);
                    panel.chart.replace_datasets(vec![Dataset::new(label, visible)]);
                    panel.dirty = true;
                }
            }
            Err(err) => {
                let text = match err {
                    RangeError::Invalid => {
                        "Please choose a start date before the end date".to_string()
                    }
                    other => format!("{}", other),
                };
                self.notice = Some(Notice {
                    title: "Date range",
                    text,
                });
            }
        }
    }

    fn export_data(&self) -> FeedExport {
        FeedExport::from_state(&self.state, self.export_feed)
    }

    /// Report an export problem; a missing dataset needs acknowledging.
    fn export_failed(&mut self, action: &str, err: ExportError) {
        match err {
            ExportError::NoData => {
                self.notice = Some(Notice {
                    title: "Export",
                    text: format!("{}: no {} data loaded", action, self.export_feed),
                })
            }
            other => self.error_message = format!("{} failed: {}", action, other),
        }
    }

    fn show_preview(&mut self) {
        let export = self.export_data();
        match storage::to_csv_string(&export.as_data()) {
            Ok(text) => self.preview = Some(storage::preview(&text, 10)),
            Err(err) => self.export_failed("Preview", err),
        }
    }

    fn export_csv(&mut self) {
        let export = self.export_data();
        let text = match storage::to_csv_string(&export.as_data()) {
            Ok(t) => t,
            Err(err) => {
                self.export_failed("Export", err);
                return;
            }
        };
        let Some(path) = rfd::FileDialog::new()
            .set_file_name(self.export_feed.latest_file_name())
            .add_filter("CSV", &["csv"])
            .save_file()
        else {
            return;
        };
        match std::fs::write(&path, text) {
            Ok(()) => self.status_message = format!("Saved {}", path.display()),
            Err(err) => self.error_message = format!("Failed to save CSV: {}", err),
        }
    }

    fn save_snapshot(&mut self) {
        let export = self.export_data();
        if export.as_data().is_empty() {
            self.export_failed("Snapshot", ExportError::NoData);
            return;
        }
        let Some(dir) = rfd::FileDialog::new().pick_folder() else {
            return;
        };
        match storage::save_snapshot(&dir, &export.as_data(), Utc::now()) {
            Ok(path) => self.status_message = format!("Saved snapshot {}", path.display()),
            Err(err) => self.export_failed("Snapshot", err),
        }
    }

    fn versions_ui(&mut self, ui: &mut egui::Ui) {
        let mut action = None;
        match self.state.versions.data() {
            Some(VersionView::Visible {
                categories,
                selection,
            }) => {
                ui.horizontal(|ui| {
                    if ui.button("All").clicked() {
                        action = Some(SelectionAction::All);
                    }
                    if ui.button("None").clicked() {
                        action = Some(SelectionAction::None);
                    }
                    if ui.button("Latest 3").clicked() {
                        action = Some(SelectionAction::Latest);
                    }
                });
                ui.horizontal_wrapped(|ui| {
                    for key in categories.keys() {
                        let mut checked = selection.contains(key);
                        if ui.checkbox(&mut checked, key).changed() {
                            action = Some(SelectionAction::Toggle(key.to_string()));
                        }
                    }
                });
                if selection.keys.is_empty() {
                    ui.label("Select at least one version");
                }
            }
            Some(VersionView::Hidden) | None => return,
        }
        if let Some(a) = action {
            self.apply_selection(a);
        }
        if let Some(panel) = self.versions.as_mut() {
            panel.refresh(ui.ctx(), "versions");
        }
        if let Some(panel) = self.versions.as_ref()
            && !panel.chart.datasets().is_empty()
        {
            panel.show(ui, true);
        }
    }

    fn trends_ui(&mut self, ui: &mut egui::Ui) {
        if self.state.trends.data().is_none() {
            return;
        }
        let mut action = None;
        ui.horizontal(|ui| {
            ui.label("From:");
            ui.add(egui::TextEdit::singleline(&mut self.range_from).desired_width(90.0));
            ui.label("To:");
            ui.add(egui::TextEdit::singleline(&mut self.range_to).desired_width(90.0));
            if ui.button("Apply").clicked() {
                action = Some(RangeAction::Apply);
            }
            if ui.button("Reset").clicked() {
                action = Some(RangeAction::Reset);
            }
            ui.separator();
            for preset in RangePreset::ALL {
                if ui.button(preset.label()).clicked() {
                    action = Some(RangeAction::Preset(preset));
                }
            }
        });
        if let Some(a) = action {
            self.apply_range(a);
        }
        if let Some(panel) = self.trends.as_mut() {
            panel.refresh(ui.ctx(), "trends");
            panel.show(ui, true);
        }
    }
}

impl eframe::App for ChartsApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.check_load_result();

        if self.is_loading {
            ctx.request_repaint();
        }

        if let Some(notice) = self.notice.clone() {
            egui::Window::new(notice.title)
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    ui.label(notice.text);
                    if ui.button("OK").clicked() {
                        self.notice = None;
                    }
                });
        }

        if let Some(text) = self.preview.clone() {
            let mut open = true;
            egui::Window::new(format!("Preview: {}", self.export_feed))
                .open(&mut open)
                .show(ctx, |ui| {
                    egui::ScrollArea::both().show(ui, |ui| {
                        ui.monospace(text);
                    });
                });
            if !open {
                self.preview = None;
            }
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.heading("PyPI Download Charts");
                ui.add_space(10.0);

                ui.group(|ui| {
                    ui.label("Data Source");
                    ui.add_space(5.0);

                    ui.horizontal(|ui| {
                        ui.radio_value(&mut self.source_mode, SourceMode::Directory, "Directory");
                        ui.radio_value(&mut self.source_mode, SourceMode::Url, "Base URL");
                    });

                    match self.source_mode {
                        SourceMode::Directory => {
                            ui.horizontal(|ui| {
                                ui.label("Data directory:");
                                ui.text_edit_singleline(&mut self.data_dir);
                                if ui.button("Browse").clicked()
                                    && let Some(path) = rfd::FileDialog::new().pick_folder()
                                {
                                    self.data_dir = path.to_string_lossy().to_string();
                                }
                            });
                        }
                        SourceMode::Url => {
                            ui.horizontal(|ui| {
                                ui.label("Base URL:");
                                ui.text_edit_singleline(&mut self.base_url).on_hover_text(
                                    "Directory URL serving <feed>_latest.csv files",
                                );
                            });
                        }
                    }

                    ui.horizontal(|ui| {
                        ui.label("Project:");
                        ui.text_edit_singleline(&mut self.project)
                            .on_hover_text("Package name used in chart titles");
                    });

                    ui.horizontal(|ui| {
                        ui.label("Locale:");
                        egui::ComboBox::from_id_salt("locale")
                            .selected_text(&self.locale)
                            .show_ui(ui, |ui| {
                                for (code, name) in [
                                    ("en", "English (en)"),
                                    ("de", "German (de)"),
                                    ("fr", "French (fr)"),
                                    ("es", "Spanish (es)"),
                                    ("it", "Italian (it)"),
                                ] {
                                    ui.selectable_value(&mut self.locale, code.to_string(), name);
                                }
                            });
                    });
                });

                ui.add_space(10.0);

                ui.horizontal(|ui| {
                    if ui
                        .add_enabled(!self.is_loading, egui::Button::new("Load"))
                        .clicked()
                    {
                        self.start_load(FeedKind::ALL.to_vec());
                    }

                    if self.is_loading {
                        ui.spinner();
                        ui.label("Loading...");
                    }
                });

                if !self.status_message.is_empty() {
                    ui.colored_label(egui::Color32::DARK_GREEN, &self.status_message);
                }
                if !self.error_message.is_empty() {
                    ui.colored_label(egui::Color32::RED, &self.error_message);
                }

                // Each failed feed reports on its own and can be retried.
                let mut retry = None;
                for (feed, err) in self.state.failures() {
                    ui.horizontal(|ui| {
                        ui.colored_label(egui::Color32::RED, format!("{}: {}", feed.title(), err));
                        if ui
                            .add_enabled(!self.is_loading, egui::Button::new("Retry"))
                            .clicked()
                        {
                            retry = Some(feed);
                        }
                    });
                }
                if let Some(feed) = retry {
                    self.start_load(vec![feed]);
                }

                ui.add_space(10.0);
                ui.collapsing(FeedKind::Trends.title(), |ui| self.trends_ui(ui));
                ui.collapsing(FeedKind::Versions.title(), |ui| self.versions_ui(ui));
                ui.collapsing(FeedKind::Installer.title(), |ui| {
                    if let Some(panel) = self.installer.as_mut() {
                        panel.refresh(ui.ctx(), "installer");
                        panel.show(ui, false);
                    }
                });
                ui.collapsing(FeedKind::Country.title(), |ui| {
                    if let Some(panel) = self.country.as_mut() {
                        panel.refresh(ui.ctx(), "country");
                        panel.show(ui, false);
                    }
                });

                ui.add_space(10.0);
                ui.group(|ui| {
                    ui.label("Export");
                    ui.horizontal(|ui| {
                        egui::ComboBox::from_id_salt("export_feed")
                            .selected_text(self.export_feed.title())
                            .show_ui(ui, |ui| {
                                for feed in FeedKind::ALL {
                                    ui.selectable_value(&mut self.export_feed, feed, feed.title());
                                }
                            });
                        if ui.button("Preview").clicked() {
                            self.show_preview();
                        }
                        if ui.button("Export CSV").clicked() {
                            self.export_csv();
                        }
                        if ui.button("Save snapshot").clicked() {
                            self.save_snapshot();
                        }
                    });
                });
            });
        });
    }
}

fn parse_day(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

fn day_text(ts: i64) -> String {
    pypi_charts::state::date_of(ts)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}
