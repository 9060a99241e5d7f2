//! Chart rendering: download trends and version comparisons as line charts,
//! installer and country share as pie charts, to **SVG**, **PNG**, or an RGB buffer.
//!
//! - Distinct series colors (Microsoft Office palette)
//! - Locale-aware tick labels (`30,000` vs `30.000`)
//! - Date tick labels whose detail follows the displayed span
//! - A [`Chart`] keeps its configuration across dataset replacements, so a
//!   redraw after a selection change is an update, not a new chart

pub mod badge;
pub mod legend;
pub mod pie;
pub mod text;
pub mod tooltip;
pub mod types;
pub mod util;

pub use tooltip::{Tooltip, TooltipEntry, nearest_timestamp, tooltip_at};
pub use types::{ChartConfig, ChartKind, Dataset, LegendMode, RenderPhase};

use crate::models::{ShareSlice, TimeRange};
use crate::state::{AxisGranularity, DAY_MILLIS};
use anyhow::{Result, anyhow};
use num_format::Locale;

use plotters::backend::DrawingBackend;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::series::{AreaSeries, LineSeries};
use plotters::style::FontFamily;

use plotters_bitmap::BitMapBackend;
use plotters_svg::SVGBackend;

use std::path::Path;
use std::sync::Once;

use legend::{draw_legend_panel, estimate_bottom_legend_height_px};
use util::{choose_axis_scale, compute_left_label_area_px, format_tick, map_locale, office_color};

/// One-time registration for a fallback "sans-serif" font when using the `ab_glyph` text path.
/// Required because `ab_glyph` doesn't discover OS fonts.
static INIT_FONTS: Once = Once::new();

fn ensure_fonts_registered() {
    INIT_FONTS.call_once(|| {
        let _ = plotters::style::register_font(
            "sans-serif",
            plotters::style::FontStyle::Normal,
            include_bytes!("../../assets/DejaVuSans.ttf"),
        );
    });
}

/// Datasets with at most this many points also get point markers.
const MARKER_LIMIT: usize = 60;

#[derive(Debug, Clone, PartialEq)]
enum Content {
    Lines(Vec<Dataset>),
    Pie(Vec<ShareSlice>),
}

/// A chart instance: configuration plus the datasets currently bound to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub config: ChartConfig,
    content: Content,
    renders: usize,
}

impl Chart {
    pub fn line(config: ChartConfig, datasets: Vec<Dataset>) -> Self {
        Self {
            config,
            content: Content::Lines(datasets),
            renders: 0,
        }
    }

    pub fn pie(config: ChartConfig, slices: Vec<ShareSlice>) -> Self {
        Self {
            config,
            content: Content::Pie(slices),
            renders: 0,
        }
    }

    pub fn kind(&self) -> ChartKind {
        match self.content {
            Content::Lines(_) => ChartKind::Line,
            Content::Pie(_) => ChartKind::Pie,
        }
    }

    pub fn datasets(&self) -> &[Dataset] {
        match &self.content {
            Content::Lines(d) => d,
            Content::Pie(_) => &[],
        }
    }

    /// Swap the bound datasets, keeping configuration and render history.
    pub fn replace_datasets(&mut self, datasets: Vec<Dataset>) {
        self.content = Content::Lines(datasets);
    }

    pub fn replace_slices(&mut self, slices: Vec<ShareSlice>) {
        self.content = Content::Pie(slices);
    }

    pub fn set_x_range(&mut self, range: Option<TimeRange>) {
        self.config.x_range = range;
    }

    /// Phase the next draw will report.
    pub fn phase(&self) -> RenderPhase {
        if self.renders == 0 {
            RenderPhase::Initial
        } else {
            RenderPhase::Update
        }
    }

    pub fn tooltip_at(&self, timestamp: i64) -> Tooltip {
        tooltip_at(self.datasets(), timestamp)
    }

    /// Time window the x axis spans: the configured range, else the data extent.
    pub fn x_extent(&self) -> Option<TimeRange> {
        x_extent(self.datasets(), self.config.x_range)
    }

    /// Draw to `.svg` (by extension) or any bitmap format.
    pub fn render_to_file<P: AsRef<Path>>(&mut self, out_path: P) -> Result<RenderPhase> {
        let out_path = out_path.as_ref();
        let path_string = out_path.to_string_lossy().into_owned();
        let size = (self.config.width, self.config.height);
        if out_path.extension().and_then(|s| s.to_str()) == Some("svg") {
            let root = SVGBackend::new(path_string.as_str(), size).into_drawing_area();
            self.draw(root)
        } else {
            let root = BitMapBackend::new(path_string.as_str(), size).into_drawing_area();
            self.draw(root)
        }
    }

    /// Draw into an RGB buffer of `width * height * 3` bytes.
    pub fn render_rgb(&mut self, buf: &mut [u8]) -> Result<RenderPhase> {
        let (w, h) = (self.config.width, self.config.height);
        if buf.len() < (w * h * 3) as usize {
            return Err(anyhow!("buffer too small for {}x{}", w, h));
        }
        let root = BitMapBackend::with_buffer(buf, (w, h)).into_drawing_area();
        self.draw(root)
    }

    /// SVG document as a string.
    pub fn render_svg_string(&mut self) -> Result<String> {
        let mut out = String::new();
        {
            let size = (self.config.width, self.config.height);
            let root = SVGBackend::with_string(&mut out, size).into_drawing_area();
            self.draw(root)?;
        }
        Ok(out)
    }

    fn draw<DB: DrawingBackend>(&mut self, root: DrawingArea<DB, Shift>) -> Result<RenderPhase> {
        ensure_fonts_registered();
        let locale = map_locale(&self.config.locale);
        match &self.content {
            Content::Lines(datasets) => draw_lines(root, datasets, &self.config, locale)?,
            Content::Pie(slices) => {
                if slices.is_empty() {
                    return Err(anyhow!("no data to plot"));
                }
                pie::draw_pie(root, slices, &self.config, locale)?
            }
        }
        let phase = self.phase();
        self.renders += 1;
        Ok(phase)
    }
}

/// Convenience: render one line chart to a file.
pub fn plot_lines<P: AsRef<Path>>(
    datasets: Vec<Dataset>,
    out_path: P,
    config: ChartConfig,
) -> Result<()> {
    Chart::line(config, datasets).render_to_file(out_path)?;
    Ok(())
}

/// Convenience: render one pie chart to a file.
pub fn plot_pie<P: AsRef<Path>>(
    slices: Vec<ShareSlice>,
    out_path: P,
    config: ChartConfig,
) -> Result<()> {
    Chart::pie(config, slices).render_to_file(out_path)?;
    Ok(())
}

fn x_extent(datasets: &[Dataset], fixed: Option<TimeRange>) -> Option<TimeRange> {
    if let Some(r) = fixed {
        return Some(r);
    }
    let ts = datasets.iter().flat_map(|d| d.points.iter().map(|p| p.timestamp));
    let min = ts.clone().min()?;
    let max = ts.max()?;
    Some(TimeRange { min, max })
}

fn draw_lines<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    datasets: &[Dataset],
    config: &ChartConfig,
    locale: &Locale,
) -> Result<()> {
    const MARGIN: i32 = 16;

    let extent = x_extent(datasets, config.x_range).ok_or_else(|| anyhow!("no data to plot"))?;
    let granularity = AxisGranularity::for_span(extent.span_millis());
    let (mut x_min, mut x_max) = (extent.min, extent.max);
    if x_min == x_max {
        x_min -= DAY_MILLIS;
        x_max += DAY_MILLIS;
    }

    // Only points inside the window are drawn.
    let visible: Vec<Vec<(i64, i64)>> = datasets
        .iter()
        .map(|d| {
            d.points
                .iter()
                .filter(|p| p.timestamp >= x_min && p.timestamp <= x_max)
                .map(|p| (p.timestamp, p.value))
                .collect()
        })
        .collect();

    let max_val = visible
        .iter()
        .flatten()
        .map(|(_, v)| *v)
        .max()
        .unwrap_or(0)
        .max(0) as f64;
    let (yscale, scale_word) = choose_axis_scale(max_val);
    let y_top = if max_val > 0.0 { max_val * 1.1 / yscale } else { 1.0 };
    let y_axis_title = match scale_word {
        "" => config.y_desc.clone(),
        sw => format!("{} ({sw})", config.y_desc),
    };

    let y_label_count = 8usize;
    let left_label_width_px = compute_left_label_area_px(0.0, y_top, y_label_count, 12, locale);
    let axis_x_start_px: i32 = MARGIN + left_label_width_px as i32;

    let multi = datasets.len() > 1;
    let legend_texts: Vec<String> = datasets.iter().map(|d| d.label.clone()).collect();
    let (root_w_u32, root_h_u32) = root.dim_in_pixel();
    let (root_w, root_h) = (root_w_u32 as i32, root_h_u32 as i32);

    let (plot_area, legend_area_opt): (DrawingArea<DB, Shift>, Option<DrawingArea<DB, Shift>>) =
        if !multi {
            (root, None)
        } else {
            match config.legend {
                LegendMode::Right => {
                    let (plot, legend) = root.split_horizontally((82).percent_width());
                    (plot, Some(legend))
                }
                LegendMode::Bottom => {
                    let h = estimate_bottom_legend_height_px(&legend_texts, axis_x_start_px, root_w)
                        .max(40);
                    let (plot, legend) = root.split_vertically((root_h - h).max(40));
                    (plot, Some(legend))
                }
            }
        };

    plot_area
        .fill(&WHITE)
        .map_err(|e| anyhow::anyhow!("{:?}", e))?;

    let mut chart = ChartBuilder::on(&plot_area)
        .margin(MARGIN as u32)
        .caption(config.title.trim(), (FontFamily::SansSerif, 22))
        .set_label_area_size(LabelAreaPosition::Left, left_label_width_px)
        .set_label_area_size(LabelAreaPosition::Bottom, 48)
        .build_cartesian_2d(x_min..x_max, 0.0..y_top)
        .map_err(|e| anyhow::anyhow!("{:?}", e))?;

    let x_label_fmt = |ts: &i64| granularity.label(*ts);
    let y_label_fmt = |v: &f64| format_tick(*v, locale);
    chart
        .configure_mesh()
        .x_desc("Date")
        .y_desc(y_axis_title)
        .x_labels(8)
        .y_labels(y_label_count)
        .x_label_formatter(&x_label_fmt)
        .y_label_formatter(&y_label_fmt)
        .light_line_style(RGBColor(233, 236, 239))
        .label_style((FontFamily::SansSerif, 12))
        .axis_desc_style((FontFamily::SansSerif, 14))
        .draw()
        .map_err(|e| anyhow::anyhow!("{:?}", e))?;

    let mut legend_items: Vec<(String, RGBAColor)> = Vec::new();
    for (idx, (dataset, points)) in datasets.iter().zip(&visible).enumerate() {
        let color = office_color(idx);
        let series_f: Vec<(i64, f64)> = points
            .iter()
            .map(|(x, y)| (*x, *y as f64 / yscale))
            .collect();

        if !multi {
            // A single trend line gets a light area fill.
            chart
                .draw_series(
                    AreaSeries::new(series_f.clone(), 0.0, color.mix(0.15).filled())
                        .border_style(color.stroke_width(0)),
                )
                .map_err(|e| anyhow::anyhow!("{:?}", e))?;
        }
        let style = ShapeStyle {
            color,
            filled: false,
            stroke_width: 2,
        };
        chart
            .draw_series(LineSeries::new(series_f.clone(), style))
            .map_err(|e| anyhow::anyhow!("{:?}", e))?;
        if series_f.len() <= MARKER_LIMIT {
            chart
                .draw_series(
                    series_f
                        .iter()
                        .map(|(x, y)| Circle::new((*x, *y), 3, color.filled())),
                )
                .map_err(|e| anyhow::anyhow!("{:?}", e))?;
        }
        legend_items.push((dataset.label.clone(), color));
    }

    if let Some(ref legend_area) = legend_area_opt {
        draw_legend_panel(legend_area, &legend_items, config.legend, axis_x_start_px)?;
    }

    plot_area
        .present()
        .map_err(|e| anyhow::anyhow!("{:?}", e))?;
    if let Some(ref legend_area) = legend_area_opt {
        legend_area
            .present()
            .map_err(|e| anyhow::anyhow!("{:?}", e))?;
    }
    Ok(())
}
