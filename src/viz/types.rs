//! Public types for the chart renderer.

use crate::models::{Series, TimeRange};

/// Legend placement options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegendMode {
    /// Separate legend panel on the right side.
    Right,
    /// Separate legend band at the bottom.
    Bottom,
}

/// Chart kinds supported by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    /// Daily downloads, one line per dataset.
    Line,
    /// Installer or country share.
    Pie,
}

/// Whether a draw created the chart or redrew an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPhase {
    Initial,
    Update,
}

/// One labelled series handed to the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub label: String,
    pub points: Series,
}

impl Dataset {
    pub fn new(label: impl Into<String>, points: Series) -> Self {
        Self {
            label: label.into(),
            points,
        }
    }
}

impl From<(String, Series)> for Dataset {
    fn from((label, points): (String, Series)) -> Self {
        Self { label, points }
    }
}

/// Axis, size, and labelling options shared by all chart kinds.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub y_desc: String,
    /// Locale tag for number formatting (`en`, `de`, ...).
    pub locale: String,
    /// Displayed window; defaults to the data extent.
    pub x_range: Option<TimeRange>,
    pub legend: LegendMode,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            title: String::new(),
            width: 1000,
            height: 600,
            y_desc: "Daily Downloads".to_string(),
            locale: "en".to_string(),
            x_range: None,
            legend: LegendMode::Bottom,
        }
    }
}
