//! Selection and range state as pure transitions, plus the controller that owns them.
//!
//! Reducers take `&self` and return a new value; the caller decides whether
//! to keep it. A failed range request therefore never touches the state that
//! is currently displayed.
use crate::loader::{self, Source};
use crate::models::{CategorySeries, FeedKind, Point, Series, ShareSlice, TimeRange};
use crate::series::{build_category_series, build_series, build_shares};
use chrono::{DateTime, NaiveDate, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub const DAY_MILLIS: i64 = 86_400_000;

/// Number of versions selected by default and by "latest".
pub const DEFAULT_LATEST: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("invalid range: start and end dates are required and start must precede end")]
    Invalid,
    #[error("no data in range")]
    NoData,
    #[error("no data loaded")]
    Empty,
}

/// Chosen version keys, in the order they were chosen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub keys: Vec<String>,
}

impl Selection {
    /// Default selection after a load: the latest three versions.
    pub fn initial(categories: &CategorySeries) -> Self {
        Self::default().select_latest(categories, DEFAULT_LATEST)
    }

    pub fn select_all(&self, categories: &CategorySeries) -> Self {
        Self {
            keys: categories.keys().map(str::to_string).collect(),
        }
    }

    pub fn select_none(&self) -> Self {
        Self::default()
    }

    pub fn select_latest(&self, categories: &CategorySeries, n: usize) -> Self {
        Self {
            keys: categories.keys().take(n).map(str::to_string).collect(),
        }
    }

    /// Remove `key` if selected, otherwise append it.
    pub fn toggle(&self, key: &str) -> Self {
        let mut keys = self.keys.clone();
        match keys.iter().position(|k| k == key) {
            Some(i) => {
                keys.remove(i);
            }
            None => keys.push(key.to_string()),
        }
        Self { keys }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    /// Datasets for the renderer, in selection order. Unknown keys are skipped.
    pub fn datasets(&self, categories: &CategorySeries) -> Vec<(String, Series)> {
        self.keys
            .iter()
            .filter_map(|k| categories.get(k).map(|s| (k.clone(), s.clone())))
            .collect()
    }
}

/// The version comparison view. A single version carries no comparison, so
/// fewer than two categories hide the view entirely.
#[derive(Debug, Clone, PartialEq)]
pub enum VersionView {
    Hidden,
    Visible {
        categories: CategorySeries,
        selection: Selection,
    },
}

impl VersionView {
    pub fn from_categories(categories: CategorySeries) -> Self {
        if categories.len() < 2 {
            return VersionView::Hidden;
        }
        let selection = Selection::initial(&categories);
        VersionView::Visible {
            categories,
            selection,
        }
    }

    pub fn is_hidden(&self) -> bool {
        matches!(self, VersionView::Hidden)
    }

    /// Apply a selection reducer; a hidden view stays hidden.
    pub fn update<F>(&mut self, f: F)
    where
        F: FnOnce(&Selection, &CategorySeries) -> Selection,
    {
        if let VersionView::Visible {
            categories,
            selection,
        } = self
        {
            *selection = f(selection, categories);
        }
    }

    pub fn datasets(&self) -> Vec<(String, Series)> {
        match self {
            VersionView::Hidden => Vec::new(),
            VersionView::Visible {
                categories,
                selection,
            } => selection.datasets(categories),
        }
    }
}

/// Preset windows ending at the last loaded day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangePreset {
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
}

impl RangePreset {
    pub const ALL: [RangePreset; 4] = [
        RangePreset::OneMonth,
        RangePreset::ThreeMonths,
        RangePreset::SixMonths,
        RangePreset::OneYear,
    ];

    pub fn days(&self) -> i64 {
        match self {
            RangePreset::OneMonth => 30,
            RangePreset::ThreeMonths => 90,
            RangePreset::SixMonths => 180,
            RangePreset::OneYear => 365,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RangePreset::OneMonth => "1 month",
            RangePreset::ThreeMonths => "3 months",
            RangePreset::SixMonths => "6 months",
            RangePreset::OneYear => "1 year",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1month" | "1m" => Some(RangePreset::OneMonth),
            "3months" | "3m" => Some(RangePreset::ThreeMonths),
            "6months" | "6m" => Some(RangePreset::SixMonths),
            "1year" | "1y" | "12months" => Some(RangePreset::OneYear),
            _ => None,
        }
    }
}

/// Displayed window over the trends series plus the extent seen at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeState {
    pub original: TimeRange,
    pub current: TimeRange,
}

pub fn date_of(ts: i64) -> Option<NaiveDate> {
    DateTime::<Utc>::from_timestamp_millis(ts).map(|dt| dt.date_naive())
}

fn midnight_millis(d: NaiveDate) -> i64 {
    d.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp_millis())
        .unwrap_or_default()
}

impl RangeState {
    /// Full extent of `series`, or `None` when it holds no points.
    pub fn from_series(series: &[Point]) -> Option<Self> {
        let min = series.iter().map(|p| p.timestamp).min()?;
        let max = series.iter().map(|p| p.timestamp).max()?;
        let full = TimeRange { min, max };
        Some(Self {
            original: full,
            current: full,
        })
    }

    /// Narrow the displayed window to `[start 00:00, end 23:59:59.999]`.
    pub fn set_range(
        &self,
        series: &[Point],
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Self, RangeError> {
        let (Some(start), Some(end)) = (start, end) else {
            return Err(RangeError::Invalid);
        };
        if start >= end {
            return Err(RangeError::Invalid);
        }
        let window = TimeRange {
            min: midnight_millis(start),
            max: midnight_millis(end) + DAY_MILLIS - 1,
        };
        if !series.iter().any(|p| window.contains(p.timestamp)) {
            return Err(RangeError::NoData);
        }
        Ok(Self {
            original: self.original,
            current: window,
        })
    }

    pub fn reset(&self) -> Self {
        Self {
            original: self.original,
            current: self.original,
        }
    }

    /// `[max(originalMax - preset, originalMin), originalMax]`, applied via [`Self::set_range`].
    pub fn set_preset(&self, series: &[Point], preset: RangePreset) -> Result<Self, RangeError> {
        let end = self.original.max;
        let start = (end - preset.days() * DAY_MILLIS).max(self.original.min);
        self.set_range(series, date_of(start), date_of(end))
    }

    /// Points of `series` inside the displayed window.
    pub fn visible(&self, series: &[Point]) -> Series {
        series
            .iter()
            .filter(|p| self.current.contains(p.timestamp))
            .copied()
            .collect()
    }

    pub fn granularity(&self) -> AxisGranularity {
        AxisGranularity::for_span(self.current.span_millis())
    }
}

/// Tick label detail for the displayed date span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisGranularity {
    /// `Jan 2024`
    MonthYear,
    /// `Jan 05`
    MonthDay,
    /// `Jan 05, 2024`
    MonthDayYear,
}

impl AxisGranularity {
    pub fn for_span(span_millis: i64) -> Self {
        let days = span_millis as f64 / DAY_MILLIS as f64;
        if days > 180.0 {
            AxisGranularity::MonthYear
        } else if days > 30.0 {
            AxisGranularity::MonthDay
        } else {
            AxisGranularity::MonthDayYear
        }
    }

    pub fn format(&self) -> &'static str {
        match self {
            AxisGranularity::MonthYear => "%b %Y",
            AxisGranularity::MonthDay => "%b %d",
            AxisGranularity::MonthDayYear => "%b %d, %Y",
        }
    }

    pub fn label(&self, ts: i64) -> String {
        DateTime::<Utc>::from_timestamp_millis(ts)
            .map(|dt| dt.format(self.format()).to_string())
            .unwrap_or_default()
    }
}

/// Trends feed: full series plus the displayed window.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendsState {
    pub series: Series,
    pub range: Option<RangeState>,
}

impl TrendsState {
    pub fn visible(&self) -> Series {
        match &self.range {
            Some(r) => r.visible(&self.series),
            None => self.series.clone(),
        }
    }

    /// Apply a range reducer; on error the current window is kept.
    pub fn apply<F>(&mut self, f: F) -> Result<(), RangeError>
    where
        F: FnOnce(&RangeState, &[Point]) -> Result<RangeState, RangeError>,
    {
        let range = self.range.as_ref().ok_or(RangeError::Empty)?;
        let next = f(range, &self.series)?;
        self.range = Some(next);
        Ok(())
    }
}

/// Outcome of one feed load.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedState<T> {
    NotLoaded,
    Loaded {
        data: T,
        source_name: String,
        dropped: usize,
    },
    Failed(String),
}

impl<T> FeedState<T> {
    pub fn data(&self) -> Option<&T> {
        match self {
            FeedState::Loaded { data, .. } => Some(data),
            _ => None,
        }
    }

    pub fn data_mut(&mut self) -> Option<&mut T> {
        match self {
            FeedState::Loaded { data, .. } => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            FeedState::Failed(msg) => Some(msg),
            _ => None,
        }
    }
}

/// All state of one project view, owned by a single controller.
#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    pub trends: FeedState<TrendsState>,
    pub versions: FeedState<VersionView>,
    pub installer: FeedState<Vec<ShareSlice>>,
    pub country: FeedState<Vec<ShareSlice>>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            trends: FeedState::NotLoaded,
            versions: FeedState::NotLoaded,
            installer: FeedState::NotLoaded,
            country: FeedState::NotLoaded,
        }
    }
}

fn load_one<T, F>(source: &dyn Source, feed: FeedKind, build: F) -> FeedState<T>
where
    F: FnOnce(&[crate::models::RawRow]) -> (T, usize, bool),
{
    match loader::load_feed(source, feed) {
        Ok(rows) => {
            let (data, dropped, empty) = build(&rows.rows);
            if empty {
                warn!("{}: no data in {}", feed, rows.source_name);
                return FeedState::Failed(format!("no data in {}", rows.source_name));
            }
            FeedState::Loaded {
                data,
                source_name: rows.source_name,
                dropped: dropped + rows.dropped_malformed + rows.dropped_unmatched,
            }
        }
        Err(e) => {
            warn!("{}: {}", feed, e);
            FeedState::Failed(e.to_string())
        }
    }
}

impl AppState {
    /// Load the selected feeds. Each feed fails on its own.
    pub fn load(source: &dyn Source, feeds: &[FeedKind]) -> Self {
        let mut state = AppState::default();
        for feed in feeds {
            state.reload(source, *feed);
        }
        state
    }

    /// Re-fetch and rebuild a single feed, replacing its previous state.
    pub fn reload(&mut self, source: &dyn Source, feed: FeedKind) {
        match feed {
            FeedKind::Trends => {
                self.trends = load_one(source, feed, |rows| {
                    let built = build_series(rows, "download_date", "daily_downloads");
                    let empty = built.value.is_empty();
                    let range = RangeState::from_series(&built.value);
                    (
                        TrendsState {
                            series: built.value,
                            range,
                        },
                        built.dropped,
                        empty,
                    )
                });
            }
            FeedKind::Versions => {
                self.versions = load_one(source, feed, |rows| {
                    let built =
                        build_category_series(rows, "version", "download_date", "daily_downloads");
                    let empty = built.value.is_empty();
                    (
                        VersionView::from_categories(built.value),
                        built.dropped,
                        empty,
                    )
                });
            }
            FeedKind::Installer => {
                self.installer = load_one(source, feed, |rows| {
                    let built = build_shares(rows, "installer_name");
                    let empty = built.value.is_empty();
                    (built.value, built.dropped, empty)
                });
            }
            FeedKind::Country => {
                self.country = load_one(source, feed, |rows| {
                    let built = build_shares(rows, "country_code");
                    let empty = built.value.is_empty();
                    (built.value, built.dropped, empty)
                });
            }
        }
        info!("{} reloaded", feed);
    }

    /// Error text per failed feed, for display.
    pub fn failures(&self) -> BTreeMap<FeedKind, String> {
        let mut out = BTreeMap::new();
        let pairs = [
            (FeedKind::Trends, self.trends.error()),
            (FeedKind::Versions, self.versions.error()),
            (FeedKind::Installer, self.installer.error()),
            (FeedKind::Country, self.country.error()),
        ];
        for (feed, err) in pairs {
            if let Some(e) = err {
                out.insert(feed, e.to_string());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;

    fn cats(keys: &[&str]) -> CategorySeries {
        CategorySeries {
            categories: keys
                .iter()
                .map(|k| Category {
                    key: k.to_string(),
                    series: vec![],
                })
                .collect(),
        }
    }

    #[test]
    fn toggle_appends_then_removes() {
        let s = Selection::default().toggle("1.0").toggle("2.0");
        assert_eq!(s.keys, vec!["1.0", "2.0"]);
        let s = s.toggle("1.0");
        assert_eq!(s.keys, vec!["2.0"]);
    }

    #[test]
    fn initial_selection_is_first_three() {
        let c = cats(&["4.0", "3.0", "2.0", "1.0"]);
        assert_eq!(Selection::initial(&c).keys, vec!["4.0", "3.0", "2.0"]);
        let c = cats(&["2.0", "1.0"]);
        assert_eq!(Selection::initial(&c).keys, vec!["2.0", "1.0"]);
    }

    #[test]
    fn granularity_thresholds() {
        assert_eq!(
            AxisGranularity::for_span(181 * DAY_MILLIS),
            AxisGranularity::MonthYear
        );
        assert_eq!(
            AxisGranularity::for_span(180 * DAY_MILLIS),
            AxisGranularity::MonthDay
        );
        assert_eq!(
            AxisGranularity::for_span(30 * DAY_MILLIS),
            AxisGranularity::MonthDayYear
        );
    }
}
