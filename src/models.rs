use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One well-formed CSV line: column name -> trimmed value.
pub type RawRow = BTreeMap<String, String>;

/// The four independent download feeds rendered for a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FeedKind {
    /// Daily downloads across all versions.
    Trends,
    /// Daily downloads per version.
    Versions,
    /// Installer share over the last 30 days.
    Installer,
    /// Country share over the last 30 days.
    Country,
}

impl FeedKind {
    pub const ALL: [FeedKind; 4] = [
        FeedKind::Trends,
        FeedKind::Versions,
        FeedKind::Installer,
        FeedKind::Country,
    ];

    /// File stem shared by the `_latest.csv` and timestamped snapshots.
    pub fn stem(&self) -> &'static str {
        match self {
            FeedKind::Trends => "download_by_date",
            FeedKind::Versions => "download_by_date_all_versions",
            FeedKind::Installer => "installer_stats_30d",
            FeedKind::Country => "download_by_country_30d",
        }
    }

    pub fn latest_file_name(&self) -> String {
        format!("{}_latest.csv", self.stem())
    }

    /// Columns a row must carry to belong to this feed.
    pub fn required_columns(&self) -> &'static [&'static str] {
        match self {
            FeedKind::Trends => &["download_date", "daily_downloads"],
            FeedKind::Versions => &["download_date", "version", "daily_downloads"],
            FeedKind::Installer => &["installer_name", "download_count"],
            FeedKind::Country => &["country_code", "download_count", "percentage"],
        }
    }

    /// Column order used when re-serializing the feed.
    pub fn export_columns(&self) -> &'static [&'static str] {
        match self {
            FeedKind::Trends => &["download_date", "daily_downloads"],
            FeedKind::Versions => &["download_date", "version", "daily_downloads"],
            FeedKind::Installer => &["installer_name", "download_count", "percentage"],
            FeedKind::Country => &["country_code", "download_count", "percentage"],
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            FeedKind::Trends => "Daily Downloads",
            FeedKind::Versions => "Daily Downloads by Version",
            FeedKind::Installer => "Recent 30 Days Installer Statistics",
            FeedKind::Country => "Recent 30 Days Country Statistics",
        }
    }

    /// Output chart name, e.g. `download-trends`.
    pub fn chart_name(&self) -> &'static str {
        match self {
            FeedKind::Trends => "download-trends",
            FeedKind::Versions => "version-comparison",
            FeedKind::Installer => "installer-stats-pie",
            FeedKind::Country => "country-stats-pie",
        }
    }

    pub fn is_time_series(&self) -> bool {
        matches!(self, FeedKind::Trends | FeedKind::Versions)
    }

    /// Discriminate a row by the known column shapes.
    ///
    /// Versions rows also carry every trends column, so the more specific
    /// shape is checked first.
    pub fn classify(row: &RawRow) -> Option<FeedKind> {
        [
            FeedKind::Versions,
            FeedKind::Trends,
            FeedKind::Country,
            FeedKind::Installer,
        ]
        .into_iter()
        .find(|kind| {
            kind.required_columns()
                .iter()
                .all(|c| row.contains_key(*c))
        })
    }

    pub fn parse(s: &str) -> Option<FeedKind> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trends" | "trend" => Some(FeedKind::Trends),
            "versions" | "version" => Some(FeedKind::Versions),
            "installer" | "installers" => Some(FeedKind::Installer),
            "country" | "countries" => Some(FeedKind::Country),
            _ => None,
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FeedKind::Trends => "trends",
            FeedKind::Versions => "versions",
            FeedKind::Installer => "installer",
            FeedKind::Country => "country",
        };
        f.write_str(s)
    }
}

/// A single chart point: UTC epoch milliseconds and a download count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub timestamp: i64,
    pub value: i64,
}

/// Points ordered non-decreasing by timestamp.
pub type Series = Vec<Point>;

/// One category (e.g. a version string) with its own series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub key: String,
    pub series: Series,
}

/// Categories in comparator order (latest version first).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategorySeries {
    pub categories: Vec<Category>,
}

impl CategorySeries {
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.key.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&Series> {
        self.categories
            .iter()
            .find(|c| c.key == key)
            .map(|c| &c.series)
    }
}

/// A pie slice for installer or country share.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareSlice {
    pub label: String,
    pub count: i64,
    pub percentage: f64,
}

/// Inclusive timestamp window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub min: i64,
    pub max: i64,
}

impl TimeRange {
    pub fn contains(&self, ts: i64) -> bool {
        ts >= self.min && ts <= self.max
    }

    pub fn span_millis(&self) -> i64 {
        self.max - self.min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cols: &[(&str, &str)]) -> RawRow {
        cols.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn classify_prefers_most_specific_shape() {
        let r = row(&[
            ("download_date", "2024-01-01"),
            ("version", "1.0"),
            ("daily_downloads", "5"),
        ]);
        assert_eq!(FeedKind::classify(&r), Some(FeedKind::Versions));

        let r = row(&[("download_date", "2024-01-01"), ("daily_downloads", "5")]);
        assert_eq!(FeedKind::classify(&r), Some(FeedKind::Trends));

        let r = row(&[("installer_name", "pip"), ("download_count", "5")]);
        assert_eq!(FeedKind::classify(&r), Some(FeedKind::Installer));

        let r = row(&[("foo", "bar")]);
        assert_eq!(FeedKind::classify(&r), None);
    }
}
