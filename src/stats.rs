use crate::models::{Point, ShareSlice};
use crate::series::percent_change;
use serde::{Deserialize, Serialize};

/// Summary statistics for one series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Summary {
    pub key: String,
    pub count: usize,
    pub total: i64,
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    /// Value of the most recent point.
    pub latest: Option<i64>,
    /// Percent change of the most recent point against the one before it.
    pub latest_change: Option<f64>,
}

/// Compute summary statistics for a series.
pub fn summarize(key: &str, series: &[Point]) -> Summary {
    let mut vals: Vec<i64> = series.iter().map(|p| p.value).collect();
    let latest = series.last().map(|p| p.value);
    let latest_change = match series {
        [.., prev, last] => percent_change(prev.value, last.value),
        _ => None,
    };
    vals.sort_unstable();
    let count = vals.len();
    let total: i64 = vals.iter().sum();
    let mean = if count > 0 {
        Some(total as f64 / count as f64)
    } else {
        None
    };
    let median = if count == 0 {
        None
    } else if count % 2 == 1 {
        Some(vals[count / 2] as f64)
    } else {
        Some((vals[count / 2 - 1] + vals[count / 2]) as f64 / 2.0)
    };
    Summary {
        key: key.to_string(),
        count,
        total,
        min: vals.first().copied(),
        max: vals.last().copied(),
        mean,
        median,
        latest,
        latest_change,
    }
}

/// Summaries for several keyed series, in the given order.
pub fn grouped_summary(groups: &[(String, Vec<Point>)]) -> Vec<Summary> {
    groups.iter().map(|(k, s)| summarize(k, s)).collect()
}

/// Sum of all slice counts.
pub fn share_total(slices: &[ShareSlice]) -> i64 {
    slices.iter().map(|s| s.count).sum()
}

/// Compact number with K/M/B suffix, e.g. `1.5M`.
pub fn format_compact(n: i64) -> String {
    let a = n.unsigned_abs() as f64;
    let sign = if n < 0 { "-" } else { "" };
    if a >= 1.0e9 {
        format!("{sign}{:.1}B", a / 1.0e9)
    } else if a >= 1.0e6 {
        format!("{sign}{:.1}M", a / 1.0e6)
    } else if a >= 1.0e3 {
        format!("{sign}{:.1}K", a / 1.0e3)
    } else {
        n.to_string()
    }
}
