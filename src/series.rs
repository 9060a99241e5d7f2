//! Reshape raw rows into typed chart series.
use crate::models::{Category, CategorySeries, Point, RawRow, Series, ShareSlice};
use ahash::AHashMap;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::cmp::Ordering;

/// Result of a build step plus the number of rows that were discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct Built<T> {
    pub value: T,
    pub dropped: usize,
}

/// Parse a calendar date (`YYYY-MM-DD`) into UTC epoch milliseconds of midnight.
///
/// Full timestamps (`YYYY-MM-DD HH:MM:SS` or RFC 3339) are accepted too.
pub fn parse_date(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp_millis());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc().timestamp_millis());
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.timestamp_millis())
}

/// Base-10 integer with prefix semantics: `"42abc"` is 42, `"abc"` is none.
pub fn parse_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (neg, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let v: i64 = digits[..end].parse().ok()?;
    Some(if neg { -v } else { v })
}

fn to_point(row: &RawRow, date_col: &str, value_col: &str) -> Option<Point> {
    let timestamp = parse_date(row.get(date_col)?)?;
    let value = parse_int(row.get(value_col)?)?;
    Some(Point { timestamp, value })
}

/// Build a time-ordered series. Ties keep their input order.
pub fn build_series<'a, I>(rows: I, date_col: &str, value_col: &str) -> Built<Series>
where
    I: IntoIterator<Item = &'a RawRow>,
{
    let mut dropped = 0;
    let mut series: Series = Vec::new();
    for row in rows {
        match to_point(row, date_col, value_col) {
            Some(p) => series.push(p),
            None => dropped += 1,
        }
    }
    // `sort_by_key` is stable
    series.sort_by_key(|p| p.timestamp);
    Built {
        value: series,
        dropped,
    }
}

/// Partition rows by `category_col` and build one series per category.
///
/// Categories come out latest version first (see [`compare_versions`]);
/// equal versions keep the order in which they were first seen. A category
/// without a single valid point is left out, its rows counted as dropped.
pub fn build_category_series(
    rows: &[RawRow],
    category_col: &str,
    date_col: &str,
    value_col: &str,
) -> Built<CategorySeries> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: AHashMap<&str, Vec<&RawRow>> = AHashMap::new();
    let mut dropped = 0;
    for row in rows {
        let Some(key) = row.get(category_col) else {
            dropped += 1;
            continue;
        };
        let key = key.as_str();
        groups
            .entry(key)
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(row);
    }

    sort_versions(&mut order);

    let mut categories = Vec::with_capacity(order.len());
    for key in order {
        let members = groups.remove(key).unwrap_or_default();
        let built = build_series(members, date_col, value_col);
        dropped += built.dropped;
        if built.value.is_empty() {
            continue;
        }
        categories.push(Category {
            key: key.to_string(),
            series: built.value,
        });
    }
    Built {
        value: CategorySeries { categories },
        dropped,
    }
}

/// Descending semantic-version order: `2.0 < 1.10 < 1.9.1 < 1.2`.
///
/// Segments are compared numerically; a non-numeric or missing segment
/// counts as 0, so `1.0` and `1.0.0` compare equal.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let pa: Vec<i64> = a.split('.').map(|s| parse_int(s).unwrap_or(0)).collect();
    let pb: Vec<i64> = b.split('.').map(|s| parse_int(s).unwrap_or(0)).collect();
    for i in 0..pa.len().max(pb.len()) {
        let x = pa.get(i).copied().unwrap_or(0);
        let y = pb.get(i).copied().unwrap_or(0);
        match y.cmp(&x) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// Stable sort, latest version first.
pub fn sort_versions<S: AsRef<str>>(keys: &mut [S]) {
    keys.sort_by(|a, b| compare_versions(a.as_ref(), b.as_ref()));
}

/// Percent change from `prev` to `cur`, rounded to one decimal.
///
/// `None` when `prev` is zero: there is no meaningful previous-day comparison.
pub fn percent_change(prev: i64, cur: i64) -> Option<f64> {
    if prev == 0 {
        return None;
    }
    let pct = (cur - prev) as f64 / prev as f64 * 100.0;
    Some((pct * 10.0).round() / 10.0)
}

/// Change relative to the previous point, one entry per point.
pub fn day_over_day(series: &[Point]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(series.len());
    if !series.is_empty() {
        out.push(None);
    }
    for w in series.windows(2) {
        out.push(percent_change(w[0].value, w[1].value));
    }
    out
}

/// Display text for a percent-change annotation.
pub fn format_change(change: Option<f64>) -> String {
    match change {
        Some(p) if p > 0.0 => format!("+{:.1}%", p),
        Some(p) => format!("{:.1}%", p),
        None => "no previous-day comparison".to_string(),
    }
}

/// Share slices for installer or country rows, in input order.
///
/// Uses the `percentage` column when it parses, otherwise derives the
/// share from the sum of counts.
pub fn build_shares(rows: &[RawRow], label_col: &str) -> Built<Vec<ShareSlice>> {
    let mut dropped = 0;
    let mut parsed: Vec<(String, i64, Option<f64>)> = Vec::new();
    for row in rows {
        let label = row.get(label_col);
        let count = row.get("download_count").and_then(|v| parse_int(v));
        match (label, count) {
            (Some(label), Some(count)) => {
                let pct = row
                    .get("percentage")
                    .and_then(|p| p.trim().parse::<f64>().ok())
                    .filter(|p| p.is_finite());
                parsed.push((label.clone(), count, pct));
            }
            _ => dropped += 1,
        }
    }

    let total: i64 = parsed.iter().map(|(_, c, _)| *c).sum();
    let slices = parsed
        .into_iter()
        .map(|(label, count, pct)| {
            let percentage = pct.unwrap_or_else(|| {
                if total == 0 {
                    0.0
                } else {
                    ((count as f64 / total as f64) * 10000.0).round() / 100.0
                }
            });
            ShareSlice {
                label,
                count,
                percentage,
            }
        })
        .collect();
    Built {
        value: slices,
        dropped,
    }
}
