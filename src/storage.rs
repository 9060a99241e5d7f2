//! Re-serialize loaded feeds for download, preview, and snapshots.
//!
//! Output CSV is stricter than the lenient input splitter: any field holding
//! a comma, quote, or newline is quoted with inner quotes doubled.
use crate::models::{FeedKind, Point, ShareSlice};
use crate::state::{AppState, date_of};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use csv::{QuoteStyle, WriterBuilder};
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no data loaded to export")]
    NoData,
    #[error("csv write failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// In-memory feed data ready to be written out.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportData<'a> {
    Trends(&'a [Point]),
    Versions(&'a [(String, Vec<Point>)]),
    Shares(FeedKind, &'a [ShareSlice]),
}

impl ExportData<'_> {
    pub fn feed(&self) -> FeedKind {
        match self {
            ExportData::Trends(_) => FeedKind::Trends,
            ExportData::Versions(_) => FeedKind::Versions,
            ExportData::Shares(kind, _) => *kind,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ExportData::Trends(s) => s.is_empty(),
            ExportData::Versions(groups) => groups.iter().all(|(_, s)| s.is_empty()),
            ExportData::Shares(_, s) => s.is_empty(),
        }
    }
}

/// Owned snapshot of what one feed currently shows, ready to export.
///
/// Trends keep only the visible window and versions only the selected ones.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedExport {
    Trends(Vec<Point>),
    Versions(Vec<(String, Vec<Point>)>),
    Shares(FeedKind, Vec<ShareSlice>),
}

impl FeedExport {
    pub fn from_state(state: &AppState, feed: FeedKind) -> Self {
        match feed {
            FeedKind::Trends => {
                FeedExport::Trends(state.trends.data().map(|t| t.visible()).unwrap_or_default())
            }
            FeedKind::Versions => FeedExport::Versions(
                state
                    .versions
                    .data()
                    .map(|v| v.datasets())
                    .unwrap_or_default(),
            ),
            FeedKind::Installer => {
                FeedExport::Shares(feed, state.installer.data().cloned().unwrap_or_default())
            }
            FeedKind::Country => {
                FeedExport::Shares(feed, state.country.data().cloned().unwrap_or_default())
            }
        }
    }

    pub fn as_data(&self) -> ExportData<'_> {
        match self {
            FeedExport::Trends(series) => ExportData::Trends(series),
            FeedExport::Versions(groups) => ExportData::Versions(groups),
            FeedExport::Shares(kind, slices) => ExportData::Shares(*kind, slices),
        }
    }
}

fn date_text(ts: i64) -> String {
    date_of(ts)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Render feed data as CSV text with the feed's header.
pub fn to_csv_string(data: &ExportData<'_>) -> Result<String, ExportError> {
    if data.is_empty() {
        return Err(ExportError::NoData);
    }
    let mut wtr = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .from_writer(Vec::new());
    wtr.write_record(data.feed().export_columns())?;
    match data {
        ExportData::Trends(series) => {
            for p in series.iter() {
                wtr.write_record([date_text(p.timestamp), p.value.to_string()])?;
            }
        }
        ExportData::Versions(groups) => {
            for (version, series) in groups.iter() {
                for p in series {
                    wtr.write_record([
                        date_text(p.timestamp),
                        version.clone(),
                        p.value.to_string(),
                    ])?;
                }
            }
        }
        ExportData::Shares(_, slices) => {
            for s in slices.iter() {
                wtr.write_record([
                    s.label.clone(),
                    s.count.to_string(),
                    format!("{:.2}", s.percentage),
                ])?;
            }
        }
    }
    wtr.flush()?;
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Write feed data as CSV. Nothing is created when there is no data.
pub fn save_csv<P: AsRef<Path>>(data: &ExportData<'_>, path: P) -> Result<(), ExportError> {
    let text = to_csv_string(data)?;
    fs::write(path, text)?;
    Ok(())
}

/// Header plus the first `rows` lines of CSV text.
pub fn preview(csv_text: &str, rows: usize) -> String {
    csv_text
        .lines()
        .take(rows + 1)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Save anything serializable as pretty JSON.
pub fn save_json<T: Serialize + ?Sized, P: AsRef<Path>>(value: &T, path: P) -> Result<()> {
    let path = path.as_ref();
    let mut f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let s = serde_json::to_string_pretty(value)?;
    f.write_all(s.as_bytes())?;
    Ok(())
}

/// Write `<stem>_<YYYYmmdd_HHMMSS>.csv` and refresh `<stem>_latest.csv`.
///
/// The latest file is a copy, not a link, so it works on every platform.
/// Returns the timestamped path.
pub fn save_snapshot<P: AsRef<Path>>(
    dir: P,
    data: &ExportData<'_>,
    now: DateTime<Utc>,
) -> Result<PathBuf, ExportError> {
    let text = to_csv_string(data)?;
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let stem = data.feed().stem();
    let path = dir.join(format!("{}_{}.csv", stem, now.format("%Y%m%d_%H%M%S")));
    fs::write(&path, &text)?;
    fs::write(dir.join(data.feed().latest_file_name()), &text)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn nothing_is_written_without_data() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("x.csv");
        let err = save_csv(&ExportData::Trends(&[]), &p).unwrap_err();
        assert!(matches!(err, ExportError::NoData));
        assert!(!p.exists());
    }

    #[test]
    fn labels_with_commas_are_quoted() {
        let slices = vec![ShareSlice {
            label: "pip, \"vendored\"".into(),
            count: 3,
            percentage: 100.0,
        }];
        let text = to_csv_string(&ExportData::Shares(FeedKind::Installer, &slices)).unwrap();
        assert!(text.contains("\"pip, \"\"vendored\"\"\",3,100.00"));
    }
}
