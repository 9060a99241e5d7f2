//! Download counter badges.
//!
//! A counter file holds a single row, e.g. `total_downloads_latest.csv` with
//! a `total_downloads` column. It is looked up with the same `_latest` then
//! snapshot fallback as the chart feeds and rendered as a compact number
//! (`1.2M`) on a small SVG badge.
use crate::loader::{self, LoadError, Source};
use crate::series::parse_int;
use crate::stats::format_compact;
use crate::viz::badge::render_badge_svg;
use anyhow::{Context, Result};
use log::{info, warn};
use plotters::style::RGBColor;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BadgeKind {
    /// All-time downloads.
    TotalDownloads,
    /// Downloads over the last 30 days.
    Recent30Days,
}

#[derive(Debug, Error)]
pub enum BadgeError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("{file} has no integer `{column}` value")]
    NoValue { file: String, column: &'static str },
}

impl BadgeKind {
    pub const ALL: [BadgeKind; 2] = [BadgeKind::TotalDownloads, BadgeKind::Recent30Days];

    /// File stem of the counter CSV; also its value column.
    pub fn stem(&self) -> &'static str {
        match self {
            BadgeKind::TotalDownloads => "total_downloads",
            BadgeKind::Recent30Days => "recent_30_days_downloads",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BadgeKind::TotalDownloads => "PyPI Downloads",
            BadgeKind::Recent30Days => "Downloads (30d)",
        }
    }

    pub fn color(&self) -> RGBColor {
        match self {
            BadgeKind::TotalDownloads => RGBColor(0x30, 0x69, 0x98),
            BadgeKind::Recent30Days => RGBColor(0x28, 0xa7, 0x45),
        }
    }

    /// `pypi-downloads-badge.svg`, `downloads-(30d)-badge.svg`.
    pub fn file_name(&self) -> String {
        format!("{}-badge.svg", self.label().to_lowercase().replace(' ', "-"))
    }

    /// Plain-text file holding the raw count next to the badge.
    pub fn count_file_name(&self) -> String {
        format!("{}.txt", self.stem())
    }
}

impl fmt::Display for BadgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} badge", self.label())
    }
}

/// Read the counter value from the first row of the first loadable candidate.
pub fn load_count(source: &dyn Source, kind: BadgeKind) -> Result<i64, BadgeError> {
    let available = source.list().unwrap_or_else(|e| {
        warn!("listing {} failed: {:#}", source.describe(), e);
        Vec::new()
    });
    let candidates = loader::candidate_names_for_stem(kind.stem(), &available);
    let (file, parsed) = loader::load(source, &candidates)?;
    let value = parsed
        .rows
        .first()
        .and_then(|row| row.get(kind.stem()))
        .and_then(|v| parse_int(v));
    match value {
        Some(v) => {
            info!("{}: {} from {}", kind, v, file);
            Ok(v)
        }
        None => Err(BadgeError::NoValue {
            file,
            column: kind.stem(),
        }),
    }
}

/// SVG badge text for a count.
pub fn badge_svg(kind: BadgeKind, count: i64) -> Result<String> {
    render_badge_svg(kind.label(), &format_compact(count), kind.color())
}

/// Write the badge and the raw count into `dir`. Returns the badge path.
pub fn save_badge<P: AsRef<Path>>(dir: P, kind: BadgeKind, count: i64) -> Result<PathBuf> {
    let dir = dir.as_ref();
    let svg = badge_svg(kind, count)?;
    let path = dir.join(kind.file_name());
    fs::write(&path, svg).with_context(|| format!("write {}", path.display()))?;
    let count_path = dir.join(kind.count_file_name());
    fs::write(&count_path, count.to_string())
        .with_context(|| format!("write {}", count_path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_follow_labels() {
        assert_eq!(BadgeKind::TotalDownloads.file_name(), "pypi-downloads-badge.svg");
        assert_eq!(BadgeKind::Recent30Days.file_name(), "downloads-(30d)-badge.svg");
        assert_eq!(
            BadgeKind::Recent30Days.count_file_name(),
            "recent_30_days_downloads.txt"
        );
    }
}
