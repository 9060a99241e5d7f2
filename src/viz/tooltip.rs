//! Hover summaries for multi-series charts.

use super::types::Dataset;

#[derive(Debug, Clone, PartialEq)]
pub struct TooltipEntry {
    pub label: String,
    pub value: i64,
    /// Share of [`Tooltip::total`] in percent; 0 when the total is 0.
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tooltip {
    pub timestamp: i64,
    pub entries: Vec<TooltipEntry>,
    pub total: i64,
}

/// Values of every dataset at `timestamp`, their sum, and each share of it.
///
/// Datasets without a point at `timestamp` are skipped. Repeated points at
/// the same timestamp are summed.
pub fn tooltip_at(datasets: &[Dataset], timestamp: i64) -> Tooltip {
    let mut entries: Vec<TooltipEntry> = datasets
        .iter()
        .filter_map(|d| {
            let mut hits = d.points.iter().filter(|p| p.timestamp == timestamp).peekable();
            hits.peek()?;
            Some(TooltipEntry {
                label: d.label.clone(),
                value: hits.map(|p| p.value).sum(),
                share: 0.0,
            })
        })
        .collect();
    let total: i64 = entries.iter().map(|e| e.value).sum();
    if total != 0 {
        for e in &mut entries {
            e.share = e.value as f64 / total as f64 * 100.0;
        }
    }
    Tooltip {
        timestamp,
        entries,
        total,
    }
}

/// Timestamp of the point nearest to `ts` across all datasets.
pub fn nearest_timestamp(datasets: &[Dataset], ts: i64) -> Option<i64> {
    datasets
        .iter()
        .flat_map(|d| d.points.iter().map(|p| p.timestamp))
        .min_by_key(|t| (t - ts).abs())
}

impl Tooltip {
    /// Multi-line text: one line per category plus a total line.
    pub fn lines(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .entries
            .iter()
            .map(|e| format!("{}: {} ({:.1}%)", e.label, e.value, e.share))
            .collect();
        out.push(format!("Total: {}", self.total));
        out
    }
}
