//! CSV loading with candidate fallback.
//!
//! A feed is looked up as `<stem>_latest.csv` first, then as timestamped
//! snapshots (`<stem>_<timestamp>.csv`) newest first. Each candidate is tried
//! once; the first one that can be fetched and yields data rows wins.
//!
//! ### Notes
//! - The splitter is deliberately lenient: no quoting, a line whose field
//!   count does not match the header is dropped (and counted).
//! - Every call re-fetches. Nothing is cached between loads.
//!
//! Typical usage:
//! ```no_run
//! # use pypi_charts::loader::{DirSource, load_feed};
//! # use pypi_charts::models::FeedKind;
//! let source = DirSource::new("output/requests");
//! let feed = load_feed(&source, FeedKind::Trends)?;
//! println!("{} rows from {}", feed.rows.len(), feed.source_name);
//! # Ok::<(), pypi_charts::loader::LoadError>(())
//! ```
use crate::models::{FeedKind, RawRow};
use anyhow::{Context, Result, bail};
use log::{debug, info, warn};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use reqwest::blocking::Client as HttpClient;
use reqwest::redirect::Policy;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no loadable file among {} candidate(s): {}", tried.len(), tried.join(", "))]
    NotFound { tried: Vec<String> },
}

/// Parsed CSV text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedCsv {
    pub header: Vec<String>,
    pub rows: Vec<RawRow>,
    /// Lines discarded because their field count did not match the header.
    pub dropped: usize,
}

/// Rows of one feed after shape discrimination.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedRows {
    pub feed: FeedKind,
    /// Candidate name that was actually loaded.
    pub source_name: String,
    pub rows: Vec<RawRow>,
    pub dropped_malformed: usize,
    pub dropped_unmatched: usize,
}

/// Where CSV files come from.
pub trait Source {
    /// Fetch the full text of `name`.
    fn fetch(&self, name: &str) -> Result<String>;

    /// Names of available files, used to build the timestamped candidates.
    fn list(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    /// Human-readable location, for log lines.
    fn describe(&self) -> String;
}

/// Files in a local directory (e.g. `output/<project>`).
#[derive(Debug, Clone)]
pub struct DirSource {
    pub root: PathBuf,
}

impl DirSource {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl Source for DirSource {
    fn fetch(&self, name: &str) -> Result<String> {
        let path = self.root.join(name);
        std::fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))
    }

    fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let entries = std::fs::read_dir(&self.root)
            .with_context(|| format!("list {}", self.root.display()))?;
        for entry in entries {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

/// Files served below a base URL, e.g. a static pages deployment.
#[derive(Debug, Clone)]
pub struct HttpSource {
    pub base_url: String,
    manifest: Vec<String>,
    http: HttpClient,
}

// Allow -, _, . unescaped in file names
const SAFE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

impl HttpSource {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(30)) // total request timeout
            .connect_timeout(Duration::from_secs(10)) // connect timeout
            .redirect(Policy::limited(5)) // cap redirects
            .user_agent(concat!("pypi_charts/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build http client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            manifest: Vec::new(),
            http,
        })
    }

    /// Known file names (the server offers no directory listing).
    pub fn with_manifest(mut self, names: Vec<String>) -> Self {
        self.manifest = names;
        self
    }

    pub fn url_for(&self, name: &str) -> String {
        format!(
            "{}/{}",
            self.base_url,
            percent_encoding::utf8_percent_encode(name.trim(), SAFE)
        )
    }
}

impl Source for HttpSource {
    fn fetch(&self, name: &str) -> Result<String> {
        let url = self.url_for(name);
        let resp = self
            .http
            .get(&url)
            .send()
            .with_context(|| format!("GET {}", url))?;
        if !resp.status().is_success() {
            bail!("GET {} failed with HTTP {}", url, resp.status());
        }
        resp.text().with_context(|| format!("decode body of {}", url))
    }

    fn list(&self) -> Result<Vec<String>> {
        Ok(self.manifest.clone())
    }

    fn describe(&self) -> String {
        self.base_url.clone()
    }
}

/// Split CSV text into rows.
///
/// The first line is the header. Blank lines are skipped; a line whose field
/// count differs from the header's is dropped, never truncated or padded.
pub fn parse_csv(text: &str) -> ParsedCsv {
    let mut lines = text.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l));
    let header: Vec<String> = match lines.next() {
        Some(h) => h.split(',').map(|k| k.trim().to_string()).collect(),
        None => return ParsedCsv::default(),
    };

    let mut out = ParsedCsv {
        header,
        ..Default::default()
    };
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != out.header.len() {
            out.dropped += 1;
            continue;
        }
        let row: RawRow = out
            .header
            .iter()
            .cloned()
            .zip(fields.iter().map(|v| v.trim().to_string()))
            .collect();
        out.rows.push(row);
    }
    out
}

/// Ordered candidates: `<stem>_latest.csv`, then snapshots newest first.
///
/// Snapshot names are compared as strings; the timestamp embedded after the
/// stem is assumed to sort lexicographically.
pub fn candidate_names(feed: FeedKind, available: &[String]) -> Vec<String> {
    candidate_names_for_stem(feed.stem(), available)
}

/// [`candidate_names`] for any file stem, e.g. a badge counter.
pub fn candidate_names_for_stem(stem: &str, available: &[String]) -> Vec<String> {
    let latest = format!("{}_latest.csv", stem);
    let pattern = format!(r"^{}_\d[\w-]*\.csv$", regex::escape(stem));
    let Ok(re) = Regex::new(&pattern) else {
        return vec![latest];
    };

    let mut snapshots: Vec<String> = available
        .iter()
        .filter(|n| **n != latest && re.is_match(n))
        .cloned()
        .collect();
    snapshots.sort_by(|a, b| b.cmp(a));
    snapshots.dedup();

    let mut out = Vec::with_capacity(snapshots.len() + 1);
    out.push(latest);
    out.extend(snapshots);
    out
}

/// Fetch and parse one candidate. A file without data rows counts as a miss.
fn fetch_candidate(source: &dyn Source, name: &str) -> Option<ParsedCsv> {
    debug!("fetching {} from {}", name, source.describe());
    let text = match source.fetch(name) {
        Ok(text) => text,
        Err(e) => {
            warn!("could not load {}: {:#}", name, e);
            return None;
        }
    };
    let parsed = parse_csv(&text);
    if parsed.header.iter().all(|h| h.is_empty()) {
        warn!("{} has no header", name);
        return None;
    }
    if parsed.rows.is_empty() {
        warn!("{} has no data rows", name);
        return None;
    }
    Some(parsed)
}

/// Try each candidate in order and return the first one that parses to rows.
pub fn load(source: &dyn Source, candidates: &[String]) -> Result<(String, ParsedCsv), LoadError> {
    for name in candidates {
        if let Some(parsed) = fetch_candidate(source, name) {
            return Ok((name.clone(), parsed));
        }
    }
    Err(LoadError::NotFound {
        tried: candidates.to_vec(),
    })
}

/// Load one feed and keep only rows whose column shape belongs to it.
///
/// A candidate holding no rows of the feed's shape is skipped like a
/// missing file.
pub fn load_feed(source: &dyn Source, feed: FeedKind) -> Result<FeedRows, LoadError> {
    let available = source.list().unwrap_or_else(|e| {
        warn!("listing {} failed: {:#}", source.describe(), e);
        Vec::new()
    });
    let candidates = candidate_names(feed, &available);

    for name in &candidates {
        let Some(parsed) = fetch_candidate(source, name) else {
            continue;
        };
        let total = parsed.rows.len();
        let rows: Vec<RawRow> = parsed
            .rows
            .into_iter()
            .filter(|r| FeedKind::classify(r) == Some(feed))
            .collect();
        let dropped_unmatched = total - rows.len();
        if rows.is_empty() {
            warn!("{}: {} holds no {} rows", feed, name, feed);
            continue;
        }
        info!(
            "{}: {} rows from {} ({} malformed, {} other shape)",
            feed,
            rows.len(),
            name,
            parsed.dropped,
            dropped_unmatched
        );
        return Ok(FeedRows {
            feed,
            source_name: name.clone(),
            rows,
            dropped_malformed: parsed.dropped,
            dropped_unmatched,
        });
    }
    Err(LoadError::NotFound { tried: candidates })
}
