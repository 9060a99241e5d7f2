//! pypi_charts
//!
//! Load PyPI download statistics exported as CSV, reshape them into chart
//! series, and render or re-export them. Pairs with the `pypi-charts` CLI and
//! the `pypi-charts-gui` viewer.
//!
//! ### Features
//! - Four feeds: daily trends, per-version downloads, installer share, country share
//! - `_latest.csv` lookup with fallback to timestamped snapshots
//! - Version selection and date-range state as pure transitions
//! - SVG/PNG line and pie charts, plus download counter badges
//! - CSV export, preview, and snapshots; BigQuery template rendering
//!
//! ### Example
//! ```no_run
//! use pypi_charts::loader::DirSource;
//! use pypi_charts::models::FeedKind;
//! use pypi_charts::state::AppState;
//! use pypi_charts::viz::{self, ChartConfig, Dataset};
//!
//! let source = DirSource::new("output/requests");
//! let state = AppState::load(&source, &FeedKind::ALL);
//! if let Some(trends) = state.trends.data() {
//!     let config = ChartConfig { title: "requests - Daily Downloads".into(), ..Default::default() };
//!     viz::plot_lines(vec![Dataset::new("requests", trends.visible())], "trends.svg", config)?;
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod badge;
pub mod config;
pub mod loader;
pub mod models;
pub mod query;
pub mod series;
pub mod state;
pub mod stats;
pub mod storage;
pub mod viz;

pub use loader::{DirSource, HttpSource, Source};
pub use models::{CategorySeries, FeedKind, Point, RawRow, Series, ShareSlice};
pub use state::AppState;
