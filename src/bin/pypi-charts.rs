use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;
use pypi_charts::badge::{self, BadgeError, BadgeKind};
use pypi_charts::config::JobsConfig;
use pypi_charts::models::FeedKind;
use pypi_charts::query::{self, QueryVars};
use pypi_charts::state::{AppState, RangePreset, Selection, VersionView};
use pypi_charts::storage::{self, FeedExport};
use pypi_charts::viz::{Chart, ChartConfig, Dataset, LegendMode};
use pypi_charts::{DirSource, HttpSource, Source, stats};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "pypi-charts",
    version,
    about = "Chart, summarize & export PyPI download statistics"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render charts for the loaded feeds, plus counter badges when present.
    Render(RenderArgs),
    /// Print summary statistics per feed.
    Stats(StatsArgs),
    /// Export or preview one feed as CSV.
    Export(ExportArgs),
    /// Render SQL templates from a jobs file or a single template.
    Sql(SqlArgs),
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Directory holding the CSV files of one project.
    #[arg(long, conflicts_with = "base_url")]
    data: Option<PathBuf>,
    /// Base URL serving the CSV files of one project.
    #[arg(long)]
    base_url: Option<String>,
    /// Known file names under --base-url (comma separated), used for snapshot fallback.
    #[arg(long)]
    files: Option<String>,
}

#[derive(Args, Debug)]
struct ViewArgs {
    /// Feeds to load (trends, versions, installer, country). Defaults to all.
    #[arg(long)]
    feeds: Option<String>,
    /// Versions to compare, in legend order (comma separated).
    #[arg(long)]
    versions: Option<String>,
    /// Compare every version instead of the latest three.
    #[arg(long, default_value_t = false)]
    all_versions: bool,
    /// Compare the latest N versions.
    #[arg(long)]
    latest: Option<usize>,
    /// Start date of the trends window (YYYY-MM-DD).
    #[arg(long)]
    from: Option<String>,
    /// End date of the trends window, inclusive (YYYY-MM-DD).
    #[arg(long)]
    to: Option<String>,
    /// Preset trends window: 1month, 3months, 6months, 1year.
    #[arg(long, conflicts_with_all = ["from", "to"])]
    preset: Option<String>,
}

#[derive(ValueEnum, Clone, Debug)]
enum ImageFormat {
    Svg,
    Png,
}

#[derive(ValueEnum, Clone, Debug)]
enum LegendArg {
    Bottom,
    Right,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    source: SourceArgs,
    #[command(flatten)]
    view: ViewArgs,
    /// Project name used in chart titles.
    #[arg(short, long, default_value = "")]
    project: String,
    /// Directory for the chart files.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
    #[arg(long, value_enum, default_value = "svg")]
    format: ImageFormat,
    /// Width of the charts (default 1000).
    #[arg(long, default_value_t = 1000)]
    width: u32,
    /// Height of the charts (default 600).
    #[arg(long, default_value_t = 600)]
    height: u32,
    /// Locale for number formatting (en, de, fr, ...).
    #[arg(long, default_value = "en")]
    locale: String,
    #[arg(long, value_enum, default_value = "bottom")]
    legend: LegendArg,
}

#[derive(Args, Debug)]
struct StatsArgs {
    #[command(flatten)]
    source: SourceArgs,
    #[command(flatten)]
    view: ViewArgs,
    /// Print JSON instead of text.
    #[arg(long, default_value_t = false)]
    json: bool,
    /// Also save the summaries as JSON to this file.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ExportArgs {
    #[command(flatten)]
    source: SourceArgs,
    #[command(flatten)]
    view: ViewArgs,
    /// Feed to export.
    #[arg(long)]
    feed: String,
    /// Write the CSV to this file.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Write `<stem>_<timestamp>.csv` plus `<stem>_latest.csv` into this directory.
    #[arg(long, conflicts_with = "out")]
    snapshot_dir: Option<PathBuf>,
    /// Print the header and first N rows instead of writing a file.
    #[arg(long)]
    preview: Option<usize>,
}

#[derive(Args, Debug)]
struct SqlArgs {
    /// Jobs file (TOML).
    #[arg(long)]
    jobs: Option<PathBuf>,
    /// Job to render, as `<package>.<job_type>`.
    #[arg(long, requires = "jobs")]
    job: Option<String>,
    /// List the jobs in --jobs.
    #[arg(long, default_value_t = false)]
    list: bool,
    /// Render a single template instead of a job.
    #[arg(long, conflicts_with = "jobs")]
    template: Option<PathBuf>,
    #[arg(long)]
    project: Option<String>,
    #[arg(long, default_value_t = 45)]
    time_range: u32,
    #[arg(long)]
    version_filter: Option<String>,
}

fn parse_list(s: &str) -> Vec<String> {
    s.split([',', ';'])
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

fn parse_day(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid date `{}`, expected YYYY-MM-DD", s))
}

fn open_source(args: &SourceArgs) -> Result<Box<dyn Source>> {
    match (&args.data, &args.base_url) {
        (Some(dir), _) => Ok(Box::new(DirSource::new(dir))),
        (None, Some(url)) => {
            let files = args.files.as_deref().map(parse_list).unwrap_or_default();
            Ok(Box::new(HttpSource::new(url)?.with_manifest(files)))
        }
        (None, None) => bail!("either --data or --base-url is required"),
    }
}

fn parse_feeds(view: &ViewArgs) -> Result<Vec<FeedKind>> {
    let Some(list) = view.feeds.as_deref() else {
        return Ok(FeedKind::ALL.to_vec());
    };
    parse_list(list)
        .iter()
        .map(|f| FeedKind::parse(f).ok_or_else(|| anyhow::anyhow!("unknown feed `{}`", f)))
        .collect()
}

/// Load feeds and apply the selection and range options.
///
/// Range problems are reported and the full range is kept.
fn load_view(source: &dyn Source, view: &ViewArgs) -> Result<AppState> {
    let feeds = parse_feeds(view)?;
    let mut state = AppState::load(source, &feeds);

    if let Some(versions) = state.versions.data_mut() {
        if let Some(list) = view.versions.as_deref() {
            let keys = parse_list(list);
            versions.update(|_, _| Selection { keys });
        } else if view.all_versions {
            versions.update(|s, c| s.select_all(c));
        } else if let Some(n) = view.latest {
            versions.update(|s, c| s.select_latest(c, n));
        }
    }

    if let Some(trends) = state.trends.data_mut() {
        let outcome = if let Some(p) = view.preset.as_deref() {
            let preset = RangePreset::parse(p)
                .ok_or_else(|| anyhow::anyhow!("unknown preset `{}`", p))?;
            Some(trends.apply(|r, s| r.set_preset(s, preset)))
        } else if view.from.is_some() || view.to.is_some() {
            let start = view.from.as_deref().map(parse_day).transpose()?;
            let end = view.to.as_deref().map(parse_day).transpose()?;
            Some(trends.apply(|r, s| r.set_range(s, start, end)))
        } else {
            None
        };
        if let Some(Err(e)) = outcome {
            eprintln!("warning: {}; showing the full range", e);
        }
    }

    for (feed, err) in state.failures() {
        eprintln!("{}: {}", feed, err);
    }
    Ok(state)
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Stats(args) => cmd_stats(args),
        Command::Export(args) => cmd_export(args),
        Command::Sql(args) => cmd_sql(args),
    }
}

/// Draw one chart, reporting the outcome on stderr. Returns false on failure.
fn write_chart(name: &dyn std::fmt::Display, mut chart: Chart, path: &Path) -> bool {
    match chart.render_to_file(path) {
        Ok(_) => {
            eprintln!("Wrote plot to {}", path.display());
            true
        }
        Err(e) => {
            eprintln!("{}: could not write {}: {:#}", name, path.display(), e);
            false
        }
    }
}

fn cmd_render(args: RenderArgs) -> Result<()> {
    let source = open_source(&args.source)?;
    let state = load_view(source.as_ref(), &args.view)?;
    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("create {}", args.out_dir.display()))?;

    let ext = match args.format {
        ImageFormat::Svg => "svg",
        ImageFormat::Png => "png",
    };
    let title = |feed: FeedKind| {
        if args.project.is_empty() {
            feed.title().to_string()
        } else {
            format!("{} - {}", args.project, feed.title())
        }
    };
    let base = ChartConfig {
        width: args.width,
        height: args.height,
        locale: args.locale.clone(),
        legend: match args.legend {
            LegendArg::Bottom => LegendMode::Bottom,
            LegendArg::Right => LegendMode::Right,
        },
        ..Default::default()
    };
    let path_for = |feed: FeedKind| args.out_dir.join(format!("{}.{}", feed.chart_name(), ext));
    let mut failed = 0;

    if let Some(trends) = state.trends.data() {
        let label = if args.project.is_empty() { "downloads" } else { args.project.as_str() };
        let config = ChartConfig {
            title: title(FeedKind::Trends),
            x_range: trends.range.map(|r| r.current),
            ..base.clone()
        };
        let chart = Chart::line(config, vec![Dataset::new(label, trends.visible())]);
        if !write_chart(&FeedKind::Trends, chart, &path_for(FeedKind::Trends)) {
            failed += 1;
        }
    }

    match state.versions.data() {
        Some(VersionView::Hidden) => {
            eprintln!("versions: fewer than two versions, comparison skipped")
        }
        Some(view) => {
            let datasets: Vec<Dataset> = view.datasets().into_iter().map(Dataset::from).collect();
            if datasets.is_empty() {
                eprintln!("versions: no version selected");
            } else {
                let config = ChartConfig {
                    title: title(FeedKind::Versions),
                    ..base.clone()
                };
                let chart = Chart::line(config, datasets);
                if !write_chart(&FeedKind::Versions, chart, &path_for(FeedKind::Versions)) {
                    failed += 1;
                }
            }
        }
        None => {}
    }

    for (feed, slices) in [
        (FeedKind::Installer, state.installer.data()),
        (FeedKind::Country, state.country.data()),
    ] {
        if let Some(slices) = slices {
            let config = ChartConfig {
                title: title(feed),
                ..base.clone()
            };
            if !write_chart(&feed, Chart::pie(config, slices.clone()), &path_for(feed)) {
                failed += 1;
            }
        }
    }

    for kind in BadgeKind::ALL {
        let count = match badge::load_count(source.as_ref(), kind) {
            Ok(count) => count,
            // Counter files are optional.
            Err(BadgeError::Load(e)) => {
                info!("{}: {}", kind, e);
                continue;
            }
            Err(e) => {
                eprintln!("{}: {}", kind, e);
                failed += 1;
                continue;
            }
        };
        match badge::save_badge(&args.out_dir, kind, count) {
            Ok(path) => eprintln!("Badge saved: {}", path.display()),
            Err(e) => {
                eprintln!("{}: {:#}", kind, e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{} output(s) could not be written", failed);
    }
    Ok(())
}

fn fmt_opt(v: Option<f64>) -> String {
    match v {
        Some(x) if x.is_finite() => {
            let s = format!("{:.2}", x);
            s.trim_end_matches('0').trim_end_matches('.').to_string()
        }
        _ => "NA".to_string(),
    }
}

fn cmd_stats(args: StatsArgs) -> Result<()> {
    let source = open_source(&args.source)?;
    let state = load_view(source.as_ref(), &args.view)?;

    let mut groups: Vec<(String, Vec<pypi_charts::Point>)> = Vec::new();
    if let Some(trends) = state.trends.data() {
        groups.push(("all versions".to_string(), trends.visible()));
    }
    if let Some(view) = state.versions.data() {
        groups.extend(view.datasets());
    }
    let summaries = stats::grouped_summary(&groups);
    if let Some(path) = args.out.as_ref() {
        storage::save_json(&summaries, path)?;
        eprintln!("Saved summaries to {}", path.display());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }
    for s in summaries {
        println!(
            "{}  days={} total={} min={} max={} mean={} median={}  latest={} ({})",
            s.key,
            s.count,
            stats::format_compact(s.total),
            s.min.map(|v| v.to_string()).unwrap_or_else(|| "NA".into()),
            s.max.map(|v| v.to_string()).unwrap_or_else(|| "NA".into()),
            fmt_opt(s.mean),
            fmt_opt(s.median),
            s.latest.map(|v| v.to_string()).unwrap_or_else(|| "NA".into()),
            pypi_charts::series::format_change(s.latest_change),
        );
    }
    for (feed, slices) in [
        (FeedKind::Installer, state.installer.data()),
        (FeedKind::Country, state.country.data()),
    ] {
        if let Some(slices) = slices {
            println!(
                "{}: total={}",
                feed,
                stats::format_compact(stats::share_total(slices))
            );
            for s in slices {
                println!("  {:<24} {:>12} {:>6.2}%", s.label, s.count, s.percentage);
            }
        }
    }
    Ok(())
}

fn cmd_export(args: ExportArgs) -> Result<()> {
    let feed = FeedKind::parse(&args.feed)
        .ok_or_else(|| anyhow::anyhow!("unknown feed `{}`", args.feed))?;
    let source = open_source(&args.source)?;
    let view = ViewArgs {
        feeds: Some(feed.to_string()),
        ..args.view
    };
    let state = load_view(source.as_ref(), &view)?;

    let export = FeedExport::from_state(&state, feed);
    let data = export.as_data();

    if let Some(n) = args.preview {
        let text = storage::to_csv_string(&data)?;
        println!("{}", storage::preview(&text, n));
        return Ok(());
    }
    if let Some(dir) = args.snapshot_dir.as_ref() {
        let path = storage::save_snapshot(dir, &data, Utc::now())?;
        eprintln!("Saved snapshot to {}", path.display());
        return Ok(());
    }
    match args.out.as_ref() {
        Some(path) => {
            storage::save_csv(&data, path)?;
            eprintln!("Saved {} to {}", feed, path.display());
        }
        None => print!("{}", storage::to_csv_string(&data)?),
    }
    Ok(())
}

fn cmd_sql(args: SqlArgs) -> Result<()> {
    if let Some(template_path) = args.template.as_ref() {
        let project = args
            .project
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("--project is required with --template"))?;
        let template = std::fs::read_to_string(template_path)
            .with_context(|| format!("read {}", template_path.display()))?;
        let vars = QueryVars {
            version_filter: args.version_filter.clone(),
            ..QueryVars::new(project, args.time_range)
        };
        println!("{}", query::render(&template, &vars));
        return Ok(());
    }

    let Some(jobs_path) = args.jobs.as_ref() else {
        bail!("either --jobs or --template is required");
    };
    let config = JobsConfig::load(jobs_path)?;
    if args.list || args.job.is_none() {
        for job in config.flatten() {
            println!("{}  ({})", job.name, job.spec.sql.display());
        }
        return Ok(());
    }
    let name = args.job.as_deref().unwrap_or_default();
    let job = config.find(name)?;
    let base = jobs_path.parent().map(PathBuf::from).unwrap_or_default();
    let sql_path = base.join(&job.spec.sql);
    let template = std::fs::read_to_string(&sql_path)
        .with_context(|| format!("read {}", sql_path.display()))?;
    println!("{}", query::render(&template, &job.spec.vars));
    Ok(())
}
