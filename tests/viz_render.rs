use pypi_charts::models::{ShareSlice, TimeRange};
use pypi_charts::series::parse_date;
use pypi_charts::viz::{self, Chart, ChartConfig, ChartKind, Dataset, LegendMode, RenderPhase};
use pypi_charts::Point;
use std::fs;

fn series(start: &str, values: &[i64]) -> Vec<Point> {
    let t0 = parse_date(start).unwrap();
    values
        .iter()
        .enumerate()
        .map(|(i, v)| Point {
            timestamp: t0 + i as i64 * 86_400_000,
            value: *v,
        })
        .collect()
}

fn versions() -> Vec<Dataset> {
    vec![
        Dataset::new("2.0", series("2024-01-01", &[30, 40, 50])),
        Dataset::new("1.9", series("2024-01-01", &[10, 10, 0])),
    ]
}

#[test]
fn line_chart_renders_svg_and_png() {
    let dir = tempfile::tempdir().unwrap();
    let svg = dir.path().join("version-comparison.svg");
    let png = dir.path().join("version-comparison.png");
    let config = ChartConfig {
        title: "requests - Daily Downloads by Version".into(),
        ..Default::default()
    };

    viz::plot_lines(versions(), &svg, config.clone()).unwrap();
    viz::plot_lines(versions(), &png, config).unwrap();

    let text = fs::read_to_string(&svg).unwrap();
    assert!(text.starts_with("<svg"));
    assert!(text.contains("Daily Downloads by Version"));
    assert!(fs::metadata(&png).unwrap().len() > 0);
}

#[test]
fn replacing_datasets_is_an_update() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("trend.svg");
    let mut chart = Chart::line(
        ChartConfig {
            legend: LegendMode::Right,
            ..Default::default()
        },
        versions(),
    );
    assert_eq!(chart.kind(), ChartKind::Line);
    assert_eq!(chart.render_to_file(&out).unwrap(), RenderPhase::Initial);

    chart.replace_datasets(vec![Dataset::new("2.0", series("2024-01-02", &[7, 8]))]);
    assert_eq!(chart.config.legend, LegendMode::Right);
    assert_eq!(chart.render_to_file(&out).unwrap(), RenderPhase::Update);
    assert_eq!(chart.datasets().len(), 1);
}

#[test]
fn fixed_window_limits_the_axis() {
    let mut chart = Chart::line(ChartConfig::default(), versions());
    let min = parse_date("2024-01-02").unwrap();
    let max = parse_date("2024-01-03").unwrap();
    chart.set_x_range(Some(TimeRange { min, max }));
    assert_eq!(chart.x_extent(), Some(TimeRange { min, max }));
    let svg = chart.render_svg_string().unwrap();
    assert!(svg.contains("Jan 02, 2024"));
}

#[test]
fn empty_chart_is_an_error() {
    let mut chart = Chart::line(ChartConfig::default(), vec![]);
    assert!(chart.render_svg_string().is_err());
    let mut pie = Chart::pie(ChartConfig::default(), vec![]);
    assert!(pie.render_svg_string().is_err());
}

#[test]
fn rgb_buffer_must_fit_the_chart() {
    let mut chart = Chart::line(
        ChartConfig {
            width: 320,
            height: 200,
            ..Default::default()
        },
        versions(),
    );
    let mut small = vec![0u8; 10];
    assert!(chart.render_rgb(&mut small).is_err());
    let mut buf = vec![0u8; 320 * 200 * 3];
    assert_eq!(chart.render_rgb(&mut buf).unwrap(), RenderPhase::Initial);
    // Background is painted white.
    assert_eq!(&buf[..3], &[255, 255, 255]);
}

#[test]
fn pie_chart_renders_footer_and_legend() {
    let slices = vec![
        ShareSlice {
            label: "pip".into(),
            count: 7_000,
            percentage: 70.0,
        },
        ShareSlice {
            label: "uv".into(),
            count: 2_990,
            percentage: 29.9,
        },
        ShareSlice {
            label: "bandersnatch".into(),
            count: 10,
            percentage: 0.1,
        },
    ];
    let mut chart = Chart::pie(
        ChartConfig {
            title: "Recent 30 Days Installer Statistics".into(),
            ..Default::default()
        },
        slices,
    );
    assert_eq!(chart.kind(), ChartKind::Pie);
    let svg = chart.render_svg_string().unwrap();
    assert!(svg.contains("Total Downloads: 10,000"));
    assert!(svg.contains("pip (70.0% - 7,000)"));
    // Too small to draw, but still listed.
    assert!(svg.contains("bandersnatch"));
}

#[test]
fn tooltip_sums_categories_at_a_date() {
    let chart = Chart::line(ChartConfig::default(), versions());
    let ts = parse_date("2024-01-01").unwrap();
    let tip = chart.tooltip_at(ts);
    assert_eq!(tip.total, 40);
    assert_eq!(tip.entries.len(), 2);
    assert_eq!(tip.entries[0].share, 75.0);
    assert_eq!(tip.lines().last().unwrap(), "Total: 40");

    let near = viz::nearest_timestamp(chart.datasets(), ts + 3 * 3_600_000);
    assert_eq!(near, Some(ts));
}

#[test]
fn tooltip_with_zero_total_has_zero_shares() {
    let datasets = vec![
        Dataset::new("a", series("2024-01-01", &[0])),
        Dataset::new("b", series("2024-01-01", &[0])),
    ];
    let tip = viz::tooltip_at(&datasets, parse_date("2024-01-01").unwrap());
    assert_eq!(tip.total, 0);
    assert!(tip.entries.iter().all(|e| e.share == 0.0));
}
