use chrono::{TimeZone, Utc};
use pypi_charts::loader::{self, DirSource};
use pypi_charts::models::{FeedKind, ShareSlice};
use pypi_charts::series::{build_category_series, build_series, parse_date};
use pypi_charts::storage::{self, ExportData, ExportError};
use pypi_charts::{Point, stats};
use std::fs;

fn pt(date: &str, value: i64) -> Point {
    Point {
        timestamp: parse_date(date).unwrap(),
        value,
    }
}

#[test]
fn exported_trends_load_back_to_the_same_points() {
    let series = vec![pt("2024-01-01", 10), pt("2024-01-02", 12), pt("2024-01-03", 9)];
    let text = storage::to_csv_string(&ExportData::Trends(&series)).unwrap();
    assert!(text.starts_with("download_date,daily_downloads\n"));

    let parsed = loader::parse_csv(&text);
    assert_eq!(parsed.dropped, 0);
    let built = build_series(&parsed.rows, "download_date", "daily_downloads");
    assert_eq!(built.value, series);
}

#[test]
fn exported_versions_keep_one_row_per_point() {
    let groups = vec![
        ("2.0".to_string(), vec![pt("2024-01-01", 5), pt("2024-01-02", 6)]),
        ("1.9".to_string(), vec![pt("2024-01-01", 3)]),
    ];
    let text = storage::to_csv_string(&ExportData::Versions(&groups)).unwrap();
    assert_eq!(text.lines().count(), 4);
    assert!(text.contains("2024-01-02,2.0,6"));

    let parsed = loader::parse_csv(&text);
    let built = build_category_series(&parsed.rows, "version", "download_date", "daily_downloads");
    assert_eq!(built.value.keys().collect::<Vec<_>>(), vec!["2.0", "1.9"]);
    assert_eq!(built.value.get("2.0").unwrap(), &groups[0].1);
}

#[test]
fn empty_export_is_rejected() {
    assert!(matches!(
        storage::to_csv_string(&ExportData::Versions(&[])),
        Err(ExportError::NoData)
    ));
    assert!(matches!(
        storage::to_csv_string(&ExportData::Shares(FeedKind::Country, &[])),
        Err(ExportError::NoData)
    ));
}

#[test]
fn preview_shows_header_and_first_rows() {
    let series: Vec<Point> = (1..=9).map(|d| pt(&format!("2024-01-0{}", d), d)).collect();
    let text = storage::to_csv_string(&ExportData::Trends(&series)).unwrap();
    let p = storage::preview(&text, 3);
    assert_eq!(
        p,
        "download_date,daily_downloads\n2024-01-01,1\n2024-01-02,2\n2024-01-03,3"
    );
}

#[test]
fn snapshot_writes_timestamped_and_latest_files() {
    let dir = tempfile::tempdir().unwrap();
    let slices = vec![
        ShareSlice {
            label: "US".into(),
            count: 60,
            percentage: 60.0,
        },
        ShareSlice {
            label: "DE".into(),
            count: 40,
            percentage: 40.0,
        },
    ];
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();
    let path = storage::save_snapshot(
        dir.path(),
        &ExportData::Shares(FeedKind::Country, &slices),
        now,
    )
    .unwrap();
    assert_eq!(
        path.file_name().unwrap().to_str().unwrap(),
        "download_by_country_30d_20240501_083000.csv"
    );
    let latest = dir.path().join("download_by_country_30d_latest.csv");
    assert_eq!(fs::read_to_string(&path).unwrap(), fs::read_to_string(&latest).unwrap());

    // The snapshot directory is itself a loadable source.
    let feed = loader::load_feed(&DirSource::new(dir.path()), FeedKind::Country).unwrap();
    assert_eq!(feed.source_name, "download_by_country_30d_latest.csv");
    assert_eq!(feed.rows.len(), 2);
}

#[test]
fn summaries_save_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let groups = vec![(
        "2.0".to_string(),
        vec![pt("2024-01-01", 100), pt("2024-01-02", 150)],
    )];
    let summaries = stats::grouped_summary(&groups);
    assert_eq!(summaries[0].total, 250);
    assert_eq!(summaries[0].latest_change, Some(50.0));

    let path = dir.path().join("summary.json");
    storage::save_json(&summaries, &path).unwrap();
    let v: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(v[0]["key"], "2.0");
    assert_eq!(v[0]["median"], 125.0);
}

#[test]
fn feed_export_follows_the_current_view() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("download_by_date_latest.csv"),
        "download_date,daily_downloads\n2024-01-01,1\n2024-01-02,2\n2024-01-03,3\n",
    )
    .unwrap();
    let mut state = pypi_charts::AppState::load(
        &DirSource::new(dir.path()),
        &[FeedKind::Trends, FeedKind::Country],
    );
    let trends = state.trends.data_mut().unwrap();
    let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 2);
    let end = chrono::NaiveDate::from_ymd_opt(2024, 1, 3);
    trends.apply(|r, s| r.set_range(s, start, end)).unwrap();

    let export = storage::FeedExport::from_state(&state, FeedKind::Trends);
    let text = storage::to_csv_string(&export.as_data()).unwrap();
    assert_eq!(text, "download_date,daily_downloads\n2024-01-02,2\n2024-01-03,3\n");

    let country = storage::FeedExport::from_state(&state, FeedKind::Country);
    assert!(country.as_data().is_empty());
    assert!(matches!(
        storage::save_snapshot(dir.path(), &country.as_data(), Utc::now()),
        Err(ExportError::NoData)
    ));
}
