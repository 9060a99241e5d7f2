use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;

fn write_project(dir: &Path) {
    fs::write(
        dir.join("download_by_date_latest.csv"),
        "download_date,daily_downloads\n2024-01-01,100\n2024-01-02,125\n2024-01-03,90\n",
    )
    .unwrap();
    fs::write(
        dir.join("download_by_date_all_versions_latest.csv"),
        "download_date,version,daily_downloads\n\
         2024-01-01,2.0,60\n2024-01-01,1.9,40\n\
         2024-01-02,2.0,80\n2024-01-02,1.9,45\n",
    )
    .unwrap();
    fs::write(
        dir.join("installer_stats_30d_latest.csv"),
        "installer_name,download_count,percentage\npip,300,75.00\nuv,100,25.00\n",
    )
    .unwrap();
}

#[test]
fn cli_shows_help() {
    let mut cmd = Command::cargo_bin("pypi-charts").unwrap();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("pypi-charts"));
}

#[test]
fn render_writes_charts_and_reports_missing_feed() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_project(data.path());

    let mut cmd = Command::cargo_bin("pypi-charts").unwrap();
    cmd.args(["render", "--project", "requests", "--data"])
        .arg(data.path())
        .arg("--out-dir")
        .arg(out.path());
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("country"));

    for name in ["download-trends", "version-comparison", "installer-stats-pie"] {
        let p = out.path().join(format!("{}.svg", name));
        assert!(p.exists(), "{} missing", p.display());
    }
    assert!(!out.path().join("country-stats-pie.svg").exists());
}

#[test]
fn render_keeps_going_after_one_chart_fails() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_project(data.path());
    fs::write(
        data.path().join("download_by_date_all_versions_latest.csv"),
        "download_date,version,daily_downloads\nbad,2.0,60\nbad,1.9,40\n",
    )
    .unwrap();
    // A directory in the way of the trends chart.
    fs::create_dir(out.path().join("download-trends.svg")).unwrap();

    let mut cmd = Command::cargo_bin("pypi-charts").unwrap();
    cmd.arg("render")
        .arg("--data")
        .arg(data.path())
        .arg("--out-dir")
        .arg(out.path());
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("trends: could not write"))
        .stderr(predicate::str::contains("versions: "))
        .stderr(predicate::str::contains("1 output(s) could not be written"));

    assert!(out.path().join("installer-stats-pie.svg").exists());
    assert!(!out.path().join("version-comparison.svg").exists());
}

#[test]
fn render_writes_counter_badges() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_project(data.path());
    fs::write(
        data.path().join("total_downloads_latest.csv"),
        "total_downloads\n1234567\n",
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("pypi-charts").unwrap();
    cmd.args(["render", "--feeds", "trends", "--data"])
        .arg(data.path())
        .arg("--out-dir")
        .arg(out.path());
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Badge saved"));

    let svg = fs::read_to_string(out.path().join("pypi-downloads-badge.svg")).unwrap();
    assert!(svg.contains("PyPI Downloads"));
    assert!(svg.contains("1.2M"));
    let raw = fs::read_to_string(out.path().join("total_downloads.txt")).unwrap();
    assert_eq!(raw, "1234567");
    assert!(!out.path().join("downloads-(30d)-badge.svg").exists());
}

#[test]
fn invalid_range_keeps_full_range() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_project(data.path());

    let mut cmd = Command::cargo_bin("pypi-charts").unwrap();
    cmd.args(["render", "--feeds", "trends", "--from", "2024-01-03", "--to", "2024-01-01"])
        .arg("--data")
        .arg(data.path())
        .arg("--out-dir")
        .arg(out.path());
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("invalid range"));
    assert!(out.path().join("download-trends.svg").exists());
}

#[test]
fn stats_prints_totals_and_change() {
    let data = tempfile::tempdir().unwrap();
    write_project(data.path());

    let mut cmd = Command::cargo_bin("pypi-charts").unwrap();
    cmd.args(["stats", "--feeds", "trends,installer", "--data"])
        .arg(data.path());
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("total=315"))
        .stdout(predicate::str::contains("-28.0%"))
        .stdout(predicate::str::contains("pip"));
}

#[test]
fn export_preview_prints_head() {
    let data = tempfile::tempdir().unwrap();
    write_project(data.path());

    let mut cmd = Command::cargo_bin("pypi-charts").unwrap();
    cmd.args(["export", "--feed", "versions", "--all-versions", "--preview", "2", "--data"])
        .arg(data.path());
    cmd.assert().success().stdout(predicate::str::diff(
        "download_date,version,daily_downloads\n2024-01-01,2.0,60\n2024-01-02,2.0,80\n",
    ));
}

#[test]
fn export_snapshot_without_data_fails() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    let mut cmd = Command::cargo_bin("pypi-charts").unwrap();
    cmd.args(["export", "--feed", "country", "--data"])
        .arg(data.path())
        .arg("--snapshot-dir")
        .arg(out.path());
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("no data loaded to export"));
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn sql_renders_bundled_job() {
    let jobs = Path::new(env!("CARGO_MANIFEST_DIR")).join("jobs.toml");
    let mut cmd = Command::cargo_bin("pypi-charts").unwrap();
    cmd.args(["sql", "--jobs"])
        .arg(&jobs)
        .args(["--job", "requests.download_by_date"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("file.project = 'requests'"))
        .stdout(predicate::str::contains("INTERVAL 180 DAY"));
}
