use pypi_charts::config::{ConfigError, JobsConfig};
use pypi_charts::query::{self, QueryVars};
use std::path::PathBuf;

const JOBS: &str = r#"
[jobs.requests.download_by_date]
sql = "sql/download_by_date.sql"
vars = { project_name = "requests", time_range = 180 }

[jobs.requests.installer_stats_30d]
sql = "sql/installer_stats_30d.sql"
vars = { project_name = "requests", version_filter = "2.31.0", dataset = "bigquery-public-data.pypi.file_downloads" }

[jobs.httpx.download_by_date]
sql = "sql/download_by_date.sql"
vars = { project_name = "httpx" }
"#;

#[test]
fn jobs_are_flattened_as_package_dot_type() {
    let cfg = JobsConfig::from_toml(JOBS).unwrap();
    let names: Vec<String> = cfg.flatten().into_iter().map(|j| j.name).collect();
    assert_eq!(
        names,
        vec![
            "httpx.download_by_date",
            "requests.download_by_date",
            "requests.installer_stats_30d",
        ]
    );
}

#[test]
fn missing_time_range_defaults_to_45_days() {
    let cfg = JobsConfig::from_toml(JOBS).unwrap();
    let job = cfg.find("httpx.download_by_date").unwrap();
    assert_eq!(job.package, "httpx");
    assert_eq!(job.job_type, "download_by_date");
    assert_eq!(job.spec.vars.time_range, 45);
    assert_eq!(job.spec.sql, PathBuf::from("sql/download_by_date.sql"));
}

#[test]
fn unknown_job_is_reported() {
    let cfg = JobsConfig::from_toml(JOBS).unwrap();
    let err = cfg.find("requests.nope").unwrap_err();
    assert!(matches!(err, ConfigError::UnknownJob(ref n) if n == "requests.nope"));
}

#[test]
fn malformed_jobs_file_is_a_parse_error() {
    assert!(matches!(
        JobsConfig::from_toml("[jobs.requests.x]\nsql = 3\n"),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn missing_jobs_file_names_the_path() {
    let err = JobsConfig::load("/definitely/not/here/jobs.toml").unwrap_err();
    assert!(err.to_string().contains("/definitely/not/here/jobs.toml"));
}

#[test]
fn job_vars_render_into_template() {
    let cfg = JobsConfig::from_toml(JOBS).unwrap();
    let job = cfg.find("requests.installer_stats_30d").unwrap();
    let sql = query::render(
        "FROM `{{dataset}}` WHERE file.project = '{{project_name}}' {{version_condition}}",
        &job.spec.vars,
    );
    assert_eq!(
        sql,
        "FROM `bigquery-public-data.pypi.file_downloads` WHERE file.project = 'requests' AND file.version = '2.31.0'"
    );
}

#[test]
fn quotes_in_version_filter_are_escaped() {
    let vars = QueryVars {
        version_filter: Some("1.0' OR '1'='1".into()),
        ..QueryVars::new("requests", 30)
    };
    assert_eq!(
        vars.version_condition(),
        "AND file.version = '1.0'' OR ''1''=''1'"
    );
}

#[test]
fn bundled_templates_have_no_unresolved_placeholders() {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let cfg = JobsConfig::load(root.join("jobs.toml")).unwrap();
    assert!(!cfg.flatten().is_empty());
    for job in cfg.flatten() {
        let template = std::fs::read_to_string(root.join(&job.spec.sql)).unwrap();
        let sql = query::render(&template, &job.spec.vars);
        assert!(!sql.contains("{{"), "{} left placeholders", job.name);
        assert!(sql.contains(&job.spec.vars.project_name));
    }
}
