//! Jobs file: which templates to render for which packages.
//!
//! ```toml
//! [jobs.requests.download_by_date]
//! sql = "sql/download_by_date.sql"
//! vars = { project_name = "requests", time_range = 45 }
//! ```
use crate::query::QueryVars;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read {}: {}", .path.display(), .source)]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parse jobs file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("unknown job `{0}`")]
    UnknownJob(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    /// Path of the SQL template, relative to the jobs file.
    pub sql: PathBuf,
    pub vars: QueryVars,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobsConfig {
    /// package -> job type -> job
    #[serde(default)]
    pub jobs: BTreeMap<String, BTreeMap<String, JobSpec>>,
}

/// A job with its `<package>.<job_type>` name.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub name: String,
    pub package: String,
    pub job_type: String,
    pub spec: JobSpec,
}

impl JobsConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// All jobs sorted by package then job type.
    pub fn flatten(&self) -> Vec<Job> {
        let mut out = Vec::new();
        for (package, jobs) in &self.jobs {
            for (job_type, spec) in jobs {
                out.push(Job {
                    name: format!("{}.{}", package, job_type),
                    package: package.clone(),
                    job_type: job_type.clone(),
                    spec: spec.clone(),
                });
            }
        }
        out
    }

    pub fn find(&self, name: &str) -> Result<Job, ConfigError> {
        self.flatten()
            .into_iter()
            .find(|j| j.name == name)
            .ok_or_else(|| ConfigError::UnknownJob(name.to_string()))
    }
}
