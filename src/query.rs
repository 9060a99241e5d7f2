//! Placeholder substitution for the BigQuery templates under `sql/`.
//!
//! Templates use `{{name}}` placeholders. `{{version_condition}}` is derived
//! from `version_filter`: empty or `all` means no condition.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Variables of one job, as written in the jobs file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryVars {
    pub project_name: String,
    #[serde(default = "default_time_range")]
    pub time_range: u32,
    #[serde(default)]
    pub version_filter: Option<String>,
    /// Extra placeholders, substituted verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, toml::Value>,
}

fn default_time_range() -> u32 {
    45
}

impl QueryVars {
    pub fn new(project_name: &str, time_range: u32) -> Self {
        Self {
            project_name: project_name.to_string(),
            time_range,
            ..Default::default()
        }
    }

    /// `AND file.version = '<v>'`, or empty for all versions.
    pub fn version_condition(&self) -> String {
        match self.version_filter.as_deref().map(str::trim) {
            Some(v) if !v.is_empty() && !v.eq_ignore_ascii_case("all") => {
                format!("AND file.version = '{}'", v.replace('\'', "''"))
            }
            _ => String::new(),
        }
    }

    fn substitutions(&self) -> Vec<(String, String)> {
        let mut subs = vec![
            ("project_name".to_string(), self.project_name.clone()),
            ("time_range".to_string(), self.time_range.to_string()),
            ("version_condition".to_string(), self.version_condition()),
        ];
        if let Some(v) = &self.version_filter {
            subs.push(("version_filter".to_string(), v.clone()));
        }
        for (k, v) in &self.extra {
            let text = match v {
                toml::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            subs.push((k.clone(), text));
        }
        subs
    }
}

/// Replace every known `{{name}}` in `template`. Unknown placeholders are left as is.
pub fn render(template: &str, vars: &QueryVars) -> String {
    let mut out = template.to_string();
    for (name, value) in vars.substitutions() {
        out = out.replace(&format!("{{{{{}}}}}", name), &value);
    }
    out
}
