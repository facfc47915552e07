pub mod dates;

#[cfg(test)]
mod config_test;

use crate::{catalog::QueryParams, size::deserialize_bytes};
use chrono::NaiveDate;
use dates::{local_today, DateSpec};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{debug, error};

#[derive(Error, Debug)]
pub enum ConfigErrors {
    #[error("Failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Config file could not be parsed: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Config failed preflight checks, see the errors above")]
    PreflightFailed,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    pub dates: DatesConfig,
    // free-form keyword filters, joined into one search term ordered by key
    #[serde(default)]
    pub query: BTreeMap<String, serde_yaml::Value>,
    pub process_configs: ProcessConfig,
    pub directory: DirectoryConfig,
    pub files: FilesConfig,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct DatesConfig {
    pub start: DateSpec,
    pub end: DateSpec,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct ProcessConfig {
    // scheduler mode when true, local run otherwise
    #[serde(default)]
    pub on_chtc: bool,
    pub cpu_per_node: u32,
    pub max_cpu_request: u32,
    pub minimum_submissions_for_balancing: usize,
    // estimated bytes a single node may hold, integer bytes or e.g. "400GB"
    #[serde(deserialize_with = "deserialize_bytes")]
    pub disk_ceiling_per_node: u64,
    #[serde(default)]
    pub max_nodes: Option<usize>,
    // GiB, forwarded to the scheduler unchanged
    #[serde(default)]
    pub memory_request: Option<u32>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct DirectoryConfig {
    pub output_results: PathBuf,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct FilesConfig {
    pub sra_list_folder: PathBuf,
    pub sra_query_file: PathBuf,
    pub sra_metadata_table: PathBuf,
    #[serde(default = "default_submit_manifest")]
    pub submit_manifest: PathBuf,
}

/// Immutable balancing parameters handed to the partitioner and request builder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalConfig {
    pub cpu_per_node: u32,
    pub max_cpu_request: u32,
    pub minimum_submissions_for_balancing: usize,
    pub disk_ceiling_per_node: u64,
    pub max_nodes: Option<usize>,
    pub memory_request: Option<u32>,
}

impl GlobalConfig {
    /// Human readable list of every violated invariant
    pub fn violations(&self) -> Vec<String> {
        let mut violations = Vec::new();

        if self.cpu_per_node == 0 {
            violations.push("process_configs.cpu_per_node must be at least 1".to_owned());
        }
        if self.cpu_per_node > self.max_cpu_request {
            violations.push(format!(
                "process_configs.cpu_per_node ({}) cannot exceed process_configs.max_cpu_request ({})",
                self.cpu_per_node, self.max_cpu_request
            ));
        }
        if self.minimum_submissions_for_balancing == 0 {
            violations.push(
                "process_configs.minimum_submissions_for_balancing must be at least 1".to_owned(),
            );
        }
        if self.disk_ceiling_per_node == 0 {
            violations.push("process_configs.disk_ceiling_per_node must be positive".to_owned());
        }
        if self.max_nodes == Some(0) {
            violations.push("process_configs.max_nodes must be at least 1 if set".to_owned());
        }

        violations
    }
}

impl From<&ProcessConfig> for GlobalConfig {
    fn from(process: &ProcessConfig) -> Self {
        Self {
            cpu_per_node: process.cpu_per_node,
            max_cpu_request: process.max_cpu_request,
            minimum_submissions_for_balancing: process.minimum_submissions_for_balancing,
            disk_ceiling_per_node: process.disk_ceiling_per_node,
            max_nodes: process.max_nodes,
            memory_request: process.memory_request,
        }
    }
}

impl DispatchConfig {
    /// read, parse and check a config file, nothing is queried before this succeeds
    pub fn load(path: &Path) -> Result<Self, ConfigErrors> {
        let content = fs::read_to_string(path).map_err(|source| ConfigErrors::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&content)?;

        debug!(path = ?path, "Loaded config");

        if config.preflight_checks(local_today()) {
            Err(ConfigErrors::PreflightFailed)
        } else {
            Ok(config)
        }
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigErrors> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn global(&self) -> GlobalConfig {
        GlobalConfig::from(&self.process_configs)
    }

    pub fn query_params(&self, today: NaiveDate) -> QueryParams {
        QueryParams {
            start: self.dates.start.resolve_start(today),
            end: self.dates.end.resolve_end(today),
            keywords: self
                .query
                .iter()
                .filter_map(|(key, value)| scalar_to_string(value).map(|value| (key.clone(), value)))
                .collect(),
        }
    }

    /// Log every problem at once instead of piece-by-piece, returns true if any were found
    pub fn preflight_checks(&self, today: NaiveDate) -> bool {
        let mut contains_error = false;

        for violation in self.global().violations() {
            error!("{violation}");
            contains_error = true;
        }

        let start = self.dates.start.resolve_start(today);
        let end = self.dates.end.resolve_end(today);
        if start > end {
            error!(
                "dates.start ({}) cannot be after dates.end ({})",
                self.dates.start, self.dates.end
            );
            contains_error = true;
        }

        if self.query.is_empty() {
            error!("query needs at least one keyword, an empty search would match the whole archive");
            contains_error = true;
        }
        for (key, value) in self.query.iter() {
            if scalar_to_string(value).is_none() {
                error!("query.{key} must be a string, number or boolean");
                contains_error = true;
            }
        }

        if self.files.sra_list_folder.as_os_str().is_empty() {
            error!("files.sra_list_folder cannot be empty");
            contains_error = true;
        }
        if self.files.sra_query_file.as_os_str().is_empty() {
            error!("files.sra_query_file cannot be empty");
            contains_error = true;
        }

        contains_error
    }
}

fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(value) => Some(value.clone()),
        serde_yaml::Value::Number(value) => Some(value.to_string()),
        serde_yaml::Value::Bool(value) => Some(value.to_string()),
        _ => None,
    }
}

fn default_submit_manifest() -> PathBuf {
    PathBuf::from("submit_configs.yaml")
}
