//! TOML configuration for the `ifgr` pipelines.
//!
//! All endpoints, index patterns, and thresholds live here and are passed
//! explicitly into the pipeline entry points; there is no process-global
//! configuration object. A missing or unparsable config file is a fatal
//! startup error.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub grq: GrqConfig,
    pub jobs: JobsConfig,
    #[serde(default)]
    pub indices: IndicesConfig,
    #[serde(default)]
    pub denylist: DenylistConfig,
    pub submit: SubmitConfig,
}

/// Product search cluster.
#[derive(Debug, Deserialize, Clone)]
pub struct GrqConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Job registry (status records of processing jobs).
#[derive(Debug, Deserialize, Clone)]
pub struct JobsConfig {
    pub base_url: String,
    #[serde(default = "default_status_index")]
    pub status_index: String,
    #[serde(default = "default_job_type")]
    pub job_type: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Index patterns for the product collections.
#[derive(Debug, Deserialize, Clone)]
pub struct IndicesConfig {
    #[serde(default = "default_aoi_index")]
    pub aoi: String,
    #[serde(default = "default_acq_list_index")]
    pub acq_list: String,
    #[serde(default = "default_ifg_index")]
    pub ifg: String,
    #[serde(default = "default_blacklist_index")]
    pub blacklist: String,
    #[serde(default = "default_greylist_index")]
    pub greylist: String,
    #[serde(default = "default_acq_plan_index")]
    pub acq_plan: String,
    #[serde(default = "default_audit_trail_index")]
    pub audit_trail: String,
    #[serde(default = "default_orbit_file_index")]
    pub orbit_file: String,
}

impl Default for IndicesConfig {
    fn default() -> Self {
        Self {
            aoi: default_aoi_index(),
            acq_list: default_acq_list_index(),
            ifg: default_ifg_index(),
            blacklist: default_blacklist_index(),
            greylist: default_greylist_index(),
            acq_plan: default_acq_plan_index(),
            audit_trail: default_audit_trail_index(),
            orbit_file: default_orbit_file_index(),
        }
    }
}

/// Denylist generation settings.
#[derive(Debug, Deserialize, Clone)]
pub struct DenylistConfig {
    /// Jobs failed at least this many times become denylist candidates;
    /// zero or negative drops the retry-count filter entirely.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: i64,
    /// Version stamp written into generated products.
    #[serde(default = "default_product_version")]
    pub product_version: String,
    /// Directory product drafts are written under before submission.
    #[serde(default = "default_work_dir")]
    pub work_dir: String,
}

impl Default for DenylistConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            product_version: default_product_version(),
            work_dir: default_work_dir(),
        }
    }
}

/// Product ingest and job submission endpoints.
#[derive(Debug, Deserialize, Clone)]
pub struct SubmitConfig {
    pub ingest_url: String,
    pub job_submit_url: String,
    #[serde(default = "default_enumerator_queue")]
    pub enumerator_queue: String,
    #[serde(default = "default_enumeration_job_version")]
    pub enumeration_job_version: String,
}

fn default_timeout_secs() -> u64 {
    60
}
fn default_status_index() -> String {
    "job_status-current".to_string()
}
fn default_job_type() -> String {
    "job-sciflo-s1-ifg".to_string()
}
fn default_aoi_index() -> String {
    "grq_*_area_of_interest".to_string()
}
fn default_acq_list_index() -> String {
    "grq_*_acq-list".to_string()
}
fn default_ifg_index() -> String {
    "grq_*_s1-ifg".to_string()
}
fn default_blacklist_index() -> String {
    "grq_*_ifg-blacklist".to_string()
}
fn default_greylist_index() -> String {
    "grq_*_s1-gunw-greylist".to_string()
}
fn default_acq_plan_index() -> String {
    "grq_*_ifg-cfg".to_string()
}
fn default_audit_trail_index() -> String {
    "grq_*_s1-gunw-acqlist-audit_trail".to_string()
}
fn default_orbit_file_index() -> String {
    "grq_*_s1-aux_poeorb".to_string()
}
fn default_failure_threshold() -> i64 {
    3
}
fn default_product_version() -> String {
    "v1.0".to_string()
}
fn default_work_dir() -> String {
    ".".to_string()
}
fn default_enumerator_queue() -> String {
    "standard_product-s1gunw-acq_enumerator".to_string()
}
fn default_enumeration_job_version() -> String {
    "master".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.grq.base_url.trim().is_empty() {
        anyhow::bail!("grq.base_url must be set");
    }
    if config.jobs.base_url.trim().is_empty() {
        anyhow::bail!("jobs.base_url must be set");
    }
    if config.grq.timeout_secs == 0 || config.jobs.timeout_secs == 0 {
        anyhow::bail!("timeout_secs must be > 0");
    }
    if config.submit.ingest_url.trim().is_empty() {
        anyhow::bail!("submit.ingest_url must be set");
    }

    Ok(config)
}
