//! Product ingest and job submission.
//!
//! Submission failures are per-item, not per-run: the outcome is returned
//! to the caller instead of raised, distinguishing retryable failures
//! (rate limiting, server errors, transport) from terminal ones (any
//! other client error). A failed product submission leaves the product
//! directory on disk as evidence for manual recovery; only a successful
//! submission removes it.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::{json, Value};
use tracing::{error, info};

/// Outcome of one submission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Submitted,
    Failed { retryable: bool },
}

impl SubmitOutcome {
    pub fn is_submitted(self) -> bool {
        self == SubmitOutcome::Submitted
    }
}

pub struct Submitter {
    http: reqwest::Client,
    ingest_url: String,
    job_submit_url: String,
}

impl Submitter {
    pub fn new(ingest_url: &str, job_submit_url: &str, timeout_secs: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            http,
            ingest_url: ingest_url.to_string(),
            job_submit_url: job_submit_url.to_string(),
        })
    }

    /// Submit a written product directory for ingest.
    ///
    /// On success the directory is removed, which makes the write+submit
    /// pair idempotent. On failure the directory stays where it is and
    /// the failure is logged.
    pub async fn submit_product(&self, dir: &Path, label: &str) -> SubmitOutcome {
        let payload = match read_product_dir(dir, label) {
            Ok(p) => p,
            Err(err) => {
                error!(product = label, "failed to read product directory: {err:#}");
                return SubmitOutcome::Failed { retryable: false };
            }
        };
        let outcome = self.post(&self.ingest_url, &payload).await;
        match outcome {
            SubmitOutcome::Submitted => {
                info!(product = label, "submitted product");
                if let Err(err) = std::fs::remove_dir_all(dir) {
                    error!(product = label, "failed to clean product directory: {err}");
                }
            }
            SubmitOutcome::Failed { retryable } => {
                error!(
                    product = label,
                    retryable, "submission failed; directory left on disk for manual recovery"
                );
            }
        }
        outcome
    }

    /// Submit a job request to the job-submission endpoint.
    pub async fn submit_job(
        &self,
        job_name: &str,
        version: &str,
        queue: &str,
        priority: i64,
        tags: &str,
        params: Value,
    ) -> SubmitOutcome {
        let payload = json!({
            "type": format!("{job_name}:{version}"),
            "queue": queue,
            "priority": priority,
            "tags": [tags],
            "params": params,
            "enable_dedup": false,
        });
        let outcome = self.post(&self.job_submit_url, &payload).await;
        match outcome {
            SubmitOutcome::Submitted => info!(job = job_name, queue, "submitted job"),
            SubmitOutcome::Failed { retryable } => {
                error!(job = job_name, retryable, "job submission failed");
            }
        }
        outcome
    }

    async fn post(&self, url: &str, payload: &Value) -> SubmitOutcome {
        match self.http.post(url).json(payload).send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    SubmitOutcome::Submitted
                } else {
                    // 429 and 5xx are worth a later retry; other 4xx are not.
                    let retryable = status.as_u16() == 429 || status.is_server_error();
                    error!(%status, url, "submission endpoint rejected request");
                    SubmitOutcome::Failed { retryable }
                }
            }
            Err(err) => {
                error!(url, "submission transport error: {err}");
                SubmitOutcome::Failed { retryable: true }
            }
        }
    }
}

fn read_product_dir(dir: &Path, label: &str) -> Result<Value> {
    let dataset_path = dir.join(format!("{label}.dataset.json"));
    let metadata_path = dir.join(format!("{label}.met.json"));
    let dataset: Value = serde_json::from_str(
        &std::fs::read_to_string(&dataset_path)
            .with_context(|| format!("reading {}", dataset_path.display()))?,
    )?;
    let metadata: Value = serde_json::from_str(
        &std::fs::read_to_string(&metadata_path)
            .with_context(|| format!("reading {}", metadata_path.display()))?,
    )?;
    Ok(json!({
        "label": label,
        "dataset": dataset,
        "metadata": metadata,
    }))
}
