//! Denylist generation pipeline.
//!
//! Reconciles the acquisition plans against produced interferograms and
//! the existing denylist, confirms which missing pairings belong to
//! terminally failed jobs, and writes/submits a denylist product for each
//! confirmed candidate. Query failures abort the run; per-candidate
//! build or submission failures are logged and the run continues.

use std::path::Path;

use anyhow::Result;
use tracing::{info, warn};

use crate::classify::{classify, existing_by_fingerprint, failed_jobs};
use crate::config::Config;
use crate::fingerprint::product_fingerprint;
use crate::product::{build_draft, write_draft, ExclusionKind};
use crate::query::{match_all_query, GrqClient};
use crate::reconcile::{missing, FingerprintIndex};
use crate::submit::Submitter;

/// Counters for one denylist run.
#[derive(Debug, Default)]
pub struct DenylistSummary {
    pub plans: usize,
    pub produced: usize,
    pub excluded: usize,
    pub missing: usize,
    pub candidates: usize,
    pub duplicates: u64,
    pub submitted: u64,
    pub failed: u64,
}

pub async fn run_denylist(config: &Config) -> Result<DenylistSummary> {
    let grq = GrqClient::new(&config.grq.base_url, config.grq.timeout_secs)?;
    let registry = GrqClient::new(&config.jobs.base_url, config.jobs.timeout_secs)?;
    let submitter = Submitter::new(
        &config.submit.ingest_url,
        &config.submit.job_submit_url,
        config.grq.timeout_secs,
    )?;

    let plans = grq
        .search_products(&config.indices.acq_plan, match_all_query())
        .await?;
    let ifgs = grq
        .search_products(&config.indices.ifg, match_all_query())
        .await?;
    let denylisted = grq
        .search_products(&config.indices.blacklist, match_all_query())
        .await?;
    info!(
        plans = plans.len(),
        ifgs = ifgs.len(),
        denylisted = denylisted.len(),
        "collections fetched"
    );

    let produced = FingerprintIndex::build(&ifgs)?;
    let excluded = FingerprintIndex::build(&denylisted)?;
    let missing_plans = missing(&plans, &produced, &excluded)?;
    info!(missing = missing_plans.len(), "missing interferograms");

    let failures = failed_jobs(
        &registry,
        &config.jobs.status_index,
        &config.jobs.job_type,
        config.denylist.failure_threshold,
    )
    .await?;
    let candidates = classify(&missing_plans, &failures)?;
    info!(
        candidates = candidates.len(),
        threshold = config.denylist.failure_threshold,
        "terminally failed pairings"
    );

    let mut summary = DenylistSummary {
        plans: plans.len(),
        produced: produced.len(),
        excluded: excluded.len(),
        missing: missing_plans.len(),
        candidates: candidates.len(),
        ..Default::default()
    };

    let work_dir = Path::new(&config.denylist.work_dir);
    for plan in &candidates {
        // Fingerprint is known computable here: classification required it.
        let fp = product_fingerprint(plan)?;
        if let Some(existing) = existing_by_fingerprint(
            &grq,
            &config.indices.blacklist,
            ExclusionKind::Denylist.dataset(),
            &fp,
        )
        .await?
        {
            info!(plan = %plan.id, duplicate = %existing, "already denylisted; skipping");
            summary.duplicates += 1;
            continue;
        }

        let draft = match build_draft(
            ExclusionKind::Denylist,
            plan,
            &config.denylist.product_version,
        ) {
            Ok(draft) => draft,
            Err(err) => {
                warn!(plan = %plan.id, "failed to build denylist product: {err:#}");
                summary.failed += 1;
                continue;
            }
        };
        let dir = match write_draft(work_dir, &draft) {
            Ok(dir) => dir,
            Err(err) => {
                warn!(plan = %plan.id, "failed to write denylist product: {err:#}");
                summary.failed += 1;
                continue;
            }
        };
        if submitter.submit_product(&dir, &draft.label).await.is_submitted() {
            summary.submitted += 1;
        } else {
            summary.failed += 1;
        }
    }

    Ok(summary)
}
