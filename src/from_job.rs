//! Exclusion-product generation from a single failed job.
//!
//! Triggered with the failed job's run context. The job's target scene
//! sets identify the pairing; an exclusion product already carrying that
//! fingerprint makes the whole run a normal no-op, as does a retry count
//! below the configured requirement. The same flow serves both lists;
//! [`ExclusionKind`] selects the dataset and the index checked for
//! duplicates.

use std::path::Path;

use anyhow::{bail, Result};
use tracing::info;

use crate::classify::existing_by_fingerprint;
use crate::config::Config;
use crate::context::RunContext;
use crate::fingerprint::fingerprint;
use crate::product::{build_draft, write_draft, ExclusionKind};
use crate::query::{fingerprint_query, GrqClient};
use crate::submit::Submitter;

/// How the run ended.
#[derive(Debug, PartialEq, Eq)]
pub enum FromJobOutcome {
    Submitted(String),
    Duplicate(String),
    BelowRetryThreshold,
    SubmissionFailed(String),
}

fn exclusion_index<'a>(config: &'a Config, kind: ExclusionKind) -> &'a str {
    match kind {
        ExclusionKind::Denylist => &config.indices.blacklist,
        ExclusionKind::Greylist => &config.indices.greylist,
    }
}

pub async fn run_from_job(
    config: &Config,
    ctx: &RunContext,
    kind: ExclusionKind,
) -> Result<FromJobOutcome> {
    // The job context is the sole input: absent scene sets are fatal.
    let (reference, secondary) = ctx.scene_sets()?;
    let fp = fingerprint(&reference, &secondary)?;

    let grq = GrqClient::new(&config.grq.base_url, config.grq.timeout_secs)?;
    if let Some(existing) =
        existing_by_fingerprint(&grq, exclusion_index(config, kind), kind.dataset(), &fp).await?
    {
        info!(duplicate = %existing, fingerprint = %fp, dataset = kind.dataset(), "product already exists");
        return Ok(FromJobOutcome::Duplicate(existing));
    }

    let current = ctx.current_retry_count();
    let required = ctx.required_retry_count();
    if current < required {
        info!(current, required, "retry count below requirement; nothing to do");
        return Ok(FromJobOutcome::BelowRetryThreshold);
    }

    // Locate the acquisition plan for the failed pairing.
    let plans = grq
        .search_products(&config.indices.acq_plan, fingerprint_query(&fp, None))
        .await?;
    let Some(plan) = plans.first() else {
        bail!("no acquisition plan found for fingerprint {fp}");
    };
    info!(plan = %plan.id, fingerprint = %fp, "acquisition plan located");

    let draft = build_draft(kind, plan, &config.denylist.product_version)?;
    let dir = write_draft(Path::new(&config.denylist.work_dir), &draft)?;
    let submitter = Submitter::new(
        &config.submit.ingest_url,
        &config.submit.job_submit_url,
        config.grq.timeout_secs,
    )?;
    if submitter.submit_product(&dir, &draft.label).await.is_submitted() {
        Ok(FromJobOutcome::Submitted(draft.label))
    } else {
        Ok(FromJobOutcome::SubmissionFailed(draft.label))
    }
}
