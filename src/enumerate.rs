//! Re-enumeration from a denylist product.
//!
//! A denylist product marks a pairing as dead; this pipeline submits a
//! fresh enumeration job for every AOI the pairing covered, so the area
//! gets a new chance with a new acquisition plan. AOIs and the track
//! number come from the audit-trail records carrying the product's
//! fingerprint; the orbit-file record supplies the enumeration window.

use anyhow::{bail, Result};
use serde_json::json;
use tracing::{info, warn};

use crate::config::Config;
use crate::context::RunContext;
use crate::query::GrqClient;
use crate::submit::Submitter;

const ALLOWED_PROD_TYPES: [&str; 1] = ["S1-GUNW-BLACKLIST"];
const ENUMERATION_JOB: &str = "job-standard_product-s1gunw-acq_enumerator";

/// Job parameters for one AOI's enumeration run.
///
/// The enumeration window and platform come from the orbit-file record;
/// `localize_products` is the record's second URL (the archive copy) and
/// is null when the record carries fewer URLs.
fn enumeration_params(
    aoi: &str,
    track: &str,
    ctx: &RunContext,
    orbit_source: &serde_json::Value,
) -> serde_json::Value {
    json!({
        "aoi_name": aoi,
        "workflow": "orbit_acquisition_enumerator_standard_product.sf.xml",
        "project": "grfn",
        "dataset_version": "v2.0.0",
        "minMatch": ctx.min_match.unwrap_or(2),
        "threshold_pixel": 5,
        "acquisition_version": &ctx.acquisition_version,
        "track_numbers": track,
        "skipDays": ctx.skip_days.unwrap_or(0),
        "starttime": orbit_source.get("starttime"),
        "endtime": orbit_source.get("endtime"),
        "platform": orbit_source.pointer("/metadata/platform"),
        "localize_products": orbit_source.pointer("/urls/1"),
    })
}

pub async fn run_enumerate(config: &Config, ctx: &RunContext) -> Result<u64> {
    let prod_type = ctx
        .prod_type
        .as_deref()
        .unwrap_or_default();
    if !ALLOWED_PROD_TYPES.contains(&prod_type) {
        bail!("product type `{prod_type}` not allowed as enumeration input");
    }
    let Some(full_id_hash) = ctx.full_id_hash.as_deref() else {
        bail!("run context has no `full_id_hash`");
    };
    let Some(orbit_file_id) = ctx.master_orbit_file.as_deref() else {
        bail!("run context has no `master_orbit_file`");
    };

    let grq = GrqClient::new(&config.grq.base_url, config.grq.timeout_secs)?;
    let audit_query = json!({
        "query": {"bool": {"must": [
            {"term": {"metadata.full_id_hash.raw": full_id_hash}}
        ]}},
        "from": 0, "size": 20
    });
    let audits = grq.search(&config.indices.audit_trail, audit_query).await?;
    if audits.is_empty() {
        bail!("no audit-trail product found for fingerprint {full_id_hash}");
    }

    // Covered AOIs, deduplicated; audit-trail records store the AOI name
    // and track in their metadata.
    let mut aois: Vec<String> = Vec::new();
    let mut track = None;
    for audit in &audits {
        if let Some(aoi) = audit
            .pointer("/_source/metadata/aoi")
            .and_then(|a| a.as_str())
        {
            if !aois.iter().any(|known| known == aoi) {
                aois.push(aoi.to_string());
            }
        }
        if track.is_none() {
            track = audit.pointer("/_source/metadata/track_number").cloned();
        }
    }
    let Some(track) = track else {
        bail!("no audit-trail record carries a track number");
    };
    // Track is numeric in some indexes, a string in others.
    let track = match &track {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    info!(aois = aois.len(), "AOIs covered by denylisted pairing");

    let orbit_query = json!({
        "query": {"bool": {"must": [
            {"term": {"metadata.archive_filename.raw": orbit_file_id}}
        ]}},
        "from": 0, "size": 20
    });
    let orbit_hits = grq.search(&config.indices.orbit_file, orbit_query).await?;
    let Some(orbit_file) = orbit_hits.first() else {
        bail!("no orbit-file record found for {orbit_file_id}");
    };
    let orbit_source = orbit_file.get("_source").cloned().unwrap_or_default();

    let submitter = Submitter::new(
        &config.submit.ingest_url,
        &config.submit.job_submit_url,
        config.grq.timeout_secs,
    )?;
    let mut submitted = 0u64;
    for aoi in &aois {
        let params = enumeration_params(aoi, &track, ctx, &orbit_source);
        info!(aoi = %aoi, "submitting enumeration job");
        let outcome = submitter
            .submit_job(
                ENUMERATION_JOB,
                &config.submit.enumeration_job_version,
                &config.submit.enumerator_queue,
                5,
                "enumeration_from_denylist",
                params,
            )
            .await;
        if outcome.is_submitted() {
            submitted += 1;
        } else {
            warn!(aoi = %aoi, "enumeration job not submitted; continuing");
        }
    }
    Ok(submitted)
}
