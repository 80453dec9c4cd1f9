//! Failure classification: which missing products are terminally failed.
//!
//! Combines the set reconciler with the job registry. Failed jobs of the
//! processing job type are fetched once, reduced to a fingerprint set over
//! their target scene pairings, and the missing products whose fingerprint
//! appears in that set are the denylist candidates. Membership is
//! deterministic fingerprint equality and nothing else.

use std::collections::HashSet;

use anyhow::Result;
use tracing::{debug, warn};

use crate::fingerprint::{fingerprint, product_fingerprint, Fingerprint, FingerprintError};
use crate::models::{JobFailureRecord, Product};
use crate::query::{failed_jobs_query, fingerprint_query, GrqClient};

/// Fetch failed jobs of `job_type` from the job registry.
///
/// `threshold <= 0` drops the retry-count filter and matches on status and
/// type alone. Documents that do not parse as job-status records are
/// skipped with a warning.
pub async fn failed_jobs(
    registry: &GrqClient,
    status_index: &str,
    job_type: &str,
    threshold: i64,
) -> Result<Vec<JobFailureRecord>> {
    let hits = registry
        .search(status_index, failed_jobs_query(job_type, threshold))
        .await?;
    let mut records = Vec::with_capacity(hits.len());
    for hit in &hits {
        let source = hit.get("_source").unwrap_or(hit);
        match JobFailureRecord::from_doc(source) {
            Some(record) => records.push(record),
            None => {
                let id = hit.get("_id").and_then(|v| v.as_str()).unwrap_or("?");
                warn!(job = id, "skipping unparsable job-status document");
            }
        }
    }
    Ok(records)
}

/// Build the fingerprint set over failure records' target scene pairings.
///
/// Records without both scene sets cannot be fingerprinted and are skipped
/// with a warning; a corrupt identifier aborts classification.
fn failure_fingerprints(
    failures: &[JobFailureRecord],
) -> Result<HashSet<Fingerprint>, FingerprintError> {
    let mut set = HashSet::new();
    for record in failures {
        match (&record.reference_scenes, &record.secondary_scenes) {
            (Some(reference), Some(secondary)) => {
                set.insert(fingerprint(reference, secondary)?);
            }
            _ => warn!(
                job_type = %record.job_type,
                "skipping failure record without scene sets"
            ),
        }
    }
    Ok(set)
}

/// The subset of `missing` confirmed to correspond to a terminally failed
/// job.
pub fn classify(
    missing: &[Product],
    failures: &[JobFailureRecord],
) -> Result<Vec<Product>, FingerprintError> {
    let failed = failure_fingerprints(failures)?;
    if failed.is_empty() {
        return Ok(Vec::new());
    }
    let mut candidates = Vec::new();
    for product in missing {
        match product_fingerprint(product) {
            Ok(fp) => {
                if failed.contains(&fp) {
                    candidates.push(product.clone());
                }
            }
            Err(err @ FingerprintError::MissingField { .. }) => {
                warn!(product = %product.id, "skipping product: {err}");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(candidates)
}

/// Look up an existing denylist/greylist product with this fingerprint.
///
/// A hit means the candidate has already been recorded; callers treat it
/// as a normal no-op for that item, not an error.
pub async fn existing_by_fingerprint(
    grq: &GrqClient,
    index: &str,
    dataset: &str,
    fp: &Fingerprint,
) -> Result<Option<String>> {
    let hits = grq
        .search(index, fingerprint_query(fp, Some(dataset)))
        .await?;
    let found = hits
        .first()
        .and_then(|hit| hit.get("_id"))
        .and_then(|v| v.as_str())
        .map(str::to_string);
    if let Some(id) = &found {
        debug!(duplicate = %id, fingerprint = %fp, "existing product for fingerprint");
    }
    Ok(found)
}
