//! Denylist and greylist product drafts.
//!
//! A draft is built once from the acquisition-plan product whose pairing
//! failed, written to a directory named by its label, and handed to the
//! submitter. The label is deterministic (prefix, pairing dates,
//! fingerprint, version), so re-running the pipeline regenerates the same
//! directory rather than a new product.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::DateTime;
use serde_json::{json, Value};

use crate::fingerprint::product_fingerprint;
use crate::models::Product;

/// Which exclusion list a draft belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionKind {
    /// Permanent exclusion after repeated terminal failures.
    Denylist,
    /// Temporary exclusion, eligible for later re-enumeration.
    Greylist,
}

impl ExclusionKind {
    /// Dataset type written into the search cluster.
    pub fn dataset(self) -> &'static str {
        match self {
            ExclusionKind::Denylist => "S1-GUNW-BLACKLIST",
            ExclusionKind::Greylist => "S1-GUNW-GREYLIST",
        }
    }
}

/// A product draft ready to be written and submitted.
#[derive(Debug, Clone)]
pub struct ProductDraft {
    pub label: String,
    pub dataset: Value,
    pub metadata: Value,
}

fn short_date(timestamp: &str) -> Result<String> {
    let parsed = DateTime::parse_from_rfc3339(timestamp)
        .or_else(|_| DateTime::parse_from_rfc3339(&format!("{timestamp}Z")))
        .with_context(|| format!("unparsable product timestamp: {timestamp}"))?;
    Ok(parsed.format("%Y%m%d").to_string())
}

/// Build a denylist/greylist draft from an acquisition-plan product.
///
/// The reference date comes from the plan's end time and the secondary
/// date from its start time; the pairing spans from the older secondary
/// acquisition to the newer reference one.
pub fn build_draft(kind: ExclusionKind, plan: &Product, version: &str) -> Result<ProductDraft> {
    let fp = product_fingerprint(plan)?;
    let endtime = plan
        .endtime
        .as_deref()
        .context("acquisition plan has no endtime")?;
    let starttime = plan
        .starttime
        .as_deref()
        .context("acquisition plan has no starttime")?;
    let reference_date = short_date(endtime)?;
    let secondary_date = short_date(starttime)?;
    let label = format!(
        "{}-{}_{}-{}-{}",
        kind.dataset(),
        reference_date,
        secondary_date,
        fp,
        version
    );

    let met = &plan.metadata;
    let dataset = json!({
        "label": &label,
        "version": version,
        "starttime": starttime,
        "endtime": endtime,
        "location": &met.union_geojson,
    });
    let metadata = json!({
        "reference_scenes": met.reference_set(),
        "secondary_scenes": met.secondary_set(),
        "master_orbit_file": &met.master_orbit_file,
        "slave_orbit_file": &met.slave_orbit_file,
        "track_number": &met.track_number,
        "full_id_hash": fp.as_str(),
    });

    Ok(ProductDraft {
        label,
        dataset,
        metadata,
    })
}

/// Write the draft under `work_dir` as a product directory.
///
/// Layout: `{label}/{label}.dataset.json` and `{label}/{label}.met.json`.
/// Re-writing an existing directory overwrites both documents.
pub fn write_draft(work_dir: &Path, draft: &ProductDraft) -> Result<PathBuf> {
    let dir = work_dir.join(&draft.label);
    fs::create_dir_all(&dir)
        .with_context(|| format!("creating product directory {}", dir.display()))?;

    let dataset_path = dir.join(format!("{}.dataset.json", draft.label));
    let metadata_path = dir.join(format!("{}.met.json", draft.label));
    fs::write(&dataset_path, serde_json::to_string(&draft.dataset)?)
        .with_context(|| format!("writing {}", dataset_path.display()))?;
    fs::write(&metadata_path, serde_json::to_string(&draft.metadata)?)
        .with_context(|| format!("writing {}", metadata_path.display()))?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Metadata, SceneId};

    fn plan() -> Product {
        Product {
            id: "plan-1".to_string(),
            index: "grq_v2.0_ifg-cfg".to_string(),
            starttime: Some("2019-01-01T12:00:00Z".to_string()),
            endtime: Some("2019-01-13T12:00:00Z".to_string()),
            metadata: Metadata {
                reference_scenes: Some(vec![SceneId::id("S1A_20190113T120000")]),
                secondary_scenes: Some(vec![SceneId::id("S1A_20190101T120000")]),
                track_number: Some(serde_json::json!(42)),
                ..Default::default()
            },
        }
    }

    #[test]
    fn label_is_deterministic_and_dated() {
        let a = build_draft(ExclusionKind::Denylist, &plan(), "v1.0").unwrap();
        let b = build_draft(ExclusionKind::Denylist, &plan(), "v1.0").unwrap();
        assert_eq!(a.label, b.label);
        assert!(a.label.starts_with("S1-GUNW-BLACKLIST-20190113_20190101-"));
        assert!(a.label.ends_with("-v1.0"));
    }

    #[test]
    fn metadata_carries_fingerprint_and_scenes() {
        let draft = build_draft(ExclusionKind::Greylist, &plan(), "v1.0").unwrap();
        let fp = draft.metadata.get("full_id_hash").unwrap().as_str().unwrap();
        assert!(fp.contains('_'));
        assert!(draft.metadata.get("reference_scenes").unwrap().is_array());
        assert_eq!(draft.metadata.get("track_number").unwrap(), 42);
    }

    #[test]
    fn draft_without_times_is_rejected() {
        let mut bare = plan();
        bare.starttime = None;
        assert!(build_draft(ExclusionKind::Denylist, &bare, "v1.0").is_err());
    }
}
