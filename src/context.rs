//! Per-run context document.
//!
//! Each pipeline run is triggered with a JSON context file describing the
//! trigger product or failed job: footprint geometry, orbit number, scene
//! sets, retry counts. Upstream schedulers wrap several of these fields
//! in single-element lists; the accessors unwrap that shape. A missing or
//! unparsable context file is fatal before any processing begins.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

use crate::models::SceneId;

#[derive(Debug, Default, Deserialize)]
pub struct RunContext {
    /// GeoJSON geometry (or list thereof) of the trigger product.
    #[serde(default)]
    pub location: Option<Value>,

    /// Interferogram index override for the tagging run.
    #[serde(default)]
    pub ifg_index: Option<Value>,

    #[serde(default, rename = "orbitNumber")]
    pub orbit_number: Option<Value>,

    /// Target scene sets of a failed job.
    #[serde(default, alias = "master_slcs")]
    pub reference_scenes: Option<Vec<SceneId>>,

    #[serde(default, alias = "slave_slcs")]
    pub secondary_scenes: Option<Vec<SceneId>>,

    #[serde(default)]
    pub required_retry_count: Option<i64>,

    /// Scalar or single-element list, depending on the scheduler.
    #[serde(default)]
    pub current_retry_count: Option<Value>,

    /// Dataset type of the trigger product (enumeration runs).
    #[serde(default)]
    pub prod_type: Option<String>,

    #[serde(default)]
    pub master_orbit_file: Option<String>,

    #[serde(default)]
    pub full_id_hash: Option<String>,

    #[serde(default, rename = "skipDays")]
    pub skip_days: Option<i64>,

    #[serde(default, rename = "minMatch")]
    pub min_match: Option<i64>,

    #[serde(default)]
    pub acquisition_version: Option<String>,
}

/// Unwrap the single-element-list convention: `[x]` reads as `x`.
fn scalar(value: &Value) -> &Value {
    match value {
        Value::Array(items) if !items.is_empty() => &items[0],
        other => other,
    }
}

impl RunContext {
    /// Polygon coordinates of the trigger product's footprint.
    pub fn coordinates(&self) -> Result<Value> {
        let location = self
            .location
            .as_ref()
            .context("run context has no `location`")?;
        scalar(location)
            .get("coordinates")
            .cloned()
            .context("run context `location` has no coordinates")
    }

    pub fn ifg_index(&self) -> Result<String> {
        let value = self
            .ifg_index
            .as_ref()
            .context("run context has no `ifg_index`")?;
        scalar(value)
            .as_str()
            .map(str::to_string)
            .context("run context `ifg_index` is not a string")
    }

    pub fn orbit(&self) -> Result<Value> {
        self.orbit_number
            .clone()
            .context("run context has no `orbitNumber`")
    }

    pub fn required_retry_count(&self) -> i64 {
        self.required_retry_count.unwrap_or(0)
    }

    pub fn current_retry_count(&self) -> i64 {
        self.current_retry_count
            .as_ref()
            .map(|v| scalar(v).as_i64().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Both scene sets of the failed job's target product. Fatal when
    /// either is absent; the job context is the sole input here.
    pub fn scene_sets(&self) -> Result<(Vec<SceneId>, Vec<SceneId>)> {
        match (&self.reference_scenes, &self.secondary_scenes) {
            (Some(reference), Some(secondary)) => Ok((reference.clone(), secondary.clone())),
            _ => bail!("run context is missing the reference/secondary scene sets"),
        }
    }
}

pub fn load_context(path: &Path) -> Result<RunContext> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read run context: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse run context: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_wrapped_fields_unwrap() {
        let ctx: RunContext = serde_json::from_value(json!({
            "location": [{"type": "polygon", "coordinates": [[[0.0, 0.0]]]}],
            "ifg_index": ["grq_v2.0_s1-ifg"],
            "orbitNumber": [12345],
            "current_retry_count": [4]
        }))
        .unwrap();
        assert!(ctx.coordinates().is_ok());
        assert_eq!(ctx.ifg_index().unwrap(), "grq_v2.0_s1-ifg");
        assert_eq!(ctx.current_retry_count(), 4);
    }

    #[test]
    fn scalar_fields_also_accepted() {
        let ctx: RunContext = serde_json::from_value(json!({
            "ifg_index": "grq_v2.0_s1-ifg",
            "current_retry_count": 2
        }))
        .unwrap();
        assert_eq!(ctx.ifg_index().unwrap(), "grq_v2.0_s1-ifg");
        assert_eq!(ctx.current_retry_count(), 2);
    }

    #[test]
    fn missing_scene_sets_are_fatal() {
        let ctx = RunContext::default();
        assert!(ctx.scene_sets().is_err());
    }

    #[test]
    fn job_context_scene_aliases() {
        let ctx: RunContext = serde_json::from_value(json!({
            "master_slcs": ["S1A_20190101T120000"],
            "slave_slcs": ["S1A_20190113T120000"]
        }))
        .unwrap();
        let (reference, secondary) = ctx.scene_sets().unwrap();
        assert_eq!(reference.len(), 1);
        assert_eq!(secondary.len(), 1);
    }
}
