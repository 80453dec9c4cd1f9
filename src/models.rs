//! Core data models for the reconciliation and tagging engine.
//!
//! These types represent the products, failure records, and areas of
//! interest that flow between the search cluster and the reconciliation
//! pipelines. Schema variants between the acquisition-plan and
//! interferogram-config indexes (`master_scenes` vs `reference_scenes`,
//! `track` vs `track_number`) are resolved here via serde aliases so the
//! rest of the crate sees one shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A scene identifier as it appears on the wire.
///
/// The search cluster stores scene lists in two shapes: a plain identifier
/// string, or an `[identifier, extra...]` group where only the leading
/// element names the scene. A third shape, a comma-delimited string of
/// identifiers, is handled at the [`Metadata`] level, where it is split
/// into individual `Id` values before fingerprinting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SceneId {
    /// A plain scene identifier.
    Id(String),
    /// An `[identifier, extra...]` group; only the first element matters.
    Group(Vec<Value>),
}

impl SceneId {
    pub fn id(s: impl Into<String>) -> Self {
        SceneId::Id(s.into())
    }
}

/// Product metadata, normalized across the two index schema variants.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    /// Reference (formerly "master") scene set.
    #[serde(default, alias = "master_scenes", skip_serializing_if = "Option::is_none")]
    pub reference_scenes: Option<Vec<SceneId>>,

    /// Secondary (formerly "slave") scene set.
    #[serde(default, alias = "slave_scenes", skip_serializing_if = "Option::is_none")]
    pub secondary_scenes: Option<Vec<SceneId>>,

    /// Comma-delimited reference identifiers (older acquisition plans).
    #[serde(default, alias = "master_ids", skip_serializing_if = "Option::is_none")]
    pub reference_ids: Option<String>,

    /// Comma-delimited secondary identifiers (older acquisition plans).
    #[serde(default, alias = "slave_ids", skip_serializing_if = "Option::is_none")]
    pub secondary_ids: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Track number; numeric in some indexes, string in others.
    #[serde(default, alias = "track", skip_serializing_if = "Option::is_none")]
    pub track_number: Option<Value>,

    /// Orbit number(s); scalar or list depending on the index.
    #[serde(default, rename = "orbitNumber", skip_serializing_if = "Option::is_none")]
    pub orbit_number: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_orbit_file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slave_orbit_file: Option<String>,

    /// Footprint geometry of the scene pairing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub union_geojson: Option<Value>,

    /// Cached content fingerprint written at enumeration time. Trusted
    /// verbatim when present; recomputation is the fallback, not a check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_id_hash: Option<String>,
}

impl Metadata {
    /// The reference scene set, resolving the delimited-string fallback.
    pub fn reference_set(&self) -> Option<Vec<SceneId>> {
        scene_set(&self.reference_scenes, &self.reference_ids)
    }

    /// The secondary scene set, resolving the delimited-string fallback.
    pub fn secondary_set(&self) -> Option<Vec<SceneId>> {
        scene_set(&self.secondary_scenes, &self.secondary_ids)
    }
}

fn scene_set(scenes: &Option<Vec<SceneId>>, delimited: &Option<String>) -> Option<Vec<SceneId>> {
    if let Some(list) = scenes {
        return Some(list.clone());
    }
    delimited.as_ref().map(|joined| {
        joined
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| SceneId::Id(s.trim().to_string()))
            .collect()
    })
}

/// A product record from the search cluster.
///
/// `index` and `id` together form the storage location used by the tag
/// mutator; everything else is payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub index: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starttime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endtime: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// An area of interest scoping one reconciliation pass.
#[derive(Debug, Clone)]
pub struct Aoi {
    pub id: String,
    pub starttime: Option<String>,
    pub endtime: Option<String>,
    pub location: Option<Value>,
}

/// A failed-job record from the job registry, reduced to the fields the
/// failure classifier needs.
#[derive(Debug, Clone)]
pub struct JobFailureRecord {
    pub status: String,
    pub job_type: String,
    pub retry_count: i64,
    pub reference_scenes: Option<Vec<SceneId>>,
    pub secondary_scenes: Option<Vec<SceneId>>,
}

impl JobFailureRecord {
    /// Extract a failure record from a raw job-status document.
    ///
    /// Returns `None` when the document lacks the status or job-type
    /// fields entirely; missing scene sets are kept as `None` so the
    /// classifier can skip the record with a warning.
    pub fn from_doc(doc: &Value) -> Option<Self> {
        let status = doc.get("status")?.as_str()?.to_string();
        let job_type = doc
            .pointer("/job/job_info/job_payload/job_type")?
            .as_str()?
            .to_string();
        let retry_count = doc
            .pointer("/job/retry_count")
            .and_then(Value::as_i64)
            .unwrap_or(0);
        let reference_scenes = scene_list(doc.pointer("/job/params/master_slcs"));
        let secondary_scenes = scene_list(doc.pointer("/job/params/slave_slcs"));
        Some(Self {
            status,
            job_type,
            retry_count,
            reference_scenes,
            secondary_scenes,
        })
    }
}

fn scene_list(value: Option<&Value>) -> Option<Vec<SceneId>> {
    serde_json::from_value(value?.clone()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn metadata_aliases_resolve_both_schemas() {
        let old: Metadata = serde_json::from_value(json!({
            "master_scenes": ["S1A_20190101T120000"],
            "slave_scenes": ["S1A_20190113T120000"]
        }))
        .unwrap();
        let new: Metadata = serde_json::from_value(json!({
            "reference_scenes": ["S1A_20190101T120000"],
            "secondary_scenes": ["S1A_20190113T120000"]
        }))
        .unwrap();
        assert!(old.reference_set().is_some());
        assert!(new.reference_set().is_some());
        assert_eq!(old.reference_set().unwrap().len(), 1);
    }

    #[test]
    fn delimited_ids_split_into_scene_set() {
        let met: Metadata = serde_json::from_value(json!({
            "master_ids": "acq-20190101T120000, acq-20190113T120000",
            "slave_ids": "acq-20190125T120000"
        }))
        .unwrap();
        let refs = met.reference_set().unwrap();
        assert_eq!(refs.len(), 2);
        assert!(matches!(&refs[0], SceneId::Id(s) if s == "acq-20190101T120000"));
    }

    #[test]
    fn scene_group_deserializes_from_array() {
        let scenes: Vec<SceneId> =
            serde_json::from_value(json!([["S1A_20190101T120000", 42], "S1B_20190113T120000"]))
                .unwrap();
        assert!(matches!(&scenes[0], SceneId::Group(_)));
        assert!(matches!(&scenes[1], SceneId::Id(_)));
    }

    #[test]
    fn failure_record_from_job_doc() {
        let doc = json!({
            "status": "job-failed",
            "job": {
                "retry_count": 4,
                "job_info": {"job_payload": {"job_type": "job-sciflo-s1-ifg"}},
                "params": {
                    "master_slcs": ["S1A_20190101T120000"],
                    "slave_slcs": ["S1A_20190113T120000"]
                }
            }
        });
        let rec = JobFailureRecord::from_doc(&doc).unwrap();
        assert_eq!(rec.status, "job-failed");
        assert_eq!(rec.retry_count, 4);
        assert!(rec.reference_scenes.is_some());
    }
}
