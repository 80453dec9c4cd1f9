//! Content-addressed identity for scene pairings.
//!
//! A product's identity is a [`Fingerprint`] over its reference and
//! secondary scene sets: each identifier is normalized to its embedded
//! acquisition timestamp token, each half is sorted and digested
//! independently, and the two digests are joined as `"{ref}_{sec}"`.
//! Equal scene sets produce equal fingerprints regardless of element
//! order or wire representation (plain id, `[id, extra]` group, or
//! delimited acquisition-plan token).
//!
//! There is exactly one fingerprint algorithm. Earlier revisions of the
//! pipeline branched per-call on which metadata keys were present; here
//! every identifier goes through the same normalization before hashing.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::models::{Product, SceneId};

/// Pattern matching the acquisition timestamp embedded in every scene
/// identifier: an 8-digit date, `T`, and a 6-digit time.
pub const TIMESTAMP_PATTERN: &str = r"[1-2]\d{7}T[0-2]\d[0-6]\d[0-6]\d";

static TIMESTAMP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(TIMESTAMP_PATTERN).expect("timestamp pattern compiles"));

/// Errors from fingerprint computation.
///
/// `MissingField` is recoverable when iterating a collection (the product
/// is skipped with a warning); `IdentityExtraction` and `MalformedScene`
/// indicate corrupt identifiers and are fatal for the product involved.
#[derive(Debug, Error)]
pub enum FingerprintError {
    #[error("required scene-set field `{field}` absent from product metadata")]
    MissingField { field: &'static str },

    #[error("no timestamp token matching `{pattern}` in scene identifier `{input}`")]
    IdentityExtraction {
        input: String,
        pattern: &'static str,
    },

    #[error("scene identifier group has no leading string element: {input}")]
    MalformedScene { input: String },
}

/// The content-addressed identity of a scene pairing.
///
/// Format: `{reference_digest}_{secondary_digest}`, each half a 128-bit
/// digest in lowercase hex. Derived on demand, never stored as primary
/// identity; a cached `full_id_hash` from the enumerator may stand in.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wrap a cached digest string without recomputation.
    pub fn cached(value: impl Into<String>) -> Self {
        Fingerprint(value.into())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.0)
    }
}

/// Normalize one scene identifier to its canonical comparison token.
///
/// Groups are reduced to their leading element first; the token is the
/// embedded acquisition timestamp, so an acquisition-plan identifier and
/// the raw scene id it refers to normalize identically.
pub fn normalize(scene: &SceneId) -> Result<String, FingerprintError> {
    let raw = match scene {
        SceneId::Id(s) => s.as_str(),
        SceneId::Group(items) => items
            .first()
            .and_then(|v| v.as_str())
            .ok_or_else(|| FingerprintError::MalformedScene {
                input: serde_json::to_string(items).unwrap_or_default(),
            })?,
    };
    TIMESTAMP_RE
        .find(raw)
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| FingerprintError::IdentityExtraction {
            input: raw.to_string(),
            pattern: TIMESTAMP_PATTERN,
        })
}

fn half_digest(scenes: &[SceneId]) -> Result<String, FingerprintError> {
    let mut tokens = scenes
        .iter()
        .map(normalize)
        .collect::<Result<Vec<_>, _>>()?;
    tokens.sort_unstable();
    let mut hasher = Sha256::new();
    hasher.update(tokens.join(" ").as_bytes());
    // Each half keeps the first 128 bits of the digest.
    Ok(hex::encode(&hasher.finalize()[..16]))
}

/// Compute the fingerprint of a reference/secondary scene-set pair.
pub fn fingerprint(
    reference: &[SceneId],
    secondary: &[SceneId],
) -> Result<Fingerprint, FingerprintError> {
    Ok(Fingerprint(format!(
        "{}_{}",
        half_digest(reference)?,
        half_digest(secondary)?
    )))
}

/// Fingerprint a product, preferring its cached `full_id_hash`.
///
/// Fails with [`FingerprintError::MissingField`] when either scene set is
/// absent after alias resolution and no cached hash exists.
pub fn product_fingerprint(product: &Product) -> Result<Fingerprint, FingerprintError> {
    if let Some(cached) = &product.metadata.full_id_hash {
        if !cached.is_empty() {
            return Ok(Fingerprint::cached(cached.clone()));
        }
    }
    let reference = product
        .metadata
        .reference_set()
        .ok_or(FingerprintError::MissingField {
            field: "reference_scenes",
        })?;
    let secondary = product
        .metadata
        .secondary_set()
        .ok_or(FingerprintError::MissingField {
            field: "secondary_scenes",
        })?;
    fingerprint(&reference, &secondary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Metadata;
    use serde_json::json;

    fn ids(list: &[&str]) -> Vec<SceneId> {
        list.iter().map(|s| SceneId::id(*s)).collect()
    }

    #[test]
    fn order_independent() {
        let a = fingerprint(
            &ids(&["S1A_X_20190101T120000", "S1B_X_20190113T120000"]),
            &ids(&["S1A_X_20190125T120000"]),
        )
        .unwrap();
        let b = fingerprint(
            &ids(&["S1B_X_20190113T120000", "S1A_X_20190101T120000"]),
            &ids(&["S1A_X_20190125T120000"]),
        )
        .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn representation_independent() {
        // Plain id, [id, extra] group, and acquisition-plan token all
        // normalize to the embedded timestamp.
        let plain = fingerprint(
            &ids(&["S1A_IW_SLC_20190101T120000_0042"]),
            &ids(&["S1A_IW_SLC_20190113T120000_0042"]),
        )
        .unwrap();
        let grouped = fingerprint(
            &[SceneId::Group(vec![
                json!("acquisition-S1A_20190101T120000"),
                json!(7),
            ])],
            &ids(&["acquisition-S1A_20190113T120000"]),
        )
        .unwrap();
        assert_eq!(plain, grouped);
    }

    #[test]
    fn differs_when_any_element_differs() {
        let a = fingerprint(
            &ids(&["S1A_20190101T120000"]),
            &ids(&["S1A_20190113T120000"]),
        )
        .unwrap();
        let b = fingerprint(
            &ids(&["S1A_20190101T120001"]),
            &ids(&["S1A_20190113T120000"]),
        )
        .unwrap();
        let c = fingerprint(
            &ids(&["S1A_20190101T120000"]),
            &ids(&["S1A_20190114T120000"]),
        )
        .unwrap();
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn halves_are_not_interchangeable() {
        let a = fingerprint(
            &ids(&["S1A_20190101T120000"]),
            &ids(&["S1A_20190113T120000"]),
        )
        .unwrap();
        let b = fingerprint(
            &ids(&["S1A_20190113T120000"]),
            &ids(&["S1A_20190101T120000"]),
        )
        .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn extraction_failure_names_input_and_pattern() {
        let err = normalize(&SceneId::id("no-timestamp-here")).unwrap_err();
        match &err {
            FingerprintError::IdentityExtraction { input, pattern } => {
                assert_eq!(input, "no-timestamp-here");
                assert_eq!(*pattern, TIMESTAMP_PATTERN);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        let msg = err.to_string();
        assert!(msg.contains("no-timestamp-here"));
        assert!(msg.contains(TIMESTAMP_PATTERN));
    }

    #[test]
    fn cached_hash_short_circuits() {
        let product = Product {
            id: "p1".into(),
            index: "grq_v2.0_ifg-cfg".into(),
            starttime: None,
            endtime: None,
            metadata: Metadata {
                full_id_hash: Some("abc123".into()),
                ..Default::default()
            },
        };
        assert_eq!(product_fingerprint(&product).unwrap().as_str(), "abc123");
    }

    #[test]
    fn missing_scene_set_is_reported() {
        let product = Product {
            id: "p1".into(),
            index: "grq_v2.0_ifg-cfg".into(),
            starttime: None,
            endtime: None,
            metadata: Metadata::default(),
        };
        let err = product_fingerprint(&product).unwrap_err();
        assert!(matches!(err, FingerprintError::MissingField { field } if field == "reference_scenes"));
    }

    #[test]
    fn fingerprint_format_is_two_hex_halves() {
        let fp = fingerprint(
            &ids(&["S1A_20190101T120000"]),
            &ids(&["S1A_20190113T120000"]),
        )
        .unwrap();
        let (r, s) = fp.as_str().split_once('_').unwrap();
        assert_eq!(r.len(), 32);
        assert_eq!(s.len(), 32);
        assert!(r.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(s.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
