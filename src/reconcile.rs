//! Set reconciliation over fingerprint-keyed product collections.
//!
//! Every operation reduces its input collections to a [`FingerprintIndex`]
//! once (O(n) per collection) and answers membership questions over the
//! fingerprint sets. All four operations are pure; no network, no
//! mutation.
//!
//! Products whose fingerprint cannot be computed because a scene-set field
//! is absent are skipped with a logged warning; a corrupt identifier
//! (failed timestamp extraction) aborts the operation.

use std::collections::HashMap;

use tracing::warn;

use crate::fingerprint::{product_fingerprint, Fingerprint, FingerprintError};
use crate::models::Product;

/// A fingerprint-keyed index over one product collection.
///
/// If two products in the source collection share a fingerprint, the later
/// one observed wins. That is a known ambiguity in the upstream data (two
/// records claiming the same scene pairing), so it is flagged with a
/// warning rather than silently treated as two distinct entities.
#[derive(Debug, Default)]
pub struct FingerprintIndex {
    map: HashMap<Fingerprint, Product>,
}

impl FingerprintIndex {
    pub fn build(products: &[Product]) -> Result<Self, FingerprintError> {
        let mut map = HashMap::new();
        for product in products {
            match product_fingerprint(product) {
                Ok(fp) => {
                    if let Some(previous) = map.insert(fp.clone(), product.clone()) {
                        warn!(
                            fingerprint = %fp,
                            earlier = %previous.id,
                            later = %product.id,
                            "duplicate fingerprint in collection; keeping later entry"
                        );
                    }
                }
                Err(err @ FingerprintError::MissingField { .. }) => {
                    warn!(product = %product.id, "skipping product: {err}");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(Self { map })
    }

    pub fn contains(&self, fp: &Fingerprint) -> bool {
        self.map.contains_key(fp)
    }

    pub fn get(&self, fp: &Fingerprint) -> Option<&Product> {
        self.map.get(fp)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Iterate a collection yielding each distinct fingerprint once, in
/// first-occurrence order, skipping entries without scene sets.
///
/// Duplicates follow the same rule as [`FingerprintIndex::build`]: the
/// later entry wins (replacing the earlier one in place) and the
/// collision is flagged with a warning.
fn distinct_fingerprints(
    products: &[Product],
) -> Result<Vec<(Fingerprint, &Product)>, FingerprintError> {
    let mut positions: HashMap<Fingerprint, usize> = HashMap::new();
    let mut out: Vec<(Fingerprint, &Product)> = Vec::with_capacity(products.len());
    for product in products {
        match product_fingerprint(product) {
            Ok(fp) => {
                if let Some(&pos) = positions.get(&fp) {
                    warn!(
                        fingerprint = %fp,
                        earlier = %out[pos].1.id,
                        later = %product.id,
                        "duplicate fingerprint in collection; keeping later entry"
                    );
                    out[pos].1 = product;
                } else {
                    positions.insert(fp.clone(), out.len());
                    out.push((fp, product));
                }
            }
            Err(err @ FingerprintError::MissingField { .. }) => {
                warn!(product = %product.id, "skipping product: {err}");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(out)
}

/// Universe entries whose fingerprint is absent from both `produced` and
/// `excluded`.
pub fn missing(
    universe: &[Product],
    produced: &FingerprintIndex,
    excluded: &FingerprintIndex,
) -> Result<Vec<Product>, FingerprintError> {
    Ok(distinct_fingerprints(universe)?
        .into_iter()
        .filter(|(fp, _)| !produced.contains(fp) && !excluded.contains(fp))
        .map(|(_, p)| p.clone())
        .collect())
}

/// Entries of `a` whose fingerprint also occurs in `b`; returns `b`'s copy
/// of each matching entry.
pub fn matching(a: &[Product], b: &FingerprintIndex) -> Result<Vec<Product>, FingerprintError> {
    Ok(distinct_fingerprints(a)?
        .into_iter()
        .filter_map(|(fp, _)| b.get(&fp).cloned())
        .collect())
}

/// True iff every fingerprint in `want` occurs in `have`.
///
/// Reflexive, and monotonic under additions to `have`.
pub fn contains_all(have: &FingerprintIndex, want: &[Product]) -> Result<bool, FingerprintError> {
    Ok(distinct_fingerprints(want)?
        .iter()
        .all(|(fp, _)| have.contains(fp)))
}

/// Entries of `want` whose fingerprint is absent from `have`.
pub fn difference(
    have: &FingerprintIndex,
    want: &[Product],
) -> Result<Vec<Product>, FingerprintError> {
    Ok(distinct_fingerprints(want)?
        .into_iter()
        .filter(|(fp, _)| !have.contains(fp))
        .map(|(_, p)| p.clone())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Metadata, SceneId};

    fn product(id: &str, reference: &[&str], secondary: &[&str]) -> Product {
        Product {
            id: id.to_string(),
            index: "grq_v2.0_test".to_string(),
            starttime: None,
            endtime: None,
            metadata: Metadata {
                reference_scenes: Some(reference.iter().map(|s| SceneId::id(*s)).collect()),
                secondary_scenes: Some(secondary.iter().map(|s| SceneId::id(*s)).collect()),
                ..Default::default()
            },
        }
    }

    fn pair(id: &str, n: u32) -> Product {
        let reference = format!("S1A_201901{n:02}T120000");
        let secondary = format!("S1A_201902{n:02}T120000");
        product(id, &[reference.as_str()], &[secondary.as_str()])
    }

    #[test]
    fn missing_is_universe_minus_produced_and_excluded() {
        let universe = vec![pair("u1", 1), pair("u2", 2), pair("u3", 3)];
        let produced = FingerprintIndex::build(&[pair("p1", 1)]).unwrap();
        let excluded = FingerprintIndex::build(&[pair("x3", 3)]).unwrap();
        let result = missing(&universe, &produced, &excluded).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "u2");
    }

    #[test]
    fn exclusions_only_shrink_missing() {
        let universe = vec![pair("u1", 1), pair("u2", 2), pair("u3", 3)];
        let produced = FingerprintIndex::build(&[pair("p1", 1)]).unwrap();
        let none = FingerprintIndex::default();
        let excluded = FingerprintIndex::build(&[pair("x2", 2)]).unwrap();

        let baseline = missing(&universe, &produced, &none).unwrap();
        let narrowed = missing(&universe, &produced, &excluded).unwrap();
        let baseline_ids: Vec<_> = baseline.iter().map(|p| p.id.as_str()).collect();
        assert!(narrowed.len() <= baseline.len());
        for p in &narrowed {
            assert!(baseline_ids.contains(&p.id.as_str()));
        }
    }

    #[test]
    fn matching_returns_second_collections_copy() {
        let a = vec![pair("a1", 1), pair("a2", 2)];
        let b = FingerprintIndex::build(&[pair("b2", 2), pair("b3", 3)]).unwrap();
        let result = matching(&a, &b).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "b2");
    }

    #[test]
    fn contains_all_is_reflexive_and_monotonic() {
        let set = vec![pair("p1", 1), pair("p2", 2)];
        let index = FingerprintIndex::build(&set).unwrap();
        assert!(contains_all(&index, &set).unwrap());

        // Adding elements to `have` preserves containment.
        let mut grown = set.clone();
        grown.push(pair("p3", 3));
        let grown_index = FingerprintIndex::build(&grown).unwrap();
        assert!(contains_all(&grown_index, &set).unwrap());

        // But `want` growing past `have` breaks it.
        assert!(!contains_all(&index, &grown).unwrap());
    }

    #[test]
    fn difference_lists_unmatched_want_entries() {
        let have = FingerprintIndex::build(&[pair("h1", 1), pair("h2", 2)]).unwrap();
        let want = vec![pair("w1", 1), pair("w2", 2), pair("w3", 3)];
        let result = difference(&have, &want).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "w3");
    }

    #[test]
    fn duplicate_fingerprints_collapse_last_write_wins() {
        let twins = vec![pair("first", 1), pair("second", 1)];
        let index = FingerprintIndex::build(&twins).unwrap();
        assert_eq!(index.len(), 1);
        let fp = product_fingerprint(&twins[0]).unwrap();
        assert_eq!(index.get(&fp).unwrap().id, "second");
    }

    #[test]
    fn duplicate_universe_entries_yield_the_later_copy() {
        let universe = vec![pair("first", 1), pair("u2", 2), pair("second", 1)];
        let result = missing(
            &universe,
            &FingerprintIndex::default(),
            &FingerprintIndex::default(),
        )
        .unwrap();
        let ids: Vec<_> = result.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["second", "u2"]);
    }

    #[test]
    fn products_without_scene_sets_are_skipped() {
        let mut bare = pair("bare", 1);
        bare.metadata = Metadata::default();
        let universe = vec![bare, pair("u2", 2)];
        let result = missing(&universe, &FingerprintIndex::default(), &FingerprintIndex::default())
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "u2");
    }

    #[test]
    fn corrupt_identifier_aborts_the_operation() {
        let bad = product("bad", &["not-a-scene-id"], &["S1A_20190101T120000"]);
        assert!(FingerprintIndex::build(&[bad]).is_err());
    }
}
