//! Per-AOI tag state machine.
//!
//! For each (AOI, orbit-pair) scope the state is derived from set
//! relationships among the acquisition-list, interferogram, and blacklist
//! collections, then applied to every interferogram product as a single
//! `{aoi}_{state}` tag. The rewrite is strip-then-append over the full
//! tag list, so applying the same state any number of times leaves
//! exactly one state tag per AOI.

use std::collections::HashSet;
use std::fmt;

use anyhow::Result;
use tracing::debug;

use crate::fingerprint::FingerprintError;
use crate::models::Product;
use crate::reconcile::{contains_all, matching, FingerprintIndex};
use crate::store::ProductStore;

/// Tag suffixes for the three persisted states. An AOI state tag is
/// `{aoi}_{suffix}`; at most one may exist per AOI per product.
pub const STATE_SUFFIXES: [&str; 3] = ["invalid", "validated", "in-progress"];

/// Outcome of one (AOI, orbit-pair) evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AoiState {
    /// A blacklist product matches the acquisition list.
    Invalid,
    /// Every acquisition-list entry has a produced interferogram.
    Validated,
    /// Coverage is partial.
    InProgress,
    /// No acquisition-list products in scope; terminal, never persisted.
    Skipped,
}

impl AoiState {
    /// Tag suffix for persisted states; `None` for [`AoiState::Skipped`].
    pub fn suffix(self) -> Option<&'static str> {
        match self {
            AoiState::Invalid => Some("invalid"),
            AoiState::Validated => Some("validated"),
            AoiState::InProgress => Some("in-progress"),
            AoiState::Skipped => None,
        }
    }

    /// The full state tag for an AOI, or `None` for skipped scopes.
    pub fn tag(self, aoi: &str) -> Option<String> {
        self.suffix().map(|s| format!("{aoi}_{s}"))
    }
}

impl fmt::Display for AoiState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AoiState::Invalid => "invalid",
            AoiState::Validated => "validated",
            AoiState::InProgress => "in-progress",
            AoiState::Skipped => "skipped",
        })
    }
}

/// Derive the AOI state from the three scoped collections.
///
/// ```text
/// acq empty                     -> Skipped
/// matching(blk, acq) non-empty  -> Invalid
/// contains_all(ifg, acq)        -> Validated
/// otherwise                     -> InProgress
/// ```
pub fn derive_state(
    acq: &[Product],
    ifg: &FingerprintIndex,
    blk: &[Product],
) -> Result<AoiState, FingerprintError> {
    if acq.is_empty() {
        return Ok(AoiState::Skipped);
    }
    let acq_index = FingerprintIndex::build(acq)?;
    if !matching(blk, &acq_index)?.is_empty() {
        return Ok(AoiState::Invalid);
    }
    if contains_all(ifg, acq)? {
        return Ok(AoiState::Validated);
    }
    Ok(AoiState::InProgress)
}

fn is_state_tag(tag: &str, aoi: &str) -> bool {
    tag.strip_prefix(aoi)
        .and_then(|rest| rest.strip_prefix('_'))
        .map(|suffix| STATE_SUFFIXES.contains(&suffix))
        .unwrap_or(false)
}

/// Rewrite a product's tag list for a new AOI state.
///
/// Strips every existing state tag for this AOI (duplicates included),
/// appends the new one, and de-duplicates the whole list preserving first
/// occurrence. Tags belonging to other AOIs, and non-state tags, pass
/// through untouched.
pub fn rewrite_tags(current: &[String], aoi: &str, state: AoiState) -> Vec<String> {
    let mut out: Vec<String> = current
        .iter()
        .filter(|t| !is_state_tag(t, aoi))
        .cloned()
        .collect();
    if let Some(tag) = state.tag(aoi) {
        out.push(tag);
    }
    let mut seen = HashSet::new();
    out.retain(|t| seen.insert(t.clone()));
    out
}

/// Apply a derived state to every product in the interferogram collection.
///
/// Each product's tag list is re-fetched from the backing store
/// immediately before mutation; a prior AOI pass in the same run may have
/// already rewritten it. Persisting stores the full list, never a delta.
/// Returns the number of products tagged; [`AoiState::Skipped`] tags
/// nothing.
pub async fn apply_state(
    store: &dyn ProductStore,
    aoi: &str,
    state: AoiState,
    products: &[Product],
) -> Result<u64> {
    if state == AoiState::Skipped {
        return Ok(0);
    }
    let mut tagged = 0u64;
    for product in products {
        let current = store.fetch_tags(&product.index, &product.id).await?;
        let next = rewrite_tags(&current, aoi, state);
        store.put_tags(&product.index, &product.id, &next).await?;
        debug!(product = %product.id, aoi, %state, "updated state tag");
        tagged += 1;
    }
    Ok(tagged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Metadata, SceneId};

    fn pair(id: &str, n: u32) -> Product {
        Product {
            id: id.to_string(),
            index: "grq_v2.0_s1-ifg".to_string(),
            starttime: None,
            endtime: None,
            metadata: Metadata {
                reference_scenes: Some(vec![SceneId::id(format!("S1A_201901{n:02}T120000"))]),
                secondary_scenes: Some(vec![SceneId::id(format!("S1A_201902{n:02}T120000"))]),
                ..Default::default()
            },
        }
    }

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_acq_is_skipped() {
        let ifg = FingerprintIndex::build(&[pair("i1", 1)]).unwrap();
        let state = derive_state(&[], &ifg, &[pair("b1", 1)]).unwrap();
        assert_eq!(state, AoiState::Skipped);
        assert_eq!(state.tag("aoi_alpha"), None);
    }

    #[test]
    fn blacklist_match_wins_over_full_coverage() {
        let acq = vec![pair("a1", 1), pair("a2", 2), pair("a3", 3)];
        let ifg = FingerprintIndex::build(&acq).unwrap();
        let blk = vec![pair("b1", 1)];
        assert_eq!(derive_state(&acq, &ifg, &blk).unwrap(), AoiState::Invalid);
    }

    #[test]
    fn full_coverage_without_blacklist_is_validated() {
        let acq = vec![pair("a1", 1), pair("a2", 2), pair("a3", 3)];
        let ifg = FingerprintIndex::build(&[pair("i1", 1), pair("i2", 2), pair("i3", 3)]).unwrap();
        assert_eq!(derive_state(&acq, &ifg, &[]).unwrap(), AoiState::Validated);
    }

    #[test]
    fn partial_coverage_is_in_progress() {
        let acq = vec![pair("a1", 1), pair("a2", 2), pair("a3", 3)];
        let ifg = FingerprintIndex::build(&[pair("i1", 1), pair("i2", 2)]).unwrap();
        assert_eq!(derive_state(&acq, &ifg, &[]).unwrap(), AoiState::InProgress);
    }

    #[test]
    fn rewrite_replaces_previous_state_tag() {
        let current = tags(&["ops_review", "aoi_alpha_in-progress"]);
        let next = rewrite_tags(&current, "aoi_alpha", AoiState::Validated);
        assert_eq!(next, tags(&["ops_review", "aoi_alpha_validated"]));
    }

    #[test]
    fn rewrite_is_idempotent() {
        let once = rewrite_tags(
            &tags(&["aoi_alpha_invalid"]),
            "aoi_alpha",
            AoiState::Validated,
        );
        let twice = rewrite_tags(&once, "aoi_alpha", AoiState::Validated);
        assert_eq!(once, twice);
        let state_tags: Vec<_> = twice
            .iter()
            .filter(|t| is_state_tag(t, "aoi_alpha"))
            .collect();
        assert_eq!(state_tags.len(), 1);
    }

    #[test]
    fn rewrite_drops_duplicate_state_tags() {
        let current = tags(&[
            "aoi_alpha_validated",
            "aoi_alpha_validated",
            "aoi_alpha_in-progress",
        ]);
        let next = rewrite_tags(&current, "aoi_alpha", AoiState::Invalid);
        assert_eq!(next, tags(&["aoi_alpha_invalid"]));
    }

    #[test]
    fn other_aois_are_untouched() {
        let current = tags(&["aoi_beta_validated", "aoi_alpha_in-progress"]);
        let next = rewrite_tags(&current, "aoi_alpha", AoiState::Invalid);
        assert_eq!(next, tags(&["aoi_beta_validated", "aoi_alpha_invalid"]));
    }

    #[test]
    fn aoi_prefix_matching_is_exact() {
        // "aoi_alpha2_validated" is a different AOI's tag, not ours.
        let current = tags(&["aoi_alpha2_validated"]);
        let next = rewrite_tags(&current, "aoi_alpha", AoiState::Validated);
        assert_eq!(
            next,
            tags(&["aoi_alpha2_validated", "aoi_alpha_validated"])
        );
    }
}
