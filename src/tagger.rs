//! AOI tagging pipeline.
//!
//! For every AOI covering the trigger product's footprint, fetches the
//! acquisition-list, interferogram, and blacklist products scoped to the
//! AOI's extent and the trigger's orbit, derives the AOI state, and
//! rewrites the state tag on each interferogram product. AOIs are
//! processed one at a time; partial progress from an aborted run is left
//! in place and converges on the next run.

use anyhow::Result;
use tracing::info;

use crate::config::Config;
use crate::context::RunContext;
use crate::query::{aoi_query, scoped_query, GrqClient};
use crate::reconcile::{difference, FingerprintIndex};
use crate::tag::{apply_state, derive_state, AoiState};

/// Result of one AOI evaluation.
#[derive(Debug)]
pub struct AoiOutcome {
    pub aoi: String,
    pub state: AoiState,
    pub tagged: u64,
    /// Acquisition-list entries with no produced interferogram; populated
    /// for in-progress AOIs.
    pub missing: Vec<String>,
}

pub async fn run_tagging(config: &Config, ctx: &RunContext) -> Result<Vec<AoiOutcome>> {
    let grq = GrqClient::new(&config.grq.base_url, config.grq.timeout_secs)?;
    let coordinates = ctx.coordinates()?;
    let orbit = ctx.orbit()?;
    let ifg_index = ctx
        .ifg_index()
        .unwrap_or_else(|_| config.indices.ifg.clone());

    let aois = grq
        .search_aois(&config.indices.aoi, aoi_query(&coordinates))
        .await?;
    info!(count = aois.len(), "AOIs over product extent");

    let mut outcomes = Vec::with_capacity(aois.len());
    for aoi in &aois {
        let scope = scoped_query(
            &orbit,
            aoi.starttime.as_deref(),
            aoi.endtime.as_deref(),
            aoi.location.as_ref(),
        );
        let acq = grq
            .search_products(&config.indices.acq_list, scope.clone())
            .await?;
        let ifg = grq.search_products(&ifg_index, scope.clone()).await?;
        let blk = grq
            .search_products(&config.indices.blacklist, scope)
            .await?;
        info!(
            aoi = %aoi.id,
            acq = acq.len(),
            ifg = ifg.len(),
            blacklist = blk.len(),
            "scoped collections"
        );

        let ifg_index_set = FingerprintIndex::build(&ifg)?;
        let state = derive_state(&acq, &ifg_index_set, &blk)?;
        let missing = if state == AoiState::InProgress {
            difference(&ifg_index_set, &acq)?
                .into_iter()
                .map(|p| p.id)
                .collect()
        } else {
            Vec::new()
        };

        let tagged = apply_state(&grq, &aoi.id, state, &ifg).await?;
        info!(aoi = %aoi.id, %state, tagged, "AOI evaluated");
        outcomes.push(AoiOutcome {
            aoi: aoi.id.clone(),
            state,
            tagged,
            missing,
        });
    }
    Ok(outcomes)
}
