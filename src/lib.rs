//! # ifg-reconcile
//!
//! Set reconciliation, failure denylisting, and AOI tagging for a SAR
//! interferogram processing pipeline.
//!
//! The pipeline enumerates acquisition plans (expected interferograms),
//! produces interferograms from them, and needs three ongoing answers:
//! which expected products are still missing, which of those belong to
//! permanently failed jobs (and must be denylisted so they are never
//! retried), and how the produced interferograms should be labeled per
//! area of interest (validated / invalid / in-progress).
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐   ┌──────────────────┐
//! │ Failure          │   │ Tag State        │
//! │ Classifier       │   │ Machine          │
//! └────────┬─────────┘   └────────┬─────────┘
//!          └─────────┬────────────┘
//!                    ▼
//!          ┌──────────────────┐
//!          │  Set Reconciler  │
//!          └────────┬─────────┘
//!                   ▼
//!          ┌──────────────────┐
//!          │ Scene Fingerprint│
//!          └──────────────────┘
//! ```
//!
//! Products are identified by a content-addressed [`fingerprint`] over
//! their reference and secondary scene sets; the [`reconcile`] module
//! answers missing/matching/containment queries over fingerprint-keyed
//! collections; [`classify`] confirms which missing products correspond
//! to terminally failed jobs; and [`tag`] derives and applies per-AOI
//! state tags idempotently.
//!
//! External collaborators (the search cluster, job registry, product
//! ingest, and job submission endpoints) are invoked only at the edges,
//! in [`query`] and [`submit`].
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`fingerprint`] | Canonical scene-set digests |
//! | [`reconcile`] | Fingerprint-keyed set operations |
//! | [`classify`] | Terminally-failed-job classification |
//! | [`tag`] | Per-AOI tag state machine |
//! | [`tagger`] | AOI tagging pipeline |
//! | [`denylist`] | Denylist generation pipeline |
//! | [`from_job`] | Denylist/greylist from a single failed job |
//! | [`enumerate`] | Re-enumeration from denylist products |
//! | [`query`] | Search cluster / job registry client |
//! | [`store`] | Tag persistence seam |
//! | [`product`] | Exclusion product drafts and writer |
//! | [`submit`] | Ingest and job submission |
//! | [`config`] | TOML configuration |
//! | [`context`] | Per-run JSON context |

pub mod classify;
pub mod config;
pub mod context;
pub mod denylist;
pub mod enumerate;
pub mod fingerprint;
pub mod from_job;
pub mod models;
pub mod product;
pub mod query;
pub mod reconcile;
pub mod store;
pub mod submit;
pub mod tag;
pub mod tagger;
