#![deny(clippy::all, clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![cfg_attr(
    test,
    allow(
        clippy::useless_vec,
        clippy::uninlined_format_args,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )
)]
#![allow(clippy::module_name_repetitions)]
//
// Documentation lints: internal helpers are self-describing; public APIs carry docs.
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
//
// Builders take owned values and return Self without must_use.
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::manual_let_else)]

//! Management-identifier allocation, repair and ordering for a video catalog.
//!
//! Every content record gets a human-readable `YYMMDD-NN` identifier: a date
//! bucket in a fixed UTC offset plus a sequence that is unique and increasing
//! within that bucket (and partition). This crate owns three pieces:
//!
//! - [`Catalog::create_record`]: allocation inside the insert's `BEGIN IMMEDIATE` transaction.
//! - [`Catalog::repair`]: backfill for rows stored without an identifier.
//! - [`ordering::order`]: display ordering over mixed-quality identifiers.

/// The vidcat-core crate version (matches `Cargo.toml`).
pub const VIDCAT_CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod bucket;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod error;
pub mod ordering;
mod store;
pub mod types;

pub use bucket::{BucketClock, DateBucket};
pub use catalog::Catalog;
pub use config::CatalogConfig;
pub use constants::*;
pub use error::{CatalogError, Result};
pub use ordering::{OrderingFields, OrderingStage, PIPELINE, SortKey, compare, order, parse_sort_key};
pub use types::{
    BucketSummary, ContentRecord, IdentifierAudit, ImportOptions, ImportRecord, ListQuery,
    ManagementId, NewRecord, NewRecordBuilder, RepairAssignment, RepairMode, RepairOptions,
    RepairPlan, RepairReport, RepairResponse, is_blank,
};
