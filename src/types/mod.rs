//! Public types exposed by the `vidcat-core` crate.

pub mod audit;
pub mod identifier;
pub mod record;
pub mod repair;

pub use audit::{BucketSummary, IdentifierAudit};
pub use identifier::{ManagementId, is_blank};
pub use record::{
    ContentRecord, ImportOptions, ImportRecord, ListQuery, NewRecord, NewRecordBuilder,
};
pub use repair::{
    RepairAssignment, RepairMode, RepairOptions, RepairPlan, RepairReport, RepairResponse,
};
