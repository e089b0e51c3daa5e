//! Per-request, per-step execution snapshots: audit trail, timeline
//! projection, and compliance export for everything that passed through
//! the gateway.

pub mod error;
pub mod repository;
pub mod store;
pub mod types;

pub use error::ReplayError;
pub use repository::{NullRepository, PostgresRepository, Repository};
pub use store::ExecutionReplayStore;
pub use types::{
    ComplianceFramework, ExecutionExport, ExecutionFilter, ExecutionSnapshot, ExecutionStatus, ExecutionSummary,
    ExportOptions, Pagination, StepStatus, TimelineEntry,
};
