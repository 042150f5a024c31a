//! Maestro Foundation
//!
//! Concrete building blocks of the Maestro orchestration engine: the
//! three-tier planner, the pure router, the workflow engine with
//! checkpoint/resume and approval gates, the approval manager, and the
//! store backends (in-memory and file-backed).

// planner module - complexity classification and plan synthesis
pub mod planner;

// router module - pure state -> next-node function
pub mod router;

// engine module - the execution loop
pub mod engine;

// approval module - pending approval bookkeeping
pub mod approval;

// stores module - state/memory/approval backends
pub mod stores;

// Re-export the main entry points
pub use approval::ApprovalManager;
pub use engine::{RecoveryReport, RunOutcome, WorkflowEngine};
pub use planner::Planner;
pub use router::{Route, route};
pub use stores::{FileStore, InMemoryStore};
