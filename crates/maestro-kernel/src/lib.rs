//! Maestro Kernel
//!
//! Core types and contracts for the Maestro multi-agent orchestration engine.
//! This crate defines data models and traits only; concrete implementations
//! (planner, router, engine, stores) live in `maestro-foundation`.

// error module
pub mod error;

// plan model
pub mod plan;

// workflow state
pub mod state;

// agent executor contract
pub mod agent;

// agent registry
pub mod registry;

// store contracts
pub mod store;

// approval gate types
pub mod approval;

// workflow events
pub mod event;

// engine configuration
pub mod config;

// Re-export the types most callers need
pub use agent::{AgentExecutor, AgentOutput, AgentStatus, AgentTask, CollaborationHints};
pub use approval::{ApprovalRequest, ApprovalResolution, Decision, PendingApproval};
pub use config::{ComplexityThresholds, EngineConfig, PlannerMode};
pub use error::{EngineError, EngineResult};
pub use event::WorkflowEvent;
pub use plan::{ExecutionPlan, Step, StepGuard, StepShape, StepStatus};
pub use registry::{AgentRegistry, AgentRegistryBuilder};
pub use state::{
    SCHEMA_VERSION, StepFailure, WorkflowMetadata, WorkflowState, WorkflowStatus,
};
pub use store::{
    ApprovalStore, PlanMemoryEntry, PlanMemoryStore, ScoredMemory, StateStore, StoreError,
    StoreResult, filter_success,
};
