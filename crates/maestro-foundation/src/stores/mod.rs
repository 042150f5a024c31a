//! Store Backends
//!
//! Implementations of the kernel store contracts: an in-memory backend for
//! tests and development, and a file-backed one for durable deployments.
//! Both implement all three contracts (`StateStore`, `PlanMemoryStore`,
//! `ApprovalStore`) on a single struct so one backend serves a whole engine.

pub mod file;
pub mod memory;
pub mod similarity;

pub use file::FileStore;
pub use memory::InMemoryStore;
pub use similarity::{EMBEDDING_DIM, cosine_similarity, embed};
