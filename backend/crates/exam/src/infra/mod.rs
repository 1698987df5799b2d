//! Infrastructure Layer
//!
//! Session store, collaborator implementations and database access.

pub mod memory;
pub mod memory_store;
pub mod postgres;

pub use memory::MemoryExamRepository;
pub use memory_store::{ExpiringSessionStore, spawn_sweeper};
pub use postgres::PgExamRepository;
