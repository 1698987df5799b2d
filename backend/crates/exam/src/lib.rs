//! Exam Session Integrity Module
//!
//! Clean Architecture structure:
//! - `domain/` - Session record, heartbeat engine, violation accounting, termination rules
//! - `application/` - Use cases, session cache, lock coordination
//! - `infra/` - Expiring session store, in-memory and PostgreSQL collaborators
//! - `presentation/` - HTTP handlers
//!
//! ## Integrity Model
//! - Live sessions exist only in process memory; a restart forgets them
//! - Every read-modify-write of a session runs under its striped lock
//! - Heartbeat tokens are issued by the backend and must be echoed verbatim
//! - Termination flags are sticky for the lifetime of a record
//! - Monitoring only applies to rated exams; free exams get non-committal replies

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::config::{AntiCheatConfig, ExamConfig, SessionStoreConfig};
pub use application::report_event::{EventStrategy, StrategyTable};
pub use error::{ExamError, ExamResult};
pub use infra::memory::MemoryExamRepository;
pub use infra::memory_store::{ExpiringSessionStore, spawn_sweeper};
pub use infra::postgres::PgExamRepository;
pub use presentation::handlers::ExamAppState;
pub use presentation::identity::IdentityResolver;
pub use presentation::router::{exam_router, exam_router_generic};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};
