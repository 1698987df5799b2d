//! Domain services
//!
//! Pure rules over a [`SessionRecord`](crate::domain::entities::SessionRecord).
//! Callers own locking and persistence.

pub mod heartbeat;
pub mod scoring;
pub mod selection;
pub mod termination;
pub mod violations;

pub use heartbeat::{HeartbeatEngine, HeartbeatOutcome, IssuedHeartbeat};
pub use termination::TerminationPolicy;
pub use violations::ViolationAccountant;
