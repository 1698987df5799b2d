//! Domain Layer - Business logic and entities
//!
//! This layer contains:
//! - Domain entities (SessionRecord, Question, ExamSummary)
//! - Domain value objects (ExamMode, Difficulty, EventKind, limits)
//! - Domain services (heartbeat, violations, termination, scoring, selection)
//! - Repository traits (session store and collaborators)

pub mod entities;
pub mod repository;
pub mod services;
pub mod value_objects;
