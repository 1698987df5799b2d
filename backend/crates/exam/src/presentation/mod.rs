//! Presentation Layer
//!
//! HTTP handlers and DTOs for the API.

pub mod dto;
pub mod handlers;
pub mod identity;
pub mod router;
