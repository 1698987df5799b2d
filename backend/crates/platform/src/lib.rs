//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Cryptographic utilities (SHA-256, HMAC, Base64)
//! - Client identification (client IP, lock keys)
//! - Cookie lookup
//! - Striped lock pool

pub mod client;
pub mod cookie;
pub mod crypto;
pub mod lock;
