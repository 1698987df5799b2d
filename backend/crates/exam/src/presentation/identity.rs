//! Request identity
//!
//! The exam module does not authenticate anyone itself. Behind a gateway
//! that has already authenticated the caller, the user id can be taken
//! from a header the gateway sets.

use crate::error::{ExamError, ExamResult};
use axum::http::HeaderMap;
use kernel::id::UserId;

/// Header set by the trusted gateway
pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdentityResolver {
    /// Every request is anonymous
    #[default]
    Anonymous,
    /// Trust `x-user-id`
    TrustedHeader,
}

impl IdentityResolver {
    pub fn resolve(&self, headers: &HeaderMap) -> ExamResult<Option<UserId>> {
        match self {
            IdentityResolver::Anonymous => Ok(None),
            IdentityResolver::TrustedHeader => {
                let Some(value) = headers.get(USER_ID_HEADER) else {
                    return Ok(None);
                };
                value
                    .to_str()
                    .ok()
                    .and_then(|raw| raw.trim().parse::<UserId>().ok())
                    .map(Some)
                    .ok_or_else(|| {
                        ExamError::MalformedRequest(format!("{USER_ID_HEADER} is not a valid id"))
                    })
            }
        }
    }
}
