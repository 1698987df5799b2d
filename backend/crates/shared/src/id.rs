//! Common ID Types
//!
//! Type-safe ID wrappers for domain entities.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::str::FromStr;
use uuid::Uuid;

/// Generic typed ID wrapper
///
/// Serializes as the bare UUID string. The marker only exists at compile
/// time, so an `Id<ExamSession>` cannot be passed where an `Id<ExamRequest>`
/// is expected.
///
/// Usage:
/// ```
/// use kernel::id::{Id, markers};
/// type SessionId = Id<markers::ExamSession>;
/// let id = SessionId::new();
/// assert_eq!(id, SessionId::from_uuid(*id.as_uuid()));
/// ```
pub struct Id<T> {
    value: Uuid,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    /// Create a new random ID (UUID v4)
    pub fn new() -> Self {
        Self::from_uuid(Uuid::new_v4())
    }

    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self {
            value: uuid,
            _marker: PhantomData,
        }
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.value
    }

    pub fn into_uuid(self) -> Uuid {
        self.value
    }
}

// Manual impls: derives would require the marker type itself to be Clone/Eq/Hash.
impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Eq for Id<T> {}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T> Default for Id<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.value)
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.value, f)
    }
}

impl<T> From<Uuid> for Id<T> {
    fn from(uuid: Uuid) -> Self {
        Self::from_uuid(uuid)
    }
}

impl<T> FromStr for Id<T> {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self::from_uuid)
    }
}

impl<T> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Uuid::deserialize(deserializer).map(Self::from_uuid)
    }
}

/// Marker types for typed IDs
pub mod markers {
    /// One exam attempt
    pub struct ExamSession;
    /// Idempotency key of a next-question / check-answer call
    pub struct ExamRequest;
    pub struct User;
}

pub type ExamSessionId = Id<markers::ExamSession>;
pub type ExamRequestId = Id<markers::ExamRequest>;
pub type UserId = Id<markers::User>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_id_creation() {
        let id1: ExamSessionId = Id::new();
        let id2: ExamSessionId = Id::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_id_from_uuid() {
        let uuid = Uuid::new_v4();
        let id: UserId = Id::from_uuid(uuid);
        assert_eq!(*id.as_uuid(), uuid);
        assert_eq!(id.into_uuid(), uuid);
    }

    #[test]
    fn test_id_serde_is_bare_uuid() {
        let id: ExamRequestId = "6f1c3c1e-6a2b-4a47-9d1e-0b4f8c3d2a11".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"6f1c3c1e-6a2b-4a47-9d1e-0b4f8c3d2a11\"");

        let back: ExamRequestId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_id_hashes_by_value() {
        let id: ExamSessionId = Id::new();
        let set: HashSet<_> = [id, id, Id::from_uuid(*id.as_uuid())].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_id_rejects_malformed() {
        assert!("not-a-uuid".parse::<ExamSessionId>().is_err());
    }
}
