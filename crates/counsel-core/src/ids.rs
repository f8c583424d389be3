//! Tenant and entity identifiers.
//!
//! Every persistent entity in the core carries a [`TenantId`] for isolation and
//! an [`EntityId`] for identity. Both wrap a UUIDv7 so identifiers are
//! monotonically time-ordered: sorting a collection of entities by `EntityId`
//! recovers insertion order without a separate sequence column.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tenant-scoped identifier. Never comparable to [`EntityId`] at the type
/// level, so a call site that expects both cannot accidentally swap them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(Uuid);

impl TenantId {
    /// Generates a new time-ordered tenant identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Wraps an existing UUID as a tenant identifier.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TenantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A monotonic, time-ordered identifier for any entity in the data model
/// (conversation, message, invocation, document, policy review, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Generates a new time-ordered entity identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Wraps an existing UUID as an entity identifier.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_ids_sort_in_creation_order() {
        let a = EntityId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = EntityId::new();
        assert!(a < b, "later-created EntityId must sort greater");
    }

    #[test]
    fn tenant_and_entity_ids_are_distinct_types() {
        let tenant = TenantId::new();
        let entity = EntityId::from_uuid(tenant.as_uuid());
        // Same underlying UUID, but the types cannot be compared directly;
        // this test documents that the conversion is explicit, not implicit.
        assert_eq!(tenant.as_uuid(), entity.as_uuid());
    }
}
