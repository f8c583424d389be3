//! Channel identity: `(tenant, scope, resource)` namespaces both the
//! broadcast topic and the replay store so isolation is structural.

use std::fmt;

use counsel_core::{EntityId, TenantId};
use serde::{Deserialize, Serialize};

/// The kind of resource a channel carries events for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChannelScope {
    Conversation,
    PolicyReview,
    User,
}

impl fmt::Display for ChannelScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChannelScope::Conversation => "conversation",
            ChannelScope::PolicyReview => "policy-review",
            ChannelScope::User => "user",
        };
        write!(f, "{s}")
    }
}

/// An opaque, tenant-scoped channel identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Channel {
    tenant_id: TenantId,
    scope: ChannelScope,
    resource_id: EntityId,
}

impl Channel {
    /// Builds a channel for a conversation's event stream.
    pub fn conversation(tenant_id: TenantId, conversation_id: EntityId) -> Self {
        Self { tenant_id, scope: ChannelScope::Conversation, resource_id: conversation_id }
    }

    /// Builds a channel for a policy review's event stream.
    pub fn policy_review(tenant_id: TenantId, review_id: EntityId) -> Self {
        Self { tenant_id, scope: ChannelScope::PolicyReview, resource_id: review_id }
    }

    /// Builds a channel for a user's push-notification stream.
    pub fn user(tenant_id: TenantId, user_id: EntityId) -> Self {
        Self { tenant_id, scope: ChannelScope::User, resource_id: user_id }
    }

    /// The tenant this channel belongs to.
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// The opaque key used to namespace both the broadcast topic and the
    /// replay store. Two channels with the same scope/resource but
    /// different tenants always produce different keys.
    pub fn key(&self) -> String {
        format!("{}:{}:{}", self.tenant_id, self.scope, self.resource_id)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}
