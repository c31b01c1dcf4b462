//! Privilege tier resolution.
//!
//! DESIGN
//! ======
//! A user is an administrator when their role record says `"admin"`, or,
//! when no such record grants it, when their email equals the configured
//! bootstrap admin email. Anything that cannot be confirmed (missing
//! identity, lookup failure) resolves to [`Role::Regular`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::identity::Identity;

/// Collection holding one role record per user id.
pub const USERS_COLLECTION: &str = "users";

const ADMIN_ROLE: &str = "admin";

// =============================================================================
// ROLE
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// No identity event has been processed yet.
    #[default]
    Unknown,
    /// Lookup in flight for the current identity.
    Resolving,
    Regular,
    Administrator,
}

impl Role {
    #[must_use]
    pub fn is_admin(self) -> bool {
        matches!(self, Self::Administrator)
    }
}

/// Per-user document declaring administrative privilege.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    #[serde(default)]
    pub role: Option<String>,
}

impl RoleRecord {
    #[must_use]
    pub fn with_role(role: impl Into<String>) -> Self {
        Self { role: Some(role.into()) }
    }

    fn grants_admin(&self) -> bool {
        self.role.as_deref() == Some(ADMIN_ROLE)
    }
}

// =============================================================================
// DOCUMENT STORE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Transport failure, permission denial, or an unreadable document.
    #[error("document store unavailable: {0}")]
    Unavailable(String),
}

/// Remote document store holding role records. Enables mocking in tests.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch the role record stored under `collection/key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the store cannot be queried.
    async fn get_document(&self, collection: &str, key: &str) -> Result<Option<RoleRecord>, StoreError>;
}

// =============================================================================
// RESOLVER
// =============================================================================

#[derive(Clone)]
pub struct RoleResolver {
    store: Arc<dyn DocumentStore>,
    admin_email: Option<String>,
}

impl RoleResolver {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, admin_email: Option<String>) -> Self {
        Self { store, admin_email }
    }

    /// Resolve the privilege tier of `identity`. Returns only
    /// [`Role::Administrator`] or [`Role::Regular`].
    pub async fn resolve(&self, identity: Option<&Identity>) -> Role {
        let Some(identity) = identity else {
            return Role::Regular;
        };

        let record = match self
            .store
            .get_document(USERS_COLLECTION, &identity.uid)
            .await
        {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(error = %e, uid = %identity.uid, "role lookup failed; treating as regular user");
                return Role::Regular;
            }
        };

        if record.as_ref().is_some_and(RoleRecord::grants_admin) {
            tracing::debug!(uid = %identity.uid, "role record grants admin");
            return Role::Administrator;
        }

        if self.admin_email.as_deref() == Some(identity.email.as_str()) {
            tracing::info!(uid = %identity.uid, "bootstrap admin email matched");
            return Role::Administrator;
        }

        Role::Regular
    }
}

#[cfg(test)]
#[path = "role_test.rs"]
mod tests;
