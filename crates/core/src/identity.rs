//! Caller identity: who a token subject is, and which tenant and role they act under.

use crate::error::StoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A resolved user. All data access is scoped by `tenant_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub tenant_id: String,
    /// Business role (e.g. "account_manager"); used to filter knowledge and
    /// injected into the persona prompt.
    pub role: String,
}

impl UserProfile {
    pub fn new(
        user_id: impl Into<String>,
        tenant_id: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            tenant_id: tenant_id.into(),
            role: role.into(),
        }
    }
}

/// Lookup of users by the subject of their access token.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Resolve a user ID. `Ok(None)` means the user is unknown.
    async fn lookup(&self, user_id: &str) -> std::result::Result<Option<UserProfile>, StoreError>;

    /// Insert or replace a user. Used for seeding and tests.
    async fn upsert_user(&self, profile: UserProfile) -> std::result::Result<(), StoreError>;
}
