//! Access grant domain model.
//!
//! # Responsibility
//! - Define the stored binding of a user to a role, optionally per site.
//! - Define the typed request accepted by grant operations.
//!
//! # Invariants
//! - `access_id` is derived, never caller-supplied.
//! - A stored grant references at least one of `role_id` /
//!   `platform_role_id`.
//! - `business_id` is the owning tenant and never changes.

use super::checksum::derive_access_id;
use serde::{Deserialize, Serialize};

/// Derived identifier of one access grant.
pub type AccessId = String;

/// Stored binding of a user to a role, optionally scoped to a site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGrant {
    pub access_id: AccessId,
    /// Owning tenant.
    pub business_id: String,
    pub user_id: String,
    /// Tenant-defined role.
    pub role_id: Option<String>,
    /// Platform-defined role.
    pub platform_role_id: Option<String>,
    /// `None` means the grant applies regardless of site.
    pub site_id: Option<String>,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms update timestamp; bumped on every re-grant.
    pub updated_at: i64,
}

impl AccessGrant {
    pub fn is_site_scoped(&self) -> bool {
        self.site_id.is_some()
    }
}

/// Caller input for granting a permission.
///
/// Fields are optional so that presence can be validated in a fixed order
/// by the grant manager rather than at deserialization time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantRequest {
    pub user_id: Option<String>,
    pub role_id: Option<String>,
    pub platform_role_id: Option<String>,
    pub site_id: Option<String>,
}

impl GrantRequest {
    /// Starts a request for `user_id`.
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::default()
        }
    }

    pub fn with_role(mut self, role_id: impl Into<String>) -> Self {
        self.role_id = Some(role_id.into());
        self
    }

    pub fn with_platform_role(mut self, platform_role_id: impl Into<String>) -> Self {
        self.platform_role_id = Some(platform_role_id.into());
        self
    }

    pub fn at_site(mut self, site_id: impl Into<String>) -> Self {
        self.site_id = Some(site_id.into());
        self
    }
}

/// Validated grant content handed to the record store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantFields {
    pub access_id: AccessId,
    pub user_id: String,
    pub role_id: Option<String>,
    pub platform_role_id: Option<String>,
    pub site_id: Option<String>,
}

impl GrantFields {
    /// Builds store fields with the access id derived from user and site.
    pub fn derive(
        user_id: impl Into<String>,
        role_id: Option<String>,
        platform_role_id: Option<String>,
        site_id: Option<String>,
    ) -> Self {
        let user_id = user_id.into();
        let access_id = derive_access_id(&user_id, site_id.as_deref());
        Self {
            access_id,
            user_id,
            role_id,
            platform_role_id,
            site_id,
        }
    }
}
