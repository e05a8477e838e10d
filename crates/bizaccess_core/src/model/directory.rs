//! Read models for entities referenced by access grants.
//!
//! These records are owned by sibling services; the access subsystem only
//! reads them to check existence at grant time.

use serde::{Deserialize, Serialize};

/// Tenant row in the platform registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessRecord {
    pub business_id: String,
    pub business_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: String,
    pub user_name: String,
}

/// Role definition; `scope` tells which collection it was read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    pub role_id: String,
    pub role_name: String,
    pub scope: RoleScope,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteRecord {
    pub site_id: String,
    pub site_name: String,
}

/// Where a role is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleScope {
    /// Defined by the tenant in its region database.
    Tenant,
    /// Defined once for the whole platform.
    Platform,
}
