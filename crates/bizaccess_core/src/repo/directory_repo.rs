//! Read-only lookups for entities referenced by access grants.
//!
//! # Responsibility
//! - Resolve tenants in the platform registry.
//! - Resolve users, tenant roles and sites in the tenant region, and
//!   platform roles in the registry.
//!
//! # Invariants
//! - Soft-deleted rows (`is_deleted = 1`) are reported as absent.
//! - Region lookups are scoped by the bound `business_id`.

use super::access_repo::RepoResult;
use crate::model::directory::{
    BusinessRecord, RoleRecord, RoleScope, SiteRecord, UserRecord,
};
use rusqlite::{params, Connection, OptionalExtension, Params, Row};

/// Platform-level tenant registry.
pub trait TenantRegistry {
    fn get_business(&self, business_id: &str) -> RepoResult<Option<BusinessRecord>>;
}

/// Existence lookups used while validating a grant request.
pub trait DirectoryLookup {
    fn get_user(&self, user_id: &str) -> RepoResult<Option<UserRecord>>;
    /// Tenant-defined role.
    fn get_role_details(&self, role_id: &str) -> RepoResult<Option<RoleRecord>>;
    /// Platform-defined role.
    fn get_platform_role(&self, role_id: &str) -> RepoResult<Option<RoleRecord>>;
    fn get_site(&self, site_id: &str) -> RepoResult<Option<SiteRecord>>;
}

/// SQLite-backed tenant registry over the platform database.
pub struct SqliteTenantRegistry<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTenantRegistry<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl TenantRegistry for SqliteTenantRegistry<'_> {
    fn get_business(&self, business_id: &str) -> RepoResult<Option<BusinessRecord>> {
        query_optional(
            self.conn,
            "SELECT business_id, business_name
             FROM businesses
             WHERE business_id = ?1 AND is_deleted = 0;",
            params![business_id],
            |row| {
                Ok(BusinessRecord {
                    business_id: row.get(0)?,
                    business_name: row.get(1)?,
                })
            },
        )
    }
}

/// SQLite-backed directory spanning the region and platform databases.
pub struct SqliteDirectory<'conn> {
    region: &'conn Connection,
    platform: &'conn Connection,
    business_id: String,
}

impl<'conn> SqliteDirectory<'conn> {
    pub fn new(
        region: &'conn Connection,
        platform: &'conn Connection,
        business_id: impl Into<String>,
    ) -> Self {
        Self {
            region,
            platform,
            business_id: business_id.into(),
        }
    }
}

impl DirectoryLookup for SqliteDirectory<'_> {
    fn get_user(&self, user_id: &str) -> RepoResult<Option<UserRecord>> {
        query_optional(
            self.region,
            "SELECT user_id, user_name
             FROM users
             WHERE business_id = ?1 AND user_id = ?2 AND is_deleted = 0;",
            params![self.business_id, user_id],
            |row| {
                Ok(UserRecord {
                    user_id: row.get(0)?,
                    user_name: row.get(1)?,
                })
            },
        )
    }

    fn get_role_details(&self, role_id: &str) -> RepoResult<Option<RoleRecord>> {
        query_optional(
            self.region,
            "SELECT role_id, role_name
             FROM roles
             WHERE business_id = ?1 AND role_id = ?2 AND is_deleted = 0;",
            params![self.business_id, role_id],
            |row| role_from_row(row, RoleScope::Tenant),
        )
    }

    fn get_platform_role(&self, role_id: &str) -> RepoResult<Option<RoleRecord>> {
        query_optional(
            self.platform,
            "SELECT role_id, role_name
             FROM sys_roles
             WHERE role_id = ?1 AND is_deleted = 0;",
            params![role_id],
            |row| role_from_row(row, RoleScope::Platform),
        )
    }

    fn get_site(&self, site_id: &str) -> RepoResult<Option<SiteRecord>> {
        query_optional(
            self.region,
            "SELECT site_id, site_name
             FROM sites
             WHERE business_id = ?1 AND site_id = ?2 AND is_deleted = 0;",
            params![self.business_id, site_id],
            |row| {
                Ok(SiteRecord {
                    site_id: row.get(0)?,
                    site_name: row.get(1)?,
                })
            },
        )
    }
}

fn role_from_row(row: &Row<'_>, scope: RoleScope) -> rusqlite::Result<RoleRecord> {
    Ok(RoleRecord {
        role_id: row.get(0)?,
        role_name: row.get(1)?,
        scope,
    })
}

fn query_optional<T, P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
    map: impl FnOnce(&Row<'_>) -> rusqlite::Result<T>,
) -> RepoResult<Option<T>> {
    let record = conn.query_row(sql, params, map).optional()?;
    Ok(record)
}
