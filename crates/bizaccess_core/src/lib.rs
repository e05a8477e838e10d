//! Tenant access grants for business services.
//! This crate is the single source of truth for grant/revoke invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, DbLocation, ServiceConfig};
pub use db::{DatabaseHandles, DbError, Schema};
pub use logging::{default_log_level, init_logging, init_service_logging, logging_status};
pub use model::access::{AccessGrant, AccessId, GrantFields, GrantRequest};
pub use model::checksum::{checksum_id, derive_access_id, ACCESS_ID_NAMESPACE};
pub use model::directory::{BusinessRecord, RoleRecord, RoleScope, SiteRecord, UserRecord};
pub use repo::access_repo::{
    AccessFilter, AccessListQuery, AccessPage, AccessRepository, AccessSort, RepoError,
    RepoResult, SqliteAccessRepository,
};
pub use repo::directory_repo::{
    DirectoryLookup, SqliteDirectory, SqliteTenantRegistry, TenantRegistry,
};
pub use service::access_manager::{
    AccessManager, AccessResult, AccessServiceError, GrantRejection,
};
pub use service::access_service::AccessService;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
