//! Tenant-bound access service.
//!
//! # Responsibility
//! - Own the platform registry and tenant region handles for one tenant.
//! - Refuse to start for tenants missing from the registry.
//! - Route access operations to `AccessManager` over SQLite repositories.
//!
//! # Invariants
//! - `business_id` is fixed for the service lifetime.
//! - Construction failure releases every handle opened so far.
//! - `end_service` consumes the service; handles cannot be released twice.
//!
//! A service is used by one caller at a time (`rusqlite::Connection` is not
//! `Sync`). It does not serialize grants across services sharing a
//! database.

use super::access_manager::{AccessManager, AccessResult, AccessServiceError};
use crate::config::ServiceConfig;
use crate::db::DatabaseHandles;
use crate::model::access::{AccessGrant, GrantRequest};
use crate::repo::access_repo::{AccessFilter, AccessListQuery, AccessPage, SqliteAccessRepository};
use crate::repo::directory_repo::{SqliteDirectory, SqliteTenantRegistry, TenantRegistry};
use log::{error, info};

/// Access service bound to one tenant.
#[derive(Debug)]
pub struct AccessService {
    handles: DatabaseHandles,
    business_id: String,
}

impl AccessService {
    /// Validates `config`, opens both databases and binds the tenant.
    ///
    /// # Errors
    /// - `Config` when `config` is invalid; nothing is opened.
    /// - `Db` when a database cannot be opened or migrated.
    /// - `InvalidTenant` when `business_id` is not registered.
    pub fn open(config: &ServiceConfig) -> AccessResult<Self> {
        config.validate()?;
        let handles = DatabaseHandles::open(config)?;
        Self::with_handles(handles, config.business_id.trim())
    }

    /// Binds already-open handles to `business_id`.
    ///
    /// The handles are closed before returning an error.
    pub fn with_handles(
        handles: DatabaseHandles,
        business_id: impl Into<String>,
    ) -> AccessResult<Self> {
        let business_id = business_id.into();
        info!("event=access_service_start module=service status=start");

        let lookup = SqliteTenantRegistry::new(handles.platform()).get_business(&business_id);
        match lookup {
            Ok(Some(_)) => {
                info!("event=access_service_start module=service status=ok business_id={business_id}");
                Ok(Self {
                    handles,
                    business_id,
                })
            }
            Ok(None) => {
                error!(
                    "event=access_service_start module=service status=error error_code=invalid_tenant business_id={business_id}"
                );
                release_after_failure(handles);
                Err(AccessServiceError::InvalidTenant(business_id))
            }
            Err(err) => {
                error!(
                    "event=access_service_start module=service status=error error_code=registry_lookup_failed error={err}"
                );
                release_after_failure(handles);
                Err(err.into())
            }
        }
    }

    /// Tenant this service is bound to.
    pub fn business_id(&self) -> &str {
        &self.business_id
    }

    fn manager(&self) -> AccessManager<SqliteAccessRepository<'_>, SqliteDirectory<'_>> {
        AccessManager::new(
            SqliteAccessRepository::new(self.handles.region(), self.business_id.as_str()),
            SqliteDirectory::new(
                self.handles.region(),
                self.handles.platform(),
                self.business_id.as_str(),
            ),
        )
    }

    pub fn list(&self, query: &AccessListQuery) -> AccessResult<AccessPage> {
        self.manager().list(query)
    }

    pub fn get(&self, access_id: &str) -> AccessResult<AccessGrant> {
        self.manager().get(access_id)
    }

    pub fn find(&self, filter: &AccessFilter) -> AccessResult<Option<AccessGrant>> {
        self.manager().find(filter)
    }

    /// See [`AccessManager::grant_permission`].
    pub fn grant_permission(&self, request: GrantRequest) -> AccessResult<AccessGrant> {
        self.manager().grant_permission(request)
    }

    pub fn revoke_permission(&self, access_id: &str) -> AccessResult<()> {
        self.manager().revoke_permission(access_id)
    }

    pub fn begin_transaction(&self) -> AccessResult<()> {
        Ok(self.handles.begin_transaction()?)
    }

    pub fn commit_transaction(&self) -> AccessResult<()> {
        Ok(self.handles.commit_transaction()?)
    }

    pub fn rollback_transaction(&self) -> AccessResult<()> {
        Ok(self.handles.rollback_transaction()?)
    }

    /// Releases both database handles.
    pub fn end_service(self) -> AccessResult<()> {
        info!(
            "event=access_service_end module=service status=start business_id={}",
            self.business_id
        );
        Ok(self.handles.close()?)
    }
}

fn release_after_failure(handles: DatabaseHandles) {
    if let Err(err) = handles.close() {
        error!(
            "event=access_service_start module=service status=error error_code=release_failed error={err}"
        );
    }
}
