//! Access grant use-case logic.
//!
//! # Responsibility
//! - Validate grant requests against the directory in a fixed order.
//! - Derive the access id and create or overwrite the stored grant.
//! - Revoke grants by id.
//!
//! # Invariants
//! - Validation failures never reach the record store.
//! - The access id depends on user and site only; re-granting the same
//!   scope replaces the role references of the existing grant.
//! - Store errors are returned unchanged, without retry.
//! - No locking: two concurrent grants for the same `(user, site)` pair are
//!   last-writer-wins at the store. Callers needing exactly-once semantics
//!   must serialize grants per user or per tenant themselves.

use crate::config::ConfigError;
use crate::db::DbError;
use crate::model::access::{AccessGrant, AccessId, GrantFields, GrantRequest};
use crate::model::directory::RoleScope;
use crate::repo::access_repo::{
    AccessFilter, AccessListQuery, AccessPage, AccessRepository, RepoError,
};
use crate::repo::directory_repo::DirectoryLookup;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Precondition that rejected a grant request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantRejection {
    /// Request carries no `user_id`.
    MissingUser,
    /// `user_id` does not resolve to an active user of the tenant.
    UnknownUser { user_id: String },
    /// Request carries neither `role_id` nor `platform_role_id`.
    MissingRole,
    /// Role id does not resolve in the collection of its scope.
    UnknownRole { role_id: String, scope: RoleScope },
    /// `site_id` does not resolve to an active site of the tenant.
    UnknownSite { site_id: String },
}

impl GrantRejection {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingUser => "missing_user",
            Self::UnknownUser { .. } => "unknown_user",
            Self::MissingRole => "missing_role",
            Self::UnknownRole { .. } => "unknown_role",
            Self::UnknownSite { .. } => "unknown_site",
        }
    }
}

impl Display for GrantRejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingUser => write!(f, "user_id is required"),
            Self::UnknownUser { user_id } => write!(f, "user not found: {user_id}"),
            Self::MissingRole => write!(f, "role_id or platform_role_id is required"),
            Self::UnknownRole {
                role_id,
                scope: RoleScope::Tenant,
            } => write!(f, "role not found: {role_id}"),
            Self::UnknownRole {
                role_id,
                scope: RoleScope::Platform,
            } => write!(f, "platform role not found: {role_id}"),
            Self::UnknownSite { site_id } => write!(f, "site not found: {site_id}"),
        }
    }
}

/// Errors from access service operations.
#[derive(Debug)]
pub enum AccessServiceError {
    /// Bound tenant does not exist in the platform registry.
    InvalidTenant(String),
    /// Grant request failed validation; the request is echoed back.
    Rejected {
        reason: GrantRejection,
        request: GrantRequest,
    },
    /// No grant with this id in the bound tenant.
    NotFound(AccessId),
    /// Record store or lookup failure.
    Repo(RepoError),
    /// Connection or transaction failure.
    Db(DbError),
    /// Service configuration is invalid.
    Config(ConfigError),
}

impl AccessServiceError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidTenant(_) => "invalid_tenant",
            Self::Rejected { reason, .. } => reason.code(),
            Self::NotFound(_) => "not_found",
            Self::Repo(_) => "store_failure",
            Self::Db(_) => "db_failure",
            Self::Config(_) => "invalid_config",
        }
    }

    /// Validation reason, when the error is a rejected grant.
    pub fn rejection(&self) -> Option<&GrantRejection> {
        match self {
            Self::Rejected { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

impl Display for AccessServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTenant(business_id) => {
                write!(f, "invalid business_id: {business_id} does not exist")
            }
            Self::Rejected { reason, .. } => write!(f, "grant rejected: {reason}"),
            Self::NotFound(access_id) => write!(f, "access not found: {access_id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AccessServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Config(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for AccessServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(access_id) => Self::NotFound(access_id),
            other => Self::Repo(other),
        }
    }
}

impl From<DbError> for AccessServiceError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<ConfigError> for AccessServiceError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

pub type AccessResult<T> = Result<T, AccessServiceError>;

/// Grant manager over a record store and a directory.
pub struct AccessManager<R: AccessRepository, L: DirectoryLookup> {
    repo: R,
    directory: L,
}

impl<R: AccessRepository, L: DirectoryLookup> AccessManager<R, L> {
    pub fn new(repo: R, directory: L) -> Self {
        Self { repo, directory }
    }

    /// Lists grants matching both the system and the caller filter.
    pub fn list(&self, query: &AccessListQuery) -> AccessResult<AccessPage> {
        Ok(self.repo.list_accesses(query)?)
    }

    /// Gets one grant by id.
    pub fn get(&self, access_id: &str) -> AccessResult<AccessGrant> {
        self.repo
            .get_access(access_id)?
            .ok_or_else(|| AccessServiceError::NotFound(access_id.to_string()))
    }

    /// Returns the first grant matching `filter`, if any.
    pub fn find(&self, filter: &AccessFilter) -> AccessResult<Option<AccessGrant>> {
        Ok(self.repo.find_access(filter)?)
    }

    /// Validates `request`, derives its access id and writes the grant.
    ///
    /// # Contract
    /// - Checks run in order: user present, user exists, a role present,
    ///   tenant role exists, platform role exists, site exists. The first
    ///   failing check is reported.
    /// - An existing grant under the derived id is overwritten, so the
    ///   result references only the roles of this request.
    pub fn grant_permission(&self, request: GrantRequest) -> AccessResult<AccessGrant> {
        let fields = match self.check_request(&request)? {
            Ok(fields) => fields,
            Err(reason) => {
                warn!(
                    "event=access_grant module=service status=rejected error_code={}",
                    reason.code()
                );
                return Err(AccessServiceError::Rejected { reason, request });
            }
        };

        let grant = match self.repo.get_access(&fields.access_id)? {
            Some(_) => self.repo.overwrite_access(&fields)?,
            None => self.repo.create_access(&fields)?,
        };

        info!(
            "event=access_grant module=service status=ok access_id={} site_scoped={}",
            grant.access_id,
            grant.is_site_scoped()
        );
        Ok(grant)
    }

    /// Deletes the grant `access_id`.
    pub fn revoke_permission(&self, access_id: &str) -> AccessResult<()> {
        self.repo.delete_access(access_id)?;
        info!("event=access_revoke module=service status=ok access_id={access_id}");
        Ok(())
    }

    /// Outer error is a lookup failure, inner error a rejected precondition.
    fn check_request(
        &self,
        request: &GrantRequest,
    ) -> Result<Result<GrantFields, GrantRejection>, RepoError> {
        let Some(user_id) = request.user_id.as_deref() else {
            return Ok(Err(GrantRejection::MissingUser));
        };
        if self.directory.get_user(user_id)?.is_none() {
            return Ok(Err(GrantRejection::UnknownUser {
                user_id: user_id.to_string(),
            }));
        }

        if request.role_id.is_none() && request.platform_role_id.is_none() {
            return Ok(Err(GrantRejection::MissingRole));
        }
        if let Some(role_id) = request.role_id.as_deref() {
            if self.directory.get_role_details(role_id)?.is_none() {
                return Ok(Err(GrantRejection::UnknownRole {
                    role_id: role_id.to_string(),
                    scope: RoleScope::Tenant,
                }));
            }
        }
        if let Some(role_id) = request.platform_role_id.as_deref() {
            if self.directory.get_platform_role(role_id)?.is_none() {
                return Ok(Err(GrantRejection::UnknownRole {
                    role_id: role_id.to_string(),
                    scope: RoleScope::Platform,
                }));
            }
        }

        if let Some(site_id) = request.site_id.as_deref() {
            if self.directory.get_site(site_id)?.is_none() {
                return Ok(Err(GrantRejection::UnknownSite {
                    site_id: site_id.to_string(),
                }));
            }
        }

        Ok(Ok(GrantFields::derive(
            user_id,
            request.role_id.clone(),
            request.platform_role_id.clone(),
            request.site_id.clone(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::{AccessManager, AccessServiceError, GrantRejection};
    use crate::model::access::{AccessGrant, GrantFields, GrantRequest};
    use crate::model::directory::{RoleRecord, RoleScope, SiteRecord, UserRecord};
    use crate::repo::access_repo::{
        AccessFilter, AccessListQuery, AccessPage, AccessRepository, RepoError, RepoResult,
    };
    use crate::repo::directory_repo::DirectoryLookup;
    use std::cell::RefCell;
    use std::collections::{BTreeMap, HashSet};

    #[derive(Default)]
    struct FakeDirectory {
        users: HashSet<String>,
        roles: HashSet<String>,
        platform_roles: HashSet<String>,
        sites: HashSet<String>,
    }

    impl DirectoryLookup for FakeDirectory {
        fn get_user(&self, user_id: &str) -> RepoResult<Option<UserRecord>> {
            Ok(self.users.get(user_id).map(|id| UserRecord {
                user_id: id.clone(),
                user_name: String::new(),
            }))
        }

        fn get_role_details(&self, role_id: &str) -> RepoResult<Option<RoleRecord>> {
            Ok(self.roles.get(role_id).map(|id| RoleRecord {
                role_id: id.clone(),
                role_name: String::new(),
                scope: RoleScope::Tenant,
            }))
        }

        fn get_platform_role(&self, role_id: &str) -> RepoResult<Option<RoleRecord>> {
            Ok(self.platform_roles.get(role_id).map(|id| RoleRecord {
                role_id: id.clone(),
                role_name: String::new(),
                scope: RoleScope::Platform,
            }))
        }

        fn get_site(&self, site_id: &str) -> RepoResult<Option<SiteRecord>> {
            Ok(self.sites.get(site_id).map(|id| SiteRecord {
                site_id: id.clone(),
                site_name: String::new(),
            }))
        }
    }

    /// Store that records every write and can be told to fail reads.
    #[derive(Default)]
    struct RecordingStore {
        rows: RefCell<BTreeMap<String, AccessGrant>>,
        writes: RefCell<Vec<&'static str>>,
        fail_reads: bool,
    }

    impl RecordingStore {
        fn to_grant(fields: &GrantFields) -> AccessGrant {
            AccessGrant {
                access_id: fields.access_id.clone(),
                business_id: "T1".to_string(),
                user_id: fields.user_id.clone(),
                role_id: fields.role_id.clone(),
                platform_role_id: fields.platform_role_id.clone(),
                site_id: fields.site_id.clone(),
                created_at: 0,
                updated_at: 0,
            }
        }
    }

    impl AccessRepository for RecordingStore {
        fn list_accesses(&self, query: &AccessListQuery) -> RepoResult<AccessPage> {
            let items: Vec<AccessGrant> = self.rows.borrow().values().cloned().collect();
            let size = items.len() as u64;
            Ok(AccessPage {
                items,
                total_size: size,
                filtered_size: size,
                skip: query.skip,
                limit: query.limit,
            })
        }

        fn get_access(&self, access_id: &str) -> RepoResult<Option<AccessGrant>> {
            if self.fail_reads {
                return Err(RepoError::InvalidData("store offline".to_string()));
            }
            Ok(self.rows.borrow().get(access_id).cloned())
        }

        fn find_access(&self, _filter: &AccessFilter) -> RepoResult<Option<AccessGrant>> {
            Ok(self.rows.borrow().values().next().cloned())
        }

        fn create_access(&self, fields: &GrantFields) -> RepoResult<AccessGrant> {
            self.writes.borrow_mut().push("create");
            let grant = Self::to_grant(fields);
            self.rows
                .borrow_mut()
                .insert(grant.access_id.clone(), grant.clone());
            Ok(grant)
        }

        fn overwrite_access(&self, fields: &GrantFields) -> RepoResult<AccessGrant> {
            self.writes.borrow_mut().push("overwrite");
            let grant = Self::to_grant(fields);
            self.rows
                .borrow_mut()
                .insert(grant.access_id.clone(), grant.clone());
            Ok(grant)
        }

        fn delete_access(&self, access_id: &str) -> RepoResult<()> {
            self.rows
                .borrow_mut()
                .remove(access_id)
                .map(|_| ())
                .ok_or_else(|| RepoError::NotFound(access_id.to_string()))
        }
    }

    fn directory() -> FakeDirectory {
        FakeDirectory {
            users: HashSet::from(["U1".to_string()]),
            roles: HashSet::from(["R1".to_string(), "R2".to_string()]),
            platform_roles: HashSet::from(["P1".to_string()]),
            sites: HashSet::from(["S1".to_string()]),
        }
    }

    #[test]
    fn rejected_requests_never_write() {
        let manager = AccessManager::new(RecordingStore::default(), directory());

        for request in [
            GrantRequest::default().with_role("R1"),
            GrantRequest::for_user("nobody").with_role("R1"),
            GrantRequest::for_user("U1"),
            GrantRequest::for_user("U1").with_role("nope"),
            GrantRequest::for_user("U1").with_platform_role("nope"),
            GrantRequest::for_user("U1").with_role("R1").at_site("nowhere"),
        ] {
            let err = manager
                .grant_permission(request.clone())
                .expect_err("request must be rejected");
            match err {
                AccessServiceError::Rejected {
                    request: echoed, ..
                } => assert_eq!(echoed, request),
                other => panic!("unexpected error: {other}"),
            }
        }

        assert!(manager.repo.writes.borrow().is_empty());
    }

    #[test]
    fn tenant_role_is_checked_before_platform_role() {
        let manager = AccessManager::new(RecordingStore::default(), directory());
        let err = manager
            .grant_permission(
                GrantRequest::for_user("U1")
                    .with_role("bad-tenant-role")
                    .with_platform_role("bad-platform-role"),
            )
            .expect_err("unknown roles must be rejected");
        assert_eq!(
            err.rejection(),
            Some(&GrantRejection::UnknownRole {
                role_id: "bad-tenant-role".to_string(),
                scope: RoleScope::Tenant,
            })
        );
    }

    #[test]
    fn second_grant_for_same_scope_takes_overwrite_path() {
        let manager = AccessManager::new(RecordingStore::default(), directory());
        manager
            .grant_permission(GrantRequest::for_user("U1").with_role("R1"))
            .expect("first grant");
        manager
            .grant_permission(GrantRequest::for_user("U1").with_platform_role("P1"))
            .expect("second grant");

        assert_eq!(*manager.repo.writes.borrow(), vec!["create", "overwrite"]);
        let stored = manager.repo.rows.borrow();
        let grant = stored.values().next().expect("one grant stored");
        assert_eq!(stored.len(), 1);
        assert_eq!(grant.role_id, None);
        assert_eq!(grant.platform_role_id.as_deref(), Some("P1"));
    }

    #[test]
    fn store_read_failure_is_propagated_unchanged() {
        let store = RecordingStore {
            fail_reads: true,
            ..RecordingStore::default()
        };
        let manager = AccessManager::new(store, directory());
        let err = manager
            .grant_permission(GrantRequest::for_user("U1").with_role("R1"))
            .expect_err("store failure must surface");
        assert!(matches!(err, AccessServiceError::Repo(RepoError::InvalidData(_))));
        assert_eq!(err.code(), "store_failure");
        assert!(manager.repo.writes.borrow().is_empty());
    }

    #[test]
    fn revoke_missing_grant_is_not_found() {
        let manager = AccessManager::new(RecordingStore::default(), directory());
        let err = manager
            .revoke_permission("aces_missing")
            .expect_err("nothing to revoke");
        assert!(matches!(err, AccessServiceError::NotFound(id) if id == "aces_missing"));
    }

    #[test]
    fn rejection_codes_are_stable() {
        assert_eq!(GrantRejection::MissingUser.code(), "missing_user");
        assert_eq!(GrantRejection::MissingRole.code(), "missing_role");
        let platform = GrantRejection::UnknownRole {
            role_id: "P9".to_string(),
            scope: RoleScope::Platform,
        };
        assert_eq!(platform.code(), "unknown_role");
        assert_eq!(platform.to_string(), "platform role not found: P9");
    }
}
