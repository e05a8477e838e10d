//! Access record store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide list/get/find/create/overwrite/delete over the `accesses`
//!   collection of one tenant.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Every statement is scoped by the repository's `business_id`.
//! - Listing is deterministic: the requested sort, then `access_id ASC`.
//! - Delete is a hard delete; there is no tombstone for grants.
//! - Timestamps are epoch milliseconds taken from the SQLite clock.
//! - Create is an upsert, so racing first grants for one id end with the
//!   last writer's roles instead of a constraint error.

use crate::db::DbError;
use crate::model::access::{AccessGrant, AccessId, GrantFields};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const ACCESS_SELECT_SQL: &str = "SELECT
    access_id,
    business_id,
    user_id,
    role_id,
    platform_role_id,
    site_id,
    created_at,
    updated_at
FROM accesses";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for access grants and directory lookups.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound(String),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Equality filter over grant columns. Set fields are AND-ed together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessFilter {
    pub user_id: Option<String>,
    pub role_id: Option<String>,
    pub platform_role_id: Option<String>,
    pub site_id: Option<String>,
    /// `Some(true)` keeps site-scoped grants, `Some(false)` keeps unscoped ones.
    pub site_scoped: Option<bool>,
}

impl AccessFilter {
    pub fn by_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::default()
        }
    }

    pub fn by_site(site_id: impl Into<String>) -> Self {
        Self {
            site_id: Some(site_id.into()),
            ..Self::default()
        }
    }

    fn push_conditions(&self, sql: &mut String, bind_values: &mut Vec<Value>) {
        let columns = [
            ("user_id", &self.user_id),
            ("role_id", &self.role_id),
            ("platform_role_id", &self.platform_role_id),
            ("site_id", &self.site_id),
        ];
        for (column, value) in columns {
            if let Some(value) = value {
                sql.push_str(" AND ");
                sql.push_str(column);
                sql.push_str(" = ?");
                bind_values.push(Value::Text(value.clone()));
            }
        }

        match self.site_scoped {
            Some(true) => sql.push_str(" AND site_id IS NOT NULL"),
            Some(false) => sql.push_str(" AND site_id IS NULL"),
            None => {}
        }
    }
}

/// Sort order for grant listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AccessSort {
    /// Most recently granted first.
    #[default]
    UpdatedDesc,
    CreatedAsc,
    UserAsc,
}

impl AccessSort {
    fn order_by_sql(self) -> &'static str {
        match self {
            Self::UpdatedDesc => " ORDER BY updated_at DESC, access_id ASC",
            Self::CreatedAsc => " ORDER BY created_at ASC, access_id ASC",
            Self::UserAsc => " ORDER BY user_id ASC, access_id ASC",
        }
    }
}

/// Query options for listing grants.
///
/// `system` carries constraints imposed by the calling layer and `filter`
/// those supplied by the end user; both must match.
#[derive(Debug, Clone, Default)]
pub struct AccessListQuery {
    pub system: AccessFilter,
    pub filter: AccessFilter,
    pub sort: AccessSort,
    pub skip: u32,
    pub limit: Option<u32>,
}

/// One page of grants plus counts for pagination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPage {
    pub items: Vec<AccessGrant>,
    /// All grants of the tenant.
    pub total_size: u64,
    /// Grants matching both filters, before skip/limit.
    pub filtered_size: u64,
    pub skip: u32,
    pub limit: Option<u32>,
}

/// Repository interface for the access record store.
pub trait AccessRepository {
    fn list_accesses(&self, query: &AccessListQuery) -> RepoResult<AccessPage>;
    fn get_access(&self, access_id: &str) -> RepoResult<Option<AccessGrant>>;
    /// Returns the first grant matching `filter` under default sort.
    fn find_access(&self, filter: &AccessFilter) -> RepoResult<Option<AccessGrant>>;
    /// Inserts a grant. A grant already stored under the same id is
    /// replaced in place and keeps its `created_at`.
    fn create_access(&self, fields: &GrantFields) -> RepoResult<AccessGrant>;
    /// Replaces role references and site of an existing grant.
    fn overwrite_access(&self, fields: &GrantFields) -> RepoResult<AccessGrant>;
    fn delete_access(&self, access_id: &str) -> RepoResult<()>;
}

/// SQLite-backed access repository bound to one tenant.
pub struct SqliteAccessRepository<'conn> {
    conn: &'conn Connection,
    business_id: String,
}

impl<'conn> SqliteAccessRepository<'conn> {
    pub fn new(conn: &'conn Connection, business_id: impl Into<String>) -> Self {
        Self {
            conn,
            business_id: business_id.into(),
        }
    }

    fn count(&self, where_sql: &str, bind_values: &[Value]) -> RepoResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM accesses{where_sql}");
        let count: i64 = self.conn.query_row(
            &sql,
            params_from_iter(bind_values.iter()),
            |row| row.get(0),
        )?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative row count `{count}`")))
    }

    fn read_back(&self, access_id: &str, stage: &str) -> RepoResult<AccessGrant> {
        self.get_access(access_id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("access `{access_id}` missing after {stage}"))
        })
    }
}

impl AccessRepository for SqliteAccessRepository<'_> {
    fn list_accesses(&self, query: &AccessListQuery) -> RepoResult<AccessPage> {
        let tenant_values = vec![Value::Text(self.business_id.clone())];
        let total_size = self.count(" WHERE business_id = ?", &tenant_values)?;

        let mut where_sql = " WHERE business_id = ?".to_string();
        let mut bind_values = tenant_values;
        query.system.push_conditions(&mut where_sql, &mut bind_values);
        query.filter.push_conditions(&mut where_sql, &mut bind_values);
        let filtered_size = self.count(&where_sql, &bind_values)?;

        let mut sql = format!("{ACCESS_SELECT_SQL}{where_sql}");
        sql.push_str(query.sort.order_by_sql());

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.skip > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.skip)));
            }
        } else if query.skip > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.skip)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_access_row(row)?);
        }

        Ok(AccessPage {
            items,
            total_size,
            filtered_size,
            skip: query.skip,
            limit: query.limit,
        })
    }

    fn get_access(&self, access_id: &str) -> RepoResult<Option<AccessGrant>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ACCESS_SELECT_SQL}
             WHERE business_id = ?1
               AND access_id = ?2;"
        ))?;

        let mut rows = stmt.query(params![self.business_id, access_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_access_row(row)?));
        }

        Ok(None)
    }

    fn find_access(&self, filter: &AccessFilter) -> RepoResult<Option<AccessGrant>> {
        let mut sql = format!("{ACCESS_SELECT_SQL} WHERE business_id = ?");
        let mut bind_values = vec![Value::Text(self.business_id.clone())];
        filter.push_conditions(&mut sql, &mut bind_values);
        sql.push_str(AccessSort::default().order_by_sql());
        sql.push_str(" LIMIT 1");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_access_row(row)?));
        }

        Ok(None)
    }

    fn create_access(&self, fields: &GrantFields) -> RepoResult<AccessGrant> {
        self.conn.execute(
            "INSERT INTO accesses (
                business_id,
                access_id,
                user_id,
                role_id,
                platform_role_id,
                site_id,
                created_at,
                updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                CAST(ROUND((julianday('now') - 2440587.5) * 86400000) AS INTEGER),
                CAST(ROUND((julianday('now') - 2440587.5) * 86400000) AS INTEGER)
            )
            ON CONFLICT (business_id, access_id) DO UPDATE SET
                user_id = excluded.user_id,
                role_id = excluded.role_id,
                platform_role_id = excluded.platform_role_id,
                site_id = excluded.site_id,
                updated_at = excluded.updated_at;",
            params![
                self.business_id,
                fields.access_id,
                fields.user_id,
                fields.role_id,
                fields.platform_role_id,
                fields.site_id,
            ],
        )?;

        self.read_back(&fields.access_id, "create")
    }

    fn overwrite_access(&self, fields: &GrantFields) -> RepoResult<AccessGrant> {
        let changed = self.conn.execute(
            "UPDATE accesses
             SET
                user_id = ?1,
                role_id = ?2,
                platform_role_id = ?3,
                site_id = ?4,
                updated_at = CAST(ROUND((julianday('now') - 2440587.5) * 86400000) AS INTEGER)
             WHERE business_id = ?5
               AND access_id = ?6;",
            params![
                fields.user_id,
                fields.role_id,
                fields.platform_role_id,
                fields.site_id,
                self.business_id,
                fields.access_id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(fields.access_id.clone()));
        }

        self.read_back(&fields.access_id, "overwrite")
    }

    fn delete_access(&self, access_id: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM accesses
             WHERE business_id = ?1
               AND access_id = ?2;",
            params![self.business_id, access_id],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(access_id.to_string()));
        }

        Ok(())
    }
}

fn parse_access_row(row: &Row<'_>) -> RepoResult<AccessGrant> {
    let access_id: AccessId = row.get("access_id")?;
    let role_id: Option<String> = row.get("role_id")?;
    let platform_role_id: Option<String> = row.get("platform_role_id")?;
    if role_id.is_none() && platform_role_id.is_none() {
        return Err(RepoError::InvalidData(format!(
            "access `{access_id}` has neither role_id nor platform_role_id"
        )));
    }

    Ok(AccessGrant {
        access_id,
        business_id: row.get("business_id")?,
        user_id: row.get("user_id")?,
        role_id,
        platform_role_id,
        site_id: row.get("site_id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
