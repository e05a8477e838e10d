//! Owned pair of database handles used by tenant-bound services.
//!
//! # Responsibility
//! - Acquire the platform registry handle and the tenant region handle as
//!   one unit.
//! - Release both on every exit path, including partial acquisition.
//! - Expose begin/commit/rollback on the region handle.
//!
//! # Invariants
//! - A `DatabaseHandles` value always holds two migrated connections.
//! - If the region handle cannot be opened, the platform handle is released
//!   before the error is returned.

use super::{open_db, open_db_in_memory, DbError, DbResult, Schema};
use crate::config::{DbLocation, ServiceConfig};
use log::{error, info, warn};
use rusqlite::Connection;

/// Platform registry and tenant region connections owned together.
#[derive(Debug)]
pub struct DatabaseHandles {
    platform: Connection,
    region: Connection,
}

impl DatabaseHandles {
    /// Opens both databases described by `config`.
    pub fn open(config: &ServiceConfig) -> DbResult<Self> {
        let platform = open_location(&config.platform_db, Schema::Platform)?;
        let region = match open_location(&config.region_db, Schema::Region) {
            Ok(conn) => conn,
            Err(err) => {
                warn!(
                    "event=handles_open module=db status=error error_code=region_open_failed action=release_platform"
                );
                drop(platform);
                return Err(err);
            }
        };

        Ok(Self { platform, region })
    }

    /// Wraps connections that were already opened with `open_db` or
    /// `open_db_in_memory` for their matching schema.
    pub fn from_connections(platform: Connection, region: Connection) -> Self {
        Self { platform, region }
    }

    /// Tenant registry connection.
    pub fn platform(&self) -> &Connection {
        &self.platform
    }

    /// Tenant region connection.
    pub fn region(&self) -> &Connection {
        &self.region
    }

    /// Starts a transaction on the region handle.
    pub fn begin_transaction(&self) -> DbResult<()> {
        self.region.execute_batch("BEGIN IMMEDIATE;")?;
        Ok(())
    }

    /// Commits the open region transaction.
    pub fn commit_transaction(&self) -> DbResult<()> {
        self.region.execute_batch("COMMIT;")?;
        Ok(())
    }

    /// Rolls back the open region transaction.
    pub fn rollback_transaction(&self) -> DbResult<()> {
        self.region.execute_batch("ROLLBACK;")?;
        Ok(())
    }

    /// Closes both handles, region first.
    ///
    /// Both closes are always attempted; the first failure is returned.
    pub fn close(self) -> DbResult<()> {
        let Self { platform, region } = self;
        let region_result = close_connection(region, Schema::Region);
        let platform_result = close_connection(platform, Schema::Platform);
        region_result.and(platform_result)
    }
}

fn open_location(location: &DbLocation, schema: Schema) -> DbResult<Connection> {
    match location {
        DbLocation::File(path) => open_db(path, schema),
        DbLocation::Memory => open_db_in_memory(schema),
    }
}

fn close_connection(conn: Connection, schema: Schema) -> DbResult<()> {
    match conn.close() {
        Ok(()) => {
            info!(
                "event=db_close module=db status=ok schema={}",
                schema.as_str()
            );
            Ok(())
        }
        Err((_conn, err)) => {
            error!(
                "event=db_close module=db status=error schema={} error_code=db_close_failed error={}",
                schema.as_str(),
                err
            );
            Err(DbError::Sqlite(err))
        }
    }
}
