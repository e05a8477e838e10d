//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the access record store and directory lookup contracts.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.
//! - Tenant-region queries never cross the bound `business_id`.

pub mod access_repo;
pub mod directory_repo;
