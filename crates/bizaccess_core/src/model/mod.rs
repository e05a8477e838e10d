//! Domain model for tenant access grants.
//!
//! # Responsibility
//! - Define the access grant record and the typed grant request.
//! - Define read models for the directory entities a grant references.
//! - Derive stable access identifiers from grant scope.
//!
//! # Invariants
//! - An `AccessId` is a pure function of `(user_id, site_id-or-absence)`.
//! - Grants reference users, roles and sites by id only.

pub mod access;
pub mod checksum;
pub mod directory;
