//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate directory lookups and record store calls into grant and
//!   revoke use-cases.
//! - Keep callers decoupled from storage details.

pub mod access_manager;
pub mod access_service;
