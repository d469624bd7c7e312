//! core
//!
//! Shared domain types and infrastructure.
//!
//! # Modules
//!
//! - [`types`] - Account identifiers and role ARNs
//! - [`records`] - Persisted records and expiry rules
//! - [`errors`] - Stable error kinds and exit codes
//! - [`paths`] - On-disk layout
//! - [`config`] - Configuration schema and loading

pub mod config;
pub mod errors;
pub mod paths;
pub mod records;
pub mod types;
