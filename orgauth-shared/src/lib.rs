//! # orgauth Shared Library
//!
//! This crate contains the account data model and provisioning logic used by
//! the orgauth admin tooling and any host application embedding it.
//!
//! ## Module Organization
//!
//! - `models`: Organization and User records with their database operations
//! - `manager`: `UserManager`, the sanctioned way to create users
//! - `store`: Storage backend trait with PostgreSQL and in-memory implementations
//! - `auth`: Password hashing
//! - `email`: Email address normalization
//! - `mail`: Mail transport trait and implementations
//! - `db`: Connection pools, aliases and schema bootstrap
//! - `error`: Crate-level error type

pub mod auth;
pub mod db;
pub mod email;
pub mod error;
pub mod mail;
pub mod manager;
pub mod models;
pub mod store;

pub use error::{AccountError, AccountResult};
pub use manager::{UserFields, UserManager};

/// Current version of the orgauth shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
