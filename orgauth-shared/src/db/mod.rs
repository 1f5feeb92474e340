//! Database layer
//!
//! # Modules
//!
//! - `pool`: PostgreSQL connection pool creation and health checks
//! - `aliases`: Registry of pools keyed by connection alias
//! - `migrations`: Embedded schema bootstrap
//!
//! Record operations live on the models in [`crate::models`].

pub mod aliases;
pub mod migrations;
pub mod pool;
