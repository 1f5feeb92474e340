//! # orgauth Admin Tool Library
//!
//! Command-line administration of organizations and user accounts.
//!
//! ## Modules
//!
//! - `config`: Configuration management
//! - `commands`: Argument parsing and command handlers

pub mod commands;
pub mod config;
