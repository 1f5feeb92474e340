//! Database models for orgauth
//!
//! # Models
//!
//! - `organization`: Tenants, with status and a loose representative reference
//! - `user`: Email-login accounts with role and permission flags
//!
//! Both models expose their CRUD operations as associated functions taking a
//! `&PgPool`. Storage-agnostic access goes through [`crate::store`].

pub mod organization;
pub mod user;
