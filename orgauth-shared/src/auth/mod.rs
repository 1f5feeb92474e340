//! Authentication utilities
//!
//! # Modules
//!
//! - [`password`]: Argon2id password hashing, unusable credentials and
//!   strength validation
//!
//! Authorization (who may do what) is left to the host application, which
//! reads `is_staff`, `is_superuser` and `role` from the user record.

pub mod password;
