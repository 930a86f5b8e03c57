//! Request extractors for authentication and authorization.
//!
//! - [`auth::AuthUser`] -- a valid Bearer token is required.
//! - [`auth::MaybeAuthUser`] -- a Bearer token is optional (guest checkout).
//! - [`rbac::RequireAdmin`] -- requires the `admin` role.

pub mod auth;
pub mod rbac;
