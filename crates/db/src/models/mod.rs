//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` entity struct matching the database row
//! - Create/update DTOs used by the repositories

pub mod beat;
pub mod download;
pub mod order;
pub mod session;
pub mod status;
pub mod user;
