//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod beat_repo;
pub mod download_repo;
pub mod order_repo;
pub mod session_repo;
pub mod user_repo;

pub use beat_repo::BeatRepo;
pub use download_repo::DownloadRepo;
pub use order_repo::OrderRepo;
pub use session_repo::SessionRepo;
pub use user_repo::UserRepo;
