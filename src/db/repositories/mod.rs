//! Database repositories
//!
//! Repository pattern implementations for database access.

pub mod item;
pub mod user;

pub use item::{ItemRepository, SqlxItemRepository};
pub use user::{SqlxUserRepository, UserRepository};

/// Whether a repository error was raised by a UNIQUE constraint
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<sqlx::Error>()
            .and_then(|e| e.as_database_error())
            .is_some_and(|db| db.is_unique_violation())
    })
}
