//! Database layer
//!
//! The Persistence Client for the storefront. SQLite is the default backend
//! (single-file deployment); MySQL is selected through `DatabaseConfig`.
//! Repositories only see the `DatabasePool` trait and resolve the concrete
//! sqlx pool through [`pool::backend`].

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    backend, create_pool, create_test_pool, Backend, DatabasePool, DynDatabasePool, MysqlDatabase,
    SqliteDatabase,
};
