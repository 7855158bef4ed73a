//! Database layer
//!
//! SQLite is the default backend (single file, created on first start);
//! MySQL can be selected through configuration. Schema changes are applied at
//! startup by the embedded migrations in [`migrations`].
//!
//! ```ignore
//! use postboard::config::DatabaseConfig;
//! use postboard::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, Backend, DatabasePool, DynDatabasePool, MysqlDatabase,
    SqliteDatabase,
};
