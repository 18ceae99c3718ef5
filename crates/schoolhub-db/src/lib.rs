//! # SchoolHub DB
//!
//! PostgreSQL pool construction and the embedded schema migrations.
//!
//! ```ignore
//! let pool = schoolhub_db::init_db_pool(&database_url).await?;
//! schoolhub_db::run_migrations(&pool).await?;
//! ```

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::migrate::{MigrateError, Migrator};

pub use sqlx::PgPool;

/// Schema migrations compiled into the binary.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Reads `DB_MAX_CONNECTIONS`, defaulting to 10.
fn max_connections() -> u32 {
    std::env::var("DB_MAX_CONNECTIONS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(10)
}

/// Opens a connection pool against `database_url`.
#[tracing::instrument(skip(database_url))]
pub async fn init_db_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections())
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await?;

    tracing::info!("Database connection pool established");
    Ok(pool)
}

/// Applies any pending migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}

/// True when `err` is a violation of a unique constraint or index.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}
