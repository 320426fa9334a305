use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::error::{DbError, Result};

const MAX_CONNECTIONS: u32 = 5;
const ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// Opens a connection pool against the given Postgres URL and validates it
/// with a round trip before handing it back.
pub async fn connect(database_url: &str) -> Result<PgPool> {
    if database_url.trim().is_empty() {
        return Err(DbError::Configuration(
            "database URL must not be empty".to_string(),
        ));
    }

    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
        .connect(database_url)
        .await?;

    // Round trip so a bad URL fails here instead of on first use.
    sqlx::query("SELECT 1").execute(&pool).await?;

    info!("connected to database");
    Ok(pool)
}
