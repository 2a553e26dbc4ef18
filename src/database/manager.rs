use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

/// Errors from the database layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Invalid database URL: {0}")]
    InvalidDatabaseUrl(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Stored recipe is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

const CREATE_DRINKS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS drinks (
        id     INTEGER PRIMARY KEY AUTOINCREMENT,
        title  TEXT    NOT NULL UNIQUE,
        recipe TEXT    NOT NULL
    )
"#;

/// Sample drink inserted when the database is reset
const SEED_TITLE: &str = "water";
const SEED_RECIPE: &str = r#"[{"name":"water","color":"blue","parts":1}]"#;

/// Builds and prepares the connection pool shared by every request
pub struct DatabaseManager;

impl DatabaseManager {
    /// Open a pool for the configured database
    pub async fn connect(config: &DatabaseConfig) -> Result<SqlitePool, DatabaseError> {
        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| DatabaseError::InvalidDatabaseUrl(e.to_string()))?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect_with(options)
            .await?;

        info!("Created database pool for: {}", config.url);
        Ok(pool)
    }

    /// Create the drinks table if it does not exist yet
    pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), DatabaseError> {
        sqlx::query(CREATE_DRINKS_TABLE).execute(pool).await?;
        Ok(())
    }

    /// Drop and recreate the drinks table, then insert the sample drink
    pub async fn reset(pool: &SqlitePool) -> Result<(), DatabaseError> {
        // AUTOINCREMENT bookkeeping lives in sqlite_sequence and is dropped with the table
        sqlx::query("DROP TABLE IF EXISTS drinks").execute(pool).await?;
        sqlx::query(CREATE_DRINKS_TABLE).execute(pool).await?;
        sqlx::query("INSERT INTO drinks (title, recipe) VALUES (?, ?)")
            .bind(SEED_TITLE)
            .bind(SEED_RECIPE)
            .execute(pool)
            .await?;

        info!("Reset drinks table and seeded '{}'", SEED_TITLE);
        Ok(())
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(pool: &SqlitePool) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }
}
