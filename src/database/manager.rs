use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::info;

use crate::config;

const FOREIGN_KEY_VIOLATION: &str = "23503";
const UNIQUE_VIOLATION: &str = "23505";

/// Errors from the storage layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    #[error("Unique violation: {0}")]
    UniqueViolation(String),

    #[error("Database unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        let violation = match &err {
            sqlx::Error::Database(db_err) => db_err.code().map(|code| {
                let detail = db_err.constraint().unwrap_or_else(|| db_err.message()).to_string();
                (code.into_owned(), detail)
            }),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                return DatabaseError::Unavailable(err.to_string());
            }
            _ => None,
        };

        match violation {
            Some((code, detail)) if code == FOREIGN_KEY_VIOLATION => DatabaseError::ForeignKeyViolation(detail),
            Some((code, detail)) if code == UNIQUE_VIOLATION => DatabaseError::UniqueViolation(detail),
            _ => DatabaseError::Sqlx(err),
        }
    }
}

/// Process-wide connection pool, created on first use
pub struct DatabaseManager;

impl DatabaseManager {
    fn cell() -> &'static OnceCell<PgPool> {
        static POOL: OnceCell<PgPool> = OnceCell::const_new();
        &POOL
    }

    /// Get the shared pool, connecting lazily
    pub async fn pool() -> Result<PgPool, DatabaseError> {
        let pool = Self::cell().get_or_try_init(Self::connect).await?;
        Ok(pool.clone())
    }

    async fn connect() -> Result<PgPool, DatabaseError> {
        let settings = &config::config().database;
        if settings.url.is_empty() {
            return Err(DatabaseError::ConfigMissing("DATABASE_URL"));
        }

        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(Duration::from_secs(settings.connection_timeout_secs))
            .connect(&settings.url)
            .await?;

        info!("Created database pool (max_connections={})", settings.max_connections);
        Ok(pool)
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check() -> Result<(), DatabaseError> {
        let pool = Self::pool().await?;
        sqlx::query("SELECT 1").execute(&pool).await?;
        Ok(())
    }
}
