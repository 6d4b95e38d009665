// Database configuration from the environment

use std::env;

use crate::error::{Result, StorageError};

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Connection settings for the Postgres pool.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// Read configuration from the environment, loading `.env` first.
    ///
    /// `DATABASE_URL` is required; `DATABASE_MAX_CONNECTIONS` is optional
    /// and falls back to a small default suited to a single app process.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let url = env::var("DATABASE_URL").map_err(|_| StorageError::MissingEnv("DATABASE_URL"))?;
        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);
        Ok(Self {
            url,
            max_connections,
        })
    }
}
