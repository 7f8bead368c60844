use crate::dialect::Dialect;
use crate::error::{DbxError, DbxResult};

/// Default upper bound on pooled connections.
pub const DEFAULT_POOL_SIZE: usize = 16;

/// Connection settings for the pooled Postgres backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbxConfig {
    /// libpq-style connection string or `postgres://` URL.
    pub database_url: String,
    /// Maximum number of pooled connections.
    pub max_pool_size: usize,
    /// Dialect statements are compiled in.
    pub dialect: Dialect,
}

impl Default for DbxConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_pool_size: DEFAULT_POOL_SIZE,
            dialect: Dialect::POSTGRES,
        }
    }
}

impl DbxConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Self::default()
        }
    }

    pub fn max_pool_size(mut self, size: usize) -> Self {
        self.max_pool_size = size;
        self
    }

    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Read `DATABASE_URL` and, optionally, `DBX_POOL_SIZE` from the environment.
    ///
    /// Loading a `.env` file first is left to the application.
    pub fn from_env() -> DbxResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DbxResult<Self> {
        let url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| DbxError::config("DATABASE_URL is not set"))?;
        let mut config = Self::new(url);
        if let Some(size) = lookup("DBX_POOL_SIZE") {
            let size = size
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| DbxError::config(format!("invalid DBX_POOL_SIZE '{size}'")))?;
            config.max_pool_size = size;
        }
        Ok(config)
    }
}
