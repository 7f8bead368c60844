//! Error types for dbx

use std::any::Any;
use thiserror::Error;

/// Result type alias for dbx operations
pub type DbxResult<T> = Result<T, DbxError>;

/// Error types for statement execution and transactions
#[derive(Debug, Error)]
pub enum DbxError {
    /// Caller configuration error, detected before touching the session
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error
    #[cfg(feature = "postgres")]
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Error reported by a non-Postgres session implementation
    #[error("Driver error: {0}")]
    Driver(String),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Check constraint violation: {0}")]
    CheckViolation(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),

    /// A panic without a typed error payload was recovered inside a transaction
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DbxError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a driver error
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver(message.into())
    }

    /// Check if this is a configuration error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    /// Check if this error came from a recovered untyped panic
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }

    /// Turn a recovered panic payload into an error.
    ///
    /// A payload that is itself a `DbxError` is returned unchanged; anything else
    /// becomes [`DbxError::Internal`].
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        match payload.downcast::<DbxError>() {
            Ok(err) => *err,
            Err(payload) => {
                let message = if let Some(s) = payload.downcast_ref::<&str>() {
                    (*s).to_string()
                } else if let Some(s) = payload.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "unknown panic".to_string()
                };
                Self::Internal(message)
            }
        }
    }

    /// Parse a tokio_postgres error into a more specific DbxError
    #[cfg(feature = "postgres")]
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let message = db_err.message();

            match db_err.code().code() {
                "23505" => return Self::UniqueViolation(format!("{}: {}", constraint, message)),
                "23503" => {
                    return Self::ForeignKeyViolation(format!("{}: {}", constraint, message));
                }
                "23514" => return Self::CheckViolation(format!("{}: {}", constraint, message)),
                _ => {}
            }
        }
        Self::Query(err)
    }
}

impl From<serde_json::Error> for DbxError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for DbxError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_panic_payload_is_returned_unchanged() {
        let payload: Box<dyn Any + Send> = Box::new(DbxError::not_found("user 7"));
        let err = DbxError::from_panic(payload);
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Not found: user 7");
    }

    #[test]
    fn string_panic_payload_becomes_internal() {
        let err = DbxError::from_panic(Box::new("boom"));
        assert!(matches!(err, DbxError::Internal(ref m) if m == "boom"));

        let err = DbxError::from_panic(Box::new(String::from("bang")));
        assert!(matches!(err, DbxError::Internal(ref m) if m == "bang"));

        let err = DbxError::from_panic(Box::new(42_u8));
        assert!(err.is_internal());
    }
}
