//! Error types for the data layer.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for data-layer operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised while building or executing a statement.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error reported by the driver
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// A `:name` placeholder has no entry in the bound map
    #[error("Missing named parameter ':{0}'")]
    MissingParam(String),

    /// The statement could not be assembled (empty SET, empty DELETE match, ...)
    #[error("Invalid statement: {0}")]
    InvalidStatement(String),

    /// Unique constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Check constraint violation: {0}")]
    CheckViolation(String),

    /// Row decode error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Validation error (identifiers, order expressions, input values)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Pool error
    #[error("Pool error: {0}")]
    Pool(String),

    /// Statement timeout
    #[error("Query timeout after {0:?}")]
    Timeout(Duration),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Coarse error classes surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed SQL, missing parameter, or backend rejection.
    Query,
    /// Uniqueness / foreign-key / check violation.
    Constraint,
    /// Statement exceeded its deadline.
    Timeout,
    /// Connectivity or pool exhaustion.
    Connection,
}

impl StoreError {
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

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an invalid-statement error
    pub fn invalid_statement(message: impl Into<String>) -> Self {
        Self::InvalidStatement(message.into())
    }

    /// Collapse the error into its caller-facing class.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UniqueViolation(_) | Self::ForeignKeyViolation(_) | Self::CheckViolation(_) => {
                ErrorKind::Constraint
            }
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Connection(_) | Self::Pool(_) => ErrorKind::Connection,
            Self::Query(e) if e.is_closed() => ErrorKind::Connection,
            _ => ErrorKind::Query,
        }
    }

    /// Check if this is a constraint violation
    pub fn is_constraint(&self) -> bool {
        self.kind() == ErrorKind::Constraint
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Parse a tokio_postgres error into a more specific StoreError
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

impl From<deadpool_postgres::PoolError> for StoreError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}
