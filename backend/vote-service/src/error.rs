/// Error types for vote-service
use thiserror::Error;

// PostgreSQL SQLSTATE codes the ledger reacts to
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const QUERY_CANCELED: &str = "57014";

#[derive(Error, Debug, Clone)]
pub enum ServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: caller identity could not be established")]
    Unauthorized,

    /// Reserved for the transport layer; services report ownership
    /// mismatches as "nothing updated or deleted" instead
    #[error("Forbidden: caller does not own this post")]
    Forbidden,

    /// Concurrent contention on the same vote row; safe to retry
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ServiceError {
    /// Whether the caller may retry the same call unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::Conflict(_))
    }

    /// Stable label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::NotFound(_) => "not_found",
            ServiceError::Unauthorized => "unauthorized",
            ServiceError::Forbidden => "forbidden",
            ServiceError::Conflict(_) => "conflict",
            ServiceError::StoreUnavailable(_) => "store_unavailable",
            ServiceError::InvalidInput(_) => "invalid_input",
        }
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => ServiceError::NotFound("row not found".to_string()),
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED) | Some(UNIQUE_VIOLATION) => {
                    ServiceError::Conflict(db_err.message().to_string())
                }
                Some(FOREIGN_KEY_VIOLATION) => ServiceError::NotFound(format!(
                    "referenced row missing ({})",
                    db_err.constraint().unwrap_or("unknown constraint")
                )),
                Some(QUERY_CANCELED) => {
                    ServiceError::StoreUnavailable(format!("statement timeout: {}", db_err.message()))
                }
                _ => ServiceError::StoreUnavailable(format!("Database error: {}", err)),
            },
            _ => ServiceError::StoreUnavailable(format!("Database error: {}", err)),
        }
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;
