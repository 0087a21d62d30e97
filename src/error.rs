use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Self::UniquenessViolation(db_err.message().to_string())
            }
            sqlx::Error::Database(db_err) if is_busy_code(db_err.code().as_deref()) => {
                Self::StoreUnavailable(format!("Store busy: {}", db_err.message()))
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::StoreUnavailable(err.to_string())
            }
            _ => Self::DatabaseError(err.to_string()),
        }
    }
}

impl From<axum::extract::rejection::JsonRejection> for LedgerError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<config::ConfigError> for LedgerError {
    fn from(err: config::ConfigError) -> Self {
        Self::ConfigError(err.to_string())
    }
}

/// SQLite reports lock contention as BUSY (5) or LOCKED (6), possibly extended.
fn is_busy_code(code: Option<&str>) -> bool {
    code.and_then(|c| c.parse::<i32>().ok())
        .map(|c| matches!(c & 0xff, 5 | 6))
        .unwrap_or(false)
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Voter {0} has already cast a vote")]
    AlreadyVoted(String),

    #[error("Unknown candidate: {0}")]
    UnknownCandidate(i64),

    #[error("Ledger has not been initialized")]
    EmptyLedger,

    #[error("Uniqueness violation: {0}")]
    UniquenessViolation(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Candidate {0} has recorded votes and cannot be deleted")]
    CandidateHasVotes(i64),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

pub type Result<T, E = LedgerError> = std::result::Result<T, E>;

impl LedgerError {
    /// Transient failures where re-running the whole submission is safe.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable(_) | Self::UniquenessViolation(_)
        )
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::AlreadyVoted(_) => "ALREADY_VOTED",
            Self::UnknownCandidate(_) => "UNKNOWN_CANDIDATE",
            Self::EmptyLedger => "EMPTY_LEDGER",
            Self::UniquenessViolation(_) => "UNIQUENESS_VIOLATION",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Self::CandidateHasVotes(_) => "CANDIDATE_HAS_VOTES",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::SerializationError(_) => "SERIALIZATION_ERROR",
            Self::DatabaseError(_) => "DATABASE_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::AlreadyVoted(_)
            | Self::UniquenessViolation(_)
            | Self::CandidateHasVotes(_) => StatusCode::CONFLICT,
            Self::UnknownCandidate(_) => StatusCode::NOT_FOUND,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::EmptyLedger | Self::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::ConfigError(_) | Self::SerializationError(_) | Self::DatabaseError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "error": self.error_code(),
            "message": self.to_string(),
        }));
        (self.status_code(), body).into_response()
    }
}
