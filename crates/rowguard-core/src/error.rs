//! Shared error type across rowguard crates.

use thiserror::Error;

use crate::policy::StatementKind;

/// Caller-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid input / malformed value.
    BadRequest,
    /// Write rejected by the tenant row filter.
    PolicyViolation,
    /// Record type or policy defined inconsistently.
    Misconfigured,
    /// Required column missing or null.
    NotNull,
    /// Table, column or role does not exist.
    Unknown,
    /// Principal may not perform the operation.
    NotAuthorized,
    /// No tenant available for a tenant-bound session.
    MissingTenant,
    /// No connection slot became free in time.
    PoolTimeout,
    /// Concurrent modification detected at commit.
    Conflict,
    /// Unsupported config version.
    UnsupportedVersion,
    /// Internal error.
    Internal,
}

impl ErrorCode {
    /// String representation used in logs and CLI output.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::PolicyViolation => "POLICY_VIOLATION",
            ErrorCode::Misconfigured => "MISCONFIGURED",
            ErrorCode::NotNull => "NOT_NULL",
            ErrorCode::Unknown => "UNKNOWN",
            ErrorCode::NotAuthorized => "NOT_AUTHORIZED",
            ErrorCode::MissingTenant => "MISSING_TENANT",
            ErrorCode::PoolTimeout => "POOL_TIMEOUT",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, RowGuardError>;

/// Unified error type used by core and store.
///
/// Rows hidden by the tenant filter never produce an error; they are simply
/// absent from results and not counted as affected.
#[derive(Debug, Error)]
pub enum RowGuardError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("new row violates row-level security policy for table \"{table}\" ({op}: {reason})")]
    PolicyViolation {
        table: String,
        op: StatementKind,
        reason: &'static str,
    },
    #[error("misconfigured: {0}")]
    Misconfigured(String),
    #[error("null value in column \"{column}\" of table \"{table}\"")]
    NotNull { table: String, column: String },
    #[error("unknown table: {0}")]
    UnknownTable(String),
    #[error("unknown column \"{column}\" in table \"{table}\"")]
    UnknownColumn { table: String, column: String },
    #[error("unknown role: {0}")]
    UnknownRole(String),
    #[error("not authorized: {0}")]
    NotAuthorized(String),
    #[error("no tenant bound to session")]
    MissingTenant,
    #[error("timed out waiting for a connection slot")]
    PoolTimeout,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl RowGuardError {
    /// Map internal error to a stable caller-facing code.
    pub fn code(&self) -> ErrorCode {
        match self {
            RowGuardError::BadRequest(_) => ErrorCode::BadRequest,
            RowGuardError::PolicyViolation { .. } => ErrorCode::PolicyViolation,
            RowGuardError::Misconfigured(_) => ErrorCode::Misconfigured,
            RowGuardError::NotNull { .. } => ErrorCode::NotNull,
            RowGuardError::UnknownTable(_)
            | RowGuardError::UnknownColumn { .. }
            | RowGuardError::UnknownRole(_) => ErrorCode::Unknown,
            RowGuardError::NotAuthorized(_) => ErrorCode::NotAuthorized,
            RowGuardError::MissingTenant => ErrorCode::MissingTenant,
            RowGuardError::PoolTimeout => ErrorCode::PoolTimeout,
            RowGuardError::Conflict(_) => ErrorCode::Conflict,
            RowGuardError::UnsupportedVersion => ErrorCode::UnsupportedVersion,
            RowGuardError::Internal(_) => ErrorCode::Internal,
        }
    }

    pub fn is_policy_violation(&self) -> bool {
        matches!(self, RowGuardError::PolicyViolation { .. })
    }
}
