//! Unified error types for InsightIQ.
//!
//! Error codes:
//! - VALID_001-003: Validation errors
//! - DB_001-003: Persistence errors
//! - TENANT_001-002: Tenant resolution errors
//! - LLM_001: Language-model call failed

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Validation error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorCode {
    /// VALID_001: Invalid JSON / invalid request shape
    InvalidFormat,
    /// VALID_002: Identifier failed the schema allow-list
    InvalidIdentifier,
    /// VALID_003: Unknown ingest domain
    UnknownDomain,
}

impl ValidationErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidFormat => "VALID_001",
            Self::InvalidIdentifier => "VALID_002",
            Self::UnknownDomain => "VALID_003",
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> u16 {
        400
    }
}

/// Persistence error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorCode {
    /// DB_001: Failed to store rows
    StoreFailed,
    /// DB_002: Failed to create or check out a pooled connection
    PoolUnavailable,
    /// DB_003: Query failed
    QueryFailed,
}

impl DbErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::StoreFailed => "DB_001",
            Self::PoolUnavailable => "DB_002",
            Self::QueryFailed => "DB_003",
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> u16 {
        500
    }
}

/// Tenant resolution error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantErrorCode {
    /// TENANT_001: Tenant registry could not be read
    EnumerationFailed,
    /// TENANT_002: Tenant is not registered
    UnknownTenant,
}

impl TenantErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::EnumerationFailed => "TENANT_001",
            Self::UnknownTenant => "TENANT_002",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Self::EnumerationFailed => 500,
            Self::UnknownTenant => 404,
        }
    }
}

/// Unified error type for InsightIQ.
#[derive(Debug, Error)]
pub enum Error {
    /// A schema, table, or column identifier failed the allow-list.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Validation error with code.
    #[error("[{code}] {message}")]
    Validation {
        code: &'static str,
        message: String,
        http_status: u16,
    },

    /// Persistence error with code.
    #[error("[{code}] {message}")]
    Persistence {
        code: &'static str,
        message: String,
        http_status: u16,
    },

    /// Tenant resolution error with code.
    #[error("[{code}] {message}")]
    Tenant {
        code: &'static str,
        message: String,
        http_status: u16,
    },

    /// A language-model call failed where no fallback applies.
    #[error("[LLM_001] {0}")]
    Capability(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn invalid_identifier(msg: impl Into<String>) -> Self {
        Self::InvalidIdentifier(msg.into())
    }

    /// Create a validation error with code.
    pub fn validation(code: ValidationErrorCode, msg: impl Into<String>) -> Self {
        Self::Validation {
            code: code.code(),
            message: msg.into(),
            http_status: code.http_status(),
        }
    }

    /// Create a persistence error.
    pub fn persistence(code: DbErrorCode, msg: impl Into<String>) -> Self {
        Self::Persistence {
            code: code.code(),
            message: msg.into(),
            http_status: code.http_status(),
        }
    }

    /// Create a tenant resolution error.
    pub fn tenant(code: TenantErrorCode, msg: impl Into<String>) -> Self {
        Self::Tenant {
            code: code.code(),
            message: msg.into(),
            http_status: code.http_status(),
        }
    }

    pub fn capability(msg: impl Into<String>) -> Self {
        Self::Capability(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidIdentifier(_) => 400,
            Self::Validation { http_status, .. } => *http_status,
            Self::Persistence { http_status, .. } => *http_status,
            Self::Tenant { http_status, .. } => *http_status,
            Self::Capability(_) => 502,
            Self::Config(_) => 500,
            Self::Serialization(_) => 400,
            Self::Internal(_) => 500,
        }
    }

    /// Get the error code if this is a coded error.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::InvalidIdentifier(_) => Some(ValidationErrorCode::InvalidIdentifier.code()),
            Self::Validation { code, .. } => Some(code),
            Self::Persistence { code, .. } => Some(code),
            Self::Tenant { code, .. } => Some(code),
            Self::Capability(_) => Some("LLM_001"),
            _ => None,
        }
    }
}
