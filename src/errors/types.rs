//! Error type definitions for the event channel manager
//!
//! Only fatal conditions are modelled here. Recoverable problems (a bad regex,
//! a malformed rule parameter, a missing date in a channel name) are logged as
//! warnings where they occur and never surface as errors.

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration loading/validation errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Fatal scan errors
    #[error("Scan aborted: {0}")]
    Scan(#[from] ScanError),

    /// Channel source / write-back errors
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Report export errors
    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Configuration specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Layered configuration could not be extracted
    #[error("Failed to resolve configuration: {0}")]
    Resolve(#[from] Box<figment::Error>),

    /// A required setting is empty
    #[error("Missing required setting: {field}")]
    MissingField { field: String },

    /// A setting has an unusable value
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    /// Settings file could not be read or written
    #[error("Settings file error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings could not be serialized for persistence
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Fatal conditions that abort a scan with no write-back
#[derive(Error, Debug)]
pub enum ScanError {
    /// None of the configured profile names exist
    #[error("Channel profile(s) not found: {names}")]
    ProfilesNotFound { names: String },

    /// Profiles resolved but no channels matched
    #[error("No channels found in profile(s) '{profiles}'{groups}")]
    NoChannels { profiles: String, groups: String },

    /// A non-empty rule string produced no usable rules
    #[error("No valid hide rules in '{input}'")]
    NoValidRules { input: String },
}

/// Channel source and write-back errors
#[derive(Error, Debug)]
pub enum SourceError {
    /// Credentials missing or rejected
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// Authenticated user lacks permission
    #[error("Access forbidden: {endpoint}")]
    Forbidden { endpoint: String },

    /// Endpoint does not exist (usually a wrong base URL)
    #[error("Endpoint not found: {endpoint}")]
    NotFound { endpoint: String },

    /// Non-success HTTP status
    #[error("HTTP error: {status} - {message}")]
    Http { status: u16, message: String },

    /// Transport-level failure
    #[error("Unable to connect to {url}: {message}")]
    Connection { url: String, message: String },

    /// Response body could not be understood
    #[error("Invalid response from {endpoint}: {message}")]
    InvalidResponse { endpoint: String, message: String },

    /// Snapshot or store level failures
    #[error("Store error: {message}")]
    Store { message: String },
}

/// Report sink errors
#[derive(Error, Debug)]
pub enum ReportError {
    /// Filesystem failures
    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialization failures
    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization failures
    #[error("Failed to write JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Resolve(Box::new(err))
    }
}

/// Convenience methods for creating common error types
impl AppError {
    /// Create a validation error with a custom message
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error aborted a scan before any write-back
    pub fn is_fatal_scan_error(&self) -> bool {
        matches!(self, Self::Scan(_) | Self::Config(ConfigError::MissingField { .. }))
    }
}

impl ConfigError {
    /// Create a missing field error
    pub fn missing<F: Into<String>>(field: F) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl SourceError {
    /// Create an authentication failed error
    pub fn auth_failed<M: Into<String>>(message: M) -> Self {
        Self::AuthenticationFailed {
            message: message.into(),
        }
    }

    /// Create an invalid response error
    pub fn invalid_response<E: Into<String>, M: Into<String>>(endpoint: E, message: M) -> Self {
        Self::InvalidResponse {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create a store error
    pub fn store<M: Into<String>>(message: M) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Whether the error means the cached access token should be dropped
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::AuthenticationFailed { .. })
    }
}
