//! Error types for the Google Play report tap.
//!
//! Every fatal condition in a run is represented by [`TapError`]. Errors are
//! propagated with `?` up to the binary, which logs them and converts them
//! into a process exit status via [`TapError::exit_code`].

use std::fmt;

use thiserror::Error;

/// Why a blob could not be fetched from the object store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// The object does not exist (e.g. the report is not published yet)
    NotFound,
    /// The credential is invalid or lacks access to the bucket
    PermissionDenied,
    /// Any other store or transport failure
    Transport,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "object not found"),
            Self::PermissionDenied => write!(f, "permission denied"),
            Self::Transport => write!(f, "transport failure"),
        }
    }
}

/// The main error type for the tap.
#[derive(Error, Debug)]
pub enum TapError {
    /// A required configuration field is missing or malformed.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A report blob could not be fetched.
    #[error("Failed to fetch '{key}': {kind}")]
    Fetch {
        /// Object key that was requested
        key: String,
        /// Classification of the failure
        kind: FetchErrorKind,
        /// Underlying store error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A report blob could not be decoded into rows.
    #[error("Decode error: {0}")]
    Decode(String),

    /// A field value does not conform to its declared schema type.
    #[error("Cannot coerce field '{field}' value '{value}' to {expected}")]
    Coercion {
        field: String,
        expected: String,
        value: String,
    },

    /// The stream is not part of the catalog.
    #[error("Stream '{0}' not found in catalog")]
    StreamNotFound(String),

    /// A cursor or start date could not be parsed.
    #[error("Invalid timestamp '{value}': {message}")]
    InvalidTimestamp { value: String, message: String },

    /// A stream schema could not be interpreted.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, TapError>`.
pub type Result<T> = std::result::Result<T, TapError>;

impl TapError {
    /// Creates a new configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates a new decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// Creates a new fetch error without an underlying cause.
    pub fn fetch(key: impl Into<String>, kind: FetchErrorKind) -> Self {
        Self::Fetch {
            key: key.into(),
            kind,
            source: None,
        }
    }

    /// Creates a new fetch error with an underlying cause.
    pub fn fetch_with_source(
        key: impl Into<String>,
        kind: FetchErrorKind,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Fetch {
            key: key.into(),
            kind,
            source: Some(source),
        }
    }

    /// Creates a new coercion error.
    pub fn coercion(
        field: impl Into<String>,
        expected: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::Coercion {
            field: field.into(),
            expected: expected.into(),
            value: value.into(),
        }
    }

    /// Returns true when the error is a missing-object fetch failure.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Fetch {
                kind: FetchErrorKind::NotFound,
                ..
            }
        )
    }

    /// Process exit status for this error.
    ///
    /// Configuration problems exit with `2` since no run took place; every
    /// other fatal error exits with `1`.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Configuration(_) => 2,
            _ => 1,
        }
    }
}
