//! Secure store error types using thiserror 2.0.
//!
//! Transport failures never leave the crate as-is: the broker maps each one
//! onto a [`StoreError`] kind and keeps the original as the error source.

use thiserror::Error;

/// Message for requests the vault rejected as forbidden.
pub const ACCESS_DENIED: &str = "Access to the secret was denied by DevOps Secrets Vault";
/// Message for paths the vault has no entry for.
pub const SECRET_NOT_FOUND: &str = "The secret was not found in DevOps Secrets Vault";
/// Message for every other failure.
pub const GENERIC_ERROR: &str = "An error occurred while communicating with DevOps Secrets Vault";
/// Message for a failed or empty client-credentials exchange.
pub const UNABLE_TO_AUTHENTICATE: &str = "Unable to authenticate with DevOps Secrets Vault";
/// Message for a context string that cannot be used.
pub const INVALID_CONTEXT: &str = "The DevOps Secrets Vault context is invalid";

/// Error raised by the transport layer (the vault's REST API).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Vault answered with a non-success status
    #[error("vault responded with status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, as returned by the vault
        body: String,
    },

    /// Request could not be sent or its response could not be read
    #[error("vault request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Endpoint URL could not be built from the API root
    #[error("invalid vault endpoint: {0}")]
    InvalidEndpoint(String),
}

impl TransportError {
    /// Create a status error.
    #[must_use]
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    /// HTTP status carried by this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            Self::InvalidEndpoint(_) => None,
        }
    }
}

/// Discriminant of a [`StoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Authentication could not be completed or the context is unusable
    InvalidConfiguration,
    /// The vault rejected the request as forbidden
    UnauthorizedOperation,
    /// The vault has no entry at the requested path
    SecretNotFound,
    /// Any other failure
    Generic,
    /// A required call argument was missing
    InvalidArgument,
}

/// Boxed error kept as the source of configuration and generic failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Secure store errors.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum StoreError {
    /// Authentication could not be completed or the context is unusable
    #[error("{message}")]
    InvalidConfiguration {
        /// Human-readable message
        message: String,
        /// Underlying failure
        #[source]
        source: Option<BoxError>,
    },

    /// The vault rejected the request as forbidden
    #[error("{message}")]
    UnauthorizedOperation {
        /// Human-readable message
        message: String,
        /// Original transport error
        #[source]
        source: TransportError,
    },

    /// The vault has no entry at the requested path
    #[error("{message}")]
    SecretNotFound {
        /// Human-readable message
        message: String,
        /// Original transport error, absent when the record lacked a field
        #[source]
        source: Option<TransportError>,
    },

    /// Any other failure
    #[error("{message}")]
    Generic {
        /// Human-readable message
        message: String,
        /// Underlying failure
        #[source]
        source: Option<BoxError>,
    },

    /// A required call argument was missing
    #[error("Missing required argument: {0}")]
    InvalidArgument(&'static str),
}

/// Result type for secure store operations.
pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// Kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidConfiguration { .. } => ErrorKind::InvalidConfiguration,
            Self::UnauthorizedOperation { .. } => ErrorKind::UnauthorizedOperation,
            Self::SecretNotFound { .. } => ErrorKind::SecretNotFound,
            Self::Generic { .. } => ErrorKind::Generic,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
        }
    }

    /// Map a transport error from a secrets call.
    ///
    /// 403 becomes [`ErrorKind::UnauthorizedOperation`], 404 becomes
    /// [`ErrorKind::SecretNotFound`], everything else is generic.
    #[must_use]
    pub fn from_transport(err: TransportError) -> Self {
        match err.status() {
            Some(403) => Self::UnauthorizedOperation {
                message: ACCESS_DENIED.to_string(),
                source: err,
            },
            Some(404) => Self::SecretNotFound {
                message: SECRET_NOT_FOUND.to_string(),
                source: Some(err),
            },
            _ => Self::Generic {
                message: GENERIC_ERROR.to_string(),
                source: Some(Box::new(err)),
            },
        }
    }

    /// Map a transport error from the token endpoint.
    ///
    /// Rejected credentials (400, 401) are a configuration problem; other
    /// failures follow [`StoreError::from_transport`].
    #[must_use]
    pub fn from_token_transport(err: TransportError) -> Self {
        match err.status() {
            Some(400 | 401) => Self::InvalidConfiguration {
                message: UNABLE_TO_AUTHENTICATE.to_string(),
                source: Some(Box::new(err)),
            },
            _ => Self::from_transport(err),
        }
    }

    /// Create an authentication failure without an underlying error.
    #[must_use]
    pub fn unable_to_authenticate() -> Self {
        Self::InvalidConfiguration {
            message: UNABLE_TO_AUTHENTICATE.to_string(),
            source: None,
        }
    }

    /// Create an invalid context error.
    #[must_use]
    pub fn invalid_context(source: impl Into<BoxError>) -> Self {
        Self::InvalidConfiguration {
            message: INVALID_CONTEXT.to_string(),
            source: Some(source.into()),
        }
    }

    /// Create a not-found error for a record that lacks a projected field.
    #[must_use]
    pub fn missing_field(path: &str, field: &str) -> Self {
        Self::SecretNotFound {
            message: format!("{SECRET_NOT_FOUND}: '{path}' has no '{field}' field"),
            source: None,
        }
    }

    /// Create a generic error.
    #[must_use]
    pub fn generic(message: impl Into<String>, source: Option<BoxError>) -> Self {
        Self::Generic {
            message: message.into(),
            source,
        }
    }
}
