use std::fmt;
use thiserror::Error;

/// The error type for objsign operations
#[derive(Error, Debug)]
#[error("{kind}: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<anyhow::Error>,
}

/// The kind of error that occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request can't be turned into a canonical request (bad method, path or header)
    CanonicalizationInvalid,

    /// The signature can't be computed (empty secret, bad timestamp, mismatched scope)
    SigningFailed,

    /// No credential could be loaded, or the loaded key pair is empty
    CredentialMissing,

    /// Credentials exist but are invalid/malformed
    CredentialInvalid,

    /// Credentials are expired
    CredentialExpired,

    /// The region has no registered endpoint
    RegionUnknown,

    /// The pre-signed URL expiry is out of the accepted range
    ExpiryInvalid,

    /// The target URL can't be built
    UrlInvalid,

    /// The server answered with a decodable error body
    ErrorResponse,

    /// The server answered with an error status and a body we can't decode
    MalformedResponse,

    /// Connectivity or I/O failure while talking to the server
    Transport,

    /// The in-flight request was cancelled or timed out
    Cancelled,

    /// Configuration error (missing fields, invalid values)
    ConfigInvalid,

    /// Unexpected errors
    Unexpected,
}

impl Error {
    /// Create a new error with the given kind and message
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Add a source error
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Get the error message without the kind prefix
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Borrow the source as a concrete type if it is one.
    ///
    /// Services attach structured details (for example a decoded error body)
    /// as the source; this is how callers get them back.
    pub fn downcast_source<T>(&self) -> Option<&T>
    where
        T: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.source.as_ref().and_then(|e| e.downcast_ref::<T>())
    }

    /// Check if this is a credential error
    pub fn is_credential_error(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::CredentialMissing
                | ErrorKind::CredentialInvalid
                | ErrorKind::CredentialExpired
        )
    }

    /// Check if this error was detected before any network call
    /// and will fail the same way on every attempt.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::CanonicalizationInvalid
                | ErrorKind::SigningFailed
                | ErrorKind::CredentialMissing
                | ErrorKind::CredentialInvalid
                | ErrorKind::RegionUnknown
                | ErrorKind::ExpiryInvalid
                | ErrorKind::UrlInvalid
                | ErrorKind::ConfigInvalid
        )
    }
}

// Convenience constructors
impl Error {
    /// Create a canonicalization error
    pub fn canonicalization_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CanonicalizationInvalid, message)
    }

    /// Create a signing error
    pub fn signing_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SigningFailed, message)
    }

    /// Create a missing credential error
    pub fn credential_missing(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CredentialMissing, message)
    }

    /// Create a credential invalid error
    pub fn credential_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CredentialInvalid, message)
    }

    /// Create a credential expired error
    pub fn credential_expired(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CredentialExpired, message)
    }

    /// Create an unknown region error
    pub fn region_unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RegionUnknown, message)
    }

    /// Create an invalid expiry error
    pub fn expiry_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ExpiryInvalid, message)
    }

    /// Create an invalid url error
    pub fn url_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UrlInvalid, message)
    }

    /// Create an error response error
    pub fn error_response(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ErrorResponse, message)
    }

    /// Create a malformed response error
    pub fn malformed_response(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedResponse, message)
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    /// Create a cancelled error
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, message)
    }

    /// Create a config invalid error
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message)
    }

    /// Create an unexpected error
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, message)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::CanonicalizationInvalid => write!(f, "canonicalization error"),
            ErrorKind::SigningFailed => write!(f, "signing error"),
            ErrorKind::CredentialMissing => write!(f, "missing credentials"),
            ErrorKind::CredentialInvalid => write!(f, "invalid credentials"),
            ErrorKind::CredentialExpired => write!(f, "expired credentials"),
            ErrorKind::RegionUnknown => write!(f, "unknown region"),
            ErrorKind::ExpiryInvalid => write!(f, "invalid expiry"),
            ErrorKind::UrlInvalid => write!(f, "invalid url"),
            ErrorKind::ErrorResponse => write!(f, "error response"),
            ErrorKind::MalformedResponse => write!(f, "malformed response"),
            ErrorKind::Transport => write!(f, "transport error"),
            ErrorKind::Cancelled => write!(f, "cancelled"),
            ErrorKind::ConfigInvalid => write!(f, "invalid configuration"),
            ErrorKind::Unexpected => write!(f, "unexpected error"),
        }
    }
}

/// Convenience type alias for Results
pub type Result<T> = std::result::Result<T, Error>;

// Common From implementations
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(err)
    }
}

impl From<std::fmt::Error> for Error {
    fn from(err: std::fmt::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::Error> for Error {
    fn from(err: http::Error) -> Self {
        Self::url_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::canonicalization_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::InvalidHeaderName> for Error {
    fn from(err: http::header::InvalidHeaderName) -> Self {
        Self::canonicalization_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::ToStrError> for Error {
    fn from(err: http::header::ToStrError) -> Self {
        Self::canonicalization_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::uri::InvalidUri> for Error {
    fn from(err: http::uri::InvalidUri) -> Self {
        Self::url_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::uri::InvalidUriParts> for Error {
    fn from(err: http::uri::InvalidUriParts) -> Self {
        Self::url_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}
