//! Error types for forcecmd-client.

use std::io;

/// Result type alias for forcecmd-client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for forcecmd-client operations.
#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional source error.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Create a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, source: None }
    }

    /// Create a new error with the given kind and source.
    pub fn with_source(
        kind: ErrorKind,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
        }
    }

    /// Returns true if the request can be sent again as is.
    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }

    /// Returns true if the request never produced a response.
    pub fn is_network(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::ConnectTimeout(_) | ErrorKind::ConnectionReset(_) | ErrorKind::Network
        )
    }

    /// The `faultstring` of a SOAP fault.
    pub fn fault_string(&self) -> Option<&str> {
        match &self.kind {
            ErrorKind::SoapFault { fault_string, .. } => Some(fault_string),
            _ => None,
        }
    }
}

/// The kind of error that occurred.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// Invalid configuration. Never retried.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Timed out while establishing the connection.
    #[error("Got connect ETIMEDOUT: {0}")]
    ConnectTimeout(String),

    /// The peer reset the connection while the response was being read.
    #[error("Got read ECONNRESET: {0}")]
    ConnectionReset(String),

    /// The request never completed.
    #[error("Network error, offline or timeout")]
    Network,

    /// Non-success HTTP status.
    #[error(
        "HTTP error {status} {reason}{}",
        body.as_deref().map(|b| format!("\n\n{b}")).unwrap_or_default()
    )]
    Http {
        status: u16,
        reason: String,
        body: Option<String>,
    },

    /// A SOAP fault returned by the server.
    #[error("{fault_string}")]
    SoapFault {
        fault_code: String,
        fault_string: String,
    },

    /// REST error list, one `errorCode: message` per line.
    #[error("{0}")]
    Rest(String),

    /// A response that could not be understood.
    #[error("Invalid response (HTTP {status}): {message}\n\n{body}")]
    InvalidResponse {
        status: u16,
        message: String,
        body: String,
    },

    /// XML parse error outside of a response.
    #[error("XML error: {0}")]
    Xml(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(String),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl ErrorKind {
    /// Connect timeouts and connection resets are safe to retry: the server
    /// either never saw the request or the response was lost mid-read.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ErrorKind::ConnectTimeout(_) | ErrorKind::ConnectionReset(_)
        )
    }
}

/// The kind of the first `io::Error` in the source chain.
fn io_error_kind(err: &(dyn std::error::Error + 'static)) -> Option<io::ErrorKind> {
    let mut current = Some(err);
    while let Some(err) = current {
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            return Some(io_err.kind());
        }
        current = err.source();
    }
    None
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let io_kind = io_error_kind(&err);
        let kind = if err.is_connect() && (err.is_timeout() || io_kind == Some(io::ErrorKind::TimedOut)) {
            ErrorKind::ConnectTimeout(err.to_string())
        } else if io_kind == Some(io::ErrorKind::ConnectionReset) {
            ErrorKind::ConnectionReset(err.to_string())
        } else if err.is_connect() || err.is_timeout() || err.is_request() {
            ErrorKind::Network
        } else if let Some(status) = err.status() {
            ErrorKind::Http {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
                body: None,
            }
        } else {
            ErrorKind::Other(err.to_string())
        };

        Error::with_source(kind, err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::with_source(ErrorKind::Json(err.to_string()), err)
    }
}

impl From<forcecmd_xml::ParseError> for Error {
    fn from(err: forcecmd_xml::ParseError) -> Self {
        Error::with_source(ErrorKind::Xml(err.to_string()), err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::with_source(ErrorKind::Config(format!("Invalid URL: {}", err)), err)
    }
}
