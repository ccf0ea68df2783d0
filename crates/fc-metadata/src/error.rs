//! Error types for forcecmd-metadata.

use crate::deploy::DeploySummary;

/// Result type alias for forcecmd-metadata operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for forcecmd-metadata operations.
#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    pub kind: ErrorKind,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, source: None }
    }

    pub fn with_source(
        kind: ErrorKind,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
        }
    }

    /// The deploy summary of a failed deployment.
    pub fn deploy_summary(&self) -> Option<&DeploySummary> {
        match &self.kind {
            ErrorKind::DeployFailed(summary) => Some(summary),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// Transport or SOAP fault, with the client's message.
    #[error("{0}")]
    Client(String),

    /// The request cannot be sent as built.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The server answered with something other than the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error(
        "Retrieve failed{}",
        .0.as_deref().map(|m| format!(": {m}")).unwrap_or_default()
    )]
    RetrieveFailed(Option<String>),

    #[error("Deploy failed")]
    DeployFailed(Box<DeploySummary>),

    #[error("{0}")]
    Other(String),
}

impl From<forcecmd_client::Error> for Error {
    fn from(err: forcecmd_client::Error) -> Self {
        Error::with_source(ErrorKind::Client(err.to_string()), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::with_source(ErrorKind::Other(format!("JSON error: {err}")), err)
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Error::with_source(
            ErrorKind::InvalidResponse(format!("zipFile is not base64: {err}")),
            err,
        )
    }
}
