//! Error types for forcecmd-auth.
//!
//! Messages never include the password.

/// Result type alias for forcecmd-auth operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for forcecmd-auth operations.
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

    /// Returns true for problems with the credentials themselves, detected
    /// before anything is sent.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Config(_) | ErrorKind::InvalidEndpoint(_) | ErrorKind::PasswordFile(_)
        )
    }
}

/// The kind of error that occurred.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// A required credential is missing.
    #[error("{0}")]
    Config(String),

    /// The login endpoint is not an acceptable URL.
    #[error("Invalid login endpoint: {0}")]
    InvalidEndpoint(String),

    /// The password file exists but cannot be used.
    #[error("Password file error: {0}")]
    PasswordFile(String),

    /// The server accepted the login but its response is incomplete.
    #[error("Login error: {0}")]
    Login(String),

    /// Transport error during login.
    #[error("{0}")]
    Client(String),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl From<forcecmd_client::Error> for Error {
    fn from(err: forcecmd_client::Error) -> Self {
        Error::with_source(ErrorKind::Client(err.to_string()), err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::with_source(ErrorKind::InvalidEndpoint(err.to_string()), err)
    }
}
