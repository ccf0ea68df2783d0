//! Error types for the pipelines.

use forcecmd_metadata::DeploySummary;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for pipeline operations.
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
            ErrorKind::Metadata(_) => self
                .source
                .as_ref()
                .and_then(|s| s.downcast_ref::<forcecmd_metadata::Error>())
                .and_then(forcecmd_metadata::Error::deploy_summary),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// `forcecmd.json` is missing, malformed or uses an obsolete key.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The command line names something the pipelines cannot use.
    #[error("{0}")]
    InvalidArgument(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Metadata not found for file: {0}")]
    UnknownMetadataDirectory(String),

    #[error("Not a source file: {0}")]
    NotASourceFile(String),

    #[error("Cannot understand configuration of object: {0}")]
    ObjectConfig(String),

    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    Client(String),

    #[error("{0}")]
    Metadata(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("{0}")]
    Other(String),
}

impl From<forcecmd_auth::Error> for Error {
    fn from(err: forcecmd_auth::Error) -> Self {
        Error::with_source(ErrorKind::Auth(err.to_string()), err)
    }
}

impl From<forcecmd_client::Error> for Error {
    fn from(err: forcecmd_client::Error) -> Self {
        Error::with_source(ErrorKind::Client(err.to_string()), err)
    }
}

impl From<forcecmd_metadata::Error> for Error {
    fn from(err: forcecmd_metadata::Error) -> Self {
        Error::with_source(ErrorKind::Metadata(err.to_string()), err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::with_source(ErrorKind::Io(err.to_string()), err)
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::with_source(ErrorKind::Archive(err.to_string()), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::with_source(ErrorKind::Json(err.to_string()), err)
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::with_source(ErrorKind::Other(err.to_string()), err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forcecmd_metadata::ErrorKind as MetadataErrorKind;

    #[test]
    fn test_error_kind_display() {
        assert_eq!(
            ErrorKind::FileNotFound("src/classes/Foo.cls".into()).to_string(),
            "File not found: src/classes/Foo.cls"
        );
        assert_eq!(
            ErrorKind::NotASourceFile("classes/Foo.cls".into()).to_string(),
            "Not a source file: classes/Foo.cls"
        );
        assert_eq!(
            ErrorKind::UnknownMetadataDirectory("src/nope/Foo.x".into()).to_string(),
            "Metadata not found for file: src/nope/Foo.x"
        );
    }

    #[test]
    fn test_deploy_summary_through_conversion() {
        let summary = DeploySummary {
            status: "Failed".into(),
            errors: vec![],
            test_errors: vec![],
        };
        let err: Error =
            forcecmd_metadata::Error::new(MetadataErrorKind::DeployFailed(Box::new(summary))).into();

        assert_eq!(err.to_string(), "Deploy failed");
        assert_eq!(err.deploy_summary().unwrap().status, "Failed");
    }

    #[test]
    fn test_io_error_conversion() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err.kind, ErrorKind::Io(_)));
        assert!(std::error::Error::source(&err).is_some());
    }
}
