//! Asynchronous metadata jobs.

use std::fmt;

use forcecmd_xml::XmlValue;
use serde::{Deserialize, Serialize};

/// Error code of a job that failed for reasons on the server side and can be
/// submitted again.
pub const TRANSIENT_JOB_ERROR: &str = "UNKNOWN_EXCEPTION";

/// What a job does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobKind {
    Retrieve,
    Deploy,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Retrieve => write!(f, "Retrieve"),
            JobKind::Deploy => write!(f, "Deploy"),
        }
    }
}

/// Job status as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Queued,
    Pending,
    InProgress,
    Succeeded,
    SucceededPartial,
    Failed,
    Canceling,
    Canceled,
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Queued" => Ok(JobStatus::Queued),
            "Pending" => Ok(JobStatus::Pending),
            "InProgress" => Ok(JobStatus::InProgress),
            "Succeeded" => Ok(JobStatus::Succeeded),
            "SucceededPartial" => Ok(JobStatus::SucceededPartial),
            "Failed" => Ok(JobStatus::Failed),
            "Canceling" => Ok(JobStatus::Canceling),
            "Canceled" => Ok(JobStatus::Canceled),
            _ => Err(format!("Unknown job status: {}", s)),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A retrieve or deploy job as of its latest status check.
///
/// `done` and `success` are the server's own flags; nothing here infers them
/// from `status`.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: String,
    pub kind: JobKind,
    pub status: Option<JobStatus>,
    /// The raw status text, kept when it is not a known [`JobStatus`].
    pub status_text: Option<String>,
    pub done: bool,
    pub success: bool,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    /// The complete status result.
    pub payload: XmlValue,
}

impl Job {
    /// Read a status result (`RetrieveResult`, `DeployResult` or `AsyncResult`).
    pub fn from_xml(kind: JobKind, value: XmlValue) -> Self {
        let text = |key: &str| {
            value[key]
                .as_str()
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let status_text = text("status").or_else(|| text("state"));
        Self {
            id: text("id").unwrap_or_default(),
            kind,
            status: status_text.as_deref().and_then(|s| s.parse().ok()),
            status_text,
            done: value["done"].is_true(),
            success: value["success"].is_true(),
            error_code: text("errorStatusCode").or_else(|| text("statusCode")),
            error_message: text("errorMessage").or_else(|| text("message")),
            payload: value,
        }
    }

    /// True when the job ended with the transient server error.
    pub fn needs_resubmit(&self) -> bool {
        self.done && self.error_code.as_deref() == Some(TRANSIENT_JOB_ERROR)
    }
}
