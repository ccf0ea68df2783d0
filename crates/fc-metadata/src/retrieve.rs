//! Retrieve operations.

use base64::{engine::general_purpose, Engine as _};
use forcecmd_xml::XmlValue;
use serde::Serialize;
use tracing::info;

use crate::client::MetadataApi;
use crate::error::{Error, ErrorKind, Result};
use crate::job::{Job, JobKind};
use crate::poller::JobPoller;
use crate::types::PackageManifest;

/// Id of the entry the server adds for the package itself.
pub const PLACEHOLDER_FILE_ID: &str = "000000000000000AAA";

/// Root directory of every entry in a retrieved or deployed archive.
pub const ARCHIVE_ROOT: &str = "unpackaged/";

/// A finished retrieve.
#[derive(Debug, Clone)]
pub struct RetrieveResult {
    pub job: Job,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusFile {
    file_properties: Vec<serde_json::Value>,
    messages: Vec<serde_json::Value>,
}

impl RetrieveResult {
    pub fn from_job(job: Job) -> Self {
        Self { job }
    }

    pub fn success(&self) -> bool {
        self.job.success
    }

    /// Fail with [`ErrorKind::RetrieveFailed`] unless the retrieve succeeded.
    pub fn ensure_success(self) -> Result<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(Error::new(ErrorKind::RetrieveFailed(
                self.job.error_message.clone(),
            )))
        }
    }

    /// File properties sorted by file name, without the package's own
    /// placeholder entry.
    pub fn file_properties(&self) -> Vec<&XmlValue> {
        let mut properties: Vec<&XmlValue> = self.job.payload["fileProperties"]
            .as_array()
            .iter()
            .filter(|fp| !is_placeholder(fp))
            .collect();
        properties.sort_by(|a, b| a["fileName"].as_str().cmp(&b["fileName"].as_str()));
        properties
    }

    pub fn messages(&self) -> &[XmlValue] {
        self.job.payload["messages"].as_array()
    }

    /// `status.json`: file properties and messages, indented by four spaces.
    pub fn status_json(&self) -> Result<String> {
        let status = StatusFile {
            file_properties: self.file_properties().into_iter().map(XmlValue::to_json).collect(),
            messages: self.messages().iter().map(XmlValue::to_json).collect(),
        };

        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        status.serialize(&mut serializer)?;
        String::from_utf8(out).map_err(|e| Error::with_source(ErrorKind::Other(e.to_string()), e))
    }

    /// The retrieved zip archive.
    pub fn zip_bytes(&self) -> Result<Vec<u8>> {
        let encoded = self.job.payload["zipFile"].as_str().ok_or_else(|| {
            Error::new(ErrorKind::InvalidResponse(
                "retrieve result without zipFile".to_string(),
            ))
        })?;
        Ok(general_purpose::STANDARD.decode(encoded)?)
    }
}

fn is_placeholder(file_properties: &XmlValue) -> bool {
    file_properties["id"].as_str() == Some(PLACEHOLDER_FILE_ID)
        && file_properties["fullName"].as_str().unwrap_or_default().is_empty()
}

/// Retrieve everything in `manifest` and wait for the result.
pub async fn retrieve_and_await<A: MetadataApi>(
    api: &A,
    poller: &JobPoller,
    manifest: &PackageManifest,
) -> Result<RetrieveResult> {
    info!(entries = manifest.len(), "Retrieve");
    let job = poller
        .submit_and_await(
            JobKind::Retrieve,
            move || api.retrieve(manifest),
            move |id| async move { api.check_retrieve_status(&id).await },
        )
        .await?;
    Ok(RetrieveResult::from_job(job))
}
