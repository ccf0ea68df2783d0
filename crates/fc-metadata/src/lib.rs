//! # forcecmd-metadata
//!
//! Salesforce Metadata API: discover the org's metadata, build package
//! manifests, and run retrieve and deploy jobs to completion.
//!
//! ## Features
//!
//! - **Manifest** - describe, list in batches of three, resolve folders
//! - **Retrieve** - submit, poll, `status.json` and the archive
//! - **Deploy** - submit, poll, summary and JUnit test report
//! - **Polling** - exponential backoff, resubmission on `UNKNOWN_EXCEPTION`
//!
//! ## Example
//!
//! ```rust,ignore
//! use forcecmd_metadata::{build_manifest, retrieve_and_await, JobPoller, MetadataClient};
//!
//! let client = MetadataClient::new(connection);
//! let manifest = build_manifest(&client, &[]).await?;
//! let result = retrieve_and_await(&client, &JobPoller::new(), &manifest)
//!     .await?
//!     .ensure_success()?;
//! std::fs::write("status.json", result.status_json()?)?;
//! ```

mod client;
mod deploy;
mod error;
mod job;
mod manifest;
mod poller;
mod retrieve;
pub mod standard_value_sets;
mod types;

pub use client::{MetadataApi, MetadataClient};
pub use deploy::{
    deploy_and_await, DeployOptions, DeployResult, DeploySummary, JunitReport, TestLevel,
};
pub use error::{Error, ErrorKind, Result};
pub use job::{Job, JobKind, JobStatus, TRANSIENT_JOB_ERROR};
pub use manifest::{build_manifest, excludable_dirs, list_all_types, ListPlan};
pub use poller::{Backoff, JobPoller, DEFAULT_BACKOFF_FACTOR, DEFAULT_INITIAL_INTERVAL};
pub use retrieve::{retrieve_and_await, RetrieveResult, ARCHIVE_ROOT, PLACEHOLDER_FILE_ID};
pub use types::{
    DescribeMetadataResult, ListQuery, ManifestEntry, MetadataComponent, MetadataTypeDescriptor,
    PackageManifest, MAX_LIST_QUERIES, PACKAGE_NAMESPACE,
};
