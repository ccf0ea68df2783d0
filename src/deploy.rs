//! Deploy pipeline: named files from `src/` into the org.
//!
//! A name ending in `/` is a folder, which exists only as its `-meta.xml`
//! sidecar. Any other name is deployed with its sidecar when one exists.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use chrono::Local;
use forcecmd_metadata::{
    deploy_and_await, DeployOptions, DeployResult, DescribeMetadataResult, JobPoller, ManifestEntry,
    MetadataApi, PackageManifest,
};
use futures::future::try_join_all;
use tracing::info;

use crate::archive::ArchiveBuilder;
use crate::error::{Error, ErrorKind, Result};
use crate::fsutil::{read_optional, write_file};

const SOURCE_PREFIX: &str = "src/";
const META_SUFFIX: &str = "-meta.xml";

/// JUnit report written with `--save-test-result`.
pub const TEST_RESULT_FILE: &str = "TEST-result.xml";

/// What to deploy.
#[derive(Debug, Clone, Default)]
pub struct DeployRequest {
    /// Paths below `src/`, relative to the project root.
    pub files: Vec<String>,
    /// Delete the named components instead of deploying them.
    pub destroy: bool,
    pub options: DeployOptions,
}

/// A named source path, checked.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SourceName<'a> {
    name: &'a str,
    folder: bool,
}

impl<'a> SourceName<'a> {
    fn parse(name: &'a str) -> Result<Self> {
        if !name.starts_with(SOURCE_PREFIX) {
            return Err(Error::new(ErrorKind::NotASourceFile(name.to_string())));
        }
        Ok(Self {
            name,
            folder: name.ends_with('/'),
        })
    }

    /// The file holding the component: the sidecar for a folder.
    fn main_file(&self) -> String {
        if self.folder {
            format!("{}{META_SUFFIX}", self.name.trim_end_matches('/'))
        } else {
            self.name.to_string()
        }
    }

    /// The files to read: main file, plus the sidecar of a non-folder.
    fn files_to_read(&self) -> Vec<String> {
        let main = self.main_file();
        if self.folder {
            vec![main]
        } else {
            let sidecar = format!("{main}{META_SUFFIX}");
            vec![main, sidecar]
        }
    }

    /// `(directory, full name)` of the component, from the path inside `src/`.
    fn component(&self) -> Option<(&'a str, &'a str)> {
        let relative = &self.name[SOURCE_PREFIX.len()..];
        let (directory, rest) = relative.split_once('/')?;
        let full_name = if self.folder {
            rest.trim_end_matches('/')
        } else {
            rest.rfind('.').map_or(rest, |dot| &rest[..dot])
        };
        Some((directory, full_name))
    }
}

/// Contents of the files a deploy reads, `None` for missing files.
pub type SourceFiles = HashMap<String, Option<Vec<u8>>>;

/// Read the named files and their sidecars below `root`.
pub async fn read_sources(files: &[String], root: &Path) -> Result<SourceFiles> {
    let mut paths = BTreeSet::new();
    for name in files {
        info!(file = %name, "Source");
        paths.extend(SourceName::parse(name)?.files_to_read());
    }

    let contents = try_join_all(paths.iter().map(|path| {
        let full_path = root.join(path);
        async move { read_optional(&full_path).await }
    }))
    .await?;
    info!(files = paths.len(), "Reading files done");
    Ok(paths.into_iter().zip(contents).collect())
}

/// Build the deploy archive: the components (unless destroying), the
/// manifest and, when destroying, `destructiveChanges.xml`.
pub fn build_package(
    request: &DeployRequest,
    sources: &SourceFiles,
    describe: &DescribeMetadataResult,
    api_version: &str,
) -> Result<Vec<u8>> {
    let mut archive = ArchiveBuilder::new();
    let mut manifest = PackageManifest::new(api_version);

    for name in &request.files {
        let source = SourceName::parse(name)?;
        let main = source.main_file();

        if !request.destroy {
            let data = source_data(sources, &main)
                .ok_or_else(|| Error::new(ErrorKind::FileNotFound(name.clone())))?;
            archive.add(&main[SOURCE_PREFIX.len()..], data)?;
            if !source.folder {
                let sidecar = format!("{main}{META_SUFFIX}");
                if let Some(data) = source_data(sources, &sidecar) {
                    archive.add(&sidecar[SOURCE_PREFIX.len()..], data)?;
                }
            }
        }

        let (directory, full_name) = source
            .component()
            .ok_or_else(|| Error::new(ErrorKind::UnknownMetadataDirectory(name.clone())))?;
        let descriptor = describe
            .by_directory(directory)
            .ok_or_else(|| Error::new(ErrorKind::UnknownMetadataDirectory(name.clone())))?;
        manifest.insert(ManifestEntry::new(&descriptor.xml_name, full_name));
    }

    let package_xml = if request.destroy {
        let destructive_changes = manifest.destructive_changes_xml();
        info!("{destructive_changes}");
        archive.add("destructiveChanges.xml", destructive_changes.as_bytes())?;
        PackageManifest::new(api_version).package_xml()
    } else {
        manifest.package_xml()
    };
    info!("{package_xml}");
    archive.add("package.xml", package_xml.as_bytes())?;

    archive.finish()
}

fn source_data<'a>(sources: &'a SourceFiles, path: &str) -> Option<&'a [u8]> {
    sources.get(path).and_then(Option::as_deref)
}

/// Read, package and deploy the requested files, waiting for the result.
///
/// A deployment that finished unsuccessfully is returned, not an error.
pub async fn deploy_sources<A: MetadataApi>(
    api: &A,
    poller: &JobPoller,
    request: &DeployRequest,
    root: &Path,
) -> Result<DeployResult> {
    let (sources, describe) = if request.destroy {
        for name in &request.files {
            SourceName::parse(name)?;
        }
        (SourceFiles::new(), api.describe_metadata().await?)
    } else {
        let (sources, describe) = tokio::join!(read_sources(&request.files, root), api.describe_metadata());
        (sources?, describe?)
    };

    let zip = build_package(request, &sources, &describe, api.api_version())?;
    Ok(deploy_and_await(api, poller, &zip, &request.options).await?)
}

/// Write the test results of `result` as `TEST-result.xml` below `root`,
/// with timestamps in local time.
pub async fn write_test_report(result: &DeployResult, hostname: &str, root: &Path) -> Result<()> {
    info!("Writing test result to {TEST_RESULT_FILE}");
    let report = result.junit_report(hostname, &Local).to_string();
    write_file(&root.join(TEST_RESULT_FILE), report).await
}
