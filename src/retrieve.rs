//! Retrieve pipeline: the whole org's metadata into `src/`.

use std::path::{Path, PathBuf};

use forcecmd_metadata::{build_manifest, retrieve_and_await, JobPoller, MetadataApi, RetrieveResult};
use futures::future::try_join_all;
use tracing::{info, warn};

use crate::archive::read_entries;
use crate::error::Result;
use crate::fsutil::{remove_tree, write_file};

/// Directory of the local source tree.
pub const SOURCE_DIR: &str = "src";

/// File properties and messages of the last retrieve.
pub const STATUS_FILE: &str = "status.json";

/// Retrieve every listable component and replace `root/src` with it.
pub async fn retrieve_metadata<A: MetadataApi>(
    api: &A,
    poller: &JobPoller,
    exclude_dirs: &[String],
    root: &Path,
) -> Result<RetrieveResult> {
    let manifest = build_manifest(api, exclude_dirs).await?;
    let result = retrieve_and_await(api, poller, &manifest)
        .await?
        .ensure_success()?;
    write_retrieved(&result, root).await?;
    Ok(result)
}

/// Write `status.json` and the archive contents below `root`.
///
/// The old source tree is removed completely before the first new file is
/// written. Returns the number of files written.
pub async fn write_retrieved(result: &RetrieveResult, root: &Path) -> Result<usize> {
    info!("Reading response and writing files");
    let status = result.status_json()?.into_bytes();
    let entries = read_entries(&result.zip_bytes()?)?;

    let source_dir = root.join(SOURCE_DIR);
    remove_tree(&source_dir).await?;

    let mut files: Vec<(PathBuf, Vec<u8>)> = Vec::with_capacity(entries.len() + 1);
    files.push((root.join(STATUS_FILE), status));
    for entry in entries {
        files.push((source_dir.join(entry.relative_name()), entry.data));
    }

    try_join_all(files.iter().map(|(path, data)| write_file(path, data))).await?;

    for message in result.messages() {
        warn!(
            file = message["fileName"].as_str().unwrap_or_default(),
            problem = message["problem"].as_str().unwrap_or_default(),
            "Retrieve message"
        );
    }
    info!(
        status = result.job.status_text.as_deref().unwrap_or_default(),
        files = files.len(),
        "Retrieve done"
    );
    Ok(files.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveBuilder;
    use base64::{engine::general_purpose, Engine as _};
    use forcecmd_metadata::{Job, JobKind};
    use forcecmd_xml::{XmlObject, XmlValue};
    use tempfile::TempDir;

    fn result_with_zip(zip: &[u8]) -> RetrieveResult {
        let payload = XmlObject::new()
            .with("done", true)
            .with("id", "09S1")
            .with("status", "Succeeded")
            .with("success", true)
            .with(
                "fileProperties",
                XmlObject::new()
                    .with("fileName", "unpackaged/classes/Foo.cls")
                    .with("fullName", "Foo")
                    .with("id", "01p1")
                    .with("type", "ApexClass"),
            )
            .with("zipFile", general_purpose::STANDARD.encode(zip));
        RetrieveResult::from_job(Job::from_xml(JobKind::Retrieve, XmlValue::from(payload)))
    }

    #[tokio::test]
    async fn test_write_retrieved_replaces_source_tree() {
        let dir = TempDir::new().unwrap();
        write_file(&dir.path().join("src/classes/Old.cls"), b"old").await.unwrap();

        let mut builder = ArchiveBuilder::new();
        builder.add("package.xml", b"<Package/>").unwrap();
        builder.add("classes/Foo.cls", b"public class Foo {}").unwrap();
        let result = result_with_zip(&builder.finish().unwrap());

        let written = write_retrieved(&result, dir.path()).await.unwrap();
        assert_eq!(written, 3);

        assert!(!dir.path().join("src/classes/Old.cls").exists());
        assert_eq!(
            std::fs::read(dir.path().join("src/classes/Foo.cls")).unwrap(),
            b"public class Foo {}"
        );
        assert!(dir.path().join("src/package.xml").exists());

        let status = std::fs::read_to_string(dir.path().join(STATUS_FILE)).unwrap();
        assert!(status.contains("\"fullName\": \"Foo\""));
    }
}
