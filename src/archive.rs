//! Zip archives exchanged with the Metadata API.
//!
//! Every entry lives under [`ARCHIVE_ROOT`]; the local source tree is the
//! same layout rooted at `src/`.

use std::collections::HashSet;
use std::io::{Cursor, Read, Write};

use forcecmd_metadata::ARCHIVE_ROOT;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{Error, ErrorKind, Result};

/// A file inside an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub data: Vec<u8>,
}

impl ArchiveEntry {
    /// The entry name without the archive root.
    pub fn relative_name(&self) -> &str {
        self.name.strip_prefix(ARCHIVE_ROOT).unwrap_or(&self.name)
    }
}

/// Read every file of an archive. Directory entries are skipped.
pub fn read_entries(bytes: &[u8]) -> Result<Vec<ArchiveEntry>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut entries = Vec::with_capacity(archive.len());

    for index in 0..archive.len() {
        let mut file = archive.by_index(index)?;
        if file.is_dir() {
            continue;
        }
        if file.enclosed_name().is_none() {
            return Err(Error::new(ErrorKind::Archive(format!(
                "entry outside the archive: {}",
                file.name()
            ))));
        }
        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data)?;
        entries.push(ArchiveEntry {
            name: file.name().to_string(),
            data,
        });
    }

    debug!(entries = entries.len(), bytes = bytes.len(), "Read archive");
    Ok(entries)
}

/// Builds a deflated archive in memory, prefixing every name with
/// [`ARCHIVE_ROOT`]. Each name is written once.
pub struct ArchiveBuilder {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
    names: HashSet<String>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
            names: HashSet::new(),
        }
    }

    /// Add `data` as `unpackaged/<name>`. A name that is already in the
    /// archive is skipped.
    pub fn add(&mut self, name: &str, data: &[u8]) -> Result<()> {
        let entry = format!("{ARCHIVE_ROOT}{name}");
        if self.names.contains(&entry) {
            debug!(entry = %entry, "Already in archive");
            return Ok(());
        }
        self.writer.start_file(entry.as_str(), self.options)?;
        self.writer.write_all(data)?;
        self.names.insert(entry);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn finish(self) -> Result<Vec<u8>> {
        let cursor = self.writer.finish()?;
        Ok(cursor.into_inner())
    }
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self::new()
    }
}
