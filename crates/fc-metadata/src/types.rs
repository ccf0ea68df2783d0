//! Common types for the Metadata API.

use std::collections::BTreeSet;

use forcecmd_xml::{build_document, XmlObject, XmlValue};
use serde::Serialize;

use crate::error::{Error, ErrorKind, Result};

/// Namespace of `package.xml` and `destructiveChanges.xml`.
pub const PACKAGE_NAMESPACE: &str = "http://soap.sforce.com/2006/04/metadata";

/// The most queries a single `listMetadata` call accepts.
pub const MAX_LIST_QUERIES: usize = 3;

/// A metadata type as described by `describeMetadata`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataTypeDescriptor {
    pub xml_name: String,
    pub directory_name: String,
    pub suffix: Option<String>,
    pub meta_file: bool,
    pub in_folder: bool,
    pub child_xml_names: Vec<String>,
}

impl MetadataTypeDescriptor {
    pub(crate) fn from_xml(value: &XmlValue) -> Result<Self> {
        let xml_name = value["xmlName"]
            .as_str()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                Error::new(ErrorKind::InvalidResponse(
                    "metadata object without xmlName".to_string(),
                ))
            })?;

        Ok(Self {
            xml_name: xml_name.to_string(),
            directory_name: value["directoryName"].as_str().unwrap_or_default().to_string(),
            suffix: value["suffix"].as_str().filter(|s| !s.is_empty()).map(str::to_string),
            meta_file: value["metaFile"].is_true(),
            in_folder: value["inFolder"].is_true(),
            child_xml_names: value["childXmlNames"]
                .as_array()
                .iter()
                .filter_map(XmlValue::as_str)
                .map(str::to_string)
                .collect(),
        })
    }
}

/// Result of `describeMetadata`.
#[derive(Debug, Clone, Default)]
pub struct DescribeMetadataResult {
    pub metadata_objects: Vec<MetadataTypeDescriptor>,
    pub organization_namespace: Option<String>,
    pub partial_save_allowed: bool,
    pub test_required: bool,
}

impl DescribeMetadataResult {
    pub(crate) fn from_xml(value: &XmlValue) -> Result<Self> {
        Ok(Self {
            metadata_objects: value["metadataObjects"]
                .as_array()
                .iter()
                .map(MetadataTypeDescriptor::from_xml)
                .collect::<Result<_>>()?,
            organization_namespace: value["organizationNamespace"]
                .as_str()
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            partial_save_allowed: value["partialSaveAllowed"].is_true(),
            test_required: value["testRequired"].is_true(),
        })
    }

    /// The type stored in `directory_name`.
    pub fn by_directory(&self, directory_name: &str) -> Option<&MetadataTypeDescriptor> {
        self.metadata_objects
            .iter()
            .find(|t| t.directory_name == directory_name)
    }
}

/// One query of a `listMetadata` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub type_name: String,
    pub folder: Option<String>,
}

impl ListQuery {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            folder: None,
        }
    }

    /// Members of `type_name` stored in `folder`.
    pub fn in_folder(type_name: impl Into<String>, folder: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            folder: Some(folder.into()),
        }
    }

    /// `Type` or `Type/folder`, for log output.
    pub fn label(&self) -> String {
        match &self.folder {
            Some(folder) => format!("{}/{}", self.type_name, folder),
            None => self.type_name.clone(),
        }
    }

    pub(crate) fn to_xml(&self) -> XmlValue {
        let mut query = XmlObject::new();
        if let Some(folder) = &self.folder {
            query.insert("folder", folder.as_str());
        }
        query.insert("type", self.type_name.as_str());
        query.into()
    }
}

/// A component returned by `listMetadata`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataComponent {
    pub metadata_type: String,
    pub full_name: String,
    pub file_name: Option<String>,
    pub id: Option<String>,
}

impl MetadataComponent {
    pub fn new(metadata_type: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            metadata_type: metadata_type.into(),
            full_name: full_name.into(),
            file_name: None,
            id: None,
        }
    }

    pub(crate) fn from_xml(value: &XmlValue) -> Self {
        let text = |key: &str| value[key].as_str().filter(|s| !s.is_empty()).map(str::to_string);
        Self {
            metadata_type: text("type").unwrap_or_default(),
            full_name: value["fullName"].as_str().unwrap_or_default().to_string(),
            file_name: text("fileName"),
            id: text("id"),
        }
    }
}

/// A `(type, member)` pair of a package manifest.
///
/// Ordering is by type, then member.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ManifestEntry {
    pub type_name: String,
    pub member_name: String,
}

impl ManifestEntry {
    pub fn new(type_name: impl Into<String>, member_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            member_name: member_name.into(),
        }
    }

    /// `*`, every member of the type.
    pub fn wildcard(type_name: impl Into<String>) -> Self {
        Self::new(type_name, "*")
    }

    pub fn is_wildcard(&self) -> bool {
        self.member_name == "*"
    }
}

/// Package manifest (`package.xml`): a sorted, duplicate free set of
/// entries plus the API version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageManifest {
    entries: BTreeSet<ManifestEntry>,
    version: String,
}

impl PackageManifest {
    /// Create an empty manifest for the given API version.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            entries: BTreeSet::new(),
            version: version.into(),
        }
    }

    /// Add a metadata type with its members.
    pub fn add_type(mut self, name: impl Into<String>, members: Vec<String>) -> Self {
        let name = name.into();
        for member in members {
            self.entries.insert(ManifestEntry::new(name.clone(), member));
        }
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn insert(&mut self, entry: ManifestEntry) {
        self.entries.insert(entry);
    }

    pub fn entries(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// One `types` element per entry, as the retrieve request and the
    /// package files carry them.
    pub(crate) fn types_value(&self) -> XmlValue {
        XmlValue::Sequence(
            self.entries
                .iter()
                .map(|entry| {
                    XmlObject::new()
                        .with("members", entry.member_name.as_str())
                        .with("name", entry.type_name.as_str())
                        .into()
                })
                .collect(),
        )
    }

    /// The `unpackaged` argument of a retrieve request.
    pub(crate) fn to_xml(&self) -> XmlValue {
        XmlObject::new()
            .with("types", self.types_value())
            .with("version", self.version.as_str())
            .into()
    }

    /// The `package.xml` document.
    pub fn package_xml(&self) -> String {
        package_document(self.to_xml())
    }

    /// The entries as a `destructiveChanges.xml` document, which carries no
    /// version.
    pub fn destructive_changes_xml(&self) -> String {
        package_document(XmlObject::new().with("types", self.types_value()).into())
    }
}

impl FromIterator<ManifestEntry> for PackageManifest {
    fn from_iter<I: IntoIterator<Item = ManifestEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
            version: String::new(),
        }
    }
}

fn package_document(value: XmlValue) -> String {
    build_document(
        "Package",
        &format!(" xmlns=\"{PACKAGE_NAMESPACE}\""),
        &value,
    )
}
