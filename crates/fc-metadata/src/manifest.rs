//! Build a manifest of every component in an org.
//!
//! The types come from `describeMetadata`. Each type (and each of its child
//! types) is listed with `listMetadata` in batches of at most
//! [`MAX_LIST_QUERIES`] queries, all batches running concurrently. Types that
//! live in folders are listed by their folder type first; each folder found
//! is then listed for its contents.

use std::collections::HashMap;

use futures::future::try_join_all;
use tracing::{debug, info};

use crate::client::MetadataApi;
use crate::error::{Error, ErrorKind, Result};
use crate::standard_value_sets;
use crate::types::{ListQuery, ManifestEntry, MetadataTypeDescriptor, PackageManifest, MAX_LIST_QUERIES};

/// Never retrieved: installed packages are not source.
const SKIPPED_TYPE: &str = "InstalledPackage";

/// Names to list and the folder types among them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPlan {
    /// Queryable type names in describe order.
    pub names: Vec<String>,
    /// Folder type name to the type stored in those folders.
    pub folder_types: HashMap<String, String>,
}

impl ListPlan {
    /// Plan the listing of `types`, leaving out those whose directory is in
    /// `exclude_dirs`.
    pub fn new(types: &[MetadataTypeDescriptor], exclude_dirs: &[String]) -> Self {
        let mut plan = ListPlan::default();
        for descriptor in types.iter().filter(|t| t.xml_name != SKIPPED_TYPE) {
            if exclude_dirs.contains(&descriptor.directory_name) {
                info!("(Excluding {})", descriptor.directory_name);
                continue;
            }

            let xml_names = descriptor
                .child_xml_names
                .iter()
                .chain(std::iter::once(&descriptor.xml_name));
            for xml_name in xml_names {
                if descriptor.in_folder {
                    let folder_type = folder_type_of(xml_name);
                    plan.folder_types.insert(folder_type.clone(), xml_name.clone());
                    plan.names.push(folder_type);
                } else {
                    plan.names.push(xml_name.clone());
                }
            }
        }
        plan
    }

    /// The type stored in folders of `folder_type`.
    pub fn folder_content_type(&self, folder_type: &str) -> Option<&str> {
        self.folder_types.get(folder_type).map(String::as_str)
    }
}

/// `EmailTemplate` lives in `EmailFolder`, everything else in `<Type>Folder`.
fn folder_type_of(xml_name: &str) -> String {
    if xml_name == "EmailTemplate" {
        "EmailFolder".to_string()
    } else {
        format!("{xml_name}Folder")
    }
}

/// Directory names that `exclude_dirs` can name.
pub fn excludable_dirs(types: &[MetadataTypeDescriptor]) -> Vec<&str> {
    types
        .iter()
        .filter(|t| t.xml_name != SKIPPED_TYPE)
        .map(|t| t.directory_name.as_str())
        .collect()
}

/// Describe, list and collect every component into a manifest for the API
/// version of `api`.
pub async fn build_manifest<A: MetadataApi>(api: &A, exclude_dirs: &[String]) -> Result<PackageManifest> {
    let entries = list_all_types(api, exclude_dirs).await?;
    Ok(entries.into_iter().collect::<PackageManifest>().with_version(api.api_version()))
}

/// All manifest entries of the org: listed components, folders, a wildcard
/// per listed type, and the standard value sets when they are not listed.
///
/// Member names are URI decoded. The result is sorted by type, then member,
/// and free of duplicates.
pub async fn list_all_types<A: MetadataApi>(api: &A, exclude_dirs: &[String]) -> Result<Vec<ManifestEntry>> {
    let describe = api.describe_metadata().await?;
    debug!(
        options = ?excludable_dirs(&describe.metadata_objects),
        "Options available for excludeDirs"
    );

    let plan = ListPlan::new(&describe.metadata_objects, exclude_dirs);
    let batches = plan
        .names
        .chunks(MAX_LIST_QUERIES)
        .map(|names| list_batch(api, &plan, names));
    let mut entries: Vec<ManifestEntry> = try_join_all(batches).await?.into_iter().flatten().collect();

    if standard_value_sets::supplement(&mut entries) {
        debug!("StandardValueSet listed only as *, added the known members");
    }

    let mut entries = entries
        .into_iter()
        .map(|entry| -> Result<ManifestEntry> {
            let member_name = decode_member(&entry.member_name)?;
            Ok(ManifestEntry::new(entry.type_name, member_name))
        })
        .collect::<Result<Vec<_>>>()?;
    entries.sort();
    entries.dedup();
    Ok(entries)
}

/// List one batch of names, then the contents of the folders found.
async fn list_batch<A: MetadataApi>(api: &A, plan: &ListPlan, names: &[String]) -> Result<Vec<ManifestEntry>> {
    let queries: Vec<ListQuery> = names.iter().map(ListQuery::new).collect();
    info!("ListMetadata {}", names.join(", "));
    let items = api.list_metadata(&queries).await?;

    let (folders, others): (Vec<_>, Vec<_>) = items
        .into_iter()
        .partition(|item| plan.folder_content_type(&item.metadata_type).is_some());

    let folder_queries: Vec<ListQuery> = folders
        .iter()
        .filter_map(|folder| {
            plan.folder_content_type(&folder.metadata_type)
                .map(|content_type| ListQuery::in_folder(content_type, &folder.full_name))
        })
        .collect();
    let contents = try_join_all(folder_queries.chunks(MAX_LIST_QUERIES).map(|queries| async move {
        let labels: Vec<String> = queries.iter().map(ListQuery::label).collect();
        info!("ListMetadata {}", labels.join(", "));
        api.list_metadata(queries).await
    }))
    .await?;

    let mut entries: Vec<ManifestEntry> = contents
        .into_iter()
        .flatten()
        .map(|item| ManifestEntry::new(item.metadata_type, item.full_name))
        .collect();
    // A folder is retrieved as a member of the type it holds.
    entries.extend(folders.into_iter().filter_map(|folder| {
        plan.folder_content_type(&folder.metadata_type)
            .map(|content_type| ManifestEntry::new(content_type, folder.full_name))
    }));
    entries.extend(
        others
            .into_iter()
            .map(|item| ManifestEntry::new(item.metadata_type, item.full_name)),
    );
    entries.extend(names.iter().map(ManifestEntry::wildcard));
    Ok(entries)
}

fn decode_member(name: &str) -> Result<String> {
    urlencoding::decode(name)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| {
            Error::with_source(
                ErrorKind::InvalidResponse(format!("member name {name} is not valid UTF-8 once decoded")),
                e,
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::DeployOptions;
    use crate::job::Job;
    use crate::types::{DescribeMetadataResult, MetadataComponent};
    use std::sync::Mutex;

    fn descriptor(xml_name: &str, dir: &str, in_folder: bool, children: &[&str]) -> MetadataTypeDescriptor {
        MetadataTypeDescriptor {
            xml_name: xml_name.to_string(),
            directory_name: dir.to_string(),
            suffix: None,
            meta_file: false,
            in_folder,
            child_xml_names: children.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Answers `listMetadata` from a table keyed by type (and folder), and
    /// records every call.
    #[derive(Default)]
    struct FakeOrg {
        types: Vec<MetadataTypeDescriptor>,
        components: HashMap<(String, Option<String>), Vec<MetadataComponent>>,
        calls: Mutex<Vec<Vec<ListQuery>>>,
    }

    impl FakeOrg {
        fn with(mut self, type_name: &str, folder: Option<&str>, items: Vec<MetadataComponent>) -> Self {
            self.components
                .insert((type_name.to_string(), folder.map(str::to_string)), items);
            self
        }

        fn calls(&self) -> Vec<Vec<ListQuery>> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl MetadataApi for FakeOrg {
        fn api_version(&self) -> &str {
            "45.0"
        }

        async fn describe_metadata(&self) -> Result<DescribeMetadataResult> {
            Ok(DescribeMetadataResult {
                metadata_objects: self.types.clone(),
                ..Default::default()
            })
        }

        async fn list_metadata(&self, queries: &[ListQuery]) -> Result<Vec<MetadataComponent>> {
            self.calls.lock().unwrap().push(queries.to_vec());
            Ok(queries
                .iter()
                .flat_map(|q| {
                    self.components
                        .get(&(q.type_name.clone(), q.folder.clone()))
                        .cloned()
                        .unwrap_or_default()
                })
                .collect())
        }

        async fn retrieve(&self, _manifest: &PackageManifest) -> Result<String> {
            unimplemented!()
        }

        async fn check_retrieve_status(&self, _id: &str) -> Result<Job> {
            unimplemented!()
        }

        async fn deploy(&self, _zip: &[u8], _options: &DeployOptions) -> Result<String> {
            unimplemented!()
        }

        async fn check_deploy_status(&self, _id: &str) -> Result<Job> {
            unimplemented!()
        }
    }

    fn entry(t: &str, m: &str) -> ManifestEntry {
        ManifestEntry::new(t, m)
    }

    #[test]
    fn test_plan_folder_types() {
        let types = vec![
            descriptor("ApexClass", "classes", false, &[]),
            descriptor("EmailTemplate", "email", true, &[]),
            descriptor("Report", "reports", true, &[]),
            descriptor("CustomObject", "objects", false, &["CustomField", "ListView"]),
            descriptor("InstalledPackage", "installedPackages", false, &[]),
        ];
        let plan = ListPlan::new(&types, &["objects".to_string()]);

        assert_eq!(plan.names, vec!["ApexClass", "EmailFolder", "ReportFolder"]);
        assert_eq!(plan.folder_content_type("EmailFolder"), Some("EmailTemplate"));
        assert_eq!(plan.folder_content_type("ReportFolder"), Some("Report"));
        assert_eq!(plan.folder_content_type("ApexClass"), None);
        assert_eq!(
            excludable_dirs(&types),
            vec!["classes", "email", "reports", "objects"]
        );
    }

    #[test]
    fn test_plan_children_before_parent() {
        let types = vec![descriptor("CustomObject", "objects", false, &["CustomField", "ListView"])];
        let plan = ListPlan::new(&types, &[]);
        assert_eq!(plan.names, vec!["CustomField", "ListView", "CustomObject"]);
    }

    #[tokio::test]
    async fn test_batches_never_exceed_three_queries() {
        let types: Vec<_> = (0..8)
            .map(|i| descriptor(&format!("Type{i}"), &format!("dir{i}"), false, &[]))
            .collect();
        let org = FakeOrg {
            types,
            ..Default::default()
        };

        let entries = list_all_types(&org, &[]).await.unwrap();

        let calls = org.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|c| c.len() <= MAX_LIST_QUERIES));
        assert_eq!(entries.len(), 8);
        assert!(entries.iter().all(ManifestEntry::is_wildcard));
    }

    #[tokio::test]
    async fn test_folders_are_listed_and_kept() {
        let mut folders: Vec<MetadataComponent> = ["A", "B", "C", "D"]
            .iter()
            .map(|f| MetadataComponent::new("ReportFolder", *f))
            .collect();
        folders.push(MetadataComponent::new("ReportFolder", "unfiled$public"));
        let org = FakeOrg {
            types: vec![
                descriptor("ApexClass", "classes", false, &[]),
                descriptor("Report", "reports", true, &[]),
            ],
            ..Default::default()
        }
        .with("ApexClass", None, vec![MetadataComponent::new("ApexClass", "Foo")])
        .with("ReportFolder", None, folders)
        .with("Report", Some("A"), vec![MetadataComponent::new("Report", "A/Pipeline")])
        .with("Report", Some("D"), vec![MetadataComponent::new("Report", "D/Churn")]);

        let entries = list_all_types(&org, &[]).await.unwrap();

        assert_eq!(
            entries,
            vec![
                entry("ApexClass", "*"),
                entry("ApexClass", "Foo"),
                entry("Report", "A"),
                entry("Report", "A/Pipeline"),
                entry("Report", "B"),
                entry("Report", "C"),
                entry("Report", "D"),
                entry("Report", "D/Churn"),
                entry("Report", "unfiled$public"),
                entry("ReportFolder", "*"),
            ]
        );

        let calls = org.calls();
        // One batch of types, then the five folders in batches of three and two.
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|c| c.len() <= MAX_LIST_QUERIES));
        assert!(calls[1..]
            .iter()
            .flatten()
            .all(|q| q.type_name == "Report" && q.folder.is_some()));
    }

    #[tokio::test]
    async fn test_members_are_decoded_sorted_and_deduplicated() {
        let org = FakeOrg {
            types: vec![
                descriptor("Layout", "layouts", false, &[]),
                descriptor("CustomObject", "objects", false, &["CustomField"]),
            ],
            ..Default::default()
        }
        .with(
            "Layout",
            None,
            vec![
                MetadataComponent::new("Layout", "Account-Account %28Marketing%29 Layout"),
                MetadataComponent::new("Layout", "Account-Account (Marketing) Layout"),
            ],
        )
        .with(
            "CustomObject",
            None,
            vec![MetadataComponent::new("CustomObject", "Account")],
        );

        let entries = list_all_types(&org, &[]).await.unwrap();

        assert_eq!(
            entries,
            vec![
                entry("CustomField", "*"),
                entry("CustomObject", "*"),
                entry("CustomObject", "Account"),
                entry("Layout", "*"),
                entry("Layout", "Account-Account (Marketing) Layout"),
            ]
        );
    }

    #[tokio::test]
    async fn test_standard_value_sets_are_supplemented() {
        let org = FakeOrg {
            types: vec![descriptor("StandardValueSet", "standardValueSets", false, &[])],
            ..Default::default()
        };

        let entries = list_all_types(&org, &[]).await.unwrap();
        assert_eq!(entries.len(), 1 + standard_value_sets::STANDARD_VALUE_SETS_V45.len());
        assert_eq!(entries[0], entry("StandardValueSet", "*"));
        assert!(entries.contains(&entry("StandardValueSet", "CaseStatus")));
    }

    #[tokio::test]
    async fn test_build_manifest_uses_api_version() {
        let org = FakeOrg {
            types: vec![descriptor("ApexClass", "classes", false, &[])],
            ..Default::default()
        };
        let manifest = build_manifest(&org, &[]).await.unwrap();
        assert_eq!(manifest.version(), "45.0");
        assert_eq!(manifest.len(), 1);
    }
}
