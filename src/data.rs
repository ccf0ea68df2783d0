//! Record export of custom settings and configured objects to `data/`.

use std::collections::BTreeMap;
use std::path::Path;

use forcecmd_client::Connection;
use futures::future::try_join_all;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::ObjectSelection;
use crate::error::{Error, ErrorKind, Result};
use crate::fsutil::{remove_tree, write_file};

/// Directory the records are written to.
pub const DATA_DIR: &str = "data";

/// Export records below `root/data`, replacing whatever was there.
///
/// Every custom setting is exported with all fields unless `objects` says
/// otherwise. Returns the exported object names.
pub async fn export_data(
    connection: &Connection,
    objects: &BTreeMap<String, ObjectSelection>,
    root: &Path,
) -> Result<Vec<String>> {
    info!("DescribeGlobal");
    let describe = connection.rest_json(&connection.data_path("sobjects")).await?;
    let sobjects = describe["sobjects"].as_array().map(Vec::as_slice).unwrap_or_default();

    let (settings, others): (Vec<&Value>, Vec<&Value>) = sobjects
        .iter()
        .partition(|sobject| sobject["customSetting"].as_bool().unwrap_or(false));
    debug!(objects = ?names(&settings), "Objects included by default");
    debug!(objects = ?names(&others), "Objects not included by default");

    let mut selections = objects.clone();
    for name in names(&settings) {
        selections
            .entry(name.to_string())
            .or_insert(ObjectSelection::AllFields);
    }

    let data_dir = root.join(DATA_DIR);
    remove_tree(&data_dir).await?;

    let exports = selections
        .iter()
        .filter(|(_, selection)| **selection != ObjectSelection::Skip)
        .map(|(object, selection)| export_object(connection, object, selection, &data_dir));
    let exported = try_join_all(exports).await?;

    Ok(exported)
}

fn names<'a>(sobjects: &[&'a Value]) -> Vec<&'a str> {
    sobjects
        .iter()
        .filter_map(|sobject| sobject["name"].as_str())
        .collect()
}

async fn export_object(
    connection: &Connection,
    object: &str,
    selection: &ObjectSelection,
    data_dir: &Path,
) -> Result<String> {
    let soql = soql(connection, object, selection).await?;
    debug!(object, soql = %soql, "Using SOQL");

    let records = query_all(connection, object, &soql).await?;
    write_file(&data_dir.join(format!("{object}.json")), to_json_file(&records)?).await?;
    Ok(object.to_string())
}

async fn soql(connection: &Connection, object: &str, selection: &ObjectSelection) -> Result<String> {
    match selection {
        ObjectSelection::Query(soql) => Ok(soql.clone()),
        ObjectSelection::Fields(fields) => Ok(select(fields.iter().map(String::as_str), object)),
        ObjectSelection::AllFields => {
            info!(object, "DescribeSObject");
            let describe = connection
                .rest_json(&connection.data_path(&format!("sobjects/{object}/describe")))
                .await?;
            let fields = describe["fields"]
                .as_array()
                .ok_or_else(|| Error::new(ErrorKind::Other(format!("No fields in describe of {object}"))))?;
            Ok(select(fields.iter().filter_map(|f| f["name"].as_str()), object))
        }
        ObjectSelection::Skip => Err(Error::new(ErrorKind::ObjectConfig(object.to_string()))),
    }
}

fn select<'a>(fields: impl Iterator<Item = &'a str>, object: &str) -> String {
    format!("select {} from {}", fields.collect::<Vec<_>>().join(", "), object)
}

/// Run `soql` and follow `nextRecordsUrl` until the last page, dropping
/// each record's `attributes`.
async fn query_all(connection: &Connection, object: &str, soql: &str) -> Result<Vec<Value>> {
    info!(object, "Query");
    let mut page = connection
        .rest_json(&connection.data_path(&format!("query/?q={}", urlencoding::encode(soql))))
        .await?;

    let mut records = Vec::new();
    loop {
        if let Some(Value::Array(page_records)) = page.get_mut("records").map(Value::take) {
            records.extend(page_records.into_iter().map(|mut record| {
                if let Value::Object(fields) = &mut record {
                    fields.remove("attributes");
                }
                record
            }));
        }

        let Some(next) = page["nextRecordsUrl"].as_str().map(str::to_string) else {
            break;
        };
        info!(object, "QueryMore");
        page = connection.rest_json(&next).await?;
    }
    Ok(records)
}

/// JSON indented by four spaces.
pub(crate) fn to_json_file(value: &impl Serialize) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    Ok(out)
}
