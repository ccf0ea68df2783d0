//! Project configuration, `forcecmd.json`.
//!
//! ```json
//! {
//!   "hostname": "login.salesforce.com",
//!   "username": "user@example.com",
//!   "apiVersion": "45.0",
//!   "excludeDirs": ["documents"],
//!   "objects": { "Account": ["Id", "Name"], "MySetting__c": false }
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use forcecmd_auth::Credentials;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, ErrorKind, Result};

/// File name of the configuration in the project directory.
pub const CONFIG_FILE_NAME: &str = "forcecmd.json";

/// How the records of one object are exported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectSelection {
    /// Every field, as listed by the object's describe.
    AllFields,
    /// Not exported.
    Skip,
    Fields(Vec<String>),
    /// A complete SOQL query.
    Query(String),
}

impl ObjectSelection {
    pub fn from_json(object: &str, value: &Value) -> Result<Self> {
        match value {
            Value::Bool(true) => Ok(Self::AllFields),
            Value::Bool(false) => Ok(Self::Skip),
            Value::String(soql) => Ok(Self::Query(soql.clone())),
            Value::Array(fields) => fields
                .iter()
                .map(|field| field.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .map(Self::Fields)
                .ok_or_else(|| Error::new(ErrorKind::ObjectConfig(object.to_string()))),
            _ => Err(Error::new(ErrorKind::ObjectConfig(object.to_string()))),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    hostname: Option<String>,
    #[serde(alias = "loginUrl")]
    endpoint: Option<String>,
    #[serde(default)]
    username: String,
    password: Option<String>,
    api_version: Option<String>,
    #[serde(default)]
    exclude_dirs: Vec<String>,
    #[serde(default)]
    objects: BTreeMap<String, Value>,
    include_objects: Option<Value>,
    exclude_objects: Option<Value>,
}

/// Parsed `forcecmd.json`.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    /// Login URL, e.g. `https://login.salesforce.com`.
    pub endpoint: String,
    pub username: String,
    pub password: Option<String>,
    pub api_version: Option<String>,
    /// Metadata directories left out of a retrieve.
    pub exclude_dirs: Vec<String>,
    pub objects: BTreeMap<String, ObjectSelection>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("api_version", &self.api_version)
            .field("exclude_dirs", &self.exclude_dirs)
            .field("objects", &self.objects)
            .finish()
    }
}

impl Config {
    /// Read `forcecmd.json` from `dir`.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE_NAME);
        let json = std::fs::read_to_string(&path).map_err(|e| {
            Error::with_source(
                ErrorKind::Config(format!("cannot read {}: {}", path.display(), e)),
                e,
            )
        })?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawConfig = serde_json::from_str(json)
            .map_err(|e| Error::with_source(ErrorKind::Config(e.to_string()), e))?;

        if raw.include_objects.is_some() {
            return Err(Error::new(ErrorKind::Config("includeObjects is obsolete".to_string())));
        }
        if raw.exclude_objects.is_some() {
            return Err(Error::new(ErrorKind::Config("excludeObjects is obsolete".to_string())));
        }

        let endpoint = match (raw.endpoint, raw.hostname) {
            (Some(endpoint), _) => endpoint,
            (None, Some(hostname)) if !hostname.is_empty() => format!("https://{hostname}"),
            _ => String::new(),
        };

        let objects = raw
            .objects
            .iter()
            .map(|(name, value)| -> Result<(String, ObjectSelection)> {
                Ok((name.clone(), ObjectSelection::from_json(name, value)?))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;

        Ok(Self {
            endpoint,
            username: raw.username,
            password: raw.password.filter(|p| !p.is_empty()),
            api_version: raw.api_version.filter(|v| !v.is_empty()),
            exclude_dirs: raw.exclude_dirs,
            objects,
        })
    }

    /// Login credentials. A configured password takes precedence over
    /// `FORCEPW` and the password file.
    pub fn credentials(&self) -> Credentials {
        let credentials = Credentials::new(&self.endpoint, &self.username);
        match &self.password {
            Some(password) => credentials.with_password(password),
            None => credentials,
        }
    }
}
