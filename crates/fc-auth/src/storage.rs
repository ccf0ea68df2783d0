//! The local password file, `~/forcepw.json`.
//!
//! ```json
//! { "passwords": { "https://login.salesforce.com$user@example.com": "secret" } }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, ErrorKind, Result};

/// File name of the password file in the home directory.
pub const PASSWORD_FILE_NAME: &str = "forcepw.json";

#[derive(Debug, Deserialize)]
struct PasswordFileContents {
    #[serde(default)]
    passwords: HashMap<String, String>,
}

/// Read-only view of a password file.
#[derive(Debug, Clone)]
pub struct PasswordFile {
    path: PathBuf,
}

impl PasswordFile {
    /// The password file in the user's home directory.
    pub fn new() -> Result<Self> {
        Ok(Self {
            path: default_password_file()?,
        })
    }

    pub fn with_path(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up the password stored under `key`.
    ///
    /// A missing file is the same as a file without the key. A file that
    /// exists but cannot be read or parsed is an error.
    pub fn lookup(&self, key: &str) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let json = std::fs::read_to_string(&self.path).map_err(|e| {
            Error::with_source(
                ErrorKind::PasswordFile(format!("cannot read {}", self.path.display())),
                e,
            )
        })?;
        let contents: PasswordFileContents = serde_json::from_str(&json).map_err(|e| {
            Error::with_source(
                ErrorKind::PasswordFile(format!("cannot parse {}: {}", self.path.display(), e)),
                e,
            )
        })?;

        Ok(contents.passwords.get(key).cloned())
    }
}

/// Key of a password in the password file.
pub fn password_key(endpoint: &str, username: &str) -> String {
    format!("{endpoint}${username}")
}

/// Get the default password file path.
pub fn default_password_file() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| Error::new(ErrorKind::Config("Could not find home directory".to_string())))?;

    Ok(home.join(PASSWORD_FILE_NAME))
}
