//! Login credentials and password resolution.
//!
//! Credential types implement a custom Debug to redact the password.

use std::fmt;
use std::path::PathBuf;

use tracing::debug;
use url::Url;

use crate::error::{Error, ErrorKind, Result};
use crate::storage::{default_password_file, password_key, PasswordFile};

/// Environment variable consulted when no password is configured.
pub const PASSWORD_ENV_VAR: &str = "FORCEPW";

/// Where a password comes from when the credentials do not carry one.
///
/// Consulted in order: the environment value, then the password file.
#[derive(Clone, Default)]
pub struct PasswordSources {
    env_value: Option<String>,
    password_file: Option<PathBuf>,
}

impl PasswordSources {
    /// The `FORCEPW` environment variable and `~/forcepw.json`.
    pub fn system() -> Self {
        Self {
            env_value: std::env::var(PASSWORD_ENV_VAR).ok(),
            password_file: default_password_file().ok(),
        }
    }

    /// No fallbacks at all.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_env_value(mut self, value: impl Into<String>) -> Self {
        self.env_value = Some(value.into());
        self
    }

    pub fn with_password_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.password_file = Some(path.into());
        self
    }
}

impl fmt::Debug for PasswordSources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordSources")
            .field("env_value", &self.env_value.as_ref().map(|_| "[REDACTED]"))
            .field("password_file", &self.password_file)
            .finish()
    }
}

/// Username/password credentials for a login endpoint.
#[derive(Clone)]
pub struct Credentials {
    endpoint: String,
    username: String,
    password: Option<String>,
    password_sources: PasswordSources,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("password_sources", &self.password_sources)
            .finish()
    }
}

impl Credentials {
    /// Credentials falling back to the system password sources.
    ///
    /// `endpoint` is the login URL, e.g. `https://login.salesforce.com`.
    pub fn new(endpoint: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            username: username.into(),
            password: None,
            password_sources: PasswordSources::system(),
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_password_sources(mut self, sources: PasswordSources) -> Self {
        self.password_sources = sources;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Check the endpoint and return its host.
    ///
    /// Only `https` on the default port is accepted.
    pub fn endpoint_host(&self) -> Result<String> {
        if self.endpoint.trim().is_empty() {
            return Err(Error::new(ErrorKind::Config("Missing hostname".to_string())));
        }
        let url = Url::parse(&self.endpoint)?;
        if url.scheme() != "https" {
            return Err(Error::new(ErrorKind::InvalidEndpoint(format!(
                "{}: only https is supported",
                self.endpoint
            ))));
        }
        if url.port().is_some() || has_explicit_port(&self.endpoint) {
            return Err(Error::new(ErrorKind::InvalidEndpoint(format!(
                "{}: only the default port is supported",
                self.endpoint
            ))));
        }
        url.host_str()
            .map(str::to_string)
            .ok_or_else(|| Error::new(ErrorKind::InvalidEndpoint(format!("{}: no host", self.endpoint))))
    }

    /// Resolve the password: explicit value, then the environment value, then
    /// the password file. Blank values count as absent.
    pub fn resolve_password(&self) -> Result<String> {
        if let Some(password) = self.password.as_deref().filter(|p| !p.is_empty()) {
            return Ok(password.to_string());
        }

        if let Some(password) = self.password_sources.env_value.as_deref().filter(|p| !p.is_empty()) {
            debug!("Using password from {PASSWORD_ENV_VAR} environment variable");
            return Ok(password.to_string());
        }

        if let Some(path) = &self.password_sources.password_file {
            let key = password_key(&self.endpoint, &self.username);
            debug!(file = %path.display(), key = %key, "Looking for password in file");
            if let Some(password) = PasswordFile::with_path(path)
                .lookup(&key)?
                .filter(|p| !p.is_empty())
            {
                return Ok(password);
            }
        }

        Err(Error::new(ErrorKind::Config("Missing password".to_string())))
    }

    /// Everything login needs, checked without touching the network.
    pub(crate) fn validate(&self) -> Result<ValidatedCredentials> {
        let host = self.endpoint_host()?;
        if self.username.trim().is_empty() {
            return Err(Error::new(ErrorKind::Config("Missing username".to_string())));
        }
        let password = self.resolve_password()?;
        Ok(ValidatedCredentials {
            host,
            username: self.username.clone(),
            password,
        })
    }
}

/// Whether the authority of `endpoint` names a port, even the default one.
/// `Url` normalizes `https://host:443` to `https://host`, so look at the raw text.
fn has_explicit_port(endpoint: &str) -> bool {
    let rest = endpoint.split_once("://").map_or(endpoint, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    let after_host = host_port.rsplit_once(']').map_or(host_port, |(_, tail)| tail);
    after_host.contains(':')
}

pub(crate) struct ValidatedCredentials {
    pub(crate) host: String,
    pub(crate) username: String,
    pub(crate) password: String,
}
