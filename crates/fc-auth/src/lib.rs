//! # forcecmd-auth
//!
//! Username/password login through the Partner SOAP API.
//!
//! ## Security
//!
//! - The password is redacted in Debug output.
//! - Tracing skips credential parameters.
//!
//! ## Password resolution
//!
//! The first non-blank value wins:
//!
//! 1. the password given to [`Credentials::with_password`],
//! 2. the `FORCEPW` environment variable,
//! 3. `~/forcepw.json`, keyed by `<endpoint>$<username>`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use forcecmd_auth::{login, Credentials};
//! use forcecmd_client::{ClientConfig, Transport};
//!
//! let creds = Credentials::new("https://login.salesforce.com", "user@example.com");
//! let conn = login(&creds, None, Transport::new(ClientConfig::default())?).await?;
//! ```

mod credentials;
mod error;
mod login;
mod storage;

pub use credentials::{Credentials, PasswordSources, PASSWORD_ENV_VAR};
pub use error::{Error, ErrorKind, Result};
pub use login::{latest_api_version, login};
pub use storage::{default_password_file, password_key, PasswordFile, PASSWORD_FILE_NAME};

/// Default Salesforce login URL for production.
pub const PRODUCTION_LOGIN_URL: &str = "https://login.salesforce.com";

/// Default Salesforce login URL for sandbox.
pub const SANDBOX_LOGIN_URL: &str = "https://test.salesforce.com";
