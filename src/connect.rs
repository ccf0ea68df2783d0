//! Logging in with the project configuration.

use forcecmd_auth::{latest_api_version, login};
use forcecmd_client::{Connection, Transport};
use tracing::info;

use crate::config::Config;
use crate::error::Result;

/// Log in with `config`.
///
/// Without a configured API version the login uses the default version and
/// the connection switches to the newest version the instance lists.
pub async fn connect(config: &Config, transport: Transport) -> Result<Connection> {
    let connection = login(&config.credentials(), config.api_version.as_deref(), transport).await?;

    if config.api_version.is_some() {
        return Ok(connection);
    }

    let version = latest_api_version(&connection).await?;
    info!(api_version = %version, "Using latest API version");
    Ok(connection.with_api_version(version))
}
