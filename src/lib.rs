//! # forcecmd
//!
//! Retrieve and deploy Salesforce metadata between an org and a local
//! source tree.
//!
//! ## Crates
//!
//! - **forcecmd-xml** - XML values, parser and builder
//! - **forcecmd-client** - SOAP and REST transport with connection retry
//! - **forcecmd-auth** - password resolution and Partner API login
//! - **forcecmd-metadata** - manifests, retrieve and deploy jobs
//!
//! ## Layout of a project
//!
//! ```text
//! forcecmd.json      configuration
//! status.json        file properties and messages of the last retrieve
//! src/               metadata, as the Metadata API zips it
//! data/              exported records, one JSON file per object
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use forcecmd::{connect, retrieve_metadata, Config, JobPoller, MetadataClient, Transport, ClientConfig};
//!
//! let config = Config::load(".".as_ref())?;
//! let connection = connect(&config, Transport::new(ClientConfig::default())?).await?;
//! let client = MetadataClient::new(connection);
//! retrieve_metadata(&client, &JobPoller::new(), &config.exclude_dirs, ".".as_ref()).await?;
//! ```

pub mod archive;
pub mod config;
mod connect;
pub mod data;
pub mod deploy;
mod error;
pub mod fsutil;
pub mod retrieve;

pub use config::{Config, ObjectSelection, CONFIG_FILE_NAME};
pub use connect::connect;
pub use data::export_data;
pub use deploy::{deploy_sources, write_test_report, DeployRequest};
pub use error::{Error, ErrorKind, Result};
pub use retrieve::{retrieve_metadata, write_retrieved};

pub use forcecmd_auth::{Credentials, PasswordSources};
pub use forcecmd_client::{ClientConfig, Connection, Session, Transport, DEFAULT_API_VERSION};
pub use forcecmd_metadata::{
    DeployOptions, DeployResult, DeploySummary, JobPoller, MetadataApi, MetadataClient,
    RetrieveResult,
};
pub use forcecmd_xml::{XmlObject, XmlValue};
