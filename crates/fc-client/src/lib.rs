//! # forcecmd-client
//!
//! Transport for the Salesforce SOAP and REST APIs.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Connection                             │
//! │  - Transport + Session + API version                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Transport                              │
//! │  - SOAP envelopes (forcecmd-xml) and REST JSON              │
//! │  - Maps statuses and faults to errors                       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │              RetryingSender<dyn HttpSender>                 │
//! │  - Resends on connect timeout / connection reset            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     ReqwestSender                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use forcecmd_client::{Api, ClientConfig, Connection, Session, Transport};
//! use forcecmd_xml::XmlObject;
//!
//! let transport = Transport::new(ClientConfig::default())?;
//! let conn = Connection::new(transport, Session::new("na1.salesforce.com", sid), "45.0");
//! let describe = conn
//!     .soap(Api::Metadata, "describeMetadata", XmlObject::new().with("apiVersion", "45.0"))
//!     .await?;
//! ```

mod config;
mod connection;
mod error;
mod request;
mod retry;
mod sender;
mod session;
mod soap;
mod transport;
mod wsdl;

pub use config::{ClientConfig, ClientConfigBuilder, DEFAULT_TRANSIENT_RETRIES};
pub use connection::Connection;
pub use error::{Error, ErrorKind, Result};
pub use request::{HttpRequest, HttpResponse, RequestMethod};
pub use retry::{RetryPolicy, RetryingSender};
pub use sender::{HttpSender, ReqwestSender};
pub use session::Session;
pub use soap::{SoapEnvelope, SOAPENV_NAMESPACE, XSD_NAMESPACE, XSI_NAMESPACE};
pub use transport::{RestBody, RestOptions, Transport, TransportBuilder};
pub use wsdl::{Api, Endpoint};

/// API version used to log in, and for everything else when the configuration
/// does not name one and discovery is skipped.
pub const DEFAULT_API_VERSION: &str = "45.0";

/// User-Agent string for the client
pub const USER_AGENT: &str = concat!("forcecmd/", env!("CARGO_PKG_VERSION"));
