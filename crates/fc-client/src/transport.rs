//! SOAP and REST calls over an [`HttpSender`].

use std::sync::Arc;

use forcecmd_xml::{XmlObject, XmlValue};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::config::ClientConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::request::{HttpRequest, HttpResponse, RequestMethod};
use crate::retry::RetryingSender;
use crate::sender::{HttpSender, ReqwestSender};
use crate::session::Session;
use crate::soap::{read_response, SoapEnvelope};
use crate::wsdl::Endpoint;

/// Options for [`Transport::rest`].
#[derive(Debug, Clone, Default)]
pub struct RestOptions {
    pub method: RequestMethod,
    pub body: Option<serde_json::Value>,
    /// Authenticate with `X-SFDC-Session` instead of `Authorization`, as the
    /// bulk API expects.
    pub bulk: bool,
    /// Return the body as text instead of parsing it.
    pub raw: bool,
}

impl RestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post(body: serde_json::Value) -> Self {
        Self {
            method: RequestMethod::Post,
            body: Some(body),
            ..Self::default()
        }
    }

    pub fn bulk(mut self) -> Self {
        self.bulk = true;
        self
    }

    pub fn raw(mut self) -> Self {
        self.raw = true;
        self
    }
}

/// Body of a successful REST response.
#[derive(Debug, Clone, PartialEq)]
pub enum RestBody {
    Json(serde_json::Value),
    Text(String),
    /// 204 No Content, or an empty body.
    Empty,
}

impl RestBody {
    /// The JSON value, with text as a JSON string and no content as `None`.
    pub fn into_json(self) -> Option<serde_json::Value> {
        match self {
            RestBody::Json(value) => Some(value),
            RestBody::Text(text) => Some(serde_json::Value::String(text)),
            RestBody::Empty => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestError {
    error_code: String,
    message: String,
}

/// Sends SOAP and REST calls to an instance.
///
/// Holds no session state: every call takes the [`Session`] explicitly.
#[derive(Debug, Clone)]
pub struct Transport {
    sender: Arc<dyn HttpSender>,
    scheme: String,
}

impl Transport {
    /// A transport over reqwest with the configured transient retry.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    pub fn builder() -> TransportBuilder {
        TransportBuilder::default()
    }

    /// Absolute URL of `path` on `host`.
    pub fn url(&self, host: &str, path: &str) -> String {
        format!("{}://{}{}", self.scheme, host, path)
    }

    /// Call `method` on a SOAP endpoint and return the `result` element of
    /// its response.
    #[instrument(skip(self, session, endpoint, args, headers), fields(host = %session.instance_host, path = %endpoint.path))]
    pub async fn soap_call(
        &self,
        session: &Session,
        endpoint: &Endpoint,
        method: &str,
        args: &XmlValue,
        headers: XmlObject,
    ) -> Result<XmlValue> {
        let envelope = SoapEnvelope::new(session, endpoint, method, args, headers).to_string();
        let request = HttpRequest::new(
            RequestMethod::Post,
            self.url(&session.instance_host, &endpoint.path),
        )
        .header("SOAPAction", "\"\"")
        .xml(envelope);

        let response = self.sender.send(request).await?;
        debug!(status = response.status, "SOAP response");
        read_response(method, &response)
    }

    /// Call a REST resource.
    #[instrument(skip(self, session, options), fields(host = %session.instance_host, method = ?options.method))]
    pub async fn rest(&self, session: &Session, path: &str, options: RestOptions) -> Result<RestBody> {
        let mut request = HttpRequest::new(options.method, self.url(&session.instance_host, path))
            .header("Accept", "application/json; charset=UTF-8");

        let session_id = session.session_id().unwrap_or_default();
        request = if options.bulk {
            request.header("X-SFDC-Session", session_id)
        } else {
            request.header("Authorization", format!("OAuth {session_id}"))
        };
        if let Some(body) = &options.body {
            request = request.json(body)?;
        }

        let response = self.sender.send(request).await.map_err(|err| {
            if err.is_network() {
                Error::with_source(ErrorKind::Network, err)
            } else {
                err
            }
        })?;
        debug!(status = response.status, "REST response");
        read_rest_response(response, options.raw)
    }
}

fn read_rest_response(response: HttpResponse, raw: bool) -> Result<RestBody> {
    if response.is_success() {
        if response.status == 204 || response.body.is_empty() {
            return Ok(RestBody::Empty);
        }
        if raw {
            return Ok(RestBody::Text(response.body));
        }
        return serde_json::from_str(&response.body)
            .map(RestBody::Json)
            .map_err(|e| {
                Error::with_source(
                    ErrorKind::InvalidResponse {
                        status: response.status,
                        message: e.to_string(),
                        body: response.body.clone(),
                    },
                    e,
                )
            });
    }

    if response.status == 400 {
        if let Ok(errors) = serde_json::from_str::<Vec<RestError>>(&response.body) {
            let text = errors
                .iter()
                .map(|e| format!("{}: {}", e.error_code, e.message))
                .collect::<Vec<_>>()
                .join("\n");
            return Err(Error::new(ErrorKind::Rest(text)));
        }
    }

    Err(Error::new(ErrorKind::Http {
        status: response.status,
        reason: response.reason,
        body: (!response.body.is_empty()).then_some(response.body),
    }))
}

/// Builder for [`Transport`].
///
/// Whatever sender is used, it is wrapped in a [`RetryingSender`] unless the
/// configured transient retry budget is zero.
#[derive(Debug)]
pub struct TransportBuilder {
    config: ClientConfig,
    sender: Option<Arc<dyn HttpSender>>,
    scheme: String,
}

impl Default for TransportBuilder {
    fn default() -> Self {
        Self {
            config: ClientConfig::default(),
            sender: None,
            scheme: "https".to_string(),
        }
    }
}

impl TransportBuilder {
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Send through `sender` instead of a reqwest client.
    pub fn sender(mut self, sender: impl HttpSender + 'static) -> Self {
        self.sender = Some(Arc::new(sender));
        self
    }

    /// URL scheme, `https` unless a test server needs `http`.
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    pub fn build(self) -> Result<Transport> {
        let base: Arc<dyn HttpSender> = match self.sender {
            Some(sender) => sender,
            None => Arc::new(ReqwestSender::new(self.config.clone())?),
        };
        let sender: Arc<dyn HttpSender> = if self.config.transient_retries > 0 {
            Arc::new(RetryingSender::new(base, self.config.transient_retries))
        } else {
            base
        };

        Ok(Transport {
            sender,
            scheme: self.scheme,
        })
    }
}
