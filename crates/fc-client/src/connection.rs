//! An authenticated connection: transport, session and API version.

use forcecmd_xml::{XmlObject, XmlValue};

use crate::error::Result;
use crate::session::Session;
use crate::transport::{RestBody, RestOptions, Transport};
use crate::wsdl::Api;

/// Everything a call needs, passed explicitly instead of living in globals.
#[derive(Debug, Clone)]
pub struct Connection {
    transport: Transport,
    session: Session,
    api_version: String,
}

impl Connection {
    pub fn new(transport: Transport, session: Session, api_version: impl Into<String>) -> Self {
        Self {
            transport,
            session,
            api_version: api_version.into(),
        }
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// The same session at a different API version.
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// Call a SOAP method of `api` at this connection's API version.
    pub async fn soap(&self, api: Api, method: &str, args: impl Into<XmlValue>) -> Result<XmlValue> {
        let endpoint = api.endpoint(&self.api_version);
        self.transport
            .soap_call(&self.session, &endpoint, method, &args.into(), XmlObject::new())
            .await
    }

    pub async fn rest(&self, path: &str, options: RestOptions) -> Result<RestBody> {
        self.transport.rest(&self.session, path, options).await
    }

    /// GET a REST resource as JSON; no content becomes `null`.
    pub async fn rest_json(&self, path: &str) -> Result<serde_json::Value> {
        let body = self.rest(path, RestOptions::get()).await?;
        Ok(body.into_json().unwrap_or(serde_json::Value::Null))
    }

    /// Path of a versioned REST resource, e.g. `sobjects` ->
    /// `/services/data/v45.0/sobjects`.
    pub fn data_path(&self, resource: &str) -> String {
        format!(
            "/services/data/v{}/{}",
            self.api_version,
            resource.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn connection(server: &MockServer) -> Connection {
        let transport = Transport::builder()
            .config(ClientConfig::builder().without_retry().build())
            .scheme("http")
            .build()
            .unwrap();
        let host = server.uri().trim_start_matches("http://").to_string();
        Connection::new(transport, Session::new(host, "SID"), "45.0")
    }

    #[tokio::test]
    async fn test_data_path() {
        let server = MockServer::start().await;
        let conn = connection(&server).await;
        assert_eq!(conn.data_path("sobjects"), "/services/data/v45.0/sobjects");
        assert_eq!(
            conn.clone().with_api_version("62.0").data_path("/query?q=x"),
            "/services/data/v62.0/query?q=x"
        );
    }

    #[tokio::test]
    async fn test_soap_uses_api_version() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/services/Soap/m/45.0"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<soapenv:Envelope><soapenv:Body><describeMetadataResponse><result><organizationNamespace></organizationNamespace></result></describeMetadataResponse></soapenv:Body></soapenv:Envelope>",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let result = connection(&server)
            .await
            .soap(Api::Metadata, "describeMetadata", XmlObject::new().with("asOfVersion", "45.0"))
            .await
            .unwrap();
        assert_eq!(result["organizationNamespace"].as_str(), Some(""));
    }

    #[tokio::test]
    async fn test_rest_json_no_content_is_null() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/services/data/v45.0/empty"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let value = connection(&server)
            .await
            .rest_json("/services/data/v45.0/empty")
            .await
            .unwrap();
        assert!(value.is_null());
    }
}
