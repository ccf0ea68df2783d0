//! Partner API login.

use forcecmd_client::{Api, Connection, Session, Transport, DEFAULT_API_VERSION};
use forcecmd_xml::XmlObject;
use tracing::{info, instrument};

use crate::credentials::Credentials;
use crate::error::{Error, ErrorKind, Result};

/// Log in with the Partner SOAP API and return a connection for
/// `api_version` (or the default version).
///
/// The credentials are validated and the password resolved before any
/// request is sent.
#[instrument(skip_all, fields(endpoint = %credentials.endpoint(), username = %credentials.username()))]
pub async fn login(
    credentials: &Credentials,
    api_version: Option<&str>,
    transport: Transport,
) -> Result<Connection> {
    let validated = credentials.validate()?;
    let api_version = api_version.unwrap_or(DEFAULT_API_VERSION);

    info!(host = %validated.host, username = %validated.username, api_version, "Login");

    let unauthenticated = Connection::new(
        transport.clone(),
        Session::unauthenticated(&validated.host),
        api_version,
    );
    let result = unauthenticated
        .soap(
            Api::Partner,
            "login",
            XmlObject::new()
                .with("username", validated.username.as_str())
                .with("password", validated.password.as_str()),
        )
        .await?;

    let host = result["serverUrl"]
        .as_str()
        .and_then(instance_host)
        .ok_or_else(|| Error::new(ErrorKind::Login("no serverUrl".to_string())))?;
    let session_id = result["sessionId"]
        .as_str()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::new(ErrorKind::Login("no sessionId".to_string())))?;

    Ok(Connection::new(
        transport,
        Session::new(host, session_id),
        api_version,
    ))
}

/// Host of a server URL such as
/// `https://na1.salesforce.com/services/Soap/u/45.0/00D...`.
fn instance_host(server_url: &str) -> Option<&str> {
    let rest = server_url.strip_prefix("https://")?;
    let end = rest.rfind("/services")?;
    Some(&rest[..end]).filter(|host| !host.is_empty())
}

/// The newest API version the instance supports, from `GET /services/data`.
pub async fn latest_api_version(connection: &Connection) -> Result<String> {
    let versions = connection.rest_json("/services/data").await?;
    let latest = versions
        .as_array()
        .and_then(|versions| versions.last())
        .ok_or_else(|| Error::new(ErrorKind::Other("no API versions listed".to_string())))?;

    let version = latest["version"]
        .as_str()
        .ok_or_else(|| Error::new(ErrorKind::Other("API version without a version number".to_string())))?;
    info!(label = latest["label"].as_str().unwrap_or_default(), version, "Latest API version");
    Ok(version.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::PasswordSources;
    use forcecmd_client::{ClientConfig, HttpRequest, HttpResponse, HttpSender};
    use futures::future::BoxFuture;
    use std::sync::{Arc, Mutex};

    /// Records requests and answers each with the next canned response.
    #[derive(Debug, Clone, Default)]
    struct FakeSender {
        requests: Arc<Mutex<Vec<HttpRequest>>>,
        responses: Arc<Mutex<Vec<HttpResponse>>>,
    }

    impl FakeSender {
        fn responding(responses: Vec<HttpResponse>) -> Self {
            Self {
                requests: Arc::default(),
                responses: Arc::new(Mutex::new(responses.into_iter().rev().collect())),
            }
        }

        fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl HttpSender for FakeSender {
        fn send(&self, request: HttpRequest) -> BoxFuture<'_, forcecmd_client::Result<HttpResponse>> {
            self.requests.lock().unwrap().push(request);
            let response = self.responses.lock().unwrap().pop().expect("unexpected request");
            Box::pin(async move { Ok(response) })
        }
    }

    fn transport(sender: &FakeSender) -> Transport {
        Transport::builder()
            .config(ClientConfig::builder().without_retry().build())
            .sender(sender.clone())
            .build()
            .unwrap()
    }

    fn login_response(result: &str) -> HttpResponse {
        HttpResponse::new(
            200,
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns="urn:partner.soap.sforce.com"><soapenv:Body><loginResponse><result>{result}</result></loginResponse></soapenv:Body></soapenv:Envelope>"#
            ),
        )
    }

    fn creds() -> Credentials {
        Credentials::new("https://login.salesforce.com", "user@example.com")
            .with_password_sources(PasswordSources::none())
    }

    #[test]
    fn test_instance_host() {
        assert_eq!(
            instance_host("https://na1.salesforce.com/services/Soap/u/45.0/00D000000000001"),
            Some("na1.salesforce.com")
        );
        assert_eq!(instance_host("http://na1.salesforce.com/services/Soap/u/45.0"), None);
        assert_eq!(instance_host("https://na1.salesforce.com/"), None);
        assert_eq!(instance_host("https:///services/Soap"), None);
    }

    #[tokio::test]
    async fn test_login() {
        let sender = FakeSender::responding(vec![login_response(
            "<serverUrl>https://na1.salesforce.com/services/Soap/u/45.0/00D</serverUrl><sessionId>SID</sessionId>",
        )]);

        let conn = login(&creds().with_password("pw"), None, transport(&sender))
            .await
            .unwrap();

        assert_eq!(conn.session().instance_host, "na1.salesforce.com");
        assert_eq!(conn.session().session_id(), Some("SID"));
        assert_eq!(conn.api_version(), "45.0");

        let requests = sender.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "https://login.salesforce.com/services/Soap/u/45.0");
        let body = String::from_utf8(requests[0].body.clone().unwrap().to_vec()).unwrap();
        assert!(body.contains("<login><username>user@example.com</username><password>pw</password></login>"));
        assert!(!body.contains("SessionHeader"));
    }

    #[tokio::test]
    async fn test_login_with_api_version() {
        let sender = FakeSender::responding(vec![login_response(
            "<serverUrl>https://eu1.salesforce.com/services/Soap/u/62.0/00D</serverUrl><sessionId>SID</sessionId>",
        )]);

        let conn = login(&creds().with_password("pw"), Some("62.0"), transport(&sender))
            .await
            .unwrap();
        assert_eq!(conn.api_version(), "62.0");
        assert_eq!(sender.requests()[0].url, "https://login.salesforce.com/services/Soap/u/62.0");
    }

    #[tokio::test]
    async fn test_blank_password_fails_before_any_request() {
        let sender = FakeSender::responding(vec![]);

        let err = login(&creds().with_password(""), None, transport(&sender))
            .await
            .unwrap_err();

        assert!(err.is_config_error());
        assert!(err.to_string().contains("password"));
        assert!(sender.requests().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_endpoint_fails_before_any_request() {
        let sender = FakeSender::responding(vec![]);
        let creds = Credentials::new("http://login.salesforce.com", "u")
            .with_password("pw")
            .with_password_sources(PasswordSources::none());

        let err = login(&creds, None, transport(&sender)).await.unwrap_err();
        assert!(err.is_config_error());
        assert!(sender.requests().is_empty());
    }

    #[tokio::test]
    async fn test_missing_session_id() {
        let sender = FakeSender::responding(vec![login_response(
            "<serverUrl>https://na1.salesforce.com/services/Soap/u/45.0/00D</serverUrl>",
        )]);

        let err = login(&creds().with_password("pw"), None, transport(&sender))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Login error: no sessionId");
    }

    #[tokio::test]
    async fn test_missing_server_url() {
        let sender = FakeSender::responding(vec![login_response("<sessionId>SID</sessionId>")]);

        let err = login(&creds().with_password("pw"), None, transport(&sender))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Login error: no serverUrl");
    }

    #[tokio::test]
    async fn test_login_fault() {
        let sender = FakeSender::responding(vec![HttpResponse::new(
            500,
            "<soapenv:Envelope><soapenv:Body><soapenv:Fault><faultcode>sf:INVALID_LOGIN</faultcode><faultstring>INVALID_LOGIN: Invalid username, password, security token; or user locked out.</faultstring></soapenv:Fault></soapenv:Body></soapenv:Envelope>",
        )]);

        let err = login(&creds().with_password("pw"), None, transport(&sender))
            .await
            .unwrap_err();
        assert!(!err.is_config_error());
        assert!(err.to_string().starts_with("INVALID_LOGIN"));
    }

    #[tokio::test]
    async fn test_latest_api_version() {
        let sender = FakeSender::responding(vec![HttpResponse::new(
            200,
            r#"[{"label":"Winter '19","url":"/services/data/v44.0","version":"44.0"},{"label":"Spring '19","url":"/services/data/v45.0","version":"45.0"}]"#,
        )]);
        let conn = Connection::new(transport(&sender), Session::new("na1.salesforce.com", "SID"), "45.0");

        assert_eq!(latest_api_version(&conn).await.unwrap(), "45.0");
        let requests = sender.requests();
        assert_eq!(requests[0].url, "https://na1.salesforce.com/services/data");
        assert_eq!(requests[0].header_value("Authorization"), Some("OAuth SID"));
    }
}
