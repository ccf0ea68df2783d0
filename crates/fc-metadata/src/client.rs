//! Metadata API client.

use std::future::Future;

use base64::{engine::general_purpose, Engine as _};
use forcecmd_client::{Api, Connection};
use forcecmd_xml::{XmlObject, XmlValue};
use tracing::info;

use crate::deploy::DeployOptions;
use crate::error::{Error, ErrorKind, Result};
use crate::job::{Job, JobKind};
use crate::types::{
    DescribeMetadataResult, ListQuery, MetadataComponent, PackageManifest, MAX_LIST_QUERIES,
};

/// The Metadata API calls the manifest builder and the pipelines use.
///
/// [`MetadataClient`] implements it over a [`Connection`]; tests substitute
/// an in-process fake.
pub trait MetadataApi: Send + Sync {
    /// API version of every call.
    fn api_version(&self) -> &str;

    fn describe_metadata(&self) -> impl Future<Output = Result<DescribeMetadataResult>> + Send;

    /// List components for up to [`MAX_LIST_QUERIES`] queries.
    fn list_metadata(
        &self,
        queries: &[ListQuery],
    ) -> impl Future<Output = Result<Vec<MetadataComponent>>> + Send;

    /// Submit a retrieve of `manifest`, returning the job id.
    fn retrieve(&self, manifest: &PackageManifest) -> impl Future<Output = Result<String>> + Send;

    fn check_retrieve_status(&self, id: &str) -> impl Future<Output = Result<Job>> + Send;

    /// Submit a deploy of a zip archive, returning the job id.
    fn deploy(
        &self,
        zip: &[u8],
        options: &DeployOptions,
    ) -> impl Future<Output = Result<String>> + Send;

    fn check_deploy_status(&self, id: &str) -> impl Future<Output = Result<Job>> + Send;
}

/// Salesforce Metadata API client.
#[derive(Debug, Clone)]
pub struct MetadataClient {
    connection: Connection,
}

impl MetadataClient {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    async fn call(&self, method: &str, args: XmlObject) -> Result<XmlValue> {
        Ok(self.connection.soap(Api::Metadata, method, args).await?)
    }
}

/// The `id` of an `AsyncResult`.
fn async_id(method: &str, result: &XmlValue) -> Result<String> {
    result["id"]
        .as_str()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            Error::new(ErrorKind::InvalidResponse(format!(
                "No async process ID in {method} response"
            )))
        })
}

impl MetadataApi for MetadataClient {
    fn api_version(&self) -> &str {
        self.connection.api_version()
    }

    async fn describe_metadata(&self) -> Result<DescribeMetadataResult> {
        info!("DescribeMetadata");
        let result = self
            .call(
                "describeMetadata",
                XmlObject::new().with("asOfVersion", self.api_version()),
            )
            .await?;
        DescribeMetadataResult::from_xml(&result)
    }

    async fn list_metadata(&self, queries: &[ListQuery]) -> Result<Vec<MetadataComponent>> {
        if queries.len() > MAX_LIST_QUERIES {
            return Err(Error::new(ErrorKind::InvalidRequest(format!(
                "listMetadata accepts at most {MAX_LIST_QUERIES} queries, got {}",
                queries.len()
            ))));
        }

        let args = XmlObject::new()
            .with(
                "queries",
                XmlValue::Sequence(queries.iter().map(ListQuery::to_xml).collect()),
            )
            .with("asOfVersion", self.api_version());
        let result = self.call("listMetadata", args).await?;

        Ok(result
            .as_array()
            .iter()
            .map(MetadataComponent::from_xml)
            .collect())
    }

    async fn retrieve(&self, manifest: &PackageManifest) -> Result<String> {
        let request = XmlObject::new()
            .with("apiVersion", self.api_version())
            .with("unpackaged", manifest.to_xml());
        let result = self
            .call("retrieve", XmlObject::new().with("retrieveRequest", request))
            .await?;
        async_id("retrieve", &result)
    }

    async fn check_retrieve_status(&self, id: &str) -> Result<Job> {
        let result = self
            .call(
                "checkRetrieveStatus",
                XmlObject::new()
                    .with("asyncProcessId", id)
                    .with("includeZip", true),
            )
            .await?;
        Ok(Job::from_xml(JobKind::Retrieve, result))
    }

    async fn deploy(&self, zip: &[u8], options: &DeployOptions) -> Result<String> {
        let encoded_zip = general_purpose::STANDARD.encode(zip);
        let args = XmlObject::new()
            .with("ZipFile", encoded_zip)
            .with("DeployOptions", options.to_xml());
        let result = self.call("deploy", args).await?;
        async_id("deploy", &result)
    }

    async fn check_deploy_status(&self, id: &str) -> Result<Job> {
        let result = self
            .call(
                "checkDeployStatus",
                XmlObject::new()
                    .with("asyncProcessId", id)
                    .with("includeDetails", true),
            )
            .await?;
        Ok(Job::from_xml(JobKind::Deploy, result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forcecmd_client::{ClientConfig, Session, Transport};
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn envelope(method: &str, result: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns="http://soap.sforce.com/2006/04/metadata"><soapenv:Body><{method}Response>{result}</{method}Response></soapenv:Body></soapenv:Envelope>"#
        )
    }

    fn client(server: &MockServer) -> MetadataClient {
        let transport = Transport::builder()
            .config(ClientConfig::builder().without_retry().build())
            .scheme("http")
            .build()
            .unwrap();
        let host = server.uri().trim_start_matches("http://").to_string();
        MetadataClient::new(Connection::new(transport, Session::new(host, "SID"), "45.0"))
    }

    async fn mount(server: &MockServer, soap_method: &str, result: &str) {
        Mock::given(method("POST"))
            .and(path("/services/Soap/m/45.0"))
            .and(body_string_contains(format!("<{soap_method}>")))
            .respond_with(ResponseTemplate::new(200).set_body_string(envelope(soap_method, result)))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_describe_metadata() {
        let server = MockServer::start().await;
        mount(
            &server,
            "describeMetadata",
            "<result><metadataObjects><directoryName>classes</directoryName><inFolder>false</inFolder>\
             <metaFile>true</metaFile><suffix>cls</suffix><xmlName>ApexClass</xmlName></metadataObjects>\
             <partialSaveAllowed>true</partialSaveAllowed><testRequired>false</testRequired></result>",
        )
        .await;

        let describe = client(&server).describe_metadata().await.unwrap();
        assert_eq!(describe.metadata_objects.len(), 1);
        assert_eq!(describe.metadata_objects[0].xml_name, "ApexClass");
        assert!(describe.metadata_objects[0].meta_file);
    }

    #[tokio::test]
    async fn test_list_metadata() {
        let server = MockServer::start().await;
        mount(
            &server,
            "listMetadata",
            "<result><fileName>reports/Sales.reportFolder</fileName><fullName>Sales</fullName>\
             <id>00l000000000001</id><type>ReportFolder</type></result>\
             <result><fileName>reports/Ops.reportFolder</fileName><fullName>Ops</fullName>\
             <id>00l000000000002</id><type>ReportFolder</type></result>",
        )
        .await;

        let items = client(&server)
            .list_metadata(&[ListQuery::new("ReportFolder"), ListQuery::new("ApexClass")])
            .await
            .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], MetadataComponent {
            metadata_type: "ReportFolder".into(),
            full_name: "Sales".into(),
            file_name: Some("reports/Sales.reportFolder".into()),
            id: Some("00l000000000001".into()),
        });

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8(requests[0].body.clone()).unwrap();
        assert!(body.contains(
            "<queries><type>ReportFolder</type></queries><queries><type>ApexClass</type></queries>"
        ));
    }

    #[tokio::test]
    async fn test_list_metadata_empty_result() {
        let server = MockServer::start().await;
        mount(&server, "listMetadata", "").await;

        let items = client(&server)
            .list_metadata(&[ListQuery::new("ApexClass")])
            .await
            .unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_list_metadata_rejects_more_than_three_queries() {
        let server = MockServer::start().await;
        let queries: Vec<ListQuery> = ["A", "B", "C", "D"].into_iter().map(ListQuery::new).collect();

        let err = client(&server).list_metadata(&queries).await.unwrap_err();
        assert!(matches!(err.kind, ErrorKind::InvalidRequest(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_retrieve_and_status() {
        let server = MockServer::start().await;
        mount(
            &server,
            "retrieve",
            "<result><done>false</done><id>09S000000000001</id><state>Queued</state></result>",
        )
        .await;
        mount(
            &server,
            "checkRetrieveStatus",
            "<result><done>true</done><id>09S000000000001</id><status>Succeeded</status>\
             <success>true</success><zipFile>UEsFBgAAAAAAAAAAAAAAAAAAAAAAAA==</zipFile></result>",
        )
        .await;

        let client = client(&server);
        let manifest = PackageManifest::new("45.0").add_type("ApexClass", vec!["*".into()]);
        let id = client.retrieve(&manifest).await.unwrap();
        assert_eq!(id, "09S000000000001");

        let job = client.check_retrieve_status(&id).await.unwrap();
        assert!(job.done && job.success);
        assert_eq!(job.kind, JobKind::Retrieve);

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8(requests[0].body.clone()).unwrap();
        assert!(body.contains(
            "<retrieveRequest><apiVersion>45.0</apiVersion><unpackaged><types><members>*</members>\
             <name>ApexClass</name></types><version>45.0</version></unpackaged></retrieveRequest>"
        ));
    }

    #[tokio::test]
    async fn test_deploy_encodes_zip() {
        let server = MockServer::start().await;
        mount(&server, "deploy", "<result><done>false</done><id>0Af000000000001</id></result>").await;

        let id = client(&server)
            .deploy(b"zip", &DeployOptions::new().check_only(true))
            .await
            .unwrap();
        assert_eq!(id, "0Af000000000001");

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8(requests[0].body.clone()).unwrap();
        assert!(body.contains("<ZipFile>emlw</ZipFile>"));
        assert!(body.contains("<DeployOptions><checkOnly>true</checkOnly></DeployOptions>"));
    }

    #[tokio::test]
    async fn test_submit_without_id_is_invalid() {
        let server = MockServer::start().await;
        mount(&server, "deploy", "<result><done>false</done></result>").await;

        let err = client(&server)
            .deploy(b"zip", &DeployOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::InvalidResponse(_)));
    }
}
