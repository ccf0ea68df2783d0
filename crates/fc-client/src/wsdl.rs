//! SOAP service bindings.

/// The SOAP APIs a session can call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Api {
    Enterprise,
    Partner,
    Apex,
    Metadata,
    Tooling,
}

impl Api {
    /// Service path prefix; the API version is appended.
    pub fn path_prefix(&self) -> &'static str {
        match self {
            Api::Enterprise => "/services/Soap/c/",
            Api::Partner => "/services/Soap/u/",
            Api::Apex => "/services/Soap/s/",
            Api::Metadata => "/services/Soap/m/",
            Api::Tooling => "/services/Soap/T/",
        }
    }

    /// Target namespace of the WSDL.
    pub fn namespace(&self) -> &'static str {
        match self {
            Api::Enterprise => "urn:enterprise.soap.sforce.com",
            Api::Partner => "urn:partner.soap.sforce.com",
            Api::Apex => "http://soap.sforce.com/2006/08/apex",
            Api::Metadata => "http://soap.sforce.com/2006/04/metadata",
            Api::Tooling => "urn:tooling.soap.sforce.com",
        }
    }

    pub fn endpoint(&self, api_version: &str) -> Endpoint {
        Endpoint {
            path: format!("{}{}", self.path_prefix(), api_version),
            namespace: self.namespace().to_string(),
        }
    }
}

/// Where a SOAP call goes and which namespace its body is in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub path: String,
    pub namespace: String,
}
