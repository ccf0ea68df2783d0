//! SOAP envelopes and responses.

use std::fmt;

use forcecmd_xml::{escape_attribute, parse, XmlElement, XmlObject, XmlValue, XML_DECLARATION};

use crate::error::{Error, ErrorKind, Result};
use crate::request::HttpResponse;
use crate::session::Session;
use crate::wsdl::Endpoint;

pub const SOAPENV_NAMESPACE: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// A request envelope, written lazily through `Display`.
///
/// The header holds `SessionHeader` when the session is authenticated,
/// followed by the caller's headers. Header and body declare the endpoint
/// namespace as the default namespace.
#[derive(Debug)]
pub struct SoapEnvelope<'a> {
    namespace: String,
    method: &'a str,
    args: &'a XmlValue,
    headers: XmlObject,
}

impl<'a> SoapEnvelope<'a> {
    pub fn new(
        session: &Session,
        endpoint: &Endpoint,
        method: &'a str,
        args: &'a XmlValue,
        extra_headers: XmlObject,
    ) -> Self {
        let mut headers = XmlObject::new();
        if let Some(session_id) = session.session_id() {
            headers.insert("SessionHeader", XmlObject::new().with("sessionId", session_id));
        }
        headers.extend(extra_headers);

        Self {
            namespace: escape_attribute(&endpoint.namespace),
            method,
            args,
            headers,
        }
    }
}

impl fmt::Display for SoapEnvelope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{XML_DECLARATION}")?;
        write!(
            f,
            r#"<soapenv:Envelope xmlns:soapenv="{SOAPENV_NAMESPACE}" xmlns:xsd="{XSD_NAMESPACE}" xmlns:xsi="{XSI_NAMESPACE}">"#
        )?;
        write!(f, r#"<soapenv:Header xmlns="{}">"#, self.namespace)?;
        for (name, value) in self.headers.iter() {
            write!(f, "{}", XmlElement::new(name, "", value))?;
        }
        write!(f, r#"</soapenv:Header><soapenv:Body xmlns="{}">"#, self.namespace)?;
        write!(f, "{}", XmlElement::new(self.method, "", self.args))?;
        write!(f, "</soapenv:Body></soapenv:Envelope>")
    }
}

/// Extract `<method>Response/result` from a 200 response, or the fault from
/// any other status.
pub fn read_response(method: &str, response: &HttpResponse) -> Result<XmlValue> {
    let parsed = parse(&response.body).map_err(|e| {
        Error::with_source(
            ErrorKind::InvalidResponse {
                status: response.status,
                message: e.to_string(),
                body: response.body.clone(),
            },
            e,
        )
    })?;
    let body = &parsed["soapenv:Envelope"]["soapenv:Body"];

    if response.status == 200 {
        return Ok(body[format!("{method}Response").as_str()]["result"].clone());
    }

    let fault = &body["soapenv:Fault"];
    match fault["faultstring"].as_str() {
        Some(fault_string) => Err(Error::new(ErrorKind::SoapFault {
            fault_code: fault["faultcode"].as_str().unwrap_or_default().to_string(),
            fault_string: fault_string.to_string(),
        })),
        None => Err(Error::new(ErrorKind::InvalidResponse {
            status: response.status,
            message: "no SOAP fault in error response".to_string(),
            body: response.body.clone(),
        })),
    }
}
