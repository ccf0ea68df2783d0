//! # forcecmd-xml
//!
//! A small XML codec for the subset of XML that Salesforce produces and
//! consumes: SOAP envelopes and metadata files such as `package.xml`.
//!
//! It is not a general XML parser. Comments, CDATA, doctypes, mixed content
//! and namespaces are not supported. The only attributes understood are
//! `xsi:nil="true"` and `xsi:type="..."`; every other attribute is ignored.
//!
//! ## Value model
//!
//! The content of an element becomes an [`XmlValue`]:
//!
//! - [`XmlValue::Nil`] when the element carries `xsi:nil="true"`.
//! - [`XmlValue::Object`] when the element has child elements or an
//!   `xsi:type` attribute. Children become fields in document order. A child
//!   name that occurs more than once becomes a [`XmlValue::Sequence`].
//! - [`XmlValue::Text`] otherwise.
//!
//! Because a repeated element collapses into a sequence only when it occurs at
//! least twice, callers that expect a list use [`XmlValue::as_array`], which
//! accepts the absent, single and repeated forms alike.
//!
//! ## Example
//!
//! ```rust
//! use forcecmd_xml::{build, parse, XmlObject, XmlValue};
//!
//! let package = XmlObject::new()
//!     .with("types", XmlObject::new().with("members", "*").with("name", "ApexClass"))
//!     .with("version", "45.0");
//! let xml = build("Package", "", &package.into());
//! assert_eq!(
//!     xml,
//!     "<Package><types><members>*</members><name>ApexClass</name></types><version>45.0</version></Package>"
//! );
//!
//! let parsed = parse(&xml).unwrap();
//! assert_eq!(parsed["Package"]["version"].as_str(), Some("45.0"));
//! assert_eq!(parsed["Package"]["types"].as_array().len(), 1);
//! ```

mod builder;
mod error;
mod parser;
mod value;

pub use builder::{build, build_document, escape, escape_attribute, XmlElement, XML_DECLARATION};
pub use error::{ParseError, Result};
pub use parser::parse;
pub use value::{XmlObject, XmlValue};
