//! Serialization of [`XmlValue`] trees.

use std::fmt::{self, Write};

use crate::value::XmlValue;

/// Declaration written at the top of standalone metadata files.
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// An element ready to be written.
///
/// Formatting streams the element into the formatter fragment by fragment, so
/// large documents (a deploy request carries the whole base64 archive) are
/// never assembled more than once.
#[derive(Debug, Clone, Copy)]
pub struct XmlElement<'a> {
    name: &'a str,
    attributes: &'a str,
    value: &'a XmlValue,
}

impl<'a> XmlElement<'a> {
    /// `attributes` is raw XML placed in the opening tag of the root element,
    /// such as namespace declarations. It must start with a space.
    pub fn new(name: &'a str, attributes: &'a str, value: &'a XmlValue) -> Self {
        Self {
            name,
            attributes,
            value,
        }
    }
}

impl fmt::Display for XmlElement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_element(f, self.name, self.attributes, self.value)
    }
}

/// Build `value` as an element named `name`.
///
/// - A sequence produces one sibling element per item, all named `name`.
/// - Nil produces `<name xsi:nil="true"></name>`.
/// - An object produces a child element per field in insertion order, and its
///   `xsi:type`, if any, as an attribute.
/// - Text is escaped and used as the element content.
pub fn build(name: &str, attributes: &str, value: &XmlValue) -> String {
    XmlElement::new(name, attributes, value).to_string()
}

/// [`build`] preceded by the XML declaration.
pub fn build_document(name: &str, attributes: &str, value: &XmlValue) -> String {
    format!("{XML_DECLARATION}\n{}\n", XmlElement::new(name, attributes, value))
}

fn write_element(out: &mut impl Write, name: &str, attributes: &str, value: &XmlValue) -> fmt::Result {
    match value {
        XmlValue::Sequence(items) => {
            for item in items {
                write_element(out, name, attributes, item)?;
            }
            Ok(())
        }
        XmlValue::Nil => write!(out, r#"<{name}{attributes} xsi:nil="true"></{name}>"#),
        XmlValue::Object(obj) => {
            write!(out, "<{name}{attributes}")?;
            if let Some(type_name) = obj.xsi_type() {
                write!(out, r#" xsi:type="{type_name}""#)?;
            }
            out.write_char('>')?;
            for (key, child) in obj.iter() {
                write_element(out, key, "", child)?;
            }
            write!(out, "</{name}>")
        }
        XmlValue::Text(text) => {
            write!(out, "<{name}{attributes}>")?;
            write_escaped(out, text, false)?;
            write!(out, "</{name}>")
        }
    }
}

fn write_escaped(out: &mut impl Write, text: &str, attribute: bool) -> fmt::Result {
    // Character by character, so `&` can never be escaped twice.
    for c in text.chars() {
        match c {
            '&' => out.write_str("&amp;")?,
            '<' => out.write_str("&lt;")?,
            '>' => out.write_str("&gt;")?,
            '"' if attribute => out.write_str("&quot;")?,
            c => out.write_char(c)?,
        }
    }
    Ok(())
}

/// Escape text content.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    let _ = write_escaped(&mut escaped, text, false);
    escaped
}

/// Escape a value for use inside a double-quoted attribute.
pub fn escape_attribute(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    let _ = write_escaped(&mut escaped, text, true);
    escaped
}
