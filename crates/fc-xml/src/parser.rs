//! Recursive-descent parser for the Salesforce XML subset.

use crate::error::{ParseError, Result};
use crate::value::{XmlObject, XmlValue};

/// Parse a document into `{root_name: root_value}`.
///
/// An XML declaration, if present, is skipped by jumping past the first `?>`.
/// Whatever follows the root element is ignored.
pub fn parse(xml: &str) -> Result<XmlValue> {
    let mut parser = Parser { xml, pos: 0 };
    if let Some(prolog_end) = xml.find("?>") {
        parser.pos = prolog_end + "?>".len();
    }
    parser.skip_whitespace();
    let (name, value) = parser.parse_element()?;
    Ok(XmlObject::new().with(name, value).into())
}

struct Parser<'a> {
    xml: &'a str,
    /// Always on an ASCII character boundary: the cursor only moves to
    /// positions of `<` or one past `>`.
    pos: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, note: impl Into<String>) -> ParseError {
        ParseError::at(self.xml, self.pos, note)
    }

    fn find_from(&self, needle: char, note: &str) -> Result<usize> {
        self.xml[self.pos..]
            .find(needle)
            .map(|offset| self.pos + offset)
            .ok_or_else(|| self.error(note))
    }

    fn skip_whitespace(&mut self) {
        let rest = &self.xml[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
    }

    /// Precondition: the cursor is on the `<` of a start tag.
    /// Postcondition: the cursor is one past the `>` of the matching end tag.
    fn parse_element(&mut self) -> Result<(&'a str, XmlValue)> {
        if !self.xml[self.pos..].starts_with('<') {
            return Err(self.error("expected '<'"));
        }
        let tag_end = self.find_from('>', "unterminated start tag")?;
        let start_tag = &self.xml[self.pos + 1..tag_end];
        let (start_tag, self_closing) = match start_tag.strip_suffix('/') {
            Some(inner) => (inner, true),
            None => (start_tag, false),
        };
        let (name, attributes) = match start_tag.find(|c: char| c.is_ascii_whitespace()) {
            Some(i) => start_tag.split_at(i),
            None => (start_tag, ""),
        };
        if name.is_empty() || name.starts_with('/') {
            return Err(self.error(format!("expected a start tag, found <{start_tag}>")));
        }
        self.pos = tag_end + 1;

        let mut attributes = attributes.split_ascii_whitespace();
        if attributes.clone().any(|a| a == r#"xsi:nil="true""#) {
            if !self_closing {
                // Nil elements have no children; jump straight to the end tag.
                self.pos = self.find_from('<', "missing end tag")?;
                self.parse_end_tag(name)?;
            }
            return Ok((name, XmlValue::Nil));
        }

        let xsi_type = attributes.find_map(|a| {
            a.strip_prefix(r#"xsi:type=""#)
                .and_then(|rest| rest.strip_suffix('"'))
        });
        let mut value = match xsi_type {
            Some(type_name) => XmlValue::Object(XmlObject::typed(type_name)),
            None => XmlValue::Text(String::new()),
        };
        if self_closing {
            return Ok((name, value));
        }

        loop {
            let next_tag = self.find_from('<', "unexpected end of document")?;
            if let XmlValue::Text(text) = &mut value {
                *text = decode_text(&self.xml[self.pos..next_tag]);
            }
            // Text next to child elements is dropped.
            self.pos = next_tag;

            if self.xml[self.pos..].starts_with("</") {
                self.parse_end_tag(name)?;
                return Ok((name, value));
            }

            if !matches!(value, XmlValue::Object(_)) {
                value = XmlValue::Object(XmlObject::new());
            }
            let (child_name, child_value) = self.parse_element()?;
            if let XmlValue::Object(obj) = &mut value {
                obj.push_child(child_name, child_value);
            }
        }
    }

    fn parse_end_tag(&mut self, name: &str) -> Result<()> {
        let tag_end = self.find_from('>', "unterminated end tag")?;
        let tag = &self.xml[self.pos..=tag_end];
        let matches = tag
            .strip_prefix("</")
            .and_then(|rest| rest.strip_suffix('>'))
            .is_some_and(|found| found.trim_end() == name);
        if !matches {
            return Err(self.error(format!("expected </{name}>, found {tag}")));
        }
        self.pos = tag_end + 1;
        Ok(())
    }
}

fn decode_text(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    // `&amp;` last so that an escaped entity such as `&amp;lt;` stays `&lt;`.
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
