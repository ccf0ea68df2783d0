//! The generic tree value produced by the parser and consumed by the builder.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

static NIL: XmlValue = XmlValue::Nil;

/// Content of an XML element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum XmlValue {
    /// `xsi:nil="true"`.
    #[default]
    Nil,
    /// Simple content.
    Text(String),
    /// Complex content.
    Object(XmlObject),
    /// A field that occurred more than once. Only appears as a field value.
    Sequence(Vec<XmlValue>),
}

impl XmlValue {
    /// Look up a field of an object. Anything that is not an object has no fields.
    pub fn get(&self, key: &str) -> Option<&XmlValue> {
        match self {
            XmlValue::Object(obj) => obj.get(key),
            _ => None,
        }
    }

    /// The text content, if this is simple content.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            XmlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&XmlObject> {
        match self {
            XmlValue::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// View this value as a list.
    ///
    /// Nil and empty text are empty, a sequence is itself, anything else is a
    /// one-element list. Combined with indexing, which yields nil for absent
    /// fields, `value["field"].as_array()` works whether `field` occurred zero,
    /// one or many times.
    pub fn as_array(&self) -> &[XmlValue] {
        match self {
            XmlValue::Nil => &[],
            XmlValue::Text(s) if s.is_empty() => &[],
            XmlValue::Sequence(items) => items,
            other => std::slice::from_ref(other),
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, XmlValue::Nil)
    }

    /// True for the text `true`, the wire form of `xsd:boolean`.
    pub fn is_true(&self) -> bool {
        self.as_str() == Some("true")
    }

    /// The `xsi:type` of a typed object.
    pub fn xsi_type(&self) -> Option<&str> {
        self.as_object().and_then(XmlObject::xsi_type)
    }

    /// Convert a JSON value. Object keys named `$type` become the `xsi:type`.
    pub fn from_json(json: &serde_json::Value) -> XmlValue {
        match json {
            serde_json::Value::Null => XmlValue::Nil,
            serde_json::Value::Bool(b) => XmlValue::Text(b.to_string()),
            serde_json::Value::Number(n) => XmlValue::Text(n.to_string()),
            serde_json::Value::String(s) => XmlValue::Text(s.clone()),
            serde_json::Value::Array(items) => {
                XmlValue::Sequence(items.iter().map(XmlValue::from_json).collect())
            }
            serde_json::Value::Object(map) => {
                let mut obj = XmlObject::new();
                for (key, value) in map {
                    match (key.as_str(), value) {
                        ("$type", serde_json::Value::String(t)) => obj.xsi_type = Some(t.clone()),
                        _ => obj.insert(key.clone(), XmlValue::from_json(value)),
                    }
                }
                XmlValue::Object(obj)
            }
        }
    }

    /// Convert to JSON, the inverse of [`XmlValue::from_json`] for values
    /// that contain only strings.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl std::ops::Index<&str> for XmlValue {
    type Output = XmlValue;

    /// Absent fields index to [`XmlValue::Nil`], like `serde_json::Value`.
    fn index(&self, key: &str) -> &XmlValue {
        self.get(key).unwrap_or(&NIL)
    }
}

impl From<&str> for XmlValue {
    fn from(s: &str) -> Self {
        XmlValue::Text(s.to_string())
    }
}

impl From<String> for XmlValue {
    fn from(s: String) -> Self {
        XmlValue::Text(s)
    }
}

impl From<&String> for XmlValue {
    fn from(s: &String) -> Self {
        XmlValue::Text(s.clone())
    }
}

impl From<bool> for XmlValue {
    fn from(b: bool) -> Self {
        XmlValue::Text(b.to_string())
    }
}

impl From<u32> for XmlValue {
    fn from(n: u32) -> Self {
        XmlValue::Text(n.to_string())
    }
}

impl From<XmlObject> for XmlValue {
    fn from(obj: XmlObject) -> Self {
        XmlValue::Object(obj)
    }
}

impl<T: Into<XmlValue>> From<Vec<T>> for XmlValue {
    fn from(items: Vec<T>) -> Self {
        XmlValue::Sequence(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<XmlValue>> From<Option<T>> for XmlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(XmlValue::Nil, Into::into)
    }
}

impl Serialize for XmlValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            XmlValue::Nil => serializer.serialize_unit(),
            XmlValue::Text(s) => serializer.serialize_str(s),
            XmlValue::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            XmlValue::Object(obj) => obj.serialize(serializer),
        }
    }
}

/// Complex content: fields in document (or insertion) order plus an optional
/// `xsi:type`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlObject {
    xsi_type: Option<String>,
    fields: Vec<(String, XmlValue)>,
}

impl XmlObject {
    pub fn new() -> Self {
        Self::default()
    }

    /// An object carrying `xsi:type="type_name"`.
    pub fn typed(type_name: impl Into<String>) -> Self {
        Self {
            xsi_type: Some(type_name.into()),
            fields: Vec::new(),
        }
    }

    pub fn xsi_type(&self) -> Option<&str> {
        self.xsi_type.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<&XmlValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Set a field, replacing an existing value in place or appending a new key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<XmlValue>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((key, value)),
        }
    }

    /// Builder form of [`XmlObject::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<XmlValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Merge all fields of `other` into this object, later keys winning.
    pub fn extend(&mut self, other: XmlObject) {
        for (key, value) in other.fields {
            self.insert(key, value);
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<XmlValue> {
        let index = self.fields.iter().position(|(k, _)| k == key)?;
        Some(self.fields.remove(index).1)
    }

    /// Add a parsed child element. A repeated name is promoted to a sequence
    /// on its second occurrence and appended to on later ones.
    pub(crate) fn push_child(&mut self, key: &str, value: XmlValue) {
        match self.fields.iter_mut().find(|(k, _)| k == key) {
            Some((_, XmlValue::Sequence(items))) => items.push(value),
            Some((_, existing)) => {
                let first = std::mem::take(existing);
                *existing = XmlValue::Sequence(vec![first, value]);
            }
            None => self.fields.push((key.to_string(), value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &XmlValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for XmlObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.fields.len() + usize::from(self.xsi_type.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        if let Some(t) = &self.xsi_type {
            map.serialize_entry("$type", t)?;
        }
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_as_array_tolerates_every_shape() {
        let obj: XmlValue = XmlObject::new()
            .with("one", "a")
            .with("many", vec!["a", "b", "c"])
            .with("nil", XmlValue::Nil)
            .into();

        assert_eq!(obj["missing"].as_array().len(), 0);
        assert_eq!(obj["nil"].as_array().len(), 0);
        assert_eq!(obj["one"].as_array(), &[XmlValue::from("a")]);
        assert_eq!(obj["many"].as_array().len(), 3);
    }

    #[test]
    fn test_push_child_promotes_on_second_occurrence() {
        let mut obj = XmlObject::new();
        obj.push_child("x", "1".into());
        assert_eq!(obj.get("x"), Some(&XmlValue::from("1")));

        obj.push_child("x", "2".into());
        assert_eq!(obj.get("x"), Some(&XmlValue::from(vec!["1", "2"])));

        obj.push_child("x", "3".into());
        assert_eq!(obj.get("x"), Some(&XmlValue::from(vec!["1", "2", "3"])));
        assert_eq!(obj.len(), 1);
    }

    #[test]
    fn test_insert_keeps_position() {
        let mut obj = XmlObject::new().with("a", "1").with("b", "2");
        obj.insert("a", "3");
        let keys: Vec<&str> = obj.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(obj.get("a").and_then(XmlValue::as_str), Some("3"));
    }

    #[test]
    fn test_index_missing_is_nil() {
        let value = XmlValue::from("text");
        assert!(value["anything"]["deeper"].is_nil());
    }

    #[test]
    fn test_json_conversion() {
        let json = json!({
            "$type": "Account",
            "checkOnly": true,
            "runTests": ["A", "B"],
            "testLevel": null
        });
        let value = XmlValue::from_json(&json);

        assert_eq!(value.xsi_type(), Some("Account"));
        assert!(value["checkOnly"].is_true());
        assert_eq!(value["runTests"].as_array().len(), 2);
        assert!(value["testLevel"].is_nil());
        assert_eq!(
            value.to_json(),
            json!({
                "$type": "Account",
                "checkOnly": "true",
                "runTests": ["A", "B"],
                "testLevel": null
            })
        );
    }
}
