//! The unified request payload handed to hooks and verb handlers.
//!
//! A [`Body`] is a flat string-keyed map built by merging every request input
//! (see [`aggregate`](crate::aggregate)). Values keep enough shape to tell a
//! scalar from a repeated parameter or an upload.

use std::collections::BTreeMap;
use std::collections::btree_map;

use base64::Engine;
use bytes::Bytes;
use serde::Serialize;

/// Reserved key carrying the caller's authentication context.
pub const AUTH_KEY: &str = "auth";

/// An uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileItem {
    /// Content type declared for the part.
    #[serde(rename = "type")]
    pub content_type: String,
    /// Raw file content, serialized as base64.
    #[serde(serialize_with = "serialize_base64")]
    pub body: Bytes,
    /// Original file name.
    pub name: String,
}

impl FileItem {
    /// Create a new `FileItem`.
    #[must_use]
    pub fn new(
        content_type: impl Into<String>,
        body: impl Into<Bytes>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            content_type: content_type.into(),
            body: body.into(),
            name: name.into(),
        }
    }
}

/// All uploads sent under one field name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FileField {
    /// A field holding exactly one upload, not wrapped in a list.
    Single(FileItem),
    /// A field holding a list of uploads.
    Many(Vec<FileItem>),
}

/// Uploaded files keyed by field name.
pub type FileMap = BTreeMap<String, FileField>;

/// A value in a [`Body`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// A scalar string (path parameter, collapsed query value, header).
    Text(String),
    /// A repeated string parameter.
    List(Vec<String>),
    /// A value taken from the JSON body, or the auth context.
    Json(serde_json::Value),
    /// Uploads of a list-valued file field.
    Files(Vec<FileItem>),
    /// The complete file map, attached for single-valued file fields.
    RawFiles(FileMap),
}

impl Value {
    /// Borrow as a string if this is a [`Value::Text`] or a JSON string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Json(serde_json::Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Borrow as a list of strings.
    #[must_use]
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(values) => Some(values),
            _ => None,
        }
    }

    /// Borrow as a JSON value.
    #[must_use]
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }

    /// Borrow as a list of uploads.
    #[must_use]
    pub fn as_files(&self) -> Option<&[FileItem]> {
        match self {
            Self::Files(files) => Some(files),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<String>> for Value {
    fn from(values: Vec<String>) -> Self {
        Self::List(values)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Self::Json(v)
    }
}

/// The merged request payload.
///
/// Inserting an existing key replaces its value, so merging sources in order
/// lets later sources win.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Body(BTreeMap<String, Value>);

impl Body {
    /// Create an empty body.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Look up a scalar string value.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Returns `true` if `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Insert a value, returning the one it replaced.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Remove a value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Merge `other` into `self`; keys from `other` win.
    pub fn merge(&mut self, other: Body) {
        self.0.extend(other.0);
    }

    /// The authentication context stored under [`AUTH_KEY`].
    #[must_use]
    pub fn auth(&self) -> Option<&serde_json::Value> {
        self.get(AUTH_KEY).and_then(Value::as_json)
    }

    /// Store the authentication context under [`AUTH_KEY`]; `None` stores null.
    pub fn set_auth(&mut self, auth: Option<serde_json::Value>) {
        self.insert(AUTH_KEY, Value::Json(auth.unwrap_or(serde_json::Value::Null)));
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the body has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over entries in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.0.iter()
    }

    /// Render the body as a JSON object.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl FromIterator<(String, Value)> for Body {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Body {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Body {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

fn serialize_base64<S: serde::Serializer>(bytes: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_let_later_merge_win() {
        let mut body: Body = [("id".to_owned(), Value::from("1"))].into_iter().collect();
        let mut later = Body::new();
        later.insert("id", "2");
        later.insert("name", "a");
        body.merge(later);

        assert_eq!(body.get_str("id"), Some("2"));
        assert_eq!(body.get_str("name"), Some("a"));
        assert_eq!(body.len(), 2);
    }

    #[test]
    fn test_should_store_null_auth() {
        let mut body = Body::new();
        body.set_auth(None);
        assert_eq!(body.auth(), Some(&serde_json::Value::Null));

        body.set_auth(Some(serde_json::json!({"user_id": 7})));
        assert_eq!(body.auth().unwrap()["user_id"], 7);
    }

    #[test]
    fn test_should_render_json_with_base64_files() {
        let mut body = Body::new();
        body.insert("tag", vec!["x".to_owned(), "y".to_owned()]);
        body.insert(
            "upload",
            Value::Files(vec![FileItem::new("text/plain", &b"hi"[..], "a.txt")]),
        );

        let json = body.to_json();
        assert_eq!(json["tag"], serde_json::json!(["x", "y"]));
        assert_eq!(
            json["upload"],
            serde_json::json!([{"type": "text/plain", "body": "aGk=", "name": "a.txt"}])
        );
    }

    #[test]
    fn test_should_read_json_strings_as_str() {
        let value = Value::from(serde_json::json!("abc"));
        assert_eq!(value.as_str(), Some("abc"));
        assert!(Value::from(serde_json::json!(3)).as_str().is_none());
    }
}
