//! The read-only request view endpoints operate on.
//!
//! A [`RequestView`] holds every request input already decoded: path
//! parameters, JSON body, query arguments, uploads, form fields, and headers.
//! It is built either from raw `http` parts with [`RequestView::from_parts`]
//! or directly with [`RequestView::builder`].

use std::collections::BTreeMap;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};

use crate::error::DecodeError;
use crate::multipart;
use crate::payload::{FileField, FileItem, FileMap};

/// Content type assumed when a request does not declare one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// String parameters that may repeat, keyed by name.
pub type MultiMap = BTreeMap<String, Vec<String>>;

/// Path parameters extracted by an upstream router.
///
/// Insert into the request extensions before the request reaches the
/// endpoint service; [`RequestView::from_parts`] picks them up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(pub BTreeMap<String, String>);

/// Authentication context established by upstream middleware.
///
/// Carried in the request extensions and stored in the body under `auth`.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthContext(pub serde_json::Value);

/// A decoded, read-only view of an HTTP request.
#[derive(Debug, Clone)]
pub struct RequestView {
    /// Request method.
    pub method: http::Method,
    /// Request URI.
    pub uri: http::Uri,
    /// Declared content type, or [`DEFAULT_CONTENT_TYPE`].
    pub content_type: String,
    /// Path parameters.
    pub path_params: BTreeMap<String, String>,
    /// JSON object body, when the content type is JSON and the body is non-null.
    pub json: Option<serde_json::Map<String, serde_json::Value>>,
    /// Query arguments.
    pub query: MultiMap,
    /// Uploaded files.
    pub files: FileMap,
    /// Form fields (urlencoded or multipart).
    pub form: MultiMap,
    /// Request headers; names are case-insensitive.
    pub headers: HeaderMap,
}

impl RequestView {
    /// Start building a view for `method`.
    #[must_use]
    pub fn builder(method: http::Method) -> RequestViewBuilder {
        RequestViewBuilder::new(method)
    }

    /// Decode request parts and a collected body.
    pub fn from_parts(parts: &http::request::Parts, body: &Bytes) -> Result<Self, DecodeError> {
        let content_type = parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_owned();
        let lowered = content_type.to_ascii_lowercase();

        let path_params = parts
            .extensions
            .get::<PathParams>()
            .map(|p| p.0.clone())
            .unwrap_or_default();

        let query = parts
            .uri
            .query()
            .map(|q| parse_urlencoded(q.as_bytes()))
            .unwrap_or_default();

        let json = if lowered.contains("application/json") {
            parse_json_object(body)?
        } else {
            None
        };

        let mut form = MultiMap::new();
        let mut files = FileMap::new();
        if lowered.contains("application/x-www-form-urlencoded") {
            form = parse_urlencoded(body);
        } else if lowered.contains("multipart/form-data") {
            let boundary = multipart::extract_boundary(&content_type)?;
            let parsed = multipart::parse_multipart(body, &boundary)?;
            form = parsed.fields;
            files = parsed
                .files
                .into_iter()
                .map(|(name, items)| (name, FileField::Many(items)))
                .collect();
        }

        Ok(Self {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            content_type,
            path_params,
            json,
            query,
            files,
            form,
            headers: parts.headers.clone(),
        })
    }

    /// Returns `true` if the declared content type contains `needle` (ASCII case-insensitive).
    #[must_use]
    pub fn content_type_contains(&self, needle: &str) -> bool {
        self.content_type
            .to_ascii_lowercase()
            .contains(&needle.to_ascii_lowercase())
    }
}

/// Parse `application/x-www-form-urlencoded` data, dropping blank values.
fn parse_urlencoded(input: &[u8]) -> MultiMap {
    let mut params = MultiMap::new();
    for (key, value) in form_urlencoded::parse(input) {
        if value.is_empty() {
            continue;
        }
        params
            .entry(key.into_owned())
            .or_default()
            .push(value.into_owned());
    }
    params
}

/// Parse a JSON body that must be an object; empty or `null` bodies yield `None`.
fn parse_json_object(
    body: &[u8],
) -> Result<Option<serde_json::Map<String, serde_json::Value>>, DecodeError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    match serde_json::from_slice(body)? {
        serde_json::Value::Object(map) => Ok(Some(map)),
        serde_json::Value::Null => Ok(None),
        _ => Err(DecodeError::JsonNotObject),
    }
}

/// Builder for [`RequestView`].
#[derive(Debug)]
pub struct RequestViewBuilder {
    view: RequestView,
}

impl RequestViewBuilder {
    fn new(method: http::Method) -> Self {
        Self {
            view: RequestView {
                method,
                uri: http::Uri::from_static("/"),
                content_type: DEFAULT_CONTENT_TYPE.to_owned(),
                path_params: BTreeMap::new(),
                json: None,
                query: MultiMap::new(),
                files: FileMap::new(),
                form: MultiMap::new(),
                headers: HeaderMap::new(),
            },
        }
    }

    /// Set the request URI.
    #[must_use]
    pub fn uri(mut self, uri: http::Uri) -> Self {
        self.view.uri = uri;
        self
    }

    /// Set the content type.
    #[must_use]
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.view.content_type = content_type.into();
        self
    }

    /// Add a path parameter.
    #[must_use]
    pub fn path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.view.path_params.insert(name.into(), value.into());
        self
    }

    /// Set the JSON body; non-object values leave the body unset.
    #[must_use]
    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.view.json = match body {
            serde_json::Value::Object(map) => Some(map),
            _ => None,
        };
        self
    }

    /// Append a query argument.
    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.view
            .query
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }

    /// Append a form field.
    #[must_use]
    pub fn form(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.view
            .form
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }

    /// Append an upload to a list-valued file field.
    #[must_use]
    pub fn file(mut self, name: impl Into<String>, item: FileItem) -> Self {
        let name = name.into();
        match self.view.files.remove(&name) {
            Some(FileField::Many(mut items)) => {
                items.push(item);
                self.view.files.insert(name, FileField::Many(items));
            }
            Some(FileField::Single(first)) => {
                self.view
                    .files
                    .insert(name, FileField::Many(vec![first, item]));
            }
            None => {
                self.view.files.insert(name, FileField::Many(vec![item]));
            }
        }
        self
    }

    /// Set a single-valued file field.
    #[must_use]
    pub fn single_file(mut self, name: impl Into<String>, item: FileItem) -> Self {
        self.view.files.insert(name.into(), FileField::Single(item));
        self
    }

    /// Append a header; invalid names or values are ignored.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.view.headers.append(name, value);
            }
            _ => tracing::debug!(name, "ignoring invalid header"),
        }
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> RequestView {
        self.view
    }
}
