//! Body aggregation: collapse every request input into one [`Body`].
//!
//! Sources are merged in a fixed order and later sources win on key
//! collision:
//!
//! 1. path parameters
//! 2. JSON body (JSON content type only)
//! 3. query arguments (any method but `POST`), scalar-collapsed
//! 4. uploaded files
//! 5. form fields, scalar-collapsed for `multipart/form-data`
//! 6. headers whose name starts with `x-`
//!
//! The `auth` key is never produced here; the caller sets it afterwards.

use crate::payload::{Body, FileField, Value};
use crate::request::{MultiMap, RequestView};

/// Merge all inputs of `request` into a single [`Body`].
#[must_use]
pub fn aggregate_body(request: &RequestView) -> Body {
    let mut body = Body::new();
    body.merge(path_params(request));
    body.merge(json_body(request));
    body.merge(query_args(request));
    body.merge(files(request));
    body.merge(form_fields(request));
    body.merge(extension_headers(request));
    body
}

/// Turn single-element lists into scalars; other lists stay lists.
#[must_use]
pub fn collapse_params(params: &MultiMap) -> Body {
    params
        .iter()
        .map(|(key, values)| {
            let value = match values.as_slice() {
                [single] => Value::Text(single.clone()),
                _ => Value::List(values.clone()),
            };
            (key.clone(), value)
        })
        .collect()
}

fn path_params(request: &RequestView) -> Body {
    request
        .path_params
        .iter()
        .map(|(k, v)| (k.clone(), Value::Text(v.clone())))
        .collect()
}

fn json_body(request: &RequestView) -> Body {
    match &request.json {
        Some(map) if request.content_type_contains("application/json") => map
            .iter()
            .map(|(k, v)| (k.clone(), Value::Json(v.clone())))
            .collect(),
        _ => Body::new(),
    }
}

fn query_args(request: &RequestView) -> Body {
    if request.method == http::Method::POST || request.query.is_empty() {
        return Body::new();
    }
    collapse_params(&request.query)
}

fn files(request: &RequestView) -> Body {
    request
        .files
        .iter()
        .map(|(key, field)| {
            let value = match field {
                FileField::Many(items) => Value::Files(items.clone()),
                // Single-valued fields carry the whole file map.
                FileField::Single(_) => Value::RawFiles(request.files.clone()),
            };
            (key.clone(), value)
        })
        .collect()
}

fn form_fields(request: &RequestView) -> Body {
    if request.form.is_empty() {
        return Body::new();
    }
    if request.content_type_contains("multipart/form-data") {
        return collapse_params(&request.form);
    }
    request
        .form
        .iter()
        .map(|(k, v)| (k.clone(), Value::List(v.clone())))
        .collect()
}

fn extension_headers(request: &RequestView) -> Body {
    request
        .headers
        .keys()
        .filter(|name| name.as_str().starts_with("x-"))
        .filter_map(|name| {
            let value = request.headers.get(name)?;
            Some((
                name.as_str().to_owned(),
                Value::Text(String::from_utf8_lossy(value.as_bytes()).into_owned()),
            ))
        })
        .collect()
}
