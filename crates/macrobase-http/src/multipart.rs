//! Multipart form-data parser.
//!
//! Parses `multipart/form-data` bodies into repeated text fields and uploads.
//! This is a synchronous parser that works on the already-collected body bytes.

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::error::DecodeError;
use crate::payload::FileItem;

/// Content type reported for parts that do not declare one.
const DEFAULT_PART_CONTENT_TYPE: &str = "application/octet-stream";

/// A parsed multipart form-data submission.
#[derive(Debug, Default)]
pub struct MultipartForm {
    /// Non-file fields, in submission order per name.
    pub fields: BTreeMap<String, Vec<String>>,
    /// Uploads, in submission order per name.
    pub files: BTreeMap<String, Vec<FileItem>>,
}

/// Extract the boundary string from a `Content-Type: multipart/form-data; boundary=...` header.
pub fn extract_boundary(content_type: &str) -> Result<String, DecodeError> {
    if !content_type
        .to_ascii_lowercase()
        .contains("multipart/form-data")
    {
        return Err(DecodeError::Multipart(format!(
            "expected multipart/form-data, got: {content_type}"
        )));
    }

    let boundary = header_params(content_type)
        .into_iter()
        .find_map(|(key, value)| (key == "boundary").then_some(value))
        .ok_or_else(|| DecodeError::Multipart("missing boundary".to_owned()))?;
    if boundary.is_empty() {
        return Err(DecodeError::Multipart("empty boundary".to_owned()));
    }
    Ok(boundary)
}

/// Parse a multipart/form-data body.
///
/// Parts with a `filename` parameter become uploads; all others become text
/// fields. Parts without a `name` are skipped.
pub fn parse_multipart(body: &[u8], boundary: &str) -> Result<MultipartForm, DecodeError> {
    let delimiter = format!("--{boundary}");
    let end_delimiter = format!("--{boundary}--");

    if find_bytes(body, delimiter.as_bytes()).is_none() {
        return Err(DecodeError::Multipart(
            "boundary not found in body".to_owned(),
        ));
    }

    let mut form = MultipartForm::default();

    for part_bytes in split_multipart_parts(body, delimiter.as_bytes(), end_delimiter.as_bytes()) {
        let Some((headers_section, part_body)) = split_headers_body(part_bytes) else {
            continue;
        };

        let disposition = parse_content_disposition(headers_section);
        let Some(field_name) = disposition.name else {
            continue;
        };

        if let Some(filename) = disposition.filename {
            let content_type = parse_part_content_type(headers_section)
                .unwrap_or_else(|| DEFAULT_PART_CONTENT_TYPE.to_owned());
            form.files.entry(field_name).or_default().push(FileItem {
                content_type,
                body: Bytes::copy_from_slice(part_body),
                name: filename,
            });
        } else {
            let value = String::from_utf8_lossy(part_body).into_owned();
            form.fields.entry(field_name).or_default().push(value);
        }
    }

    Ok(form)
}

/// Split the multipart body into individual parts by boundary.
fn split_multipart_parts<'a>(
    body: &'a [u8],
    delimiter: &[u8],
    end_delimiter: &[u8],
) -> Vec<&'a [u8]> {
    let mut parts = Vec::new();
    let mut remaining = body;

    // Skip the preamble.
    if let Some(pos) = find_bytes(remaining, delimiter) {
        remaining = skip_crlf(&remaining[pos + delimiter.len()..]);
    } else {
        return parts;
    }

    loop {
        if remaining.starts_with(end_delimiter)
            || remaining
                .strip_prefix(b"\r\n")
                .is_some_and(|r| r.starts_with(end_delimiter))
        {
            break;
        }

        if let Some(pos) = find_bytes(remaining, delimiter) {
            parts.push(strip_trailing_crlf(&remaining[..pos]));
            remaining = skip_crlf(&remaining[pos + delimiter.len()..]);
        } else {
            let part = strip_trailing_crlf(remaining);
            if !part.is_empty() {
                parts.push(part);
            }
            break;
        }
    }

    parts
}

/// Split a part into headers section and body at the first \r\n\r\n boundary.
fn split_headers_body(part: &[u8]) -> Option<(&[u8], &[u8])> {
    let separator = b"\r\n\r\n";
    find_bytes(part, separator).map(|pos| (&part[..pos], &part[pos + separator.len()..]))
}

struct ContentDisposition {
    name: Option<String>,
    filename: Option<String>,
}

fn parse_content_disposition(headers: &[u8]) -> ContentDisposition {
    let headers_str = String::from_utf8_lossy(headers);
    let mut disposition = ContentDisposition {
        name: None,
        filename: None,
    };

    for line in headers_str.split("\r\n") {
        if !line
            .to_ascii_lowercase()
            .starts_with("content-disposition:")
        {
            continue;
        }
        for (key, value) in header_params(line) {
            match key.as_str() {
                "name" => disposition.name = Some(value),
                "filename" => disposition.filename = Some(value),
                _ => {}
            }
        }
    }

    disposition
}

/// Parameters after the first `;` of a header value, as lowercased keys and
/// unquoted values. Separators inside quoted strings do not split.
fn header_params(value: &str) -> Vec<(String, String)> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' if in_quotes => {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ';' if !in_quotes => segments.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    segments.push(current);

    segments
        .into_iter()
        .skip(1)
        .filter_map(|segment| {
            let (key, value) = segment.split_once('=')?;
            Some((key.trim().to_ascii_lowercase(), unquote(value.trim())))
        })
        .collect()
}

/// Strip surrounding quotes and unescape `\"`. Other backslashes are kept.
fn unquote(value: &str) -> String {
    let Some(inner) = value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) else {
        return value.to_owned();
    };
    inner.replace("\\\"", "\"")
}

fn parse_part_content_type(headers: &[u8]) -> Option<String> {
    let headers_str = String::from_utf8_lossy(headers);
    headers_str.split("\r\n").find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim()
            .eq_ignore_ascii_case("content-type")
            .then(|| value.trim().to_owned())
    })
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn skip_crlf(data: &[u8]) -> &[u8] {
    data.strip_prefix(b"\r\n").unwrap_or(data)
}

fn strip_trailing_crlf(data: &[u8]) -> &[u8] {
    data.strip_suffix(b"\r\n").unwrap_or(data)
}
