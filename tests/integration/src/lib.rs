//! Integration tests for Macrobase endpoints.
//!
//! Requests are built as plain `http::Request`s with in-memory bodies and
//! driven through [`EndpointService`], exercising decoding, aggregation,
//! dispatch, failure resolution, and response headers together.
//!
//! Run them with:
//! ```text
//! cargo test -p macrobase-integration
//! ```

use std::sync::{Arc, Once};

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::service::Service;
use macrobase_http::{Endpoint, EndpointService, Response};

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Wrap `endpoint` in a service.
#[must_use]
pub fn service(endpoint: Endpoint) -> EndpointService {
    init_tracing();
    EndpointService::new(Arc::new(endpoint))
}

/// Start a request with the given method and URI.
#[must_use]
pub fn request(method: &str, uri: &str) -> http::request::Builder {
    http::Request::builder().method(method).uri(uri)
}

/// Send `req` through `svc`.
///
/// # Panics
///
/// Panics if the request cannot be built.
pub async fn send(
    svc: &EndpointService,
    req: http::request::Builder,
    body: impl Into<Bytes>,
) -> Response {
    let req = req
        .body(Full::new(body.into()))
        .expect("request should build");
    match svc.call(req).await {
        Ok(resp) => resp,
        Err(never) => match never {},
    }
}

/// Collect a response body.
///
/// # Panics
///
/// Panics if the body cannot be collected.
pub async fn body_bytes(resp: Response) -> Bytes {
    resp.into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes()
}

/// Collect a response body and parse it as JSON.
///
/// # Panics
///
/// Panics if the body is not valid JSON.
pub async fn body_json(resp: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(resp).await).expect("body should be JSON")
}

mod test_aggregate;
mod test_dispatch;
mod test_resolution;
