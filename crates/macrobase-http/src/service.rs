//! Hyper `Service` serving a single [`Endpoint`].

use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::BodyExt;

use crate::body::ResponseBody;
use crate::dispatch::{Endpoint, RequestContext};
use crate::error::DecodeError;
use crate::request::{AuthContext, RequestView};
use crate::response::{JsonReply, ReplyOptions, Response};

/// Value of the `server` header on every response.
pub const SERVER_NAME: &str = "Macrobase";

/// Hyper `Service` implementation for an [`Endpoint`].
///
/// Each call collects the request body, decodes it into a [`RequestView`],
/// takes the authentication context from the [`AuthContext`] request
/// extension, and dispatches with a fresh [`RequestContext`].
#[derive(Debug, Clone)]
pub struct EndpointService {
    endpoint: Arc<Endpoint>,
}

impl EndpointService {
    /// Create a new `EndpointService`.
    pub fn new(endpoint: Arc<Endpoint>) -> Self {
        Self { endpoint }
    }

    /// The wrapped endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &Arc<Endpoint> {
        &self.endpoint
    }
}

impl<B> hyper::service::Service<http::Request<B>> for EndpointService
where
    B: http_body::Body + Send + 'static,
    B::Data: Send,
    B::Error: fmt::Display,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<B>) -> Self::Future {
        let endpoint = Arc::clone(&self.endpoint);
        let ctx = RequestContext::new();
        let is_head = req.method() == http::Method::HEAD;

        Box::pin(async move {
            let mut response = process_request(req, &endpoint, &ctx).await;
            if is_head {
                *response.body_mut() = ResponseBody::empty();
            }
            Ok(add_common_headers(response))
        })
    }
}

/// Process a single request through decode and dispatch.
async fn process_request<B>(
    req: http::Request<B>,
    endpoint: &Endpoint,
    ctx: &RequestContext,
) -> Response
where
    B: http_body::Body,
    B::Error: fmt::Display,
{
    let (parts, incoming) = req.into_parts();

    // 1. Collect body and decode the request view.
    let decoded = collect_body(incoming)
        .await
        .and_then(|body| RequestView::from_parts(&parts, &body));
    let request = match decoded {
        Ok(request) => request,
        Err(err) => {
            tracing::debug!(request_id = ctx.request_id(), error = %err, "undecodable request");
            return ctx.responses().json(
                JsonReply::new(StatusCode::BAD_REQUEST).with_message(err.to_string()),
            );
        }
    };

    // 2. Dispatch.
    let auth = parts.extensions.get::<AuthContext>().map(|a| a.0.clone());
    match endpoint.handle_with(ctx, &request, auth).await {
        Ok(response) => response,
        Err(failure) => {
            tracing::error!(
                request_id = ctx.request_id(),
                error_class = %failure.class(),
                error = %failure,
                "unhandled failure"
            );
            ctx.responses().text(
                failure.to_string(),
                ReplyOptions::status(StatusCode::INTERNAL_SERVER_ERROR),
            )
        }
    }
}

/// Collect the incoming body into a single `Bytes` buffer.
async fn collect_body<B>(incoming: B) -> Result<Bytes, DecodeError>
where
    B: http_body::Body,
    B::Error: fmt::Display,
{
    incoming
        .collect()
        .await
        .map(http_body_util::Collected::to_bytes)
        .map_err(|e| DecodeError::Body(e.to_string()))
}

/// Add common response headers to every response.
fn add_common_headers(mut response: Response) -> Response {
    response
        .headers_mut()
        .insert("server", http::HeaderValue::from_static(SERVER_NAME));
    response
}
