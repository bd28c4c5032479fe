//! Demo echo endpoint.
//!
//! `GET` and `POST` answer with the aggregated body as JSON. A `POST` that
//! carries nothing besides `auth` fails with [`EmptyBodyError`], which the
//! registry built by [`build_registry`] maps to 422.

use std::sync::Arc;

use http::StatusCode;
use macrobase_core::{
    Classified, EXCEPTION, ErrorClass, Failure, HandlerRegistry, Resolution, ResolutionPolicy,
};
use macrobase_http::{
    AUTH_KEY, AfterHook, BeforeHook, Body, Endpoint, JsonReply, RequestContext, RequestView,
    Response, Verb, VerbHandler,
};

/// Error class of [`EmptyBodyError`].
pub static EMPTY_BODY: ErrorClass = ErrorClass::derived("EmptyBodyError", &EXCEPTION);

/// Application error code reported for empty bodies.
const EMPTY_BODY_CODE: i64 = 4220;

/// A `POST` without any payload.
#[derive(Debug, thiserror::Error)]
#[error("request body is empty")]
pub struct EmptyBodyError;

impl Classified for EmptyBodyError {
    fn class(&self) -> &'static ErrorClass {
        &EMPTY_BODY
    }
}

/// Registry with the built-in defaults plus the demo's own classes.
pub fn build_registry(policy: ResolutionPolicy) -> HandlerRegistry {
    let mut registry = HandlerRegistry::with_defaults(policy);
    registry.register(&[&EMPTY_BODY], |failure: &Failure| {
        Resolution::new(StatusCode::UNPROCESSABLE_ENTITY)
            .with_error_code(EMPTY_BODY_CODE)
            .with_message(failure.to_string())
    });
    registry
}

/// The echo endpoint.
pub fn echo_endpoint(registry: Arc<HandlerRegistry>) -> Endpoint {
    Endpoint::builder()
        .handler(Verb::Get, Echo)
        .handler(Verb::Post, Echo)
        .before(AccessLog)
        .after(AccessLog)
        .registry(registry)
        .not_implemented_defaults()
        .build()
}

/// Echo the body back.
#[derive(Debug, Clone, Copy)]
struct Echo;

#[async_trait::async_trait]
impl VerbHandler for Echo {
    async fn handle(
        &self,
        ctx: &RequestContext,
        request: &RequestView,
        body: &Body,
    ) -> Result<Response, Failure> {
        let has_payload = body.iter().any(|(key, _)| key != AUTH_KEY);
        if request.method == http::Method::POST && !has_payload {
            return Err(EmptyBodyError.into());
        }
        Ok(ctx
            .responses()
            .json(JsonReply::data(serde_json::json!({ "echo": body.to_json() }))))
    }
}

/// Logs the start and end of each dispatch.
#[derive(Debug, Clone, Copy)]
struct AccessLog;

#[async_trait::async_trait]
impl BeforeHook for AccessLog {
    async fn before(
        &self,
        ctx: &RequestContext,
        request: &RequestView,
        body: &mut Body,
    ) -> Result<(), Failure> {
        tracing::info!(
            request_id = ctx.request_id(),
            method = %request.method,
            uri = %request.uri,
            keys = body.len(),
            "request started"
        );
        Ok(())
    }
}

#[async_trait::async_trait]
impl AfterHook for AccessLog {
    async fn after(&self, ctx: &RequestContext, request: &RequestView) -> Result<(), Failure> {
        tracing::info!(
            request_id = ctx.request_id(),
            method = %request.method,
            uri = %request.uri,
            "request finished"
        );
        Ok(())
    }
}
