//! Endpoint dispatch: verb selection, hooks, and failure resolution.
//!
//! Every dispatch follows the same lifecycle:
//!
//! ```text
//! RESOLVE_HANDLER -> BEFORE_HOOKS -> INVOKE -> AFTER_HOOKS -> DONE
//!                         \            |
//!                          +-> HANDLE_FAILURE -> AFTER_HOOKS
//! ```
//!
//! Before-hooks and the verb handler form the protected region: a failure
//! there is captured and later turned into a response by the endpoint's
//! [`HandlerRegistry`]. After-hooks run unconditionally once the protected
//! region is left but are not protected themselves; their failures are
//! returned to the caller.
//!
//! Traits are object-safe through `#[async_trait]` so endpoints can hold
//! heterogeneous handlers behind `Arc<dyn ...>`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::StatusCode;
use macrobase_core::{Failure, HandlerRegistry, ResolutionPolicy};

use crate::aggregate::aggregate_body;
use crate::payload::Body;
use crate::request::RequestView;
use crate::response::{JsonReply, ReplyOptions, Response, ResponseFactory};

/// The request verbs an endpoint can serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// `GET`
    Get,
    /// `HEAD`
    Head,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
    /// `CONNECT`
    Connect,
    /// `OPTIONS`
    Options,
    /// `TRACE`
    Trace,
    /// `PATCH`
    Patch,
}

impl Verb {
    /// Every verb.
    pub const ALL: [Self; 9] = [
        Self::Get,
        Self::Head,
        Self::Post,
        Self::Put,
        Self::Delete,
        Self::Connect,
        Self::Options,
        Self::Trace,
        Self::Patch,
    ];

    /// Map a request method to a verb; extension methods map to `None`.
    #[must_use]
    pub fn from_method(method: &http::Method) -> Option<Self> {
        match method.as_str().to_ascii_lowercase().as_str() {
            "get" => Some(Self::Get),
            "head" => Some(Self::Head),
            "post" => Some(Self::Post),
            "put" => Some(Self::Put),
            "delete" => Some(Self::Delete),
            "connect" => Some(Self::Connect),
            "options" => Some(Self::Options),
            "trace" => Some(Self::Trace),
            "patch" => Some(Self::Patch),
            _ => None,
        }
    }

    /// Lowercase verb name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Head => "head",
            Self::Post => "post",
            Self::Put => "put",
            Self::Delete => "delete",
            Self::Connect => "connect",
            Self::Options => "options",
            Self::Trace => "trace",
            Self::Patch => "patch",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-dispatch state threaded through hooks and handlers.
#[derive(Debug, Clone)]
pub struct RequestContext {
    responses: ResponseFactory,
}

impl RequestContext {
    /// Context with a fresh UUID v4 correlation id.
    #[must_use]
    pub fn new() -> Self {
        Self::with_request_id(uuid::Uuid::new_v4().to_string())
    }

    /// Context with a caller-chosen correlation id.
    #[must_use]
    pub(crate) fn with_request_id(request_id: impl Into<String>) -> Self {
        Self {
            responses: ResponseFactory::new(request_id),
        }
    }

    /// The correlation id of this dispatch.
    #[must_use]
    pub fn request_id(&self) -> &str {
        self.responses.request_id()
    }

    /// Response factory stamped with this dispatch's correlation id.
    #[must_use]
    pub fn responses(&self) -> &ResponseFactory {
        &self.responses
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Handler for one verb of an endpoint.
#[async_trait::async_trait]
pub trait VerbHandler: Send + Sync + 'static {
    /// Produce the response for `request`.
    async fn handle(
        &self,
        ctx: &RequestContext,
        request: &RequestView,
        body: &Body,
    ) -> Result<Response, Failure>;
}

/// Hook run before the verb handler; may rewrite the body.
#[async_trait::async_trait]
pub trait BeforeHook: Send + Sync + 'static {
    /// Inspect or amend the request body.
    async fn before(
        &self,
        ctx: &RequestContext,
        request: &RequestView,
        body: &mut Body,
    ) -> Result<(), Failure>;
}

/// Hook run after the verb handler, on success and failure alike.
#[async_trait::async_trait]
pub trait AfterHook: Send + Sync + 'static {
    /// Observe the finished request.
    async fn after(&self, ctx: &RequestContext, request: &RequestView) -> Result<(), Failure>;
}

/// Answers 500 `"<METHOD> Not Impl"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotImplementedHandler;

#[async_trait::async_trait]
impl VerbHandler for NotImplementedHandler {
    async fn handle(
        &self,
        ctx: &RequestContext,
        request: &RequestView,
        _body: &Body,
    ) -> Result<Response, Failure> {
        Ok(ctx.responses().json(
            JsonReply::new(StatusCode::INTERNAL_SERVER_ERROR)
                .with_message(format!("{} Not Impl", request.method)),
        ))
    }
}

/// Answers `GET` with the raw body `Health`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HealthHandler;

#[async_trait::async_trait]
impl VerbHandler for HealthHandler {
    async fn handle(
        &self,
        ctx: &RequestContext,
        _request: &RequestView,
        _body: &Body,
    ) -> Result<Response, Failure> {
        Ok(ctx.responses().raw("Health", ReplyOptions::default()))
    }
}

/// Adapter turning a synchronous closure into a [`VerbHandler`].
pub struct FnHandler<F>(F);

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnHandler")
    }
}

/// Wrap `f` as a [`VerbHandler`].
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&RequestContext, &RequestView, &Body) -> Result<Response, Failure>
        + Send
        + Sync
        + 'static,
{
    FnHandler(f)
}

#[async_trait::async_trait]
impl<F> VerbHandler for FnHandler<F>
where
    F: Fn(&RequestContext, &RequestView, &Body) -> Result<Response, Failure>
        + Send
        + Sync
        + 'static,
{
    async fn handle(
        &self,
        ctx: &RequestContext,
        request: &RequestView,
        body: &Body,
    ) -> Result<Response, Failure> {
        (self.0)(ctx, request, body)
    }
}

/// A set of verb handlers sharing hooks and an exception registry.
pub struct Endpoint {
    handlers: HashMap<Verb, Arc<dyn VerbHandler>>,
    before: Vec<Arc<dyn BeforeHook>>,
    after: Vec<Arc<dyn AfterHook>>,
    registry: Arc<HandlerRegistry>,
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut verbs: Vec<_> = self.handlers.keys().map(Verb::as_str).collect();
        verbs.sort_unstable();
        f.debug_struct("Endpoint")
            .field("verbs", &verbs)
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .field("registry", &self.registry)
            .finish()
    }
}

impl Endpoint {
    /// Start building an endpoint.
    #[must_use]
    pub fn builder() -> EndpointBuilder {
        EndpointBuilder::default()
    }

    /// The health endpoint: `GET` answers `Health`, other verbs are not
    /// implemented.
    #[must_use]
    pub fn health() -> Self {
        Self::builder()
            .handler(Verb::Get, HealthHandler)
            .not_implemented_defaults()
            .build()
    }

    /// The registry resolving this endpoint's failures.
    #[must_use]
    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    /// Returns `true` if a handler is registered for `verb`.
    #[must_use]
    pub fn serves(&self, verb: Verb) -> bool {
        self.handlers.contains_key(&verb)
    }

    /// Aggregate the request body, attach `auth`, and dispatch with a fresh
    /// context.
    ///
    /// # Errors
    ///
    /// Returns the failure of the first after-hook that fails.
    pub async fn handle(
        &self,
        request: &RequestView,
        auth: Option<serde_json::Value>,
    ) -> Result<Response, Failure> {
        self.handle_with(&RequestContext::new(), request, auth).await
    }

    /// Like [`Endpoint::handle`] with a caller-supplied context.
    pub(crate) async fn handle_with(
        &self,
        ctx: &RequestContext,
        request: &RequestView,
        auth: Option<serde_json::Value>,
    ) -> Result<Response, Failure> {
        let mut body = aggregate_body(request);
        body.set_auth(auth);
        self.dispatch_with(ctx, request, body).await
    }

    /// Dispatch an already aggregated body with a fresh context.
    ///
    /// # Errors
    ///
    /// Returns the failure of the first after-hook that fails. Failures in
    /// before-hooks and the handler are resolved into a response instead.
    pub async fn dispatch(&self, request: &RequestView, body: Body) -> Result<Response, Failure> {
        self.dispatch_with(&RequestContext::new(), request, body).await
    }

    /// Run the dispatch lifecycle under `ctx`.
    pub(crate) async fn dispatch_with(
        &self,
        ctx: &RequestContext,
        request: &RequestView,
        mut body: Body,
    ) -> Result<Response, Failure> {
        let handler = Verb::from_method(&request.method).and_then(|verb| {
            self.handlers
                .get(&verb)
                .map(|handler| (verb, Arc::clone(handler)))
        });
        let Some((verb, handler)) = handler else {
            tracing::debug!(
                request_id = ctx.request_id(),
                method = %request.method,
                "no handler for method"
            );
            return Ok(ctx.responses().json(
                JsonReply::new(StatusCode::METHOD_NOT_ALLOWED).with_message("Method Not Allowed"),
            ));
        };

        tracing::debug!(request_id = ctx.request_id(), %verb, "dispatching");

        let outcome = self
            .run_protected(ctx, request, &mut body, handler.as_ref())
            .await;

        for hook in &self.after {
            if let Err(failure) = hook.after(ctx, request).await {
                tracing::error!(
                    request_id = ctx.request_id(),
                    %verb,
                    error_class = %failure.class(),
                    error = %failure,
                    "after-hook failed"
                );
                return Err(failure);
            }
        }

        match outcome {
            Ok(response) => Ok(response),
            Err(failure) => {
                tracing::warn!(
                    request_id = ctx.request_id(),
                    %verb,
                    error_class = %failure.class(),
                    error = %failure,
                    "request failed"
                );
                let resolution = self.registry.resolve_response(&failure);
                Ok(ctx.responses().json(JsonReply::from(resolution)))
            }
        }
    }

    async fn run_protected(
        &self,
        ctx: &RequestContext,
        request: &RequestView,
        body: &mut Body,
        handler: &dyn VerbHandler,
    ) -> Result<Response, Failure> {
        for hook in &self.before {
            hook.before(ctx, request, body).await?;
        }
        handler.handle(ctx, request, body).await
    }
}

/// Builder for [`Endpoint`].
#[derive(Default)]
pub struct EndpointBuilder {
    handlers: HashMap<Verb, Arc<dyn VerbHandler>>,
    before: Vec<Arc<dyn BeforeHook>>,
    after: Vec<Arc<dyn AfterHook>>,
    registry: Option<Arc<HandlerRegistry>>,
}

impl fmt::Debug for EndpointBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointBuilder")
            .field("handlers", &self.handlers.len())
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .finish_non_exhaustive()
    }
}

impl EndpointBuilder {
    /// Serve `verb` with `handler`, replacing any previous handler.
    #[must_use]
    pub fn handler(mut self, verb: Verb, handler: impl VerbHandler) -> Self {
        self.handlers.insert(verb, Arc::new(handler));
        self
    }

    /// Append a before-hook.
    #[must_use]
    pub fn before(mut self, hook: impl BeforeHook) -> Self {
        self.before.push(Arc::new(hook));
        self
    }

    /// Append an after-hook.
    #[must_use]
    pub fn after(mut self, hook: impl AfterHook) -> Self {
        self.after.push(Arc::new(hook));
        self
    }

    /// Resolve failures with `registry`.
    #[must_use]
    pub fn registry(mut self, registry: Arc<HandlerRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Fill every verb without a handler with [`NotImplementedHandler`].
    #[must_use]
    pub fn not_implemented_defaults(mut self) -> Self {
        for verb in Verb::ALL {
            self.handlers
                .entry(verb)
                .or_insert_with(|| Arc::new(NotImplementedHandler));
        }
        self
    }

    /// Finish the endpoint. Without a registry the built-in defaults are
    /// used.
    #[must_use]
    pub fn build(self) -> Endpoint {
        Endpoint {
            handlers: self.handlers,
            before: self.before,
            after: self.after,
            registry: self
                .registry
                .unwrap_or_else(|| {
                    Arc::new(HandlerRegistry::with_defaults(ResolutionPolicy::default()))
                }),
        }
    }
}
