//! HTTP layer for Macrobase endpoints.
//!
//! This crate turns raw HTTP requests into endpoint calls:
//!
//! - **Request view**: decodes path parameters, query, JSON, forms, and
//!   multipart uploads from `http` request parts
//! - **Aggregation**: collapses all inputs into one [`Body`]
//! - **Dispatch**: runs before-hooks, the verb handler, and after-hooks,
//!   resolving failures through a [`macrobase_core::HandlerRegistry`]
//! - **Responses**: raw, text, JSON, and file responses stamped with a
//!   correlation id
//! - **Service**: Hyper `Service` implementation wrapping an [`Endpoint`]

pub mod aggregate;
pub mod body;
pub mod dispatch;
pub mod error;
pub mod multipart;
pub mod payload;
pub mod request;
pub mod response;
pub mod service;

pub use aggregate::{aggregate_body, collapse_params};
pub use body::ResponseBody;
pub use dispatch::{
    AfterHook, BeforeHook, Endpoint, EndpointBuilder, HealthHandler, NotImplementedHandler,
    RequestContext, Verb, VerbHandler, handler_fn,
};
pub use error::DecodeError;
pub use payload::{AUTH_KEY, Body, FileField, FileItem, FileMap, Value};
pub use request::{AuthContext, PathParams, RequestView};
pub use response::{CORRELATION_HEADER, JsonReply, ReplyOptions, Response, ResponseFactory};
pub use service::EndpointService;
