//! Core types, exception-handler registry, and configuration for Macrobase.
//!
//! This crate holds everything an endpoint needs that is independent of the
//! HTTP transport:
//!
//! - **Error classes** ([`class`]): `'static` descriptors forming an explicit
//!   single-inheritance hierarchy, so failures can be matched by ancestry.
//! - **Failures** ([`failure`]): the [`Failure`] value captured when a hook or
//!   verb handler fails, plus the built-in [`HttpError`] and [`RoutingError`].
//! - **Registry** ([`registry`]): [`HandlerRegistry`] maps failure classes to
//!   resolvers producing a [`Resolution`].
//! - **Configuration** ([`config`]): environment-driven [`MacrobaseConfig`].

pub mod class;
pub mod config;
pub mod error;
pub mod failure;
pub mod registry;

pub use class::{EXCEPTION, ErrorClass, HTTP_ERROR, IO_ERROR, JSON_ERROR, ROUTING_ERROR};
pub use config::MacrobaseConfig;
pub use error::{MacrobaseError, MacrobaseResult};
pub use failure::{Classified, Failure, HttpError, RoutingError};
pub use registry::{HandlerRegistry, Resolution, ResolutionPolicy, Resolver};
