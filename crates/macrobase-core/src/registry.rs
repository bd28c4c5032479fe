//! Exception-handler registry.
//!
//! The registry maps [`ErrorClass`]es to resolvers. Entries are append-only
//! and kept in registration order; an exact-class index gives an O(1) fast
//! path. When no exact entry exists the lookup falls back to ancestry:
//!
//! - [`ResolutionPolicy::InsertionOrder`] returns the **first registered**
//!   ancestor, regardless of how close it is. Registering `Base` before
//!   `Specific` means a `Specific` subclass without its own entry resolves to
//!   the `Base` resolver.
//! - [`ResolutionPolicy::MostSpecific`] returns the closest ancestor, ties
//!   broken by registration order.
//!
//! A registry is populated at startup and shared read-only behind an `Arc`.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::class::{ErrorClass, HTTP_ERROR};
use crate::error::MacrobaseError;
use crate::failure::{Failure, HttpError, RoutingError};

/// Structured description of a failure: the resolver output.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// HTTP status of the response.
    pub status: http::StatusCode,
    /// Application error code; the status code is reported when absent.
    pub error_code: Option<i64>,
    /// Message; the canonical status phrase is reported when absent.
    pub message: Option<String>,
    /// Payload returned verbatim instead of the `{code, message}` envelope.
    pub data: Option<serde_json::Value>,
}

impl Resolution {
    /// Resolution with only a status.
    #[must_use]
    pub fn new(status: http::StatusCode) -> Self {
        Self {
            status,
            error_code: None,
            message: None,
            data: None,
        }
    }

    /// Set the application error code.
    #[must_use]
    pub fn with_error_code(mut self, error_code: i64) -> Self {
        self.error_code = Some(error_code);
        self
    }

    /// Set the message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Set the payload.
    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Fallback for failures no entry matches: 500 with the failure's message.
    #[must_use]
    pub fn unhandled(failure: &Failure) -> Self {
        Self::new(http::StatusCode::INTERNAL_SERVER_ERROR).with_message(failure.to_string())
    }
}

/// A resolver maps a failure to its [`Resolution`].
pub type Resolver = Arc<dyn Fn(&Failure) -> Resolution + Send + Sync>;

/// How ancestor matches are chosen when no exact entry exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionPolicy {
    /// First registered ancestor wins.
    #[default]
    InsertionOrder,
    /// Closest ancestor wins.
    MostSpecific,
}

impl ResolutionPolicy {
    /// The configuration name of this policy.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InsertionOrder => "insertion-order",
            Self::MostSpecific => "most-specific",
        }
    }
}

impl fmt::Display for ResolutionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolutionPolicy {
    type Err = MacrobaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "insertion-order" => Ok(Self::InsertionOrder),
            "most-specific" => Ok(Self::MostSpecific),
            _ => Err(MacrobaseError::InvalidPolicy(s.to_owned())),
        }
    }
}

struct HandlerEntry {
    class: &'static ErrorClass,
    resolver: Resolver,
}

/// Ordered, append-only mapping from error classes to resolvers.
pub struct HandlerRegistry {
    entries: Vec<HandlerEntry>,
    exact: HashMap<&'static str, usize>,
    policy: ResolutionPolicy,
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field(
                "entries",
                &self.entries.iter().map(|e| e.class.name()).collect::<Vec<_>>(),
            )
            .field("policy", &self.policy)
            .finish()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new(ResolutionPolicy::default())
    }
}

impl HandlerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new(policy: ResolutionPolicy) -> Self {
        Self {
            entries: Vec::new(),
            exact: HashMap::new(),
            policy,
        }
    }

    /// Create a registry with the built-in [`HTTP_ERROR`] resolver installed.
    ///
    /// `HttpError` answers with its own status and message, `RoutingError`
    /// with 500. Because the entry is registered first, under
    /// [`ResolutionPolicy::InsertionOrder`] it also wins for application
    /// subclasses of `HTTP_ERROR` that lack an exact entry.
    #[must_use]
    pub fn with_defaults(policy: ResolutionPolicy) -> Self {
        let mut registry = Self::new(policy);
        registry.register(&[&HTTP_ERROR], resolve_http_error);
        registry
    }

    /// The active ancestor-matching policy.
    #[must_use]
    pub fn policy(&self) -> ResolutionPolicy {
        self.policy
    }

    /// Register `resolver` for each class in `classes`.
    ///
    /// One entry per class is appended. A later registration for the same
    /// class takes over the exact-class fast path, but the earlier entry stays
    /// in the ordered sequence.
    pub fn register<F>(&mut self, classes: &[&'static ErrorClass], resolver: F)
    where
        F: Fn(&Failure) -> Resolution + Send + Sync + 'static,
    {
        let resolver: Resolver = Arc::new(resolver);
        for &class in classes {
            tracing::debug!(error_class = %class, "registering exception handler");
            self.exact.insert(class.name(), self.entries.len());
            self.entries.push(HandlerEntry {
                class,
                resolver: Arc::clone(&resolver),
            });
        }
    }

    /// Find the resolver for a failure.
    #[must_use]
    pub fn resolve(&self, failure: &Failure) -> Option<&Resolver> {
        self.resolve_class(failure.class())
    }

    /// Find the resolver for a class.
    #[must_use]
    pub fn resolve_class(&self, class: &ErrorClass) -> Option<&Resolver> {
        if let Some(entry) = self
            .exact
            .get(class.name())
            .and_then(|&idx| self.entries.get(idx))
        {
            return Some(&entry.resolver);
        }

        let entry = match self.policy {
            ResolutionPolicy::InsertionOrder => self.entries.iter().find(|e| class.is_a(e.class)),
            ResolutionPolicy::MostSpecific => self
                .entries
                .iter()
                .filter_map(|e| class.distance_to(e.class).map(|hops| (hops, e)))
                .min_by_key(|(hops, _)| *hops)
                .map(|(_, e)| e),
        };
        entry.map(|e| &e.resolver)
    }

    /// Resolve a failure into its response description.
    ///
    /// Failures with no matching entry become a 500 carrying the failure's
    /// message and no data.
    #[must_use]
    pub fn resolve_response(&self, failure: &Failure) -> Resolution {
        match self.resolve(failure) {
            Some(resolver) => resolver(failure),
            None => {
                tracing::debug!(error_class = %failure.class(), "no exception handler registered");
                Resolution::unhandled(failure)
            }
        }
    }

    /// Number of entries, duplicates included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered classes in registration order.
    pub fn classes(&self) -> impl Iterator<Item = &'static ErrorClass> + '_ {
        self.entries.iter().map(|e| e.class)
    }
}

/// Resolver for the [`HTTP_ERROR`] family.
fn resolve_http_error(failure: &Failure) -> Resolution {
    let status = if let Some(err) = failure.downcast_ref::<HttpError>() {
        err.status
    } else if failure.downcast_ref::<RoutingError>().is_some() {
        RoutingError::STATUS
    } else {
        http::StatusCode::INTERNAL_SERVER_ERROR
    };
    Resolution::new(status).with_message(failure.to_string())
}
