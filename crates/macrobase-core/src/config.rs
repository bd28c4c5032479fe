//! Configuration for Macrobase services.
//!
//! Provides [`MacrobaseConfig`]. Values are loaded from environment variables
//! and fall back to defaults when unset or unparsable.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::error::{MacrobaseError, MacrobaseResult};
use crate::registry::ResolutionPolicy;

/// Macrobase service configuration.
///
/// # Examples
///
/// ```
/// use macrobase_core::{MacrobaseConfig, ResolutionPolicy};
///
/// let config = MacrobaseConfig::default();
/// assert_eq!(config.gateway_listen, "0.0.0.0:8000");
/// assert_eq!(config.resolution_policy, ResolutionPolicy::InsertionOrder);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct MacrobaseConfig {
    /// Bind address for the server (e.g. `"0.0.0.0:8000"`).
    #[builder(default = String::from("0.0.0.0:8000"))]
    pub gateway_listen: String,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,

    /// How the exception-handler registry picks among ancestor matches.
    #[builder(default)]
    pub resolution_policy: ResolutionPolicy,
}

impl Default for MacrobaseConfig {
    fn default() -> Self {
        Self {
            gateway_listen: String::from("0.0.0.0:8000"),
            log_level: String::from("info"),
            resolution_policy: ResolutionPolicy::default(),
        }
    }
}

impl MacrobaseConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `GATEWAY_LISTEN` | `0.0.0.0:8000` |
    /// | `LOG_LEVEL` | `info` |
    /// | `RESOLUTION_POLICY` | `insertion-order` |
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("GATEWAY_LISTEN") {
            config.gateway_listen = v;
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Ok(v) = std::env::var("RESOLUTION_POLICY") {
            match v.parse() {
                Ok(policy) => config.resolution_policy = policy,
                Err(err) => tracing::warn!(error = %err, "ignoring RESOLUTION_POLICY"),
            }
        }

        config
    }

    /// Parse [`gateway_listen`](Self::gateway_listen) as a socket address.
    pub fn listen_addr(&self) -> MacrobaseResult<SocketAddr> {
        self.gateway_listen.parse().map_err(|e| {
            MacrobaseError::Config(format!(
                "invalid GATEWAY_LISTEN {:?}: {e}",
                self.gateway_listen
            ))
        })
    }
}
