// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deployment configuration
//!
//! Both configurations have sensible defaults, `with_*` builders and a
//! `from_env()` constructor. Unset or unparsable variables fall back to the
//! defaults.
//!
//! | Variable | Default |
//! |---|---|
//! | `DEPLOYMENT_ENABLED_PROVIDERS` | `kubernetes,radius` |
//! | `DEPLOYMENT_HANDLER_TIMEOUT_SECS` | `300` (`0` disables) |
//! | `DEPLOYMENT_RECIPE_TIMEOUT_SECS` | `1800` (`0` disables) |
//! | `NATS_URL` | `nats://localhost:4222` (comma separated) |
//! | `DEPLOYMENT_KV_BUCKET` | `deployment-resources` |

use std::time::Duration;

use tracing::warn;

use crate::domain::EnabledProviders;

const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_secs(5 * 60);
const DEFAULT_RECIPE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Configuration for the deployment processor
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessorConfig {
    /// Providers output resources may target
    pub enabled_providers: EnabledProviders,
    /// Budget for one resource handler call
    pub handler_timeout: Option<Duration>,
    /// Budget for one recipe handler call
    pub recipe_timeout: Option<Duration>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            enabled_providers: EnabledProviders::default(),
            handler_timeout: Some(DEFAULT_HANDLER_TIMEOUT),
            recipe_timeout: Some(DEFAULT_RECIPE_TIMEOUT),
        }
    }
}

impl ProcessorConfig {
    pub fn new(enabled_providers: EnabledProviders) -> Self {
        Self {
            enabled_providers,
            ..Default::default()
        }
    }

    pub fn with_enabled_providers(mut self, enabled_providers: EnabledProviders) -> Self {
        self.enabled_providers = enabled_providers;
        self
    }

    pub fn with_handler_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.handler_timeout = timeout;
        self
    }

    pub fn with_recipe_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.recipe_timeout = timeout;
        self
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let enabled_providers = match std::env::var("DEPLOYMENT_ENABLED_PROVIDERS") {
            Ok(list) => EnabledProviders::parse_list(&list).unwrap_or_else(|err| {
                warn!(error = %err, "Ignoring DEPLOYMENT_ENABLED_PROVIDERS");
                defaults.enabled_providers.clone()
            }),
            Err(_) => defaults.enabled_providers.clone(),
        };

        Self {
            enabled_providers,
            handler_timeout: timeout_from_env("DEPLOYMENT_HANDLER_TIMEOUT_SECS", defaults.handler_timeout),
            recipe_timeout: timeout_from_env("DEPLOYMENT_RECIPE_TIMEOUT_SECS", defaults.recipe_timeout),
        }
    }
}

fn timeout_from_env(var: &str, default: Option<Duration>) -> Option<Duration> {
    match std::env::var(var).ok().map(|raw| raw.trim().parse::<u64>()) {
        Some(Ok(0)) => None,
        Some(Ok(secs)) => Some(Duration::from_secs(secs)),
        Some(Err(_)) => {
            warn!(variable = var, "Ignoring unparsable timeout");
            default
        }
        None => default,
    }
}

/// Configuration for the NATS key/value record store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NatsStoreConfig {
    /// NATS server URLs
    pub servers: Vec<String>,
    /// KV bucket holding resource records
    pub bucket: String,
    /// Revisions kept per key
    pub history: i64,
    /// Connection timeout
    pub connect_timeout: Duration,
}

impl Default for NatsStoreConfig {
    fn default() -> Self {
        Self {
            servers: vec!["nats://localhost:4222".to_string()],
            bucket: "deployment-resources".to_string(),
            history: 5,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl NatsStoreConfig {
    pub fn with_servers(mut self, servers: Vec<String>) -> Self {
        self.servers = servers;
        self
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let servers = std::env::var("NATS_URL")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect::<Vec<_>>()
            })
            .ok()
            .filter(|servers| !servers.is_empty())
            .unwrap_or(defaults.servers);

        let bucket = std::env::var("DEPLOYMENT_KV_BUCKET").unwrap_or(defaults.bucket);

        Self {
            servers,
            bucket,
            ..defaults
        }
    }
}
