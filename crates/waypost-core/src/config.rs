//! Configuration module
//!
//! Reporter and server settings, loaded from the environment (and `.env`
//! through dotenvy). The verbosity knob is a shared handle injected into every
//! reporter so the embedding application can adjust it at runtime without a
//! process-wide global.

use std::env;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

// Common constants
const DEFAULT_VERBOSITY: i32 = 0;
const DEFAULT_SERVER_PORT: u16 = 3000;
const HTTP_CONCURRENCY_LIMIT: usize = 256;

/// Shared verbosity setting. Traces are disclosed to clients only while it is > 0.
///
/// Clones share the same underlying value.
#[derive(Clone, Debug, Default)]
pub struct Verbosity(Arc<AtomicI32>);

impl Verbosity {
    pub fn new(level: i32) -> Self {
        Self(Arc::new(AtomicI32::new(level)))
    }

    pub fn level(&self) -> i32 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set(&self, level: i32) {
        self.0.store(level, Ordering::Relaxed);
    }

    pub fn discloses_traces(&self) -> bool {
        self.level() > 0
    }
}

/// Settings read by the reporter on every call.
#[derive(Clone, Debug)]
pub struct ReporterConfig {
    pub verbosity: Verbosity,
    /// Capture (and log) stacks even when verbosity keeps them from the client.
    pub capture_when_quiet: bool,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            verbosity: Verbosity::new(DEFAULT_VERBOSITY),
            capture_when_quiet: true,
        }
    }
}

impl ReporterConfig {
    pub fn with_verbosity(level: i32) -> Self {
        Self {
            verbosity: Verbosity::new(level),
            ..Self::default()
        }
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let verbosity = match lookup("WAYPOST_VERBOSITY") {
            Some(raw) => raw.trim().parse::<i32>().map_err(|e| {
                anyhow::anyhow!("WAYPOST_VERBOSITY must be an integer, got {:?}: {}", raw, e)
            })?,
            None => DEFAULT_VERBOSITY,
        };

        let capture_when_quiet = parse_bool(&lookup, "WAYPOST_CAPTURE_WHEN_QUIET", true)?;

        Ok(Self {
            verbosity: Verbosity::new(verbosity),
            capture_when_quiet,
        })
    }
}

/// Demo server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub server_port: u16,
    pub environment: String,
    pub http_concurrency_limit: usize,
    pub allow_traces_in_production: bool,
    pub reporter: ReporterConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let server_port = match lookup("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|e| anyhow::anyhow!("PORT must be a valid port number: {}", e))?,
            None => DEFAULT_SERVER_PORT,
        };

        let http_concurrency_limit = match lookup("HTTP_CONCURRENCY_LIMIT") {
            Some(raw) => raw.parse().map_err(|e| {
                anyhow::anyhow!("HTTP_CONCURRENCY_LIMIT must be a positive integer: {}", e)
            })?,
            None => HTTP_CONCURRENCY_LIMIT,
        };

        Ok(Self {
            server_port,
            environment,
            http_concurrency_limit,
            allow_traces_in_production: parse_bool(
                &lookup,
                "WAYPOST_ALLOW_TRACES_IN_PRODUCTION",
                false,
            )?,
            reporter: ReporterConfig::from_lookup(&lookup)?,
        })
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.http_concurrency_limit == 0 {
            return Err(anyhow::anyhow!("HTTP_CONCURRENCY_LIMIT must be greater than 0"));
        }

        if self.is_production()
            && self.reporter.verbosity.discloses_traces()
            && !self.allow_traces_in_production
        {
            return Err(anyhow::anyhow!(
                "WAYPOST_VERBOSITY > 0 exposes stack traces to clients; set WAYPOST_ALLOW_TRACES_IN_PRODUCTION=true to allow it in production"
            ));
        }

        if !self.reporter.capture_when_quiet && self.reporter.verbosity.discloses_traces() {
            tracing::debug!("WAYPOST_CAPTURE_WHEN_QUIET has no effect while verbosity > 0");
        }

        Ok(())
    }
}

fn parse_bool<F>(lookup: &F, key: &str, default: bool) -> Result<bool, anyhow::Error>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(anyhow::anyhow!("{} must be a boolean, got {:?}", key, other)),
        },
        None => Ok(default),
    }
}
