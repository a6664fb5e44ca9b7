use std::{env, time::Duration};

use crate::error::ConfigError;

/// AppConfig
///
/// Holds the gateway's configuration. Immutable once loaded and shared with every
/// request through the application state.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Production refuses unverified tokens.
    pub env: Env,
    // Socket address the HTTP listener binds to.
    pub bind_addr: String,
    // Name of the cookie holding the access token.
    pub cookie_name: String,
    // Shared secret the token issuer signs with (HS256/384/512).
    pub jwt_secret: Option<String>,
    // PEM public key of an issuer that signs with RSA or EC. None for both means decode-only.
    pub jwt_public_key: Option<String>,
    // Base URL of the page layer that allowed requests are forwarded to.
    pub upstream_url: String,
    // Deadline for a single forwarded request.
    pub upstream_timeout: Duration,
}

/// Env
///
/// Defines the runtime context: relaxed local development or hardened production.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Env {
    Local,
    Production,
}

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_COOKIE_NAME: &str = "access_token";
pub const DEFAULT_UPSTREAM_URL: &str = "http://localhost:3001";
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;

impl Default for AppConfig {
    /// Non-panicking local configuration used for test state setup.
    fn default() -> Self {
        Self {
            env: Env::Local,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            jwt_secret: Some("super-secure-test-secret-value-local".to_string()),
            jwt_public_key: None,
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            upstream_timeout: Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables.
    ///
    /// Production demands a verification key (`AUTH_JWT_SECRET` or `AUTH_JWT_PUBLIC_KEY`)
    /// and `UPSTREAM_URL`; local development falls back to decode-only tokens and a page
    /// layer on `localhost:3001`.
    pub fn load() -> Result<Self, ConfigError> {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let jwt_secret = non_empty_var("AUTH_JWT_SECRET");
        // Single-line env files carry PEM newlines as literal `\n`.
        let jwt_public_key =
            non_empty_var("AUTH_JWT_PUBLIC_KEY").map(|pem| pem.replace("\\n", "\n"));
        let upstream_url = non_empty_var("UPSTREAM_URL");

        if jwt_secret.is_some() && jwt_public_key.is_some() {
            return Err(ConfigError::Invalid {
                name: "AUTH_JWT_PUBLIC_KEY",
                value: "<pem>".to_string(),
                reason: "set either AUTH_JWT_SECRET or AUTH_JWT_PUBLIC_KEY, not both".to_string(),
            });
        }

        let upstream_url = match env {
            Env::Production => {
                if jwt_secret.is_none() && jwt_public_key.is_none() {
                    return Err(ConfigError::MissingInProduction(
                        "AUTH_JWT_SECRET or AUTH_JWT_PUBLIC_KEY",
                    ));
                }
                upstream_url.ok_or(ConfigError::MissingInProduction("UPSTREAM_URL"))?
            }
            Env::Local => upstream_url.unwrap_or_else(|| DEFAULT_UPSTREAM_URL.to_string()),
        };

        if !upstream_url.starts_with("http://") && !upstream_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                name: "UPSTREAM_URL",
                value: upstream_url,
                reason: "must be an http:// or https:// URL".to_string(),
            });
        }

        let upstream_timeout = match non_empty_var("UPSTREAM_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "UPSTREAM_TIMEOUT_SECS",
                        value: raw,
                        reason: "must be a positive number of seconds".to_string(),
                    });
                }
            },
            None => Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS),
        };

        Ok(Self {
            env,
            bind_addr: non_empty_var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            cookie_name: non_empty_var("AUTH_COOKIE_NAME")
                .unwrap_or_else(|| DEFAULT_COOKIE_NAME.to_string()),
            jwt_secret,
            jwt_public_key,
            upstream_url: upstream_url.trim_end_matches('/').to_string(),
            upstream_timeout,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}
