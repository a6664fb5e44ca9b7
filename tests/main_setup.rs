use marketplace_gate::{AppConfig, AppState, MockUpstream, config::Env, error::ConfigError};
use serial_test::serial;
use std::{env, panic, sync::Arc, time::Duration};

const RSA_PUBLIC_PEM: &str = include_str!("fixtures/rsa_public.pem");

// --- Setup/Teardown Utilities ---

const CONFIG_VARS: [&str; 7] = [
    "APP_ENV",
    "BIND_ADDR",
    "AUTH_COOKIE_NAME",
    "AUTH_JWT_SECRET",
    "AUTH_JWT_PUBLIC_KEY",
    "UPSTREAM_URL",
    "UPSTREAM_TIMEOUT_SECS",
];

/// Runs `test` with exactly the given variables set (all other config variables cleared)
/// and restores the previous environment afterwards.
fn run_with_env<T, R>(vars: &[(&'static str, &'static str)], test: T) -> R
where
    T: FnOnce() -> R + panic::UnwindSafe,
{
    // Save current environment variables
    let originals: Vec<(&str, Option<String>)> = CONFIG_VARS
        .iter()
        .map(|&var| (var, env::var(var).ok()))
        .collect();

    unsafe {
        for var in CONFIG_VARS {
            env::remove_var(var);
        }
        for (key, value) in vars {
            env::set_var(key, value);
        }
    }

    let result = panic::catch_unwind(test);

    // Restore original environment variables
    for (key, original_value) in originals {
        unsafe {
            match original_value {
                Some(val) => env::set_var(key, val),
                None => env::remove_var(key),
            }
        }
    }

    match result {
        Ok(value) => value,
        Err(e) => panic::resume_unwind(e),
    }
}

// --- Tests ---

#[test]
#[serial]
fn test_local_env_defaults() {
    let config = run_with_env(&[], AppConfig::load).unwrap();

    assert_eq!(config.env, Env::Local);
    assert_eq!(config.bind_addr, "0.0.0.0:3000");
    assert_eq!(config.cookie_name, "access_token");
    assert_eq!(config.jwt_secret, None);
    assert_eq!(config.jwt_public_key, None);
    assert_eq!(config.upstream_url, "http://localhost:3001");
    assert_eq!(config.upstream_timeout, Duration::from_secs(30));
}

#[test]
#[serial]
fn test_production_requires_a_verification_key() {
    let result = run_with_env(
        &[
            ("APP_ENV", "production"),
            ("UPSTREAM_URL", "http://pages.internal:3001"),
        ],
        AppConfig::load,
    );

    assert!(matches!(
        result,
        Err(ConfigError::MissingInProduction(
            "AUTH_JWT_SECRET or AUTH_JWT_PUBLIC_KEY"
        ))
    ));
}

#[test]
#[serial]
fn test_production_requires_upstream_url() {
    let result = run_with_env(
        &[("APP_ENV", "production"), ("AUTH_JWT_SECRET", "prod-secret")],
        AppConfig::load,
    );

    assert!(matches!(
        result,
        Err(ConfigError::MissingInProduction("UPSTREAM_URL"))
    ));
}

#[test]
#[serial]
fn test_blank_secret_counts_as_missing() {
    let result = run_with_env(
        &[
            ("APP_ENV", "production"),
            ("AUTH_JWT_SECRET", "   "),
            ("UPSTREAM_URL", "http://pages.internal:3001"),
        ],
        AppConfig::load,
    );

    assert!(result.is_err());
}

#[test]
#[serial]
fn test_production_config_loads_overrides() {
    let config = run_with_env(
        &[
            ("APP_ENV", "production"),
            ("AUTH_JWT_SECRET", "prod-secret"),
            ("UPSTREAM_URL", "https://pages.internal/"),
            ("BIND_ADDR", "127.0.0.1:8080"),
            ("AUTH_COOKIE_NAME", "mp_session"),
            ("UPSTREAM_TIMEOUT_SECS", "5"),
        ],
        AppConfig::load,
    )
    .unwrap();

    assert_eq!(config.env, Env::Production);
    assert_eq!(config.jwt_secret.as_deref(), Some("prod-secret"));
    assert_eq!(config.upstream_url, "https://pages.internal");
    assert_eq!(config.bind_addr, "127.0.0.1:8080");
    assert_eq!(config.cookie_name, "mp_session");
    assert_eq!(config.upstream_timeout, Duration::from_secs(5));
}

#[test]
#[serial]
fn test_invalid_timeout_is_rejected() {
    for raw in ["0", "soon", "-3"] {
        let result = run_with_env(&[("UPSTREAM_TIMEOUT_SECS", raw)], AppConfig::load);
        assert!(
            matches!(
                result,
                Err(ConfigError::Invalid {
                    name: "UPSTREAM_TIMEOUT_SECS",
                    ..
                })
            ),
            "{raw}"
        );
    }
}

#[test]
#[serial]
fn test_non_http_upstream_is_rejected() {
    let result = run_with_env(&[("UPSTREAM_URL", "pages.internal:3001")], AppConfig::load);

    assert!(matches!(
        result,
        Err(ConfigError::Invalid {
            name: "UPSTREAM_URL",
            ..
        })
    ));
}

#[test]
#[serial]
fn test_production_accepts_public_key_instead_of_secret() {
    let config = run_with_env(
        &[
            ("APP_ENV", "production"),
            ("AUTH_JWT_PUBLIC_KEY", RSA_PUBLIC_PEM),
            ("UPSTREAM_URL", "http://pages.internal:3001"),
        ],
        AppConfig::load,
    )
    .unwrap();

    assert_eq!(config.jwt_secret, None);
    let state = AppState::new(config, Arc::new(MockUpstream::new())).unwrap();
    assert!(state.validator.verifies_signatures());
}

#[test]
#[serial]
fn test_escaped_newlines_in_public_key_are_restored() {
    let escaped: &'static str = RSA_PUBLIC_PEM.trim_end().replace('\n', "\\n").leak();

    let config = run_with_env(&[("AUTH_JWT_PUBLIC_KEY", escaped)], AppConfig::load).unwrap();

    assert_eq!(config.jwt_public_key.as_deref(), Some(RSA_PUBLIC_PEM.trim_end()));
    assert!(AppState::new(config, Arc::new(MockUpstream::new())).is_ok());
}

#[test]
#[serial]
fn test_secret_and_public_key_together_are_rejected() {
    let result = run_with_env(
        &[
            ("AUTH_JWT_SECRET", "local-secret"),
            ("AUTH_JWT_PUBLIC_KEY", RSA_PUBLIC_PEM),
        ],
        AppConfig::load,
    );

    assert!(matches!(
        result,
        Err(ConfigError::Invalid {
            name: "AUTH_JWT_PUBLIC_KEY",
            ..
        })
    ));
}

#[test]
fn test_unparseable_public_key_fails_state_setup() {
    let mut config = AppConfig::default();
    config.jwt_secret = None;
    config.jwt_public_key =
        Some("-----BEGIN PUBLIC KEY-----\nnope\n-----END PUBLIC KEY-----".to_string());

    let result = AppState::new(config, Arc::new(MockUpstream::new()));

    assert!(matches!(
        result,
        Err(ConfigError::Invalid {
            name: "AUTH_JWT_PUBLIC_KEY",
            ..
        })
    ));
}

#[test]
fn test_default_config_is_safe_for_tests() {
    let config = AppConfig::default();

    assert_eq!(config.env, Env::Local);
    assert!(config.jwt_secret.is_some());
}
