use std::{env, path::PathBuf};

/// AppConfig
///
/// Holds the service configuration. Loaded once at startup and cloned into the
/// application state; never mutated afterwards.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls the local identity bypass and log format.
    pub env: Env,
    // Secret used to validate incoming JWTs.
    pub jwt_secret: String,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
    // When set, resolved roles are persisted to this JSON file instead of memory.
    pub session_file: Option<PathBuf>,
    // When set, this JSON permission table replaces the built-in one at startup.
    pub permissions_file: Option<PathBuf>,
}

/// Env
///
/// Runtime context. `Local` enables the header-based identity bypass and pretty logs.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const LOCAL_JWT_SECRET: &str = "super-secure-test-secret-value-local";

impl Default for AppConfig {
    /// Non-panicking configuration for tests: local env, in-memory sessions, built-in
    /// permission table.
    fn default() -> Self {
        Self {
            env: Env::Local,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            session_file: None,
            permissions_file: None,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables.
    ///
    /// # Panics
    /// Panics in production when `JWT_SECRET` is not set, so the service never starts
    /// validating tokens against a known default secret.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let jwt_secret = match env {
            Env::Production => {
                env::var("JWT_SECRET").expect("FATAL: JWT_SECRET must be set in production.")
            }
            Env::Local => env::var("JWT_SECRET").unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
        };

        Self {
            env,
            jwt_secret,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            session_file: optional_path("SESSION_FILE"),
            permissions_file: optional_path("PERMISSIONS_FILE"),
        }
    }
}

fn optional_path(key: &str) -> Option<PathBuf> {
    env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
}
