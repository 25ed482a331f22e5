use std::env;
use std::time::Duration;

use crate::route::{self, FallbackPriorityList, RoutePath};

/// AppConfig
///
/// Holds the console gate's entire configuration. Immutable once loaded and
/// pulled into handlers via `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Selects log format and secret strictness.
    pub env: Env,
    // Socket address the HTTP service binds to.
    pub bind_addr: String,
    // Base URL of the platform's REST API (profile endpoint lives under it).
    pub api_base_url: String,
    // Path of the profile endpoint that returns `allowed_routes`.
    pub profile_path: String,
    // Secret used to validate session tokens.
    pub jwt_secret: String,
    // Where unauthenticated visitors are sent.
    pub login_path: RoutePath,
    // Ordered fallback destinations.
    pub fallback_priority: FallbackPriorityList,
    // Timeout for a single profile fetch.
    pub profile_timeout: Duration,
    // How long a navigation waits for permissions before reporting `pending`.
    pub permissions_wait: Duration,
}

/// Env
///
/// Defines the runtime context: local development (pretty logs, fallback
/// secrets) or production (JSON logs, every secret required).
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

const LOCAL_JWT_SECRET: &str = "super-secure-test-secret-value-local";
const DEFAULT_PROFILE_PATH: &str = "/admin/profile";

impl Default for AppConfig {
    /// default
    ///
    /// Safe, non-panicking values for tests; no environment variables read.
    fn default() -> Self {
        Self {
            env: Env::Local,
            bind_addr: "127.0.0.1:3000".to_string(),
            api_base_url: "http://localhost:8080/api".to_string(),
            profile_path: DEFAULT_PROFILE_PATH.to_string(),
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            login_path: RoutePath::canonical(route::LOGIN),
            fallback_priority: FallbackPriorityList::default(),
            profile_timeout: Duration::from_secs(10),
            permissions_wait: Duration::from_secs(5),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables (call
    /// `dotenv::dotenv()` first to pick up a `.env` file).
    ///
    /// # Panics
    /// Panics in production if `SESSION_JWT_SECRET` or `API_BASE_URL` is
    /// missing, and in any environment if `PROFILE_TIMEOUT_MS` or
    /// `PERMISSIONS_WAIT_MS` is set but not a number.
    pub fn load() -> Self {
        // 1. Determine Environment
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let defaults = Self::default();

        // 2. Secrets: mandatory in production, local fallbacks otherwise.
        let (jwt_secret, api_base_url) = match env {
            Env::Production => (
                env::var("SESSION_JWT_SECRET")
                    .expect("FATAL: SESSION_JWT_SECRET must be set in production."),
                env::var("API_BASE_URL").expect("FATAL: API_BASE_URL must be set in production."),
            ),
            Env::Local => (
                env::var("SESSION_JWT_SECRET").unwrap_or(defaults.jwt_secret),
                env::var("API_BASE_URL").unwrap_or(defaults.api_base_url),
            ),
        };

        // 3. Optional routing overrides. An unparsable login path keeps the default.
        let login_path = env::var("LOGIN_PATH")
            .ok()
            .and_then(|raw| RoutePath::parse(&raw).ok())
            .unwrap_or(defaults.login_path);

        let fallback_priority = env::var("FALLBACK_PRIORITY")
            .map(|raw| FallbackPriorityList::from_csv(&raw))
            .unwrap_or(defaults.fallback_priority);

        // 4. Assemble, timeouts last (malformed values are fatal).
        Self {
            env,
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            api_base_url,
            profile_path: env::var("PROFILE_PATH").unwrap_or(defaults.profile_path),
            jwt_secret,
            login_path,
            fallback_priority,
            profile_timeout: duration_ms("PROFILE_TIMEOUT_MS").unwrap_or(defaults.profile_timeout),
            permissions_wait: duration_ms("PERMISSIONS_WAIT_MS").unwrap_or(defaults.permissions_wait),
        }
    }
}

/// Reads a millisecond duration. Unset is `None`; a malformed value is fatal.
fn duration_ms(var: &str) -> Option<Duration> {
    let raw = env::var(var).ok()?;
    let millis: u64 = raw
        .trim()
        .parse()
        .unwrap_or_else(|_| panic!("FATAL: {var} must be a whole number of milliseconds, got {raw:?}"));
    Some(Duration::from_millis(millis))
}
