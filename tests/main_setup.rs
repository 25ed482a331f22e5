use console_gate::{AppConfig, config::Env};
use serial_test::serial;
use std::{env, panic, time::Duration};

const CONFIG_VARS: &[&str] = &[
    "APP_ENV",
    "SESSION_JWT_SECRET",
    "API_BASE_URL",
    "LOGIN_PATH",
    "FALLBACK_PRIORITY",
    "BIND_ADDR",
    "PROFILE_PATH",
    "PROFILE_TIMEOUT_MS",
    "PERMISSIONS_WAIT_MS",
];

// --- Setup/Teardown Utilities ---

/// Utility to run a test function and restore environment variables afterward
fn run_with_env<T, R>(test: T) -> R
where
    T: FnOnce() -> R + panic::UnwindSafe,
{
    // Save current environment variables, then start from a clean slate
    let originals: Vec<(&str, Option<String>)> = CONFIG_VARS
        .iter()
        .map(|&var| (var, env::var(var).ok()))
        .collect();
    unsafe {
        for var in CONFIG_VARS {
            env::remove_var(var);
        }
    }

    // Run the test
    let result = panic::catch_unwind(test);

    // Restore original environment variables
    for (key, original_value) in originals.into_iter().rev() {
        unsafe {
            if let Some(val) = original_value {
                env::set_var(key, val);
            } else {
                env::remove_var(key);
            }
        }
    }

    // Re-panic if the test failed
    match result {
        Ok(value) => value,
        Err(e) => panic::resume_unwind(e),
    }
}

// --- Tests ---

#[test]
#[serial]
fn test_app_config_production_fail_fast() {
    // SESSION_JWT_SECRET is missing
    let result = panic::catch_unwind(|| {
        run_with_env(|| {
            unsafe {
                env::set_var("APP_ENV", "production");
                env::set_var("API_BASE_URL", "https://api.example.com");
            }
            AppConfig::load()
        })
    });
    assert!(
        result.is_err(),
        "Production config loading should panic on a missing session secret"
    );

    // API_BASE_URL is missing
    let result = panic::catch_unwind(|| {
        run_with_env(|| {
            unsafe {
                env::set_var("APP_ENV", "production");
                env::set_var("SESSION_JWT_SECRET", "prod-secret");
            }
            AppConfig::load()
        })
    });
    assert!(
        result.is_err(),
        "Production config loading should panic on a missing API base URL"
    );
}

#[test]
#[serial]
fn test_app_config_production_with_secrets() {
    let config = run_with_env(|| {
        unsafe {
            env::set_var("APP_ENV", "production");
            env::set_var("SESSION_JWT_SECRET", "prod-secret");
            env::set_var("API_BASE_URL", "https://api.example.com");
        }
        AppConfig::load()
    });

    assert_eq!(config.env, Env::Production);
    assert_eq!(config.jwt_secret, "prod-secret");
    assert_eq!(config.api_base_url, "https://api.example.com");
}

#[test]
#[serial]
fn test_app_config_local_env_defaults() {
    // Local mode should not panic, and should use hardcoded defaults
    let config = run_with_env(|| {
        unsafe {
            env::set_var("APP_ENV", "local");
        }
        AppConfig::load()
    });

    assert_eq!(config.env, Env::Local);
    assert_eq!(config.jwt_secret, "super-secure-test-secret-value-local");
    assert_eq!(config.api_base_url, "http://localhost:8080/api");
    assert_eq!(config.profile_path, "/admin/profile");
    assert_eq!(config.login_path.as_str(), "/login");
    assert_eq!(config.fallback_priority.len(), 15);
    assert_eq!(config.permissions_wait, Duration::from_secs(5));
}

#[test]
#[serial]
fn test_app_config_overrides() {
    let config = run_with_env(|| {
        unsafe {
            env::set_var("FALLBACK_PRIORITY", "/faqs,/users");
            env::set_var("LOGIN_PATH", "/sign-in");
            env::set_var("PROFILE_TIMEOUT_MS", "2500");
            env::set_var("PERMISSIONS_WAIT_MS", " 750 ");
        }
        AppConfig::load()
    });

    let priority: Vec<&str> = config.fallback_priority.iter().map(|p| p.as_str()).collect();
    assert_eq!(priority, vec!["/faqs", "/users"]);
    assert_eq!(config.login_path.as_str(), "/sign-in");
    assert_eq!(config.profile_timeout, Duration::from_millis(2500));
    assert_eq!(config.permissions_wait, Duration::from_millis(750));
}

#[test]
#[serial]
fn test_app_config_malformed_timeout_panics() {
    let result = panic::catch_unwind(|| {
        run_with_env(|| {
            unsafe {
                env::set_var("PROFILE_TIMEOUT_MS", "ten seconds");
            }
            AppConfig::load()
        })
    });

    assert!(result.is_err(), "A malformed timeout should be fatal");
}
