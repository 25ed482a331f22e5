use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::ProfileError;

// 1. ProfileClient Contract
/// ProfileClient
///
/// The profile-fetch collaborator. Returns the raw profile body so the
/// permissions store can pull `allowed_routes` out of it without the client
/// needing to know about grants. Swappable between the real HTTP client and
/// the in-memory mock used by tests.
#[async_trait]
pub trait ProfileClient: Send + Sync {
    /// Fetches the signed-in principal's profile using the session token.
    async fn fetch_profile(&self, token: &str) -> Result<Value, ProfileError>;
}

/// ProfileState
///
/// The concrete type used to share the profile client across the application state.
pub type ProfileState = Arc<dyn ProfileClient>;

// 2. The Real Implementation
/// HttpProfileClient
///
/// Calls the platform's REST API: `GET {base_url}{profile_path}` with a
/// bearer token.
#[derive(Clone)]
pub struct HttpProfileClient {
    client: reqwest::Client,
    url: String,
}

impl HttpProfileClient {
    pub fn new(base_url: &str, profile_path: &str, timeout: Duration) -> Result<Self, ProfileError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: format!("{}{}", base_url.trim_end_matches('/'), profile_path),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ProfileClient for HttpProfileClient {
    async fn fetch_profile(&self, token: &str) -> Result<Value, ProfileError> {
        let response = self
            .client
            .get(&self.url)
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProfileError::Status(status.as_u16()));
        }

        Ok(response.json::<Value>().await?)
    }
}

/// allowed_routes
///
/// Extracts the declared route list from a profile body. Looks at the top
/// level first, then inside a `data` envelope. A missing or non-array field
/// yields an empty list and non-string elements are skipped; neither is an
/// error.
pub fn allowed_routes(profile: &Value) -> Vec<&str> {
    let field = profile
        .get("allowed_routes")
        .or_else(|| profile.get("data").and_then(|d| d.get("allowed_routes")));

    match field.and_then(Value::as_array) {
        Some(items) => items.iter().filter_map(Value::as_str).collect(),
        None => Vec::new(),
    }
}

// 3. The Mock Implementation (For Tests)
/// MockProfileClient
///
/// Returns a canned profile (or a simulated failure) and counts calls, so
/// tests can assert when the network collaborator was or was not used.
#[derive(Debug, Clone)]
pub struct MockProfileClient {
    response: Option<Value>,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl MockProfileClient {
    /// Succeeds with the given body.
    pub fn new(response: Value) -> Self {
        Self {
            response: Some(response),
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Succeeds with `{ "allowed_routes": routes }`.
    pub fn with_routes(routes: &[&str]) -> Self {
        Self::new(serde_json::json!({ "allowed_routes": routes }))
    }

    /// Every call fails as if the endpoint returned a 500.
    pub fn new_failing() -> Self {
        Self {
            response: None,
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Holds every response for `delay` before returning it.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileClient for MockProfileClient {
    async fn fetch_profile(&self, _token: &str) -> Result<Value, ProfileError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.response.clone().ok_or(ProfileError::Status(500))
    }
}
