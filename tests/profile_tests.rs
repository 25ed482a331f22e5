use console_gate::{
    error::ProfileError,
    profile::{HttpProfileClient, MockProfileClient, ProfileClient, allowed_routes},
};
use serde_json::json;
use std::time::Duration;

#[cfg(test)]
mod extraction_tests {
    use super::*;

    #[test]
    fn test_reads_top_level_field() {
        let body = json!({ "id": 3, "allowed_routes": ["/users", "/dogs"] });
        assert_eq!(allowed_routes(&body), vec!["/users", "/dogs"]);
    }

    #[test]
    fn test_reads_data_envelope() {
        let body = json!({ "status": 200, "data": { "allowed_routes": ["/faqs"] } });
        assert_eq!(allowed_routes(&body), vec!["/faqs"]);
    }

    #[test]
    fn test_skips_non_string_entries() {
        let body = json!({ "allowed_routes": ["/users", 7, null, { "path": "/dogs" }, "/likes"] });
        assert_eq!(allowed_routes(&body), vec!["/users", "/likes"]);
    }

    #[test]
    fn test_missing_or_malformed_field_is_empty() {
        assert!(allowed_routes(&json!({})).is_empty());
        assert!(allowed_routes(&json!({ "allowed_routes": "/users" })).is_empty());
        assert!(allowed_routes(&json!({ "data": null })).is_empty());
        assert!(allowed_routes(&json!([])).is_empty());
    }
}

#[cfg(test)]
mod mock_tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_success_counts_calls() {
        let mock = MockProfileClient::with_routes(&["/users"]);

        let body = mock.fetch_profile("token").await.unwrap();
        mock.fetch_profile("token").await.unwrap();

        assert_eq!(allowed_routes(&body), vec!["/users"]);
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let mock = MockProfileClient::new_failing();
        let result = mock.fetch_profile("token").await;
        assert!(matches!(result, Err(ProfileError::Status(500))));
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_clones_share_the_counter() {
        let mock = MockProfileClient::with_routes(&[]);
        let clone = mock.clone();
        clone.fetch_profile("token").await.unwrap();
        assert_eq!(mock.call_count(), 1);
    }
}

#[cfg(test)]
mod http_tests {
    use super::*;
    use axum::{Json, Router, http::HeaderMap, http::StatusCode, routing::get};
    use tokio::net::TcpListener;

    /// Serves a fake profile endpoint that only answers the expected bearer token.
    async fn spawn_profile_api() -> String {
        async fn profile(headers: HeaderMap) -> Result<Json<serde_json::Value>, StatusCode> {
            let auth = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            if auth != "Bearer good-token" {
                return Err(StatusCode::UNAUTHORIZED);
            }
            Ok(Json(json!({ "data": { "allowed_routes": ["/payments"] } })))
        }

        let router = Router::new().route("/api/admin/profile", get(profile));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        format!("http://127.0.0.1:{}/api/", port)
    }

    #[test]
    fn test_client_joins_base_and_path() {
        let client = HttpProfileClient::new(
            "http://localhost:8080/api/",
            "/admin/profile",
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(client.url(), "http://localhost:8080/api/admin/profile");
    }

    #[tokio::test]
    async fn test_client_sends_bearer_token() {
        let base = spawn_profile_api().await;
        let client = HttpProfileClient::new(&base, "/admin/profile", Duration::from_secs(2)).unwrap();

        let body = client.fetch_profile("good-token").await.unwrap();

        assert_eq!(allowed_routes(&body), vec!["/payments"]);
    }

    #[tokio::test]
    async fn test_client_maps_error_status() {
        let base = spawn_profile_api().await;
        let client = HttpProfileClient::new(&base, "/admin/profile", Duration::from_secs(2)).unwrap();

        let result = client.fetch_profile("stale-token").await;

        assert!(matches!(result, Err(ProfileError::Status(401))));
    }

    #[tokio::test]
    async fn test_client_unreachable_is_transport_error() {
        // Port 9 (discard) is not expected to be listening locally.
        let client =
            HttpProfileClient::new("http://127.0.0.1:9", "/admin/profile", Duration::from_millis(500))
                .unwrap();

        let result = client.fetch_profile("good-token").await;

        assert!(matches!(result, Err(ProfileError::Transport(_))));
    }
}
