#![allow(dead_code)]

use console_gate::{auth::Claims, route::RoutePath};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::time::SystemTime;
use uuid::Uuid;

/// Matches `AppConfig::default().jwt_secret`.
pub const TEST_JWT_SECRET: &str = "super-secure-test-secret-value-local";

pub fn path(raw: &str) -> RoutePath {
    RoutePath::parse(raw).unwrap()
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

/// Signs a session token expiring `exp_offset` seconds from now (negative for
/// an already expired token).
pub fn create_token(
    secret: &str,
    user_id: Uuid,
    role: &str,
    allowed_routes: Option<Vec<&str>>,
    exp_offset: i64,
) -> String {
    let now = now();
    let claims = Claims {
        sub: user_id,
        role: role.to_string(),
        allowed_routes: allowed_routes.map(|r| r.into_iter().map(String::from).collect()),
        iat: now as usize,
        exp: (now + exp_offset) as usize,
    };

    let key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

pub fn sub_admin_token(user_id: Uuid) -> String {
    create_token(TEST_JWT_SECRET, user_id, "sub_admin", None, 3600)
}

pub fn admin_token(user_id: Uuid) -> String {
    create_token(TEST_JWT_SECRET, user_id, "admin", None, 3600)
}
