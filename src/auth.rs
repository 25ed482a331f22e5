use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::AuthError,
    models::{Principal, Role},
    route::RouteRegistry,
    session::SessionState,
};

/// Claims
///
/// Payload carried by the session token the login flow hands to the console.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the principal's id.
    pub sub: Uuid,
    /// `admin` or `sub_admin`.
    pub role: String,
    /// Grants embedded in the principal record, if the platform includes them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_routes: Option<Vec<String>>,
    /// Expiration Time (exp): seconds since the epoch.
    pub exp: usize,
    /// Issued At (iat): seconds since the epoch.
    pub iat: usize,
}

/// VerifiedSession
///
/// A validated token turned into the principal record plus its expiry.
#[derive(Debug, Clone)]
pub struct VerifiedSession {
    pub principal: Principal,
    pub expires_at: Option<DateTime<Utc>>,
}

/// verify_session_token
///
/// Checks signature and expiry with the configured secret and builds the
/// `Principal`. Embedded `allowed_routes` go through the same registry
/// validation as fetched grants.
pub fn verify_session_token(
    token: &str,
    secret: &str,
    registry: &RouteRegistry,
) -> Result<VerifiedSession, AuthError> {
    // 1. Decoding key and validation rules (HS256, expiry enforced).
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::default();
    validation.validate_exp = true;

    // 2. Signature and expiry check.
    let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        _ => AuthError::InvalidToken(e.to_string()),
    })?;
    let claims = token_data.claims;

    // 3. Role. Anything but admin / sub_admin is refused outright.
    let role = Role::parse(&claims.role).ok_or_else(|| AuthError::UnknownRole(claims.role.clone()))?;

    // 4. Embedded grants, validated like fetched ones.
    let grants = claims
        .allowed_routes
        .as_deref()
        .map(|routes| registry.parse_grants(routes.iter().map(String::as_str)))
        .unwrap_or_default();

    // 5. Expiry, so the session store can drop the session on its own.
    let expires_at = i64::try_from(claims.exp)
        .ok()
        .and_then(|exp| DateTime::<Utc>::from_timestamp(exp, 0));

    Ok(VerifiedSession {
        principal: Principal::new(claims.sub, role).with_grants(grants),
        expires_at,
    })
}

/// ActivePrincipal
///
/// Extractor for endpoints that need a signed-in principal. Resolves it from
/// the shared session store; rejects with 401 when there is no live session.
#[derive(Debug, Clone)]
pub struct ActivePrincipal(pub Principal);

impl<S> FromRequestParts<S> for ActivePrincipal
where
    S: Send + Sync,
    SessionState: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(_parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = SessionState::from_ref(state);
        session
            .principal()
            .map(ActivePrincipal)
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}
