use thiserror::Error;

/// RouteError
///
/// Raised when a raw string cannot be turned into a `RoutePath`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("route path is empty")]
    Empty,
}

/// AuthError
///
/// Failures while turning a session token into a `Principal`.
/// These are authentication failures: they end (or prevent) a session.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("session token has expired")]
    Expired,
    #[error("session token is invalid: {0}")]
    InvalidToken(String),
    #[error("unknown role: {0}")]
    UnknownRole(String),
}

/// ProfileError
///
/// Failures of the profile-fetch collaborator. The permissions store logs
/// and swallows these; they degrade the snapshot to an empty grant set and
/// never end the session.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("profile request failed: {0}")]
    Transport(String),
    #[error("profile endpoint returned status {0}")]
    Status(u16),
    #[error("profile body could not be decoded: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ProfileError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProfileError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            ProfileError::Status(status.as_u16())
        } else {
            ProfileError::Transport(err.to_string())
        }
    }
}
