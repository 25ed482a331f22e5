use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::route::RoutePath;

// --- Identity ---

/// Role
///
/// The two principal kinds the console knows. `Admin` bypasses route grants
/// entirely; `SubAdmin` only reaches what the server grants it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Role {
    Admin,
    #[serde(alias = "subadmin", alias = "sub-admin")]
    SubAdmin,
}

impl Role {
    /// Parses the role names the platform's tokens use.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "sub_admin" | "subadmin" | "sub-admin" => Some(Role::SubAdmin),
            _ => None,
        }
    }
}

/// Principal
///
/// The signed-in actor. Created when a session is established and dropped on
/// logout or token expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
    /// Grants embedded in the principal record itself (the token's
    /// `allowed_routes` claim). Only consulted when picking a fallback.
    #[serde(rename = "allowed_routes", default)]
    #[schema(value_type = Vec<String>)]
    pub own_granted_prefixes: BTreeSet<RoutePath>,
}

impl Principal {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self {
            id,
            role,
            own_granted_prefixes: BTreeSet::new(),
        }
    }

    pub fn with_grants(mut self, grants: impl IntoIterator<Item = RoutePath>) -> Self {
        self.own_granted_prefixes.extend(grants);
        self
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

// --- Permissions ---

/// PermissionsSnapshot
///
/// The cached, immutable view of the principal's authorized route prefixes.
/// Replaced as a whole on every commit, never mutated in place.
///
/// While `is_loading` is true an empty `authorized_prefixes` means "not known
/// yet", not "nothing granted".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PermissionsSnapshot {
    #[schema(value_type = Vec<String>)]
    pub authorized_prefixes: BTreeSet<RoutePath>,
    pub is_loading: bool,
    #[ts(type = "string | null")]
    pub loaded_at: Option<DateTime<Utc>>,
}

impl PermissionsSnapshot {
    /// The settled, grant-less state used with no session or after a failed fetch.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A settled snapshot carrying the given grants.
    pub fn ready(authorized_prefixes: BTreeSet<RoutePath>) -> Self {
        Self {
            authorized_prefixes,
            is_loading: false,
            loaded_at: Some(Utc::now()),
        }
    }

    /// Same grants, flagged as being reloaded.
    pub fn reloading(&self) -> Self {
        Self {
            is_loading: true,
            ..self.clone()
        }
    }
}

// --- Navigation ---

/// Navigation
///
/// One navigation attempt: the requested path plus the path the router
/// remembered when it last sent the visitor to a public page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Navigation {
    pub path: RoutePath,
    #[serde(default)]
    pub from: Option<RoutePath>,
}

impl Navigation {
    pub fn to(path: RoutePath) -> Self {
        Self { path, from: None }
    }

    pub fn with_from(mut self, from: RoutePath) -> Self {
        self.from = Some(from);
        self
    }
}

/// NoticeKind
///
/// Distinguishes the two reasons a visitor gets redirected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum NoticeKind {
    InsufficientPermission,
    NotLoggedIn,
}

/// Notice
///
/// Human-readable explanation shown alongside a redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub message: String,
    pub destination: RoutePath,
}

impl Notice {
    pub fn insufficient_permission(requested: &RoutePath, destination: RoutePath) -> Self {
        Self {
            kind: NoticeKind::InsufficientPermission,
            title: "Access restricted".to_string(),
            message: format!(
                "You do not have permission to open {requested}. You have been redirected to {destination}."
            ),
            destination,
        }
    }

    pub fn not_logged_in(destination: RoutePath) -> Self {
        Self {
            kind: NoticeKind::NotLoggedIn,
            title: "Sign in required".to_string(),
            message: "Your session has ended or you are not logged in. Please sign in to continue."
                .to_string(),
            destination,
        }
    }
}

/// GateDecision
///
/// What the console should do with a navigation attempt. `Pending` means the
/// gate is still waiting on session or permissions data and must render
/// neither the page nor a redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
#[ts(export)]
pub enum GateDecision {
    Pending,
    Render,
    Redirect {
        to: RoutePath,
        /// Carried router state: the path originally requested.
        from: Option<RoutePath>,
        notice: Option<Notice>,
    },
}

impl GateDecision {
    pub fn redirect_target(&self) -> Option<&RoutePath> {
        match self {
            GateDecision::Redirect { to, .. } => Some(to),
            _ => None,
        }
    }
}

// --- Request Payloads ---

/// CreateSessionRequest
///
/// Input payload for `POST /session`, sent once the login flow has produced
/// a session token.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateSessionRequest {
    pub token: String,
}

/// NavigateQuery
///
/// Query parameters for `GET /navigate`. Raw strings; normalized by the handler.
#[derive(Debug, Clone, Deserialize, utoipa::IntoParams)]
pub struct NavigateQuery {
    /// The requested console path, e.g. `/users/edit-user?id=42`.
    pub path: String,
    /// Path remembered by the router before an earlier login redirect.
    pub from: Option<String>,
}
