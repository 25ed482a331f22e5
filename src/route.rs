use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::error::RouteError;

// --- Canonical Console Paths ---

pub const DASHBOARD: &str = "/dashboard";
pub const PROFILE_SETTINGS: &str = "/profile-settings";
pub const PAGES: &str = "/pages";
pub const CONTENT_MANAGEMENT: &str = "/pages/content-management";
pub const LOGIN: &str = "/login";
pub const FORGOT_PASSWORD: &str = "/forgot-password";
pub const RESET_PASSWORD: &str = "/reset-password";

/// Ordered fallback destinations, highest priority first.
pub const DEFAULT_FALLBACK_PRIORITY: &[&str] = &[
    DASHBOARD,
    "/users",
    "/payments",
    "/contact",
    CONTENT_MANAGEMENT,
    PROFILE_SETTINGS,
    "/report",
    "/dogs",
    "/faqs",
    "/sub-admins",
    "/gifting",
    "/breeds",
    "/characters",
    "/hobbies",
    "/likes",
];

/// Every screen root the console declares. Grants outside these are unknown.
pub const CONSOLE_ROOTS: &[&str] = &[
    DASHBOARD,
    "/users",
    "/payments",
    "/contact",
    PAGES,
    PROFILE_SETTINGS,
    "/report",
    "/dogs",
    "/faqs",
    "/sub-admins",
    "/gifting",
    "/breeds",
    "/characters",
    "/hobbies",
    "/likes",
];

const PUBLIC_PAGES: &[&str] = &[LOGIN, FORGOT_PASSWORD, RESET_PASSWORD];

/// RoutePath
///
/// A normalized console path such as `/pages/content-management`.
///
/// Normalization drops the query string and fragment, collapses repeated
/// slashes and removes the trailing slash, so `/users/edit-user?id=42` and
/// `users//edit-user/` are the same path. Paths relate by **prefix
/// containment** (see [`RoutePath::contains`]).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(try_from = "String", into = "String")]
#[ts(export)]
pub struct RoutePath(String);

impl RoutePath {
    /// parse
    ///
    /// Normalizes a raw path. Only input with no path component at all
    /// (empty, whitespace, or a bare `?query`) is rejected.
    pub fn parse(raw: &str) -> Result<Self, RouteError> {
        let trimmed = raw.trim();
        let path_part = trimmed
            .split(['?', '#'])
            .next()
            .unwrap_or_default();

        if path_part.is_empty() {
            return Err(RouteError::Empty);
        }

        let segments: Vec<&str> = path_part.split('/').filter(|s| !s.is_empty()).collect();
        Ok(Self(format!("/{}", segments.join("/"))))
    }

    /// Builds a path from a compile-time constant that is already normalized.
    pub(crate) fn canonical(path: &'static str) -> Self {
        debug_assert!(path.starts_with('/') && (path == "/" || !path.ends_with('/')));
        Self(path.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// contains
    ///
    /// `a.contains(b)` iff `b == a` or `b` starts with `a + "/"`.
    /// Reflexive and transitive; `/users` does not contain `/users-archive`.
    pub fn contains(&self, other: &RoutePath) -> bool {
        match other.0.strip_prefix(self.0.as_str()) {
            Some("") => true,
            Some(rest) => rest.starts_with('/'),
            None => false,
        }
    }

    /// Either path contains the other.
    pub fn overlaps(&self, other: &RoutePath) -> bool {
        self.contains(other) || other.contains(self)
    }
}

impl fmt::Display for RoutePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RoutePath {
    type Error = RouteError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        RoutePath::parse(&value)
    }
}

impl From<RoutePath> for String {
    fn from(path: RoutePath) -> Self {
        path.0
    }
}

/// RouteClass
///
/// Every console route is either `Protected` (requires a session) or
/// `Public` (login and recovery pages, only shown to visitors without one).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum RouteClass {
    Protected,
    Public,
}

/// FallbackPriorityList
///
/// Fixed, ordered list of landing routes consulted by the fallback resolver.
/// Configuration data only; never derived from a principal's grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackPriorityList(Vec<RoutePath>);

impl Default for FallbackPriorityList {
    fn default() -> Self {
        Self(
            DEFAULT_FALLBACK_PRIORITY
                .iter()
                .map(|&p| RoutePath::canonical(p))
                .collect(),
        )
    }
}

impl FallbackPriorityList {
    pub fn new(entries: Vec<RoutePath>) -> Self {
        Self(entries)
    }

    /// from_csv
    ///
    /// Parses a comma-separated override (e.g. from `FALLBACK_PRIORITY`).
    /// Blank items are ignored and duplicates keep their first position.
    /// An override with no usable entries yields the default list.
    pub fn from_csv(raw: &str) -> Self {
        let mut entries: Vec<RoutePath> = Vec::new();
        for item in raw.split(',') {
            if let Ok(path) = RoutePath::parse(item) {
                if !entries.contains(&path) {
                    entries.push(path);
                }
            }
        }
        if entries.is_empty() {
            Self::default()
        } else {
            Self(entries)
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoutePath> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// RouteRegistry
///
/// The closed set of route roots the console declares. Server-provided grant
/// strings are validated against it at the parsing boundary, so anything the
/// console has no screen for is rejected there instead of silently missing
/// every prefix match later on.
#[derive(Debug, Clone)]
pub struct RouteRegistry {
    roots: Vec<RoutePath>,
    public: Vec<RoutePath>,
}

impl Default for RouteRegistry {
    fn default() -> Self {
        Self::for_console(&FallbackPriorityList::default())
    }
}

impl RouteRegistry {
    /// for_console
    ///
    /// Registers the fixed console roots. Entries of a configured priority
    /// list that no root covers are added as extra roots; an override never
    /// removes a root, so reordering fallbacks cannot revoke grants.
    pub fn for_console(priority: &FallbackPriorityList) -> Self {
        let mut roots: Vec<RoutePath> = CONSOLE_ROOTS
            .iter()
            .map(|&p| RoutePath::canonical(p))
            .collect();
        for entry in priority.iter() {
            if !roots.iter().any(|root| root.contains(entry)) {
                roots.push(entry.clone());
            }
        }
        let public = PUBLIC_PAGES.iter().map(|&p| RoutePath::canonical(p)).collect();
        Self { roots, public }
    }

    /// classify
    ///
    /// Login and recovery pages are `Public`; everything else, including
    /// paths the registry has never heard of, is `Protected`.
    pub fn classify(&self, path: &RoutePath) -> RouteClass {
        if self.public.iter().any(|p| p.contains(path)) {
            RouteClass::Public
        } else {
            RouteClass::Protected
        }
    }

    /// Normalizes a raw grant and accepts it only if a registered root covers it.
    pub fn recognize(&self, raw: &str) -> Option<RoutePath> {
        let path = RoutePath::parse(raw).ok()?;
        self.roots
            .iter()
            .any(|root| root.contains(&path))
            .then_some(path)
    }

    /// parse_grants
    ///
    /// Converts raw `allowed_routes` strings into a deduplicated grant set.
    /// Unknown or malformed entries are dropped with a warning.
    pub fn parse_grants<'a, I>(&self, raw: I) -> BTreeSet<RoutePath>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut grants = BTreeSet::new();
        for entry in raw {
            match self.recognize(entry) {
                Some(path) => {
                    grants.insert(path);
                }
                None => tracing::warn!(route = %entry, "ignoring unknown route in grant list"),
            }
        }
        grants
    }
}
