use serde::Serialize;

use crate::{
    models::{PermissionsSnapshot, Principal},
    route::{self, FallbackPriorityList, RoutePath},
};

/// Decision
///
/// Outcome of [`authorize`]. A denial is a value, not an error: gates turn
/// it into a redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }
}

/// authorize
///
/// Decides whether `principal` may open `path`. Rules are checked in order:
///
/// 1. Admins may open anything.
/// 2. `/profile-settings` and everything under it is open to every principal.
/// 3. The `/pages` content group is granted as a unit: any grant that
///    contains or falls under `/pages` opens every path under `/pages`.
/// 4. Any grant that contains `path` opens it.
/// 5. Everything else is denied.
///
/// Only the fetched snapshot counts here; grants embedded in the principal
/// record never widen access.
pub fn authorize(path: &RoutePath, principal: &Principal, snapshot: &PermissionsSnapshot) -> Decision {
    if principal.is_admin() {
        return Decision::Allow;
    }

    if RoutePath::canonical(route::PROFILE_SETTINGS).contains(path) {
        return Decision::Allow;
    }

    let pages = RoutePath::canonical(route::PAGES);
    if pages.contains(path) && snapshot.authorized_prefixes.iter().any(|p| p.overlaps(&pages)) {
        return Decision::Allow;
    }

    if snapshot.authorized_prefixes.iter().any(|p| p.contains(path)) {
        return Decision::Allow;
    }

    Decision::Deny
}

/// FallbackResolver
///
/// Picks where to send a principal whose request was denied. Total and
/// deterministic: the same principal and snapshot always map to one path.
#[derive(Debug, Clone, Default)]
pub struct FallbackResolver {
    priority: FallbackPriorityList,
}

impl FallbackResolver {
    pub fn new(priority: FallbackPriorityList) -> Self {
        Self { priority }
    }

    pub fn priority(&self) -> &FallbackPriorityList {
        &self.priority
    }

    /// resolve
    ///
    /// Admins land on `/dashboard`. Otherwise the candidates are the
    /// snapshot's grants merged with the principal's own grants. The priority
    /// list is walked in order and the first entry overlapping a candidate
    /// wins; the narrower of the two paths is returned, so the candidate's
    /// grant always covers it. With no priority match the first candidate
    /// is used, and with no candidates `/profile-settings`.
    ///
    /// A bare `/pages` result becomes `/pages/content-management`.
    pub fn resolve(&self, principal: &Principal, snapshot: &PermissionsSnapshot) -> RoutePath {
        if principal.is_admin() {
            return RoutePath::canonical(route::DASHBOARD);
        }

        let mut candidates: Vec<&RoutePath> = snapshot
            .authorized_prefixes
            .iter()
            .chain(principal.own_granted_prefixes.iter())
            .collect();
        candidates.sort();
        candidates.dedup();

        for entry in self.priority.iter() {
            if let Some(candidate) = candidates.iter().find(|c| entry.overlaps(c)) {
                let narrower = if entry.contains(candidate) { *candidate } else { entry };
                return landing(narrower);
            }
        }

        candidates
            .first()
            .map(|c| landing(c))
            .unwrap_or_else(|| RoutePath::canonical(route::PROFILE_SETTINGS))
    }
}

/// The `/pages` group has no screen of its own.
fn landing(path: &RoutePath) -> RoutePath {
    if path.as_str() == route::PAGES {
        RoutePath::canonical(route::CONTENT_MANAGEMENT)
    } else {
        path.clone()
    }
}
