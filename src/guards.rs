use std::sync::Arc;
use std::time::Duration;

use crate::{
    models::{GateDecision, Navigation, Notice, PermissionsSnapshot, Principal},
    notice::NotifierState,
    permissions::PermissionsStore,
    policy::{FallbackResolver, authorize},
    route::{self, RouteClass, RoutePath, RouteRegistry},
    session::SessionState,
};

/// GateState
///
/// `Unknown` until the session has been checked. An authenticated principal
/// then sits in `PermissionsLoading` until the store settles; only
/// `PermissionsReady` allows an authorization decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    Unknown,
    Unauthenticated,
    PermissionsLoading(Principal),
    PermissionsReady(Principal, PermissionsSnapshot),
}

/// Gatekeeper
///
/// Everything a gate consults on a navigation attempt. Cheap to clone; each
/// navigation builds a fresh gate from it.
#[derive(Clone)]
pub struct Gatekeeper {
    session: SessionState,
    permissions: Arc<PermissionsStore>,
    resolver: Arc<FallbackResolver>,
    registry: Arc<RouteRegistry>,
    notifier: NotifierState,
    login_path: RoutePath,
    permissions_wait: Duration,
}

impl Gatekeeper {
    pub fn new(
        session: SessionState,
        permissions: Arc<PermissionsStore>,
        resolver: FallbackResolver,
        registry: RouteRegistry,
        notifier: NotifierState,
    ) -> Self {
        Self {
            session,
            permissions,
            resolver: Arc::new(resolver),
            registry: Arc::new(registry),
            notifier,
            login_path: RoutePath::canonical(route::LOGIN),
            permissions_wait: Duration::from_secs(5),
        }
    }

    pub fn with_login_path(mut self, login_path: RoutePath) -> Self {
        self.login_path = login_path;
        self
    }

    /// Upper bound on how long `settle` waits for permissions.
    pub fn with_permissions_wait(mut self, wait: Duration) -> Self {
        self.permissions_wait = wait;
        self
    }

    pub fn registry(&self) -> &RouteRegistry {
        &self.registry
    }

    pub fn protected(&self) -> ProtectedGate<'_> {
        ProtectedGate {
            keeper: self,
            state: GateState::Unknown,
        }
    }

    pub fn public(&self) -> PublicGate<'_> {
        PublicGate {
            keeper: self,
            state: GateState::Unknown,
        }
    }

    /// navigate
    ///
    /// Runs the gate matching the requested path's route class and waits for
    /// it to settle.
    pub async fn navigate(&self, navigation: &Navigation) -> GateDecision {
        match self.registry.classify(&navigation.path) {
            RouteClass::Protected => self.protected().settle(navigation).await,
            RouteClass::Public => self.public().settle(navigation).await,
        }
    }

    fn observe(&self) -> GateState {
        let principal = match (self.session.token(), self.session.principal()) {
            (Some(_), Some(principal)) => principal,
            _ => return GateState::Unauthenticated,
        };

        let snapshot = self.permissions.snapshot();
        if snapshot.is_loading {
            GateState::PermissionsLoading(principal)
        } else {
            GateState::PermissionsReady(principal, snapshot)
        }
    }

    async fn wait_for_permissions(&self) {
        if tokio::time::timeout(self.permissions_wait, self.permissions.ready())
            .await
            .is_err()
        {
            tracing::warn!(
                wait_ms = self.permissions_wait.as_millis() as u64,
                "permissions still loading; navigation left pending"
            );
        }
    }

    /// Fallback for a denied principal, re-checked so a redirect can never
    /// point at another denied route.
    fn fallback(&self, principal: &Principal, snapshot: &PermissionsSnapshot) -> RoutePath {
        // 1. Candidates from the snapshot and the principal record.
        let target = self.resolver.resolve(principal, snapshot);
        if authorize(&target, principal, snapshot).is_allowed() {
            return target;
        }

        // 2. The winner was only granted on the record; retry with fetched grants alone.
        tracing::warn!(
            principal_id = %principal.id,
            %target,
            "fallback is only granted on the principal record; resolving from the snapshot"
        );
        let snapshot_only = Principal::new(principal.id, principal.role);
        let target = self.resolver.resolve(&snapshot_only, snapshot);
        if authorize(&target, principal, snapshot).is_allowed() {
            return target;
        }

        // 3. Always allowed.
        RoutePath::canonical(route::PROFILE_SETTINGS)
    }
}

/// ProtectedGate
///
/// Guards every route that requires a session.
pub struct ProtectedGate<'a> {
    keeper: &'a Gatekeeper,
    state: GateState,
}

impl ProtectedGate<'_> {
    pub fn state(&self) -> &GateState {
        &self.state
    }

    /// Reads the session and permissions store and moves out of `Unknown`.
    pub fn check(&mut self) -> &GateState {
        self.state = self.keeper.observe();
        &self.state
    }

    /// decide
    ///
    /// Decision for the current state. No decision is made while the state
    /// is `Unknown` or permissions are loading. Does not raise notices.
    pub fn decide(&self, navigation: &Navigation) -> GateDecision {
        match &self.state {
            GateState::Unknown | GateState::PermissionsLoading(_) => GateDecision::Pending,
            GateState::Unauthenticated => GateDecision::Redirect {
                to: self.keeper.login_path.clone(),
                from: Some(navigation.path.clone()),
                notice: Some(Notice::not_logged_in(self.keeper.login_path.clone())),
            },
            GateState::PermissionsReady(principal, snapshot) => {
                if authorize(&navigation.path, principal, snapshot).is_allowed() {
                    return GateDecision::Render;
                }
                let to = self.keeper.fallback(principal, snapshot);
                GateDecision::Redirect {
                    notice: Some(Notice::insufficient_permission(&navigation.path, to.clone())),
                    from: Some(navigation.path.clone()),
                    to,
                }
            }
        }
    }

    /// settle
    ///
    /// Checks the session, waits for permissions if needed, decides, and
    /// raises the insufficient-permission notice when the decision is a
    /// fallback redirect.
    pub async fn settle(mut self, navigation: &Navigation) -> GateDecision {
        if matches!(self.check(), GateState::PermissionsLoading(_)) {
            self.keeper.wait_for_permissions().await;
            self.check();
        }

        let decision = self.decide(navigation);
        match &decision {
            GateDecision::Redirect {
                notice: Some(notice),
                ..
            } if self.state != GateState::Unauthenticated => {
                tracing::info!(
                    requested = %navigation.path,
                    destination = %notice.destination,
                    "navigation denied; redirecting to fallback"
                );
                self.keeper.notifier.notify(notice);
            }
            GateDecision::Redirect { .. } => {
                tracing::debug!(requested = %navigation.path, "no session; redirecting to login");
            }
            _ => {}
        }
        decision
    }
}

/// PublicGate
///
/// Guards the login and password-recovery pages: shown to visitors without
/// a session, while a signed-in principal is sent where it belongs.
pub struct PublicGate<'a> {
    keeper: &'a Gatekeeper,
    state: GateState,
}

impl PublicGate<'_> {
    pub fn state(&self) -> &GateState {
        &self.state
    }

    pub fn check(&mut self) -> &GateState {
        self.state = self.keeper.observe();
        &self.state
    }

    /// decide
    ///
    /// While permissions load nothing is rendered, neither the page nor a
    /// redirect. A remembered `from` path is honoured only if it is a
    /// protected route the principal may open.
    pub fn decide(&self, navigation: &Navigation) -> GateDecision {
        match &self.state {
            GateState::Unknown | GateState::PermissionsLoading(_) => GateDecision::Pending,
            GateState::Unauthenticated => GateDecision::Render,
            GateState::PermissionsReady(principal, snapshot) => {
                let from = navigation.from.as_ref().filter(|from| {
                    self.keeper.registry.classify(from) == RouteClass::Protected
                        && authorize(from, principal, snapshot).is_allowed()
                });
                let to = match from {
                    Some(from) => from.clone(),
                    None => self.keeper.fallback(principal, snapshot),
                };
                GateDecision::Redirect {
                    to,
                    from: None,
                    notice: None,
                }
            }
        }
    }

    pub async fn settle(mut self, navigation: &Navigation) -> GateDecision {
        if matches!(self.check(), GateState::PermissionsLoading(_)) {
            self.keeper.wait_for_permissions().await;
            self.check();
        }
        self.decide(navigation)
    }
}
