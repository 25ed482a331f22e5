use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, watch};

use crate::{
    models::PermissionsSnapshot,
    profile::{ProfileState, allowed_routes},
    route::RouteRegistry,
    session::SessionState,
};

/// Signal
///
/// Typed occasions that change what the store should hold. Sent by the
/// login/logout flow and by the admin screen that edits sub-admin grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// A login just succeeded; grants must be fetched before any gate decides.
    SessionEstablished,
    /// An admin changed grants; the current principal's set may be stale.
    PermissionsInvalidated,
    /// Logout. The snapshot is emptied immediately.
    SessionEnded,
}

/// PermissionsStore
///
/// Fetches and caches the signed-in principal's authorized route prefixes.
///
/// The store is the single writer of the `PermissionsSnapshot`; gates read
/// it through [`PermissionsStore::snapshot`] or a [`watch::Receiver`]. Every
/// write replaces the whole snapshot.
///
/// Each load takes a generation ticket. A fetched result is committed only
/// if no later load or logout has happened since, and the session still
/// carries the token the fetch was made with.
pub struct PermissionsStore {
    session: SessionState,
    profile: ProfileState,
    // Validates grant strings before they reach a snapshot.
    registry: RouteRegistry,
    // Sole write handle of the published snapshot.
    snapshot: watch::Sender<PermissionsSnapshot>,
    // Ticket counter; bumped by every load and by logout.
    generation: AtomicU64,
    signals: mpsc::UnboundedSender<Signal>,
    // Receiver parked here until the worker takes it.
    pending: Mutex<Option<mpsc::UnboundedReceiver<Signal>>>,
}

impl PermissionsStore {
    /// Creates the store without a background worker. Signals are buffered
    /// until [`PermissionsStore::spawn_worker`] is called.
    pub fn new(session: SessionState, profile: ProfileState, registry: RouteRegistry) -> Self {
        let initial = if session.is_active() {
            PermissionsSnapshot::empty().reloading()
        } else {
            PermissionsSnapshot::empty()
        };
        let (snapshot, _) = watch::channel(initial);
        let (signals, pending) = mpsc::unbounded_channel();

        Self {
            session,
            profile,
            registry,
            snapshot,
            generation: AtomicU64::new(0),
            signals,
            pending: Mutex::new(Some(pending)),
        }
    }

    /// Creates the store and starts the worker that reacts to signals.
    /// If a session is already active, an initial load is queued.
    pub fn spawn(session: SessionState, profile: ProfileState, registry: RouteRegistry) -> Arc<Self> {
        let store = Arc::new(Self::new(session, profile, registry));
        if store.session.is_active() {
            let _ = store.signals.send(Signal::SessionEstablished);
        }
        store.spawn_worker();
        store
    }

    /// Starts the signal worker. Only the first call has any effect.
    pub fn spawn_worker(self: &Arc<Self>) {
        let Some(mut receiver) = self.pending.lock().take() else {
            return;
        };
        let store: Weak<Self> = Arc::downgrade(self);

        tokio::spawn(async move {
            while let Some(signal) = receiver.recv().await {
                let Some(store) = store.upgrade() else {
                    break;
                };
                tracing::debug!(?signal, "permissions worker reloading");
                store.load().await;
            }
            tracing::debug!("permissions worker stopped");
        });
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> PermissionsSnapshot {
        self.snapshot.borrow().clone()
    }

    /// A receiver that observes every snapshot replacement.
    pub fn subscribe(&self) -> watch::Receiver<PermissionsSnapshot> {
        self.snapshot.subscribe()
    }

    /// Waits until the snapshot is no longer loading and returns it.
    pub async fn ready(&self) -> PermissionsSnapshot {
        let mut receiver = self.snapshot.subscribe();
        match receiver.wait_for(|s| !s.is_loading).await {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.snapshot(),
        }
    }

    /// notify
    ///
    /// Applies a signal's synchronous effect before returning, so no reader
    /// can act on pre-signal data, then queues the reload (if any) on the
    /// worker.
    pub fn notify(&self, signal: Signal) {
        match signal {
            Signal::SessionEstablished => {
                // Grants of a previous principal must never leak into the new session.
                self.snapshot.send_replace(PermissionsSnapshot::empty().reloading());
            }
            Signal::PermissionsInvalidated => {
                self.snapshot.send_replace(self.snapshot().reloading());
            }
            Signal::SessionEnded => {
                self.generation.fetch_add(1, Ordering::SeqCst);
                self.snapshot.send_replace(PermissionsSnapshot::empty());
                tracing::info!("permissions reset after logout");
                return;
            }
        }

        if self.signals.send(signal).is_err() {
            tracing::error!(?signal, "permissions worker is gone; signal dropped");
        }
    }

    /// refresh
    ///
    /// Re-runs [`PermissionsStore::load`] and returns the settled snapshot.
    /// Safe to call while another load is in flight: the load started last
    /// wins, and a superseded caller waits for the winner.
    pub async fn refresh(&self) -> PermissionsSnapshot {
        self.load().await;
        self.ready().await
    }

    /// load
    ///
    /// Without a session token, settles on the empty snapshot and never calls
    /// the network. Otherwise fetches the profile and commits its
    /// `allowed_routes` (unknown entries dropped). A failed fetch commits an
    /// empty grant set; it is logged and never surfaced to the caller.
    ///
    /// Returns the snapshot the store holds once this load is done.
    pub async fn load(&self) -> PermissionsSnapshot {
        // 1. Take a ticket; any later load or logout supersedes this one.
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        // 2. No token, no network call.
        let Some(token) = self.session.token() else {
            tracing::debug!("no session token; skipping permissions fetch");
            self.commit(ticket, None, PermissionsSnapshot::empty());
            return self.snapshot();
        };

        // 3. Readers must not treat the old grants as final while we fetch.
        if !self.snapshot.borrow().is_loading {
            self.snapshot.send_replace(self.snapshot().reloading());
        }

        // 4. Fetch. Failures degrade to no grants and keep the session.
        let grants = match self.profile.fetch_profile(&token).await {
            Ok(body) => self.registry.parse_grants(allowed_routes(&body)),
            Err(err) => {
                tracing::warn!(error = %err, "permissions fetch failed; continuing without grants");
                BTreeSet::new()
            }
        };

        // 5. Commit, unless superseded or the session changed meanwhile.
        self.commit(ticket, Some(&token), PermissionsSnapshot::ready(grants));
        self.snapshot()
    }

    fn commit(&self, ticket: u64, token: Option<&str>, snapshot: PermissionsSnapshot) {
        let latest = self.generation.load(Ordering::SeqCst);
        if latest != ticket {
            tracing::debug!(ticket, latest, "discarding superseded permissions load");
            return;
        }
        let current = self.session.token();
        if token.is_some() && current.as_deref() != token {
            tracing::debug!(ticket, "discarding permissions for a session that has ended");
            if current.is_none() {
                // Expired mid-fetch with no logout signal to reset the snapshot.
                self.snapshot.send_replace(PermissionsSnapshot::empty());
            }
            return;
        }

        tracing::info!(
            grants = snapshot.authorized_prefixes.len(),
            "permissions snapshot committed"
        );
        self.snapshot.send_replace(snapshot);
    }
}
