use parking_lot::Mutex;
use std::sync::Arc;

use crate::models::Notice;

/// Notifier
///
/// The user-visible notice collaborator (modal or toast). Called when a
/// denied navigation is redirected to a fallback.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &Notice);
}

/// NotifierState
///
/// The concrete type used to share the notifier across the application state.
pub type NotifierState = Arc<dyn Notifier>;

/// TracingNotifier
///
/// Server-side notifier: the notice is already returned in the gate decision
/// for the frontend to display, so this only records it in the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: &Notice) {
        tracing::info!(
            kind = ?notice.kind,
            destination = %notice.destination,
            title = %notice.title,
            "navigation notice"
        );
    }
}

/// RecordingNotifier
///
/// Keeps every notice in memory so tests can assert on what was shown.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: &Notice) {
        self.notices.lock().push(notice.clone());
    }
}
