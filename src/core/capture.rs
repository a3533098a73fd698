//! Change capture bridge: host notifications → outbound change events
//!
//! One handler per notification channel. A notification whose kind is flagged
//! in the reentrancy guard is our own inbound apply echoing back and is dropped.

use std::rc::Rc;

use tracing::{debug, trace};

use crate::core::guard::ReentrancyGuard;
use crate::core::host::{ChangeSink, NotificationHandler, ProgressHost, SubscriptionId};
use crate::types::{ChangeEvent, ChangePayload, PlayerId, ReasonCode, ResourceKind};

/// Subscribes to host notifications and forwards local changes to the transport
pub struct ChangeCaptureBridge {
    origin: PlayerId,
    guard: Rc<ReentrancyGuard>,
    sink: Rc<dyn ChangeSink>,
    subscriptions: Vec<SubscriptionId>,
}

impl std::fmt::Debug for ChangeCaptureBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeCaptureBridge")
            .field("origin", &self.origin)
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

impl ChangeCaptureBridge {
    pub fn new(origin: PlayerId, guard: Rc<ReentrancyGuard>, sink: Rc<dyn ChangeSink>) -> Self {
        Self {
            origin,
            guard,
            sink,
            subscriptions: Vec::new(),
        }
    }

    /// Subscribe to every channel of `kinds`; returns the number of new subscriptions
    pub fn attach(&mut self, host: &dyn ProgressHost, kinds: &[ResourceKind]) -> usize {
        let before = self.subscriptions.len();
        for kind in kinds {
            for channel in kind.channels() {
                let id = host.subscribe(channel, self.handler());
                self.subscriptions.push(id);
            }
        }
        let added = self.subscriptions.len() - before;
        debug!(player = %self.origin, kinds = ?kinds, subscriptions = added, "capture attached");
        added
    }

    /// Remove every subscription made by `attach`; safe to call repeatedly
    pub fn detach(&mut self, host: &dyn ProgressHost) -> usize {
        let removed = self
            .subscriptions
            .drain(..)
            .filter(|id| host.unsubscribe(*id))
            .count();
        if removed > 0 {
            debug!(player = %self.origin, subscriptions = removed, "capture detached");
        }
        removed
    }

    pub fn is_attached(&self) -> bool {
        !self.subscriptions.is_empty()
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    fn handler(&self) -> NotificationHandler {
        let origin = self.origin.clone();
        let guard = Rc::clone(&self.guard);
        let sink = Rc::clone(&self.sink);
        Rc::new(move |payload: &ChangePayload| capture(&origin, &guard, &*sink, payload))
    }
}

/// Decide whether one notification becomes an outbound event
fn capture(origin: &PlayerId, guard: &ReentrancyGuard, sink: &dyn ChangeSink, payload: &ChangePayload) {
    let kind = payload.kind();
    if guard.should_suppress_capture(kind) {
        trace!(%kind, reason = ReasonCode::R001_CAPTURE_SUPPRESSED.code(), "notification dropped");
        return;
    }
    trace!(%kind, reason = ReasonCode::R001_CHANGE_CAPTURED.code(), "notification captured");
    sink.send_change_event(ChangeEvent::new(payload.clone(), origin.clone()));
}

// =============================================================================
// TESTS
// =============================================================================
