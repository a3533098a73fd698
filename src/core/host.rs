//! Collaborator seams
//!
//! The client core never owns game state or sockets. It reaches the game
//! through [`ProgressHost`], the network through [`ChangeSink`], and the lock
//! authority through [`LockService`].

use std::rc::Rc;
use std::sync::Arc;

use crate::types::{ChangeEvent, ChangePayload, ContractChange, LockClaimResult, NotificationChannel, PlayerId};

/// Callback invoked synchronously by the host when a shared value changes
pub type NotificationHandler = Rc<dyn Fn(&ChangePayload)>;

/// Handle returned by [`ProgressHost::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// The game simulation that owns funds, science, reputation, technology and contracts.
///
/// Setters must notify subscribers of the matching channel on the calling
/// thread before returning, whether the change is local or applied from a peer.
pub trait ProgressHost {
    fn funds(&self) -> f64;
    fn set_funds(&self, funds: f64);

    fn science(&self) -> f32;
    fn set_science(&self, science: f32);

    fn reputation(&self) -> f32;
    fn set_reputation(&self, reputation: f32);

    fn research_technology(&self, tech_id: &str);

    fn apply_contract_change(&self, change: &ContractChange);

    fn subscribe(&self, channel: NotificationChannel, handler: NotificationHandler) -> SubscriptionId;

    /// Returns false when the id was not subscribed
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

/// Outbound half of the transport
pub trait ChangeSink {
    /// Best effort, no retry
    fn send_change_event(&self, event: ChangeEvent);
}

/// Request/response access to the lock registry
pub trait LockService {
    fn request_lock(&self, resource: &str, requester: &PlayerId) -> LockClaimResult;
    fn release_lock(&self, resource: &str, requester: &PlayerId);
}

impl<T: LockService + ?Sized> LockService for Arc<T> {
    fn request_lock(&self, resource: &str, requester: &PlayerId) -> LockClaimResult {
        (**self).request_lock(resource, requester)
    }

    fn release_lock(&self, resource: &str, requester: &PlayerId) {
        (**self).release_lock(resource, requester)
    }
}
