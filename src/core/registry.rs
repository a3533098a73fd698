//! Lock registry: authoritative resource → holder mapping
//!
//! Rules:
//! - First requester of an unheld resource becomes its holder
//! - The holder asking again gets `AlreadyHeldBySelf`
//! - Everyone else gets `HeldByOther` until the holder releases or disconnects
//!
//! Each resource entry is its own unit of mutual exclusion. Nothing is persisted.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info};

use crate::core::host::LockService;
use crate::types::{LockClaimResult, LockRecord, PlayerId, ReasonCode};

#[derive(Debug, Clone)]
struct Holder {
    player: PlayerId,
    acquired_at: DateTime<Utc>,
}

/// Server-side lock registry, shared between request handlers
#[derive(Debug, Default)]
pub struct LockRegistry {
    locks: DashMap<String, Holder>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `resource` for `requester`
    pub fn try_acquire(&self, resource: &str, requester: &PlayerId) -> LockClaimResult {
        let result = match self.locks.entry(resource.to_string()) {
            Entry::Occupied(entry) => {
                let holder = &entry.get().player;
                if holder == requester {
                    LockClaimResult::AlreadyHeldBySelf
                } else {
                    LockClaimResult::HeldByOther {
                        holder: holder.clone(),
                    }
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(Holder {
                    player: requester.clone(),
                    acquired_at: Utc::now(),
                });
                LockClaimResult::Granted
            }
        };

        match &result {
            LockClaimResult::Granted => {
                info!(resource, player = %requester, reason = result.reason().code(), "lock granted")
            }
            _ => debug!(resource, player = %requester, reason = result.reason().code(), "lock claim"),
        }
        result
    }

    /// Release `resource` if `requester` holds it
    pub fn release(&self, resource: &str, requester: &PlayerId) -> bool {
        let released = self
            .locks
            .remove_if(resource, |_, holder| &holder.player == requester)
            .is_some();

        let reason = if released {
            ReasonCode::L002_LOCK_RELEASED
        } else {
            ReasonCode::L002_RELEASE_DENIED
        };
        debug!(resource, player = %requester, reason = reason.code(), "lock release");
        released
    }

    /// Current holder of `resource`
    pub fn holder_of(&self, resource: &str) -> Option<PlayerId> {
        self.locks.get(resource).map(|holder| holder.player.clone())
    }

    /// Release every lock held by `requester`, returning the released resource names
    pub fn release_all(&self, requester: &PlayerId) -> Vec<String> {
        let mut released = Vec::new();
        self.locks.retain(|resource, holder| {
            if &holder.player == requester {
                released.push(resource.clone());
                false
            } else {
                true
            }
        });

        if !released.is_empty() {
            info!(
                player = %requester,
                count = released.len(),
                reason = ReasonCode::L002_DISCONNECT_RELEASE.code(),
                "released locks of disconnected player"
            );
        }
        released.sort();
        released
    }

    /// Snapshot of all held locks, sorted by resource name
    pub fn locks(&self) -> Vec<LockRecord> {
        let mut records: Vec<LockRecord> = self
            .locks
            .iter()
            .map(|entry| LockRecord {
                resource: entry.key().clone(),
                holder: entry.value().player.clone(),
                acquired_at: entry.value().acquired_at,
            })
            .collect();
        records.sort_by(|a, b| a.resource.cmp(&b.resource));
        records
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl LockService for LockRegistry {
    fn request_lock(&self, resource: &str, requester: &PlayerId) -> LockClaimResult {
        self.try_acquire(resource, requester)
    }

    fn release_lock(&self, resource: &str, requester: &PlayerId) {
        self.release(resource, requester);
    }
}

// =============================================================================
// TESTS
// =============================================================================
