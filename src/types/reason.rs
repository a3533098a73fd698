//! Reason codes for lock decisions, replication outcomes and store rejections

use serde::{Deserialize, Serialize};

/// Reason codes for every non-fatal outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum ReasonCode {
    // =========================================================================
    // L001: Lock claims
    // =========================================================================
    /// Resource was free, requester is now the holder
    L001_LOCK_GRANTED,
    /// Requester already held the resource
    L001_LOCK_ALREADY_HELD,
    /// Another player holds the resource
    L001_LOCK_CONTENTION,

    // =========================================================================
    // L002: Lock release
    // =========================================================================
    /// Holder released the resource
    L002_LOCK_RELEASED,
    /// Release requested by someone who is not the holder
    L002_RELEASE_DENIED,
    /// All locks of a disconnected player were released
    L002_DISCONNECT_RELEASE,

    // =========================================================================
    // R001: Replication
    // =========================================================================
    /// Local change captured and sent to peers
    R001_CHANGE_CAPTURED,
    /// Change notification came from our own inbound apply
    R001_CAPTURE_SUPPRESSED,
    /// Inbound change applied to the host
    R001_CHANGE_APPLIED,
    /// Inbound change ignored (kind not replicated or own echo)
    R001_CHANGE_IGNORED,
    /// Response or event arrived after the session ended
    R001_STALE_RESPONSE,

    // =========================================================================
    // S001: Screenshot store
    // =========================================================================
    /// Screenshot stored
    S001_SCREENSHOT_SAVED,
    /// A screenshot with the same name already exists
    S001_DUPLICATE_WRITE,
    /// Player uploads faster than the allowed interval
    S001_RATE_EXCEEDED,
}

impl ReasonCode {
    /// Get the code string (for logging)
    pub fn code(&self) -> &'static str {
        match self {
            Self::L001_LOCK_GRANTED => "L001_LOCK_GRANTED",
            Self::L001_LOCK_ALREADY_HELD => "L001_LOCK_ALREADY_HELD",
            Self::L001_LOCK_CONTENTION => "L001_LOCK_CONTENTION",
            Self::L002_LOCK_RELEASED => "L002_LOCK_RELEASED",
            Self::L002_RELEASE_DENIED => "L002_RELEASE_DENIED",
            Self::L002_DISCONNECT_RELEASE => "L002_DISCONNECT_RELEASE",
            Self::R001_CHANGE_CAPTURED => "R001_CHANGE_CAPTURED",
            Self::R001_CAPTURE_SUPPRESSED => "R001_CAPTURE_SUPPRESSED",
            Self::R001_CHANGE_APPLIED => "R001_CHANGE_APPLIED",
            Self::R001_CHANGE_IGNORED => "R001_CHANGE_IGNORED",
            Self::R001_STALE_RESPONSE => "R001_STALE_RESPONSE",
            Self::S001_SCREENSHOT_SAVED => "S001_SCREENSHOT_SAVED",
            Self::S001_DUPLICATE_WRITE => "S001_DUPLICATE_WRITE",
            Self::S001_RATE_EXCEEDED => "S001_RATE_EXCEEDED",
        }
    }

    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::L001_LOCK_GRANTED => "Lock granted",
            Self::L001_LOCK_ALREADY_HELD => "Lock already held by requester",
            Self::L001_LOCK_CONTENTION => "Lock held by another player",
            Self::L002_LOCK_RELEASED => "Lock released",
            Self::L002_RELEASE_DENIED => "Release denied - not the holder",
            Self::L002_DISCONNECT_RELEASE => "Locks released on disconnect",
            Self::R001_CHANGE_CAPTURED => "Local change captured",
            Self::R001_CAPTURE_SUPPRESSED => "Capture suppressed during apply",
            Self::R001_CHANGE_APPLIED => "Remote change applied",
            Self::R001_CHANGE_IGNORED => "Remote change ignored",
            Self::R001_STALE_RESPONSE => "Arrived after session teardown",
            Self::S001_SCREENSHOT_SAVED => "Screenshot saved",
            Self::S001_DUPLICATE_WRITE => "Screenshot already exists",
            Self::S001_RATE_EXCEEDED => "Screenshots sent too fast",
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.description())
    }
}
