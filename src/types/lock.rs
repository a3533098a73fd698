//! Lock ownership types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::ReasonCode;

/// Stable identifier of a connected player
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlayerId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for PlayerId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of one claim attempt against the lock registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LockClaimResult {
    /// The resource was free and now belongs to the requester
    Granted,
    /// The requester already held the resource
    AlreadyHeldBySelf,
    /// Someone else holds the resource
    HeldByOther { holder: PlayerId },
}

impl LockClaimResult {
    /// Does the requester hold the lock after this claim?
    pub fn is_held(&self) -> bool {
        matches!(self, LockClaimResult::Granted | LockClaimResult::AlreadyHeldBySelf)
    }

    /// Reason code describing this outcome
    pub fn reason(&self) -> ReasonCode {
        match self {
            LockClaimResult::Granted => ReasonCode::L001_LOCK_GRANTED,
            LockClaimResult::AlreadyHeldBySelf => ReasonCode::L001_LOCK_ALREADY_HELD,
            LockClaimResult::HeldByOther { .. } => ReasonCode::L001_LOCK_CONTENTION,
        }
    }

    /// Current holder when someone else has the lock
    pub fn other_holder(&self) -> Option<&PlayerId> {
        match self {
            LockClaimResult::HeldByOther { holder } => Some(holder),
            _ => None,
        }
    }
}

/// One held lock as listed by the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    pub resource: String,
    pub holder: PlayerId,
    pub acquired_at: DateTime<Utc>,
}
