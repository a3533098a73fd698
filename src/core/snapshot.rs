//! Progress snapshot: save/restore of shared scalars
//!
//! Only the most recent checkpoint is kept. Which scalars are covered follows
//! the session mode: science in Science mode, all three in Career.

use tracing::debug;

use crate::core::host::ProgressHost;
use crate::types::{ResourceKind, SessionMode};

/// Saved funds, science and reputation
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProgressSnapshot {
    funds: Option<f64>,
    science: Option<f32>,
    reputation: Option<f32>,
}

impl ProgressSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the mode's scalars, overwriting any earlier checkpoint
    pub fn save(&mut self, host: &dyn ProgressHost, mode: SessionMode) {
        *self = Self::default();
        if mode.replicates(ResourceKind::Science) {
            self.science = Some(host.science());
        }
        if mode.replicates(ResourceKind::Funds) {
            self.funds = Some(host.funds());
        }
        if mode.replicates(ResourceKind::Reputation) {
            self.reputation = Some(host.reputation());
        }
        debug!(%mode, funds = ?self.funds, science = ?self.science, reputation = ?self.reputation, "progress saved");
    }

    /// Write the saved scalars back, whether or not they changed since `save`
    ///
    /// Returns the kinds that were written. Nothing is written before the first save.
    pub fn restore(&self, host: &dyn ProgressHost) -> Vec<ResourceKind> {
        let mut written = Vec::new();
        if let Some(science) = self.science {
            host.set_science(science);
            written.push(ResourceKind::Science);
        }
        if let Some(funds) = self.funds {
            host.set_funds(funds);
            written.push(ResourceKind::Funds);
        }
        if let Some(reputation) = self.reputation {
            host.set_reputation(reputation);
            written.push(ResourceKind::Reputation);
        }
        written
    }

    /// Kinds covered by the current checkpoint
    pub fn saved_kinds(&self) -> Vec<ResourceKind> {
        let mut kinds = Vec::new();
        if self.science.is_some() {
            kinds.push(ResourceKind::Science);
        }
        if self.funds.is_some() {
            kinds.push(ResourceKind::Funds);
        }
        if self.reputation.is_some() {
            kinds.push(ResourceKind::Reputation);
        }
        kinds
    }

    pub fn is_empty(&self) -> bool {
        self.funds.is_none() && self.science.is_none() && self.reputation.is_none()
    }

    pub fn funds(&self) -> Option<f64> {
        self.funds
    }

    pub fn science(&self) -> Option<f32> {
        self.science
    }

    pub fn reputation(&self) -> Option<f32> {
        self.reputation
    }
}

// =============================================================================
// TESTS
// =============================================================================
