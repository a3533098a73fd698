//! Lock acquisition loop: periodic claim of the contract lock
//!
//! Outcome handling:
//! - Granted / AlreadyHeldBySelf → authority on, generation iterations = default
//! - HeldByOther → authority off, generation iterations = 0
//!
//! At most one client in the session ends up generating contracts. Losing the
//! race is the normal steady state, never an error.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

use crate::core::host::LockService;
use crate::types::{LockClaimResult, PlayerId, ReasonCode};

/// Session liveness flag shared by everything that can outlive a teardown
#[derive(Debug, Clone)]
pub struct Liveness(Rc<Cell<bool>>);

impl Liveness {
    pub fn alive() -> Self {
        Self(Rc::new(Cell::new(true)))
    }

    pub fn is_alive(&self) -> bool {
        self.0.get()
    }

    pub fn end(&self) {
        self.0.set(false);
    }
}

/// Contract generation authority, read by the external contract generator
#[derive(Debug)]
pub struct AuthorityState {
    holds_authority: Cell<bool>,
    resolved: Cell<bool>,
    contract_generate_iterations: Cell<u32>,
    default_iterations: u32,
}

impl AuthorityState {
    /// Starts without authority until the first claim succeeds
    pub fn new(default_iterations: u32) -> Self {
        Self {
            holds_authority: Cell::new(false),
            resolved: Cell::new(false),
            contract_generate_iterations: Cell::new(0),
            default_iterations,
        }
    }

    pub fn holds_authority(&self) -> bool {
        self.holds_authority.get()
    }

    /// How many contract candidates the generator may create this cycle
    pub fn contract_generate_iterations(&self) -> u32 {
        self.contract_generate_iterations.get()
    }

    pub fn default_iterations(&self) -> u32 {
        self.default_iterations
    }

    /// Record a claim outcome. Returns true on the first outcome and whenever
    /// authority flips.
    pub(crate) fn set_holds(&self, holds: bool) -> bool {
        let iterations = if holds { self.default_iterations } else { 0 };
        self.contract_generate_iterations.set(iterations);
        let first = !self.resolved.replace(true);
        let previous = self.holds_authority.replace(holds);
        first || previous != holds
    }
}

/// Periodically claims one resource until the session ends
pub struct LockAcquisitionLoop {
    resource: String,
    player: PlayerId,
    locks: Rc<dyn LockService>,
    authority: Rc<AuthorityState>,
    liveness: Liveness,
    period: Duration,
}

impl std::fmt::Debug for LockAcquisitionLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockAcquisitionLoop")
            .field("resource", &self.resource)
            .field("player", &self.player)
            .field("period", &self.period)
            .field("alive", &self.liveness.is_alive())
            .finish()
    }
}

impl LockAcquisitionLoop {
    pub fn new(
        resource: impl Into<String>,
        player: PlayerId,
        locks: Rc<dyn LockService>,
        authority: Rc<AuthorityState>,
        liveness: Liveness,
        period: Duration,
    ) -> Self {
        Self {
            resource: resource.into(),
            player,
            locks,
            authority,
            liveness,
            period,
        }
    }

    /// One claim round trip. `None` once the session has ended.
    pub fn attempt(&self) -> Option<LockClaimResult> {
        if !self.liveness.is_alive() {
            return None;
        }
        let result = self.locks.request_lock(&self.resource, &self.player);
        self.apply_outcome(&result);
        Some(result)
    }

    /// Update authority from a claim outcome; ignored after teardown
    pub fn apply_outcome(&self, result: &LockClaimResult) -> bool {
        if !self.liveness.is_alive() {
            debug!(
                resource = %self.resource,
                reason = ReasonCode::R001_STALE_RESPONSE.code(),
                "lock outcome discarded"
            );
            return false;
        }

        let holds = result.is_held();
        if !self.authority.set_holds(holds) {
            debug!(resource = %self.resource, reason = result.reason().code(), "contract lock unchanged");
        } else if holds {
            info!(
                resource = %self.resource,
                iterations = self.authority.contract_generate_iterations(),
                "holding contract lock, generating contracts"
            );
        } else {
            info!(
                resource = %self.resource,
                holder = ?result.other_holder(),
                reason = result.reason().code(),
                "no contract lock, contract generation disabled"
            );
        }
        true
    }

    /// Retry on the fixed period until the session ends. The first tick is one
    /// period out; the immediate claim is made by the caller via [`attempt`](Self::attempt).
    pub async fn run(self: Rc<Self>) {
        let mut interval = time::interval_at(time::Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            if self.attempt().is_none() {
                break;
            }
        }
    }

    /// Spawn [`run`](Self::run) on the current `LocalSet`
    pub fn spawn(self: &Rc<Self>) -> JoinHandle<()> {
        tokio::task::spawn_local(Rc::clone(self).run())
    }
}

// =============================================================================
// TESTS
// =============================================================================
