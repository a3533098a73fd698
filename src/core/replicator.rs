//! Progress replicator: per-session orchestration on the client
//!
//! Phases (fixed for the session):
//! - INACTIVE (Sandbox): no subscriptions, no locks
//! - SCIENCE_ONLY (Science): science capture and apply only
//! - FULL (Career): every kind, plus the contract lock loop
//!
//! Inbound apply: set guard flag → write host → clear flag. The host notifies
//! synchronously inside the write, so the capture bridge sees the flag and
//! drops the echo.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::core::acquisition::{AuthorityState, Liveness, LockAcquisitionLoop};
use crate::core::capture::ChangeCaptureBridge;
use crate::core::guard::{ApplyScope, ReentrancyGuard};
use crate::core::host::{ChangeSink, LockService, ProgressHost};
use crate::core::snapshot::ProgressSnapshot;
use crate::types::{ChangeEvent, ChangePayload, PlayerId, ReasonCode, ResourceKind, SessionMode};
use crate::{CONTRACT_LOCK, DEFAULT_CONTRACT_GENERATE_ITERATIONS, LOCK_RETRY_INTERVAL_MS};

/// Per-session client configuration
#[derive(Debug, Clone)]
pub struct ReplicatorConfig {
    pub player: PlayerId,
    pub mode: SessionMode,
    /// Resource name of the contract generation lock
    pub contract_lock: String,
    pub lock_retry_interval: Duration,
    /// Iterations handed to the contract generator while holding authority
    pub contract_generate_iterations: u32,
}

impl ReplicatorConfig {
    pub fn new(player: impl Into<PlayerId>, mode: SessionMode) -> Self {
        Self {
            player: player.into(),
            mode,
            contract_lock: CONTRACT_LOCK.to_string(),
            lock_retry_interval: Duration::from_millis(LOCK_RETRY_INTERVAL_MS),
            contract_generate_iterations: DEFAULT_CONTRACT_GENERATE_ITERATIONS,
        }
    }

    pub fn with_lock_retry_interval(mut self, interval: Duration) -> Self {
        self.lock_retry_interval = interval;
        self
    }

    pub fn with_contract_generate_iterations(mut self, iterations: u32) -> Self {
        self.contract_generate_iterations = iterations;
        self
    }
}

/// What a session replicates, derived from its mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicatorPhase {
    Inactive,
    ScienceOnly,
    Full,
}

impl From<SessionMode> for ReplicatorPhase {
    fn from(mode: SessionMode) -> Self {
        match mode {
            SessionMode::Sandbox => ReplicatorPhase::Inactive,
            SessionMode::Science => ReplicatorPhase::ScienceOnly,
            SessionMode::Career => ReplicatorPhase::Full,
        }
    }
}

/// Client-side orchestrator for one session
pub struct ProgressReplicator {
    config: ReplicatorConfig,
    host: Rc<dyn ProgressHost>,
    locks: Rc<dyn LockService>,
    guard: Rc<ReentrancyGuard>,
    bridge: RefCell<ChangeCaptureBridge>,
    snapshot: RefCell<ProgressSnapshot>,
    authority: Rc<AuthorityState>,
    liveness: RefCell<Option<Liveness>>,
    lock_task: RefCell<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for ProgressReplicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReplicator")
            .field("config", &self.config)
            .field("active", &self.is_active())
            .field("authority", &self.authority)
            .finish()
    }
}

impl ProgressReplicator {
    pub fn new(
        config: ReplicatorConfig,
        host: Rc<dyn ProgressHost>,
        sink: Rc<dyn ChangeSink>,
        locks: Rc<dyn LockService>,
    ) -> Self {
        let guard = Rc::new(ReentrancyGuard::new());
        let bridge = ChangeCaptureBridge::new(config.player.clone(), Rc::clone(&guard), sink);
        let authority = Rc::new(AuthorityState::new(config.contract_generate_iterations));
        Self {
            config,
            host,
            locks,
            guard,
            bridge: RefCell::new(bridge),
            snapshot: RefCell::new(ProgressSnapshot::new()),
            authority,
            liveness: RefCell::new(None),
            lock_task: RefCell::new(None),
        }
    }

    /// Begin the session: subscribe per mode and, in Career, start claiming the
    /// contract lock. Career sessions must start inside a tokio `LocalSet`; the
    /// retry task is spawned before anything else so a missing `LocalSet`
    /// panics with no subscriptions or locks left behind.
    pub fn start(&self) -> ReplicatorPhase {
        let phase = self.phase();
        if self.is_active() {
            return phase;
        }

        let liveness = Liveness::alive();
        let lock_loop = if self.config.mode.uses_contract_lock() {
            let lock_loop = Rc::new(LockAcquisitionLoop::new(
                self.config.contract_lock.clone(),
                self.config.player.clone(),
                Rc::clone(&self.locks),
                Rc::clone(&self.authority),
                liveness.clone(),
                self.config.lock_retry_interval,
            ));
            // First retry is one period out, the immediate claim follows below
            *self.lock_task.borrow_mut() = Some(lock_loop.spawn());
            Some(lock_loop)
        } else {
            None
        };
        *self.liveness.borrow_mut() = Some(liveness);

        let kinds = self.config.mode.replicated_kinds();
        if kinds.is_empty() {
            info!(player = %self.config.player, mode = %self.config.mode, "progress sharing disabled");
            return phase;
        }

        self.bridge.borrow_mut().attach(&*self.host, kinds);
        if let Some(lock_loop) = lock_loop {
            lock_loop.attempt();
        }

        info!(player = %self.config.player, mode = %self.config.mode, ?phase, "progress sharing started");
        phase
    }

    /// End the session. Safe to call more than once.
    pub fn stop(&self) {
        let Some(liveness) = self.liveness.borrow_mut().take() else {
            return;
        };
        liveness.end();

        if let Some(task) = self.lock_task.borrow_mut().take() {
            task.abort();
        }

        self.bridge.borrow_mut().detach(&*self.host);

        if self.config.mode.uses_contract_lock() {
            if self.authority.holds_authority() {
                self.locks.release_lock(&self.config.contract_lock, &self.config.player);
            }
            self.authority.set_holds(false);
        }
        self.guard.reset();

        info!(player = %self.config.player, "progress sharing stopped");
    }

    /// Inbound entry point for change events from peers
    pub fn on_change_event_received(&self, event: ChangeEvent) -> ReasonCode {
        if !self.is_active() {
            debug!(kind = %event.kind(), reason = ReasonCode::R001_STALE_RESPONSE.code(), "inbound change discarded");
            return ReasonCode::R001_STALE_RESPONSE;
        }

        let kind = event.kind();
        if !self.config.mode.replicates(kind) || event.origin() == &self.config.player {
            debug!(%kind, origin = %event.origin(), reason = ReasonCode::R001_CHANGE_IGNORED.code(), "inbound change ignored");
            return ReasonCode::R001_CHANGE_IGNORED;
        }

        let _scope = self.guard.scope(kind);
        apply_payload(&*self.host, event.payload());
        debug!(%kind, origin = %event.origin(), reason = ReasonCode::R001_CHANGE_APPLIED.code(), "inbound change applied");
        ReasonCode::R001_CHANGE_APPLIED
    }

    /// Checkpoint the mode's scalars. No-op in Sandbox.
    pub fn save_basic_progress(&self) {
        if self.config.mode == SessionMode::Sandbox {
            return;
        }
        self.snapshot.borrow_mut().save(&*self.host, self.config.mode);
    }

    /// Write the checkpoint back. The writes are captured like any local
    /// change, so peers that saw the intermediate values follow. No-op in Sandbox.
    pub fn restore_basic_progress(&self) {
        if self.config.mode == SessionMode::Sandbox {
            return;
        }
        let snapshot = *self.snapshot.borrow();
        snapshot.restore(&*self.host);
    }

    /// Save, run `recompute` with scalar capture suppressed, then restore
    /// without broadcasting. Peers never saw the window, so nothing is sent.
    pub fn shield_progress<R>(&self, recompute: impl FnOnce(&dyn ProgressHost) -> R) -> R {
        self.save_basic_progress();
        let result = {
            let _scopes = self.suppress(&self.snapshot.borrow().saved_kinds());
            recompute(&*self.host)
        };
        self.restore_quietly();
        result
    }

    pub fn phase(&self) -> ReplicatorPhase {
        ReplicatorPhase::from(self.config.mode)
    }

    pub fn is_active(&self) -> bool {
        self.liveness
            .borrow()
            .as_ref()
            .is_some_and(Liveness::is_alive)
    }

    /// Handle for the contract generator
    pub fn authority(&self) -> Rc<AuthorityState> {
        Rc::clone(&self.authority)
    }

    fn restore_quietly(&self) {
        let snapshot = *self.snapshot.borrow();
        let _scopes = self.suppress(&snapshot.saved_kinds());
        snapshot.restore(&*self.host);
    }

    fn suppress(&self, kinds: &[ResourceKind]) -> Vec<ApplyScope<'_>> {
        kinds.iter().map(|kind| self.guard.scope(*kind)).collect()
    }
}

impl Drop for ProgressReplicator {
    fn drop(&mut self) {
        self.stop();
    }
}

fn apply_payload(host: &dyn ProgressHost, payload: &ChangePayload) {
    match payload {
        ChangePayload::Funds(funds) => host.set_funds(*funds),
        ChangePayload::Science(science) => host.set_science(*science),
        ChangePayload::Reputation(reputation) => host.set_reputation(*reputation),
        ChangePayload::Technology { tech_id } => host.research_technology(tech_id),
        ChangePayload::Contract(change) => host.apply_contract_change(change),
    }
}

// =============================================================================
// TESTS
// =============================================================================
