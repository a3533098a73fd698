//! progress-sync: contract-authority locking and shared progress replication
//!
//! Server side: a lock registry plus an HTTP/WebSocket relay for change events.
//! Client side: change capture, guarded apply and authority polling for one session.

pub mod core;
pub mod types;

// =============================================================================
// LOCKING
// =============================================================================

/// Resource name of the lock that grants contract generation authority
pub const CONTRACT_LOCK: &str = "contract-generation-authority";

/// How often a client retries the contract lock (milliseconds)
pub const LOCK_RETRY_INTERVAL_MS: u64 = 10_000;

/// Contract candidates generated per cycle by the authority holder
pub const DEFAULT_CONTRACT_GENERATE_ITERATIONS: u32 = 50;

// =============================================================================
// SCREENSHOTS
// =============================================================================

/// Minimum time between two screenshot uploads from one player (milliseconds)
pub const MIN_SCREENSHOT_INTERVAL_MS: u64 = 30_000;

/// Folder under the universe directory that holds screenshots
pub const SCREENSHOT_FOLDER: &str = "Screenshots";

// =============================================================================
// SERVER
// =============================================================================

/// Capacity of the change event broadcast channel
pub const RELAY_CHANNEL_CAPACITY: usize = 256;

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = "1.0.0";
