//! Core modules for progress-sync

pub mod host;
pub mod registry;
pub mod guard;
pub mod snapshot;
pub mod capture;
pub mod acquisition;
pub mod replicator;
pub mod memory;
pub mod screenshot;
pub mod api;

pub use host::{ChangeSink, LockService, NotificationHandler, ProgressHost, SubscriptionId};
pub use registry::LockRegistry;
pub use guard::{ApplyScope, ReentrancyGuard};
pub use snapshot::ProgressSnapshot;
pub use capture::ChangeCaptureBridge;
pub use acquisition::{AuthorityState, Liveness, LockAcquisitionLoop};
pub use replicator::{ProgressReplicator, ReplicatorConfig, ReplicatorPhase};
pub use memory::{EventQueue, InMemoryHost};
pub use screenshot::{ScreenshotError, ScreenshotStore};
pub use api::{create_router, create_router_with_state, run_server, AppState, ServerConfig};
