//! Core types for progress-sync

mod event;
mod lock;
mod mode;
mod reason;
mod screenshot;

pub use event::{ChangeEvent, ChangePayload, ContractChange, ContractEventKind, NotificationChannel, ResourceKind};
pub use lock::{LockClaimResult, LockRecord, PlayerId};
pub use mode::SessionMode;
pub use reason::ReasonCode;
pub use screenshot::ScreenshotInfo;
