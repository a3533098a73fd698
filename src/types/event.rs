//! Change events and host notification channels
//!
//! A `ChangePayload` is both what the host reports when a shared value changes
//! and what travels to peers inside a `ChangeEvent`.

use serde::{Deserialize, Serialize};

use crate::types::PlayerId;

/// Category of shared progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Funds,
    Science,
    Reputation,
    Technology,
    Contract,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Funds,
        ResourceKind::Science,
        ResourceKind::Reputation,
        ResourceKind::Technology,
        ResourceKind::Contract,
    ];

    /// Dense index, used for per-kind flag tables
    pub fn index(self) -> usize {
        match self {
            ResourceKind::Funds => 0,
            ResourceKind::Science => 1,
            ResourceKind::Reputation => 2,
            ResourceKind::Technology => 3,
            ResourceKind::Contract => 4,
        }
    }

    /// Host notification channels that report changes of this kind
    pub fn channels(self) -> Vec<NotificationChannel> {
        match self {
            ResourceKind::Funds => vec![NotificationChannel::Funds],
            ResourceKind::Science => vec![NotificationChannel::Science],
            ResourceKind::Reputation => vec![NotificationChannel::Reputation],
            ResourceKind::Technology => vec![NotificationChannel::Technology],
            ResourceKind::Contract => ContractEventKind::ALL
                .iter()
                .copied()
                .map(NotificationChannel::Contract)
                .collect(),
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResourceKind::Funds => "funds",
            ResourceKind::Science => "science",
            ResourceKind::Reputation => "reputation",
            ResourceKind::Technology => "technology",
            ResourceKind::Contract => "contract",
        };
        f.write_str(name)
    }
}

/// The twelve distinguishable contract lifecycle notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractEventKind {
    Accepted,
    Cancelled,
    Completed,
    Declined,
    Failed,
    Finished,
    Offered,
    ParameterChanged,
    Read,
    Seen,
    ListChanged,
    Loaded,
}

impl ContractEventKind {
    pub const ALL: [ContractEventKind; 12] = [
        ContractEventKind::Accepted,
        ContractEventKind::Cancelled,
        ContractEventKind::Completed,
        ContractEventKind::Declined,
        ContractEventKind::Failed,
        ContractEventKind::Finished,
        ContractEventKind::Offered,
        ContractEventKind::ParameterChanged,
        ContractEventKind::Read,
        ContractEventKind::Seen,
        ContractEventKind::ListChanged,
        ContractEventKind::Loaded,
    ];
}

/// A contract lifecycle change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractChange {
    pub event: ContractEventKind,
    /// Absent for list-level events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_id: Option<String>,
}

impl ContractChange {
    pub fn new(event: ContractEventKind, contract_id: impl Into<String>) -> Self {
        Self {
            event,
            contract_id: Some(contract_id.into()),
        }
    }

    pub fn list_level(event: ContractEventKind) -> Self {
        Self {
            event,
            contract_id: None,
        }
    }
}

/// New value of one shared progress field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ChangePayload {
    Funds(f64),
    Science(f32),
    Reputation(f32),
    Technology { tech_id: String },
    Contract(ContractChange),
}

impl ChangePayload {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ChangePayload::Funds(_) => ResourceKind::Funds,
            ChangePayload::Science(_) => ResourceKind::Science,
            ChangePayload::Reputation(_) => ResourceKind::Reputation,
            ChangePayload::Technology { .. } => ResourceKind::Technology,
            ChangePayload::Contract(_) => ResourceKind::Contract,
        }
    }

    /// Channel the host reports this change on
    pub fn channel(&self) -> NotificationChannel {
        match self {
            ChangePayload::Funds(_) => NotificationChannel::Funds,
            ChangePayload::Science(_) => NotificationChannel::Science,
            ChangePayload::Reputation(_) => NotificationChannel::Reputation,
            ChangePayload::Technology { .. } => NotificationChannel::Technology,
            ChangePayload::Contract(change) => NotificationChannel::Contract(change.event),
        }
    }
}

/// A host notification channel a handler can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationChannel {
    Funds,
    Science,
    Reputation,
    Technology,
    Contract(ContractEventKind),
}

impl NotificationChannel {
    pub fn kind(self) -> ResourceKind {
        match self {
            NotificationChannel::Funds => ResourceKind::Funds,
            NotificationChannel::Science => ResourceKind::Science,
            NotificationChannel::Reputation => ResourceKind::Reputation,
            NotificationChannel::Technology => ResourceKind::Technology,
            NotificationChannel::Contract(_) => ResourceKind::Contract,
        }
    }
}

/// One mutation of shared progress, broadcast to peers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    payload: ChangePayload,
    origin: PlayerId,
}

impl ChangeEvent {
    pub fn new(payload: ChangePayload, origin: PlayerId) -> Self {
        Self { payload, origin }
    }

    pub fn kind(&self) -> ResourceKind {
        self.payload.kind()
    }

    pub fn payload(&self) -> &ChangePayload {
        &self.payload
    }

    pub fn origin(&self) -> &PlayerId {
        &self.origin
    }
}
