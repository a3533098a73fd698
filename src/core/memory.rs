//! In-process collaborators
//!
//! `InMemoryHost` stands in for the game simulation and `EventQueue` for the
//! outbound transport. The demo mode and the test suites drive clients with them.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::core::host::{ChangeSink, NotificationHandler, ProgressHost, SubscriptionId};
use crate::types::{ChangeEvent, ChangePayload, ContractChange, ContractEventKind, NotificationChannel};

#[derive(Debug, Default)]
struct HostValues {
    funds: f64,
    science: f32,
    reputation: f32,
    technologies: BTreeSet<String>,
    contracts: BTreeMap<String, ContractEventKind>,
    contract_list_events: u32,
}

/// Game state held in memory, notifying subscribers on every mutation
#[derive(Default)]
pub struct InMemoryHost {
    values: RefCell<HostValues>,
    subscribers: RefCell<Vec<(SubscriptionId, NotificationChannel, NotificationHandler)>>,
    next_id: Cell<u64>,
}

impl std::fmt::Debug for InMemoryHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryHost")
            .field("values", &self.values)
            .field("subscribers", &self.subscribers.borrow().len())
            .finish()
    }
}

impl InMemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Host starting with the given scalars, without notifying anyone
    pub fn with_values(funds: f64, science: f32, reputation: f32) -> Self {
        let host = Self::new();
        {
            let mut values = host.values.borrow_mut();
            values.funds = funds;
            values.science = science;
            values.reputation = reputation;
        }
        host
    }

    pub fn subscription_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    pub fn has_technology(&self, tech_id: &str) -> bool {
        self.values.borrow().technologies.contains(tech_id)
    }

    /// Last lifecycle event seen for a contract
    pub fn contract_state(&self, contract_id: &str) -> Option<ContractEventKind> {
        self.values.borrow().contracts.get(contract_id).copied()
    }

    pub fn contract_list_events(&self) -> u32 {
        self.values.borrow().contract_list_events
    }

    fn notify(&self, payload: ChangePayload) {
        let channel = payload.channel();
        // Handlers may read the host, so no borrow is held while they run
        let handlers: Vec<NotificationHandler> = self
            .subscribers
            .borrow()
            .iter()
            .filter(|(_, subscribed, _)| *subscribed == channel)
            .map(|(_, _, handler)| handler.clone())
            .collect();
        for handler in handlers {
            handler(&payload);
        }
    }
}

impl ProgressHost for InMemoryHost {
    fn funds(&self) -> f64 {
        self.values.borrow().funds
    }

    fn set_funds(&self, funds: f64) {
        self.values.borrow_mut().funds = funds;
        self.notify(ChangePayload::Funds(funds));
    }

    fn science(&self) -> f32 {
        self.values.borrow().science
    }

    fn set_science(&self, science: f32) {
        self.values.borrow_mut().science = science;
        self.notify(ChangePayload::Science(science));
    }

    fn reputation(&self) -> f32 {
        self.values.borrow().reputation
    }

    fn set_reputation(&self, reputation: f32) {
        self.values.borrow_mut().reputation = reputation;
        self.notify(ChangePayload::Reputation(reputation));
    }

    fn research_technology(&self, tech_id: &str) {
        let added = self.values.borrow_mut().technologies.insert(tech_id.to_string());
        if added {
            self.notify(ChangePayload::Technology {
                tech_id: tech_id.to_string(),
            });
        }
    }

    fn apply_contract_change(&self, change: &ContractChange) {
        {
            let mut values = self.values.borrow_mut();
            match &change.contract_id {
                Some(id) => {
                    values.contracts.insert(id.clone(), change.event);
                }
                None => values.contract_list_events += 1,
            }
        }
        self.notify(ChangePayload::Contract(change.clone()));
    }

    fn subscribe(&self, channel: NotificationChannel, handler: NotificationHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.subscribers.borrow_mut().push((id, channel, handler));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        let before = subscribers.len();
        subscribers.retain(|(subscribed, _, _)| *subscribed != id);
        subscribers.len() != before
    }
}

/// Outbound events queued in memory until drained
#[derive(Debug, Default)]
pub struct EventQueue {
    events: RefCell<VecDeque<ChangeEvent>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    pub fn drain(&self) -> Vec<ChangeEvent> {
        self.events.borrow_mut().drain(..).collect()
    }
}

impl ChangeSink for EventQueue {
    fn send_change_event(&self, event: ChangeEvent) {
        self.events.borrow_mut().push_back(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_setter_notifies_matching_channel_only() {
        let host = InMemoryHost::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        host.subscribe(
            NotificationChannel::Funds,
            Rc::new(move |payload: &ChangePayload| sink.borrow_mut().push(payload.clone())),
        );

        host.set_funds(10.0);
        host.set_science(3.0);

        assert_eq!(*seen.borrow(), vec![ChangePayload::Funds(10.0)]);
        assert_eq!(host.science(), 3.0);
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let host = InMemoryHost::new();
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        let id = host.subscribe(
            NotificationChannel::Science,
            Rc::new(move |_: &ChangePayload| counter.set(counter.get() + 1)),
        );
        host.set_science(1.0);
        assert!(host.unsubscribe(id));
        assert!(!host.unsubscribe(id));
        host.set_science(2.0);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_technology_notifies_once() {
        let host = InMemoryHost::new();
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        host.subscribe(
            NotificationChannel::Technology,
            Rc::new(move |_: &ChangePayload| counter.set(counter.get() + 1)),
        );
        host.research_technology("basicRocketry");
        host.research_technology("basicRocketry");
        assert_eq!(count.get(), 1);
        assert!(host.has_technology("basicRocketry"));
    }

    #[test]
    fn test_contract_changes_tracked() {
        let host = InMemoryHost::new();
        host.apply_contract_change(&ContractChange::new(ContractEventKind::Offered, "c-1"));
        host.apply_contract_change(&ContractChange::new(ContractEventKind::Accepted, "c-1"));
        host.apply_contract_change(&ContractChange::list_level(ContractEventKind::ListChanged));
        assert_eq!(host.contract_state("c-1"), Some(ContractEventKind::Accepted));
        assert_eq!(host.contract_list_events(), 1);
    }
}
