use std::collections::HashMap;

use crate::models::{Customer, CustomerStatus};
use crate::store::CustomerEvent;

/// How one event changed a live list.
#[derive(Debug, Clone, PartialEq)]
pub enum ListChange {
    Upserted(Customer),
    Removed(String),
}

/// Materialized view of one status partition, kept current by feed events.
#[derive(Debug, Clone)]
pub struct LiveList {
    status: CustomerStatus,
    customers: HashMap<String, Customer>,
}

impl LiveList {
    pub fn new(status: CustomerStatus, snapshot: Vec<Customer>) -> Self {
        let customers = snapshot
            .into_iter()
            .map(|customer| (customer.id.clone(), customer))
            .collect();
        Self { status, customers }
    }

    pub fn status(&self) -> CustomerStatus {
        self.status
    }

    /// Applies an event. `None` means the view did not change.
    pub fn apply(&mut self, event: &CustomerEvent) -> Option<ListChange> {
        if !event.touches(self.status) {
            return None;
        }

        match event {
            CustomerEvent::Added { customer, .. } => Some(self.upsert(customer)),
            CustomerEvent::Moved { to, customer, .. } if *to == self.status => {
                Some(self.upsert(customer))
            }
            CustomerEvent::Moved { customer, .. } => self.remove(&customer.id),
            CustomerEvent::Removed { id, .. } => self.remove(id),
        }
    }

    fn upsert(&mut self, customer: &Customer) -> ListChange {
        self.customers.insert(customer.id.clone(), customer.clone());
        ListChange::Upserted(customer.clone())
    }

    fn remove(&mut self, id: &str) -> Option<ListChange> {
        self.customers
            .remove(id)
            .map(|_| ListChange::Removed(id.to_string()))
    }

    /// Current records, newest first.
    pub fn customers(&self) -> Vec<Customer> {
        let mut customers: Vec<Customer> = self.customers.values().cloned().collect();
        sort_newest_first(&mut customers);
        customers
    }

    pub fn len(&self) -> usize {
        self.customers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.customers.is_empty()
    }

    /// Message shown in place of the list, if it is empty.
    pub fn empty_message(&self) -> Option<String> {
        self.is_empty().then(|| empty_message(self.status))
    }
}

pub fn empty_message(status: CustomerStatus) -> String {
    format!("No {} customers.", status.label().to_lowercase())
}

/// Order does not matter to callers; this just keeps responses stable.
pub fn sort_newest_first(customers: &mut [Customer]) {
    customers.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn customer(id: &str, status: CustomerStatus) -> Customer {
        Customer {
            id: id.to_string(),
            name: id.to_uppercase(),
            email: format!("{}@x.co", id),
            phone_number: "555-0100".to_string(),
            status,
            created_at: Some(Utc::now()),
            expiry_date: None,
        }
    }

    #[test]
    fn follows_moves_in_and_out() {
        let mut pending = LiveList::new(CustomerStatus::Pending, vec![customer("a", CustomerStatus::Pending)]);
        let mut active = LiveList::new(CustomerStatus::Active, vec![]);
        assert!(active.is_empty());

        let event = CustomerEvent::Moved {
            from: CustomerStatus::Pending,
            to: CustomerStatus::Active,
            customer: customer("a", CustomerStatus::Active),
        };

        assert_eq!(pending.apply(&event), Some(ListChange::Removed("a".to_string())));
        assert!(matches!(active.apply(&event), Some(ListChange::Upserted(_))));
        assert!(pending.is_empty());
        assert_eq!(pending.empty_message().as_deref(), Some("No pending customers."));
        assert_eq!(active.empty_message(), None);
        assert_eq!(active.customers()[0].status, CustomerStatus::Active);
    }

    #[test]
    fn ignores_other_partitions() {
        let mut list = LiveList::new(CustomerStatus::OneYear, vec![]);

        let change = list.apply(&CustomerEvent::Added {
            status: CustomerStatus::Pending,
            customer: customer("a", CustomerStatus::Pending),
        });

        assert_eq!(change, None);
        assert_eq!(list.len(), 0);
        assert_eq!(list.empty_message().as_deref(), Some("No one year customers."));
    }

    #[test]
    fn removing_unknown_id_is_not_a_change() {
        let mut list = LiveList::new(CustomerStatus::Pending, vec![customer("a", CustomerStatus::Pending)]);

        let change = list.apply(&CustomerEvent::Removed {
            status: CustomerStatus::Pending,
            id: "ghost".to_string(),
        });
        assert_eq!(change, None);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn newest_first() {
        let mut older = customer("old", CustomerStatus::Pending);
        older.created_at = Some(Utc::now() - Duration::days(3));
        let newer = customer("new", CustomerStatus::Pending);

        let list = LiveList::new(CustomerStatus::Pending, vec![older, newer]);
        let ids: Vec<_> = list.customers().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["new", "old"]);
    }
}
