// ==================== CHANGE FEED ====================
// Committed customer writes, as reported by the store backend. Live lists
// follow a partition by subscribing here instead of polling.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::models::{Customer, CustomerStatus};

const FEED_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CustomerEvent {
    Added {
        status: CustomerStatus,
        customer: Customer,
    },
    Removed {
        status: CustomerStatus,
        id: String,
    },
    Moved {
        from: CustomerStatus,
        to: CustomerStatus,
        customer: Customer,
    },
}

impl CustomerEvent {
    /// Whether a subscriber of `status` needs to see this event.
    pub fn touches(&self, status: CustomerStatus) -> bool {
        match self {
            CustomerEvent::Added { status: s, .. } | CustomerEvent::Removed { status: s, .. } => {
                *s == status
            }
            CustomerEvent::Moved { from, to, .. } => *from == status || *to == status,
        }
    }
}

#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<CustomerEvent>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(FEED_CAPACITY);
        Self { sender }
    }

    pub fn publish(&self, event: CustomerEvent) {
        // No subscribers is the normal idle state
        if let Ok(receivers) = self.sender.send(event) {
            log::debug!("📣 Customer event delivered to {} subscriber(s)", receivers);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CustomerEvent> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer(status: CustomerStatus) -> Customer {
        Customer {
            id: "c1".to_string(),
            name: "Ada".to_string(),
            email: "ada@x.co".to_string(),
            phone_number: "555-0100".to_string(),
            status,
            created_at: None,
            expiry_date: None,
        }
    }

    #[test]
    fn moved_event_touches_both_partitions() {
        let event = CustomerEvent::Moved {
            from: CustomerStatus::Pending,
            to: CustomerStatus::OneYear,
            customer: customer(CustomerStatus::OneYear),
        };

        assert!(event.touches(CustomerStatus::Pending));
        assert!(event.touches(CustomerStatus::OneYear));
        assert!(!event.touches(CustomerStatus::Active));
    }

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let feed = ChangeFeed::new();
        let mut rx = feed.subscribe();

        feed.publish(CustomerEvent::Removed {
            status: CustomerStatus::Pending,
            id: "c1".to_string(),
        });

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, CustomerEvent::Removed { ref id, .. } if id == "c1"));
    }

    #[test]
    fn publishing_without_subscribers_is_silent() {
        let feed = ChangeFeed::new();
        feed.publish(CustomerEvent::Added {
            status: CustomerStatus::Pending,
            customer: customer(CustomerStatus::Pending),
        });
    }
}
