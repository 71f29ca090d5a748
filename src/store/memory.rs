use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{broadcast, RwLock};

use super::{normalize_status, ChangeFeed, CustomerEvent, CustomerRepository, StoreError};
use crate::models::{Customer, CustomerStatus};

/// In-process store. A single lock guards every partition, which is what makes
/// `relocate` atomic here. Events are published before the lock is released,
/// so subscribers see writes in commit order.
#[derive(Default)]
pub struct InMemoryStore {
    partitions: RwLock<HashMap<CustomerStatus, HashMap<String, Customer>>>,
    feed: ChangeFeed,
    fail_next_commit: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `relocate` reject without touching any partition.
    #[cfg(test)]
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl CustomerRepository for InMemoryStore {
    async fn insert(&self, status: CustomerStatus, customer: &Customer) -> Result<(), StoreError> {
        let mut partitions = self.partitions.write().await;
        partitions
            .entry(status)
            .or_default()
            .insert(customer.id.clone(), customer.clone());
        self.feed.publish(CustomerEvent::Added {
            status,
            customer: customer.clone(),
        });
        Ok(())
    }

    async fn list(&self, status: CustomerStatus) -> Result<Vec<Customer>, StoreError> {
        let partitions = self.partitions.read().await;
        Ok(partitions
            .get(&status)
            .map(|partition| {
                partition
                    .values()
                    .cloned()
                    .map(|c| normalize_status(c, status))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get(&self, status: CustomerStatus, id: &str) -> Result<Option<Customer>, StoreError> {
        let partitions = self.partitions.read().await;
        Ok(partitions
            .get(&status)
            .and_then(|partition| partition.get(id))
            .cloned()
            .map(|c| normalize_status(c, status)))
    }

    async fn remove(&self, status: CustomerStatus, id: &str) -> Result<bool, StoreError> {
        let mut partitions = self.partitions.write().await;
        let removed = partitions
            .get_mut(&status)
            .and_then(|partition| partition.remove(id))
            .is_some();
        if removed {
            self.feed.publish(CustomerEvent::Removed {
                status,
                id: id.to_string(),
            });
        }
        Ok(removed)
    }

    async fn relocate(
        &self,
        from: CustomerStatus,
        to: CustomerStatus,
        customer: &Customer,
    ) -> Result<(), StoreError> {
        let mut partitions = self.partitions.write().await;

        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(StoreError::CommitFailed("injected commit failure".to_string()));
        }

        if let Some(source) = partitions.get_mut(&from) {
            source.remove(&customer.id);
        }
        partitions
            .entry(to)
            .or_default()
            .insert(customer.id.clone(), customer.clone());
        self.feed.publish(CustomerEvent::Moved {
            from,
            to,
            customer: customer.clone(),
        });

        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<CustomerEvent> {
        self.feed.subscribe()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer(id: &str, status: CustomerStatus) -> Customer {
        Customer {
            id: id.to_string(),
            name: format!("Customer {}", id),
            email: format!("{}@x.co", id),
            phone_number: "555-0100".to_string(),
            status,
            created_at: None,
            expiry_date: None,
        }
    }

    #[tokio::test]
    async fn relocate_moves_between_partitions() {
        let store = InMemoryStore::new();
        let c = customer("c1", CustomerStatus::Pending);
        store.insert(CustomerStatus::Pending, &c).await.unwrap();

        store
            .relocate(CustomerStatus::Pending, CustomerStatus::Active, &c.with_status(CustomerStatus::Active))
            .await
            .unwrap();

        assert!(store.get(CustomerStatus::Pending, "c1").await.unwrap().is_none());
        let moved = store.get(CustomerStatus::Active, "c1").await.unwrap().unwrap();
        assert_eq!(moved.status, CustomerStatus::Active);
    }

    #[tokio::test]
    async fn failed_commit_leaves_partitions_untouched() {
        let store = InMemoryStore::new();
        let c = customer("c1", CustomerStatus::Pending);
        store.insert(CustomerStatus::Pending, &c).await.unwrap();

        store.fail_next_commit();
        let result = store
            .relocate(CustomerStatus::Pending, CustomerStatus::Active, &c.with_status(CustomerStatus::Active))
            .await;

        assert!(matches!(result, Err(StoreError::CommitFailed(_))));
        assert!(store.get(CustomerStatus::Pending, "c1").await.unwrap().is_some());
        assert!(store.list(CustomerStatus::Active).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_reports_missing_ids() {
        let store = InMemoryStore::new();
        store
            .insert(CustomerStatus::OneYear, &customer("c1", CustomerStatus::OneYear))
            .await
            .unwrap();

        assert!(store.remove(CustomerStatus::OneYear, "c1").await.unwrap());
        assert!(!store.remove(CustomerStatus::OneYear, "c1").await.unwrap());
        assert!(!store.remove(CustomerStatus::Pending, "ghost").await.unwrap());
    }

    #[tokio::test]
    async fn committed_writes_reach_subscribers() {
        let store = InMemoryStore::new();
        let mut rx = store.subscribe();
        let c = customer("c1", CustomerStatus::Pending);

        store.insert(CustomerStatus::Pending, &c).await.unwrap();
        store
            .relocate(CustomerStatus::Pending, CustomerStatus::Active, &c.with_status(CustomerStatus::Active))
            .await
            .unwrap();
        assert!(!store.remove(CustomerStatus::Pending, "c1").await.unwrap());
        assert!(store.remove(CustomerStatus::Active, "c1").await.unwrap());

        assert!(matches!(rx.recv().await.unwrap(), CustomerEvent::Added { status: CustomerStatus::Pending, .. }));
        assert!(matches!(
            rx.recv().await.unwrap(),
            CustomerEvent::Moved { from: CustomerStatus::Pending, to: CustomerStatus::Active, .. }
        ));
        assert_eq!(
            rx.recv().await.unwrap(),
            CustomerEvent::Removed { status: CustomerStatus::Active, id: "c1".to_string() }
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn rejected_commit_publishes_nothing() {
        let store = InMemoryStore::new();
        let c = customer("c1", CustomerStatus::Pending);
        store.insert(CustomerStatus::Pending, &c).await.unwrap();
        let mut rx = store.subscribe();

        store.fail_next_commit();
        let _ = store
            .relocate(CustomerStatus::Pending, CustomerStatus::Active, &c.with_status(CustomerStatus::Active))
            .await;

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn reads_normalize_mismatched_status() {
        let store = InMemoryStore::new();
        store
            .insert(CustomerStatus::OneMonth, &customer("c1", CustomerStatus::Pending))
            .await
            .unwrap();

        let listed = store.list(CustomerStatus::OneMonth).await.unwrap();
        assert_eq!(listed[0].status, CustomerStatus::OneMonth);
    }
}
