// ==================== CUSTOMER OPERATIONS ====================
// Add, delete, list and status switches over the partitioned store.
// Live lists follow the store's change feed, so they see every committed
// write, including ones made by other instances.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::live_list::{sort_newest_first, LiveList};
use crate::{
    api::metrics,
    models::{Customer, CustomerStatus, NewCustomerRequest},
    store::{CustomerEvent, CustomerRepository},
    utils::error::AppError,
};

#[derive(Debug, Clone, PartialEq)]
pub enum SwitchOutcome {
    /// Target equals current status; nothing was written
    Unchanged(Customer),
    Moved(Customer),
}

#[derive(Clone)]
pub struct CustomerService {
    repo: Arc<dyn CustomerRepository>,
}

impl CustomerService {
    pub fn new(repo: Arc<dyn CustomerRepository>) -> Self {
        Self { repo }
    }

    pub fn backend(&self) -> &'static str {
        self.repo.backend()
    }

    pub async fn ping(&self) -> Result<(), AppError> {
        self.repo.ping().await.map_err(AppError::from)
    }

    /// Creates a customer in the partition of the selected view.
    pub async fn add_customer(
        &self,
        view: CustomerStatus,
        request: &NewCustomerRequest,
    ) -> Result<Customer, AppError> {
        let request = request.validate().map_err(AppError::InvalidRequest)?;

        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name: request.name,
            email: request.email,
            phone_number: request.phone,
            status: view,
            created_at: Some(Utc::now()),
            expiry_date: None,
        };

        self.repo.insert(view, &customer).await.map_err(|e| {
            log::error!("❌ Failed to add customer to {}: {}", view.collection_name(), e);
            AppError::from(e)
        })?;

        log::info!("✅ Customer {} added to the {} list", customer.id, view);
        metrics::record_customer_added();

        Ok(customer)
    }

    pub async fn get_customer(&self, status: CustomerStatus, id: &str) -> Result<Customer, AppError> {
        self.repo
            .get(status, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Customer {} in {} list", id, status)))
    }

    /// Removes one record. Unknown ids are a no-op and return `false`.
    pub async fn delete_customer(&self, status: CustomerStatus, id: &str) -> Result<bool, AppError> {
        let deleted = self.repo.remove(status, id).await.map_err(|e| {
            log::error!("❌ Failed to delete customer {} from {}: {}", id, status.collection_name(), e);
            AppError::from(e)
        })?;

        if deleted {
            log::info!("🗑️  Customer {} deleted from the {} list", id, status);
            metrics::record_customer_deleted();
        } else {
            log::debug!("Customer {} was not in the {} list", id, status);
        }

        Ok(deleted)
    }

    /// Moves a customer between status partitions in one atomic commit.
    ///
    /// Same-to-same is answered without any store call. There is no check
    /// against concurrent switches or deletes of the same id between the read
    /// and the commit.
    pub async fn switch_status(
        &self,
        from: CustomerStatus,
        id: &str,
        to: CustomerStatus,
    ) -> Result<SwitchOutcome, AppError> {
        if from == to {
            log::info!("↔️  Customer {} already {}, skipping switch", id, to);
            let current = self.get_customer(from, id).await?;
            return Ok(SwitchOutcome::Unchanged(current));
        }

        let current = self.get_customer(from, id).await?;
        let moved = current.with_status(to);

        if let Err(e) = self.repo.relocate(from, to, &moved).await {
            log::error!("❌ Error switching customer {} from {} to {}: {}", id, from, to, e);
            metrics::record_status_switch(false);
            return Err(AppError::CommitFailed(e.to_string()));
        }

        log::info!("🔀 Customer {} moved from {} to {}", id, from, to);
        metrics::record_status_switch(true);

        Ok(SwitchOutcome::Moved(moved))
    }

    /// All records of a partition, newest first.
    pub async fn list_customers(&self, status: CustomerStatus) -> Result<Vec<Customer>, AppError> {
        let mut customers = self.repo.list(status).await?;
        sort_newest_first(&mut customers);
        Ok(customers)
    }

    /// Snapshot plus a receiver subscribed before the snapshot was read, so no
    /// committed write can fall between the two.
    pub async fn watch(
        &self,
        status: CustomerStatus,
    ) -> Result<(LiveList, broadcast::Receiver<CustomerEvent>), AppError> {
        let receiver = self.repo.subscribe();
        let snapshot = self.repo.list(status).await?;
        Ok((LiveList::new(status, snapshot), receiver))
    }
}
