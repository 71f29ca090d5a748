use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, DateTime as BsonDateTime, Document};
use mongodb::change_stream::event::{OperationType, ResumeToken};
use mongodb::options::FullDocumentType;
use mongodb::Collection;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::broadcast;

use super::{normalize_status, ChangeFeed, CustomerEvent, CustomerRepository, StoreError};
use crate::database::MongoDB;
use crate::models::{Customer, CustomerStatus};

/// Stored shape: one document per customer, keyed by the customer id.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CustomerDocument {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    email: String,
    #[serde(rename = "phoneNumber")]
    phone_number: String,
    status: CustomerStatus,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    created_at: Option<BsonDateTime>,
    #[serde(rename = "expiryDate", default, skip_serializing_if = "Option::is_none")]
    expiry_date: Option<BsonDateTime>,
}

fn to_bson_date(date: DateTime<Utc>) -> BsonDateTime {
    BsonDateTime::from_millis(date.timestamp_millis())
}

fn from_bson_date(date: BsonDateTime) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(date.timestamp_millis())
}

impl From<&Customer> for CustomerDocument {
    fn from(customer: &Customer) -> Self {
        CustomerDocument {
            id: customer.id.clone(),
            name: customer.name.clone(),
            email: customer.email.clone(),
            phone_number: customer.phone_number.clone(),
            status: customer.status,
            created_at: customer.created_at.map(to_bson_date),
            expiry_date: customer.expiry_date.map(to_bson_date),
        }
    }
}

impl From<CustomerDocument> for Customer {
    fn from(document: CustomerDocument) -> Self {
        Customer {
            id: document.id,
            name: document.name,
            email: document.email,
            phone_number: document.phone_number,
            status: document.status,
            created_at: document.created_at.and_then(from_bson_date),
            expiry_date: document.expiry_date.and_then(from_bson_date),
        }
    }
}

fn unavailable(e: mongodb::error::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

const STREAM_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Maps one change stream notification of the `status` collection to a feed
/// event. A switch shows up as a delete in the source collection and an
/// insert in the destination.
fn partition_event(
    status: CustomerStatus,
    operation: &OperationType,
    key: Option<&Document>,
    document: Option<CustomerDocument>,
) -> Option<CustomerEvent> {
    match operation {
        OperationType::Insert | OperationType::Replace | OperationType::Update => {
            document.map(|d| CustomerEvent::Added {
                status,
                customer: normalize_status(Customer::from(d), status),
            })
        }
        OperationType::Delete => key
            .and_then(|key| key.get_str("_id").ok())
            .map(|id| CustomerEvent::Removed {
                status,
                id: id.to_string(),
            }),
        _ => None,
    }
}

/// Follows one collection forever, resuming after the last seen event when
/// the stream drops.
async fn follow_partition(
    collection: Collection<CustomerDocument>,
    status: CustomerStatus,
    feed: ChangeFeed,
) {
    let mut resume_token: Option<ResumeToken> = None;

    loop {
        let mut watch = collection.watch().full_document(FullDocumentType::UpdateLookup);
        if let Some(token) = resume_token.clone() {
            watch = watch.resume_after(token);
        }

        match watch.await {
            Ok(mut stream) => {
                log::info!("👀 Watching {} for changes", status.collection_name());
                loop {
                    match stream.try_next().await {
                        Ok(Some(change)) => {
                            resume_token = stream.resume_token();
                            let event = partition_event(
                                status,
                                &change.operation_type,
                                change.document_key.as_ref(),
                                change.full_document,
                            );
                            if let Some(event) = event {
                                feed.publish(event);
                            }
                        }
                        Ok(None) => break,
                        Err(e) => {
                            log::warn!("⚠️  Change stream on {} failed: {}", status.collection_name(), e);
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                log::error!("❌ Could not open change stream on {}: {}", status.collection_name(), e);
            }
        }

        tokio::time::sleep(STREAM_RETRY_DELAY).await;
    }
}

/// MongoDB backend: one collection per status, status switches run inside a
/// multi-document transaction (requires a replica set or sharded cluster).
/// Writes from any process reach subscribers through per-collection change
/// streams once `start_change_streams` has run.
#[derive(Clone)]
pub struct MongoCustomerStore {
    db: MongoDB,
    feed: ChangeFeed,
}

impl MongoCustomerStore {
    pub fn new(db: MongoDB) -> Self {
        Self {
            db,
            feed: ChangeFeed::new(),
        }
    }

    fn collection(&self, status: CustomerStatus) -> Collection<CustomerDocument> {
        self.db.collection::<CustomerDocument>(&status.collection_name())
    }

    /// Spawns one change stream follower per status collection.
    pub fn start_change_streams(&self) {
        for status in CustomerStatus::ALL {
            tokio::spawn(follow_partition(self.collection(status), status, self.feed.clone()));
        }
        log::info!("📡 Change streams started for {} collections", CustomerStatus::ALL.len());
    }
}

#[async_trait]
impl CustomerRepository for MongoCustomerStore {
    async fn insert(&self, status: CustomerStatus, customer: &Customer) -> Result<(), StoreError> {
        let document = CustomerDocument::from(customer);

        self.collection(status)
            .replace_one(doc! { "_id": &customer.id }, &document)
            .upsert(true)
            .await
            .map_err(unavailable)?;

        Ok(())
    }

    async fn list(&self, status: CustomerStatus) -> Result<Vec<Customer>, StoreError> {
        let cursor = self
            .collection(status)
            .find(doc! {})
            .await
            .map_err(unavailable)?;

        let documents: Vec<CustomerDocument> = cursor
            .try_collect()
            .await
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        Ok(documents
            .into_iter()
            .map(|d| normalize_status(Customer::from(d), status))
            .collect())
    }

    async fn get(&self, status: CustomerStatus, id: &str) -> Result<Option<Customer>, StoreError> {
        let document = self
            .collection(status)
            .find_one(doc! { "_id": id })
            .await
            .map_err(unavailable)?;

        Ok(document.map(|d| normalize_status(Customer::from(d), status)))
    }

    async fn remove(&self, status: CustomerStatus, id: &str) -> Result<bool, StoreError> {
        let result = self
            .collection(status)
            .delete_one(doc! { "_id": id })
            .await
            .map_err(unavailable)?;

        Ok(result.deleted_count > 0)
    }

    async fn relocate(
        &self,
        from: CustomerStatus,
        to: CustomerStatus,
        customer: &Customer,
    ) -> Result<(), StoreError> {
        let document = CustomerDocument::from(customer);
        let source = self.collection(from);
        let destination = self.collection(to);

        let mut session = self.db.client().start_session().await.map_err(unavailable)?;
        session
            .start_transaction()
            .await
            .map_err(|e| StoreError::CommitFailed(e.to_string()))?;

        let writes = async {
            source
                .delete_one(doc! { "_id": &customer.id })
                .session(&mut session)
                .await?;
            destination
                .replace_one(doc! { "_id": &customer.id }, &document)
                .upsert(true)
                .session(&mut session)
                .await?;
            Ok::<(), mongodb::error::Error>(())
        }
        .await;

        match writes {
            Ok(()) => session
                .commit_transaction()
                .await
                .map_err(|e| StoreError::CommitFailed(e.to_string())),
            Err(e) => {
                if let Err(abort_err) = session.abort_transaction().await {
                    log::warn!("⚠️  Failed to abort transaction for {}: {}", customer.id, abort_err);
                }
                Err(StoreError::CommitFailed(e.to_string()))
            }
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<CustomerEvent> {
        self.feed.subscribe()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.db
            .database()
            .list_collection_names()
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "mongodb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_round_trips_timestamps_at_millisecond_precision() {
        let created = DateTime::<Utc>::from_timestamp_millis(1_700_000_000_123).unwrap();
        let customer = Customer {
            id: "c1".to_string(),
            name: "Ada Lovelace".to_string(),
            email: "ada@x.co".to_string(),
            phone_number: "555-0100".to_string(),
            status: CustomerStatus::Pending,
            created_at: Some(created),
            expiry_date: None,
        };

        let document = CustomerDocument::from(&customer);
        assert_eq!(document.created_at.map(|d| d.timestamp_millis()), Some(1_700_000_000_123));
        assert_eq!(Customer::from(document), customer);
    }

    #[test]
    fn delete_notifications_become_removals() {
        let key = doc! { "_id": "c1" };

        let event = partition_event(CustomerStatus::Active, &OperationType::Delete, Some(&key), None);

        assert_eq!(
            event,
            Some(CustomerEvent::Removed {
                status: CustomerStatus::Active,
                id: "c1".to_string(),
            })
        );
    }

    #[test]
    fn upserts_become_additions_in_the_watched_partition() {
        let customer = Customer {
            id: "c1".to_string(),
            name: "Ada Lovelace".to_string(),
            email: "ada@x.co".to_string(),
            phone_number: "555-0100".to_string(),
            status: CustomerStatus::Pending,
            created_at: None,
            expiry_date: None,
        };

        let event = partition_event(
            CustomerStatus::OneYear,
            &OperationType::Replace,
            None,
            Some(CustomerDocument::from(&customer)),
        );

        match event {
            Some(CustomerEvent::Added { status, customer }) => {
                assert_eq!(status, CustomerStatus::OneYear);
                assert_eq!(customer.status, CustomerStatus::OneYear);
            }
            other => panic!("expected an addition, got {:?}", other),
        }
        assert_eq!(partition_event(CustomerStatus::Pending, &OperationType::Drop, None, None), None);
    }

    #[tokio::test]
    #[ignore] // Requires a MongoDB replica set (transactions)
    async fn test_mongodb_relocate() {
        dotenv::dotenv().ok();
        let uri = std::env::var("DATABASE_URL").unwrap();
        let store = MongoCustomerStore::new(MongoDB::new(&uri).await.unwrap());

        let customer = Customer {
            id: uuid::Uuid::new_v4().to_string(),
            name: "Ada Lovelace".to_string(),
            email: "ada@x.co".to_string(),
            phone_number: "555-0100".to_string(),
            status: CustomerStatus::Pending,
            created_at: Some(Utc::now()),
            expiry_date: None,
        };

        store.insert(CustomerStatus::Pending, &customer).await.unwrap();
        store
            .relocate(CustomerStatus::Pending, CustomerStatus::Active, &customer.with_status(CustomerStatus::Active))
            .await
            .unwrap();

        assert!(store.get(CustomerStatus::Pending, &customer.id).await.unwrap().is_none());
        assert!(store.get(CustomerStatus::Active, &customer.id).await.unwrap().is_some());
        assert!(store.remove(CustomerStatus::Active, &customer.id).await.unwrap());
    }

    #[tokio::test]
    #[ignore] // Requires a MongoDB replica set (change streams)
    async fn test_mongodb_change_streams_report_other_writers() {
        dotenv::dotenv().ok();
        let uri = std::env::var("DATABASE_URL").unwrap();
        let watcher = MongoCustomerStore::new(MongoDB::new(&uri).await.unwrap());
        let writer = MongoCustomerStore::new(MongoDB::new(&uri).await.unwrap());
        watcher.start_change_streams();
        let mut rx = watcher.subscribe();
        tokio::time::sleep(Duration::from_secs(1)).await;

        let customer = Customer {
            id: uuid::Uuid::new_v4().to_string(),
            name: "Grace Hopper".to_string(),
            email: "grace@x.co".to_string(),
            phone_number: "555-0101".to_string(),
            status: CustomerStatus::Pending,
            created_at: Some(Utc::now()),
            expiry_date: None,
        };
        writer.insert(CustomerStatus::Pending, &customer).await.unwrap();

        let event = tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                if let CustomerEvent::Added { customer: seen, .. } = rx.recv().await.unwrap() {
                    if seen.id == customer.id {
                        return seen;
                    }
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(event.status, CustomerStatus::Pending);
        assert!(writer.remove(CustomerStatus::Pending, &customer.id).await.unwrap());
    }
}
