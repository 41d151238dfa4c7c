use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::{DataSource, SourceError};
use crate::models::Collection;

/// The last successfully fetched copy of a collection.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub records: Arc<Vec<Value>>,
    pub fetched_at: DateTime<Utc>,
    /// Ticket of the fetch that produced this snapshot.
    pub ticket: u64,
}

/// Result of a refresh: fresh data, or the last good copy when the backend failed.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub snapshot: Snapshot,
    pub stale: bool,
}

#[derive(Debug, Default)]
struct Slot {
    next_ticket: u64,
    current: Option<Snapshot>,
}

/// Last-good snapshots per collection.
///
/// Each fetch takes a ticket before going out; a result is only committed if
/// no later-issued fetch has already committed, so out-of-order responses
/// never overwrite newer data.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    slots: RwLock<HashMap<Collection, Slot>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn current(&self, collection: Collection) -> Option<Snapshot> {
        self.slots
            .read()
            .await
            .get(&collection)
            .and_then(|slot| slot.current.clone())
    }

    pub async fn begin_fetch(&self, collection: Collection) -> u64 {
        let mut slots = self.slots.write().await;
        let slot = slots.entry(collection).or_default();
        slot.next_ticket += 1;
        slot.next_ticket
    }

    /// Stores `records` unless a newer fetch already landed. Returns the
    /// snapshot now current.
    pub async fn commit(
        &self,
        collection: Collection,
        ticket: u64,
        records: Vec<Value>,
        fetched_at: DateTime<Utc>,
    ) -> Snapshot {
        let mut slots = self.slots.write().await;
        let slot = slots.entry(collection).or_default();
        if let Some(existing) = &slot.current {
            if existing.ticket > ticket {
                debug!(
                    "Discarding superseded {} fetch (ticket {} < {})",
                    collection, ticket, existing.ticket
                );
                return existing.clone();
            }
        }
        let snapshot = Snapshot {
            records: Arc::new(records),
            fetched_at,
            ticket,
        };
        slot.current = Some(snapshot.clone());
        snapshot
    }

    /// Fetches `collection` from `source`. On failure the last good snapshot
    /// is returned flagged stale; with none to fall back on the error propagates.
    pub async fn refresh(
        &self,
        source: &dyn DataSource,
        collection: Collection,
    ) -> Result<Loaded, SourceError> {
        let ticket = self.begin_fetch(collection).await;
        match source.list(collection).await {
            Ok(records) => {
                let snapshot = self.commit(collection, ticket, records, Utc::now()).await;
                Ok(Loaded {
                    snapshot,
                    stale: false,
                })
            }
            Err(e) => match self.current(collection).await {
                Some(snapshot) => {
                    warn!(
                        "Fetching {} failed, serving snapshot from {}: {}",
                        collection, snapshot.fetched_at, e
                    );
                    Ok(Loaded {
                        snapshot,
                        stale: true,
                    })
                }
                None => Err(e),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Answers `list` from a queue of canned results.
    struct Scripted {
        answers: Mutex<Vec<Result<Vec<Value>, SourceError>>>,
    }

    impl Scripted {
        fn new(mut answers: Vec<Result<Vec<Value>, SourceError>>) -> Self {
            answers.reverse();
            Self {
                answers: Mutex::new(answers),
            }
        }
    }

    #[async_trait]
    impl DataSource for Scripted {
        async fn list(&self, _collection: Collection) -> Result<Vec<Value>, SourceError> {
            self.answers
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Err(SourceError::Unavailable { attempts: 1 }))
        }

        async fn create(&self, _c: Collection, payload: Value) -> Result<Value, SourceError> {
            Ok(payload)
        }

        async fn update(
            &self,
            _c: Collection,
            _id: &str,
            payload: Value,
        ) -> Result<Value, SourceError> {
            Ok(payload)
        }

        async fn delete(&self, _c: Collection, _id: &str) -> Result<(), SourceError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_last_good() {
        let store = SnapshotStore::new();
        let source = Scripted::new(vec![
            Ok(vec![json!({"id": "c1"})]),
            Err(SourceError::Unavailable { attempts: 3 }),
        ]);

        let first = store.refresh(&source, Collection::Contacts).await.unwrap();
        assert!(!first.stale);

        let second = store.refresh(&source, Collection::Contacts).await.unwrap();
        assert!(second.stale);
        assert_eq!(second.snapshot.records.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_first_refresh_errors() {
        let store = SnapshotStore::new();
        let source = Scripted::new(vec![Err(SourceError::Unavailable { attempts: 3 })]);
        assert!(store.refresh(&source, Collection::Contacts).await.is_err());
    }

    #[tokio::test]
    async fn test_superseded_fetch_is_discarded() {
        let store = SnapshotStore::new();
        let older = store.begin_fetch(Collection::Contacts).await;
        let newer = store.begin_fetch(Collection::Contacts).await;

        store
            .commit(Collection::Contacts, newer, vec![json!({"id": "new"})], Utc::now())
            .await;
        let current = store
            .commit(Collection::Contacts, older, vec![json!({"id": "old"})], Utc::now())
            .await;

        assert_eq!(current.ticket, newer);
        assert_eq!(current.records[0]["id"], "new");
    }

    #[tokio::test]
    async fn test_collections_are_independent() {
        let store = SnapshotStore::new();
        let t = store.begin_fetch(Collection::Contacts).await;
        store.commit(Collection::Contacts, t, vec![], Utc::now()).await;
        assert!(store.current(Collection::Applications).await.is_none());
        assert_eq!(store.begin_fetch(Collection::Applications).await, 1);
    }
}
