//! Reconcile a server delta into a local store and partition the outcome.

use crate::SyncConfig;
use anno_types::{
    ChangeInventory, Keyed, ObjectConverter, ObjectUpdater, ServerUpdate, StoreEditor, SyncError,
};
use futures_util::stream::{self, StreamExt};
use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;

/// How one server object was applied to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Added,
    Updated,
    Unchanged,
}

/// Applies server deltas for one object type to a [`StoreEditor`].
///
/// Deletions are applied first. Server objects are then classified concurrently, at most
/// `max_concurrency` at a time; each ends up in exactly one partition of the returned
/// inventory, in input order within that partition. Without an updater, objects already in
/// the store are reported unchanged.
pub struct StoreServerQueryResultsHandler<K, O, S, St> {
    store: Arc<St>,
    converter: Arc<dyn ObjectConverter<S, O>>,
    updater: Option<Arc<dyn ObjectUpdater<O, S>>>,
    max_concurrency: usize,
    _key: PhantomData<fn() -> K>,
}

impl<K, O, S, St> StoreServerQueryResultsHandler<K, O, S, St>
where
    K: Clone + Debug + Send + Sync + 'static,
    O: Keyed<Key = K> + Send + Sync + 'static,
    S: Keyed<Key = K> + Send + Sync + 'static,
    St: StoreEditor<K, O> + 'static,
{
    pub fn new(
        store: Arc<St>,
        converter: Arc<dyn ObjectConverter<S, O>>,
        updater: Option<Arc<dyn ObjectUpdater<O, S>>>,
    ) -> Self {
        Self {
            store,
            converter,
            updater,
            max_concurrency: SyncConfig::default().max_concurrency,
            _key: PhantomData,
        }
    }

    pub fn with_config(mut self, config: &SyncConfig) -> Self {
        self.max_concurrency = config.max_concurrency.max(1);
        self
    }

    pub fn store(&self) -> &Arc<St> {
        &self.store
    }

    pub async fn process_server_update(
        &self,
        update: ServerUpdate<K, S>,
    ) -> Result<ChangeInventory<Arc<O>>, SyncError> {
        tracing::trace!(query_time = %update.query_time, "processing server update");
        self.process_server_objects(update.new_or_updated, update.deleted_ids)
            .await
    }

    /// Remove `deleted_ids`, then add or update every object in `server_objects`.
    ///
    /// If a classification task fails, the edits that did land are published to the store's
    /// observers before the error is returned, so no stored object goes unreported.
    pub async fn process_server_objects(
        &self,
        server_objects: Vec<S>,
        deleted_ids: Vec<K>,
    ) -> Result<ChangeInventory<Arc<O>>, SyncError> {
        let mut inventory = ChangeInventory::with_capacity(server_objects.len(), deleted_ids.len());
        self.delete(&deleted_ids, &mut inventory).await;
        if let Err(e) = self.insert_or_update(server_objects, &mut inventory).await {
            tracing::warn!(error = %e, counts = %inventory.counts(), "publishing partial batch");
            self.store.end_batch(&inventory).await?;
            return Err(e);
        }
        tracing::debug!(counts = %inventory.counts(), "reconciled server objects");
        Ok(inventory)
    }

    /// Publish the batch to the store's observers.
    pub async fn end_batch(&self, changes: &ChangeInventory<Arc<O>>) -> Result<(), SyncError> {
        self.store.end_batch(changes).await?;
        Ok(())
    }

    async fn delete(&self, keys: &[K], inventory: &mut ChangeInventory<Arc<O>>) {
        for key in keys {
            let removed = self.store.try_remove_object(key).await;
            if removed.is_none() {
                tracing::warn!(key = ?key, "deleted key was not in the local store");
            }
            inventory.deleted.push(removed);
        }
    }

    async fn insert_or_update(
        &self,
        server_objects: Vec<S>,
        inventory: &mut ChangeInventory<Arc<O>>,
    ) -> Result<(), SyncError> {
        let total = server_objects.len();
        let tasks = server_objects.into_iter().map(|server| {
            let store = Arc::clone(&self.store);
            let converter = Arc::clone(&self.converter);
            let updater = self.updater.clone();
            tokio::spawn(Self::classify(store, converter, updater, server))
        });
        // `buffered` yields in input order, so results stay positional.
        let results: Vec<_> = stream::iter(tasks)
            .buffered(self.max_concurrency)
            .collect()
            .await;
        if results.len() < total {
            return Err(SyncError::MissingResult {
                index: results.len(),
            });
        }

        // Every finished task is recorded, even past a failed one; the first failure wins.
        let mut failure = None;
        for (index, result) in results.into_iter().enumerate() {
            let (outcome, obj) = match result {
                Ok(classified) => classified,
                Err(e) => {
                    tracing::warn!(index, error = %e, "classification task failed");
                    failure.get_or_insert_with(|| SyncError::Task(format!("item {index}: {e}")));
                    continue;
                }
            };
            tracing::trace!(index, ?outcome, "classified server object");
            match outcome {
                Outcome::Added => inventory.added.push(obj),
                Outcome::Updated => inventory.updated.push(obj),
                Outcome::Unchanged => inventory.unchanged.push(obj),
            }
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn classify(
        store: Arc<St>,
        converter: Arc<dyn ObjectConverter<S, O>>,
        updater: Option<Arc<dyn ObjectUpdater<O, S>>>,
        server: S,
    ) -> (Outcome, Arc<O>) {
        let mut added = false;
        let obj = store
            .get_or_add(server.key(), |_| {
                added = true;
                converter.convert(&server)
            })
            .await;
        if added {
            return (Outcome::Added, obj);
        }
        let changed = match &updater {
            Some(updater) => updater.update(&obj, &server).await,
            None => false,
        };
        if changed {
            (Outcome::Updated, obj)
        } else {
            (Outcome::Unchanged, obj)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{StructureConverter, StructureObj, StructureUpdater};
    use crate::InMemoryStore;
    use anno_types::Structure;
    use chrono::Utc;

    type Handler = StoreServerQueryResultsHandler<
        i64,
        StructureObj,
        Structure,
        InMemoryStore<i64, StructureObj>,
    >;

    fn handler(with_updater: bool) -> Handler {
        let updater: Option<Arc<dyn ObjectUpdater<StructureObj, Structure>>> = if with_updater {
            Some(Arc::new(StructureUpdater))
        } else {
            None
        };
        Handler::new(
            Arc::new(InMemoryStore::new(16)),
            Arc::new(StructureConverter),
            updater,
        )
        .with_config(&SyncConfig {
            max_concurrency: 4,
            ..SyncConfig::default()
        })
    }

    fn structure(id: i64, verified: bool) -> Structure {
        Structure {
            id,
            type_id: 1,
            parent_id: None,
            label: None,
            notes: None,
            confidence: 1.0,
            verified,
            links: Vec::new(),
        }
    }

    fn ids(objs: &[Arc<StructureObj>]) -> Vec<i64> {
        objs.iter().map(|o| o.id()).collect()
    }

    #[tokio::test]
    async fn object_lifecycle_moves_through_partitions() {
        let h = handler(true);
        let now = Utc::now();

        let inv = h
            .process_server_update(ServerUpdate::single(now, structure(5, false), vec![]))
            .await
            .unwrap();
        assert_eq!(ids(&inv.added), vec![5]);

        let inv = h
            .process_server_update(ServerUpdate::single(now, structure(5, false), vec![]))
            .await
            .unwrap();
        assert_eq!(ids(&inv.unchanged), vec![5]);

        let inv = h
            .process_server_update(ServerUpdate::single(now, structure(5, true), vec![]))
            .await
            .unwrap();
        assert_eq!(ids(&inv.updated), vec![5]);

        let inv = h
            .process_server_update(ServerUpdate::deletions(now, vec![5]))
            .await
            .unwrap();
        assert_eq!(inv.deleted.len(), 1);
        assert_eq!(inv.deleted_objects().map(|o| o.id()).collect::<Vec<_>>(), vec![5]);
        assert!(h.store().try_get_object(&5).await.is_none());

        let inv = h
            .process_server_update(ServerUpdate::single(now, structure(5, true), vec![]))
            .await
            .unwrap();
        assert_eq!(ids(&inv.added), vec![5]);
    }

    #[tokio::test]
    async fn absent_deletion_is_recorded_as_missing() {
        let h = handler(true);
        let inv = h
            .process_server_objects(vec![structure(1, false)], vec![42])
            .await
            .unwrap();
        assert_eq!(inv.deleted.len(), 1);
        assert!(inv.deleted[0].is_none());
        assert_eq!(ids(&inv.added), vec![1]);
    }

    #[tokio::test]
    async fn without_updater_existing_objects_are_unchanged() {
        let h = handler(false);
        h.process_server_objects(vec![structure(1, false)], vec![])
            .await
            .unwrap();
        let inv = h
            .process_server_objects(vec![structure(1, true)], vec![])
            .await
            .unwrap();
        assert_eq!(ids(&inv.unchanged), vec![1]);
        assert!(!h.store().try_get_object(&1).await.unwrap().state().await.verified);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn duplicate_keys_in_one_batch_add_once() {
        let h = handler(true);
        let batch = vec![structure(9, false); 12];
        let inv = h.process_server_objects(batch, vec![]).await.unwrap();

        assert_eq!(inv.added.len(), 1);
        assert_eq!(inv.added.len() + inv.updated.len() + inv.unchanged.len(), 12);
        let first = &inv.added[0];
        assert!(inv.unchanged.iter().all(|o| Arc::ptr_eq(o, first)));
    }

    #[tokio::test]
    async fn partitions_keep_input_order() {
        let h = handler(true);
        let batch: Vec<_> = (0..40).map(|id| structure(id, false)).collect();
        let inv = h.process_server_objects(batch, vec![]).await.unwrap();
        assert_eq!(ids(&inv.added), (0..40).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn delete_then_readd_in_one_update_is_added() {
        let h = handler(true);
        h.process_server_objects(vec![structure(3, false)], vec![])
            .await
            .unwrap();
        let inv = h
            .process_server_objects(vec![structure(3, false)], vec![3])
            .await
            .unwrap();
        assert_eq!(inv.deleted_objects().count(), 1);
        assert_eq!(ids(&inv.added), vec![3]);
    }

    struct FailingUpdater(i64);

    #[async_trait::async_trait]
    impl ObjectUpdater<StructureObj, Structure> for FailingUpdater {
        async fn update(&self, _local: &StructureObj, server: &Structure) -> bool {
            if server.id == self.0 {
                panic!("updater failed on structure {}", server.id);
            }
            false
        }
    }

    #[tokio::test]
    async fn failed_task_still_publishes_the_objects_it_stored() {
        let store: Arc<InMemoryStore<i64, StructureObj>> = Arc::new(InMemoryStore::new(16));
        let h = Handler::new(
            Arc::clone(&store),
            Arc::new(StructureConverter),
            Some(Arc::new(FailingUpdater(2))),
        );
        h.process_server_objects(vec![structure(2, false)], vec![])
            .await
            .unwrap();
        let mut rx = store.subscribe();

        let err = h
            .process_server_objects(
                vec![structure(5, false), structure(2, true), structure(6, false)],
                vec![],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Task(_)));

        let batch = rx.try_recv().unwrap();
        assert_eq!(batch.counts.added, 2);
        assert_eq!(ids(&batch.changes.added), vec![5, 6]);
        assert_eq!(store.len().await, 3);

        // a replay sees the published objects as already stored
        let inv = h
            .process_server_objects(vec![structure(5, false), structure(6, false)], vec![])
            .await
            .unwrap();
        assert_eq!(ids(&inv.unchanged), vec![5, 6]);
    }

    #[tokio::test]
    async fn end_batch_reaches_store_observers() {
        let h = handler(true);
        let mut rx = h.store().subscribe();
        let inv = h
            .process_server_objects(vec![structure(1, false), structure(2, false)], vec![])
            .await
            .unwrap();
        h.end_batch(&inv).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().counts.added, 2);
    }
}
