//! In-memory keyed object store with batched change notifications.

use anno_types::{ChangeCounts, ChangeInventory, Keyed, StoreEditor, StoreError};
use async_trait::async_trait;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// One notification per non-empty batch.
#[derive(Debug)]
pub struct StoreBatch<O> {
    pub counts: ChangeCounts,
    pub changes: ChangeInventory<Arc<O>>,
}

/// Local store of shared objects keyed by `K`.
///
/// Edits take effect immediately; observers hear about them only through [`end_batch`].
///
/// [`end_batch`]: StoreEditor::end_batch
pub struct InMemoryStore<K, O> {
    objects: Arc<RwLock<HashMap<K, Arc<O>>>>,
    batches: broadcast::Sender<Arc<StoreBatch<O>>>,
}

impl<K, O> InMemoryStore<K, O>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    O: Keyed<Key = K> + Send + Sync + 'static,
{
    pub fn new(notify_capacity: usize) -> Self {
        let (batches, _) = broadcast::channel(notify_capacity.max(1));
        Self {
            objects: Arc::new(RwLock::new(HashMap::new())),
            batches,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<StoreBatch<O>>> {
        self.batches.subscribe()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    /// Every stored object, in no particular order.
    pub async fn snapshot(&self) -> Vec<Arc<O>> {
        self.objects.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl<K, O> StoreEditor<K, O> for InMemoryStore<K, O>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    O: Keyed<Key = K> + Send + Sync + 'static,
{
    async fn try_add_object(&self, obj: Arc<O>) -> bool {
        let mut objects = self.objects.write().await;
        match objects.entry(obj.key()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(obj);
                true
            }
        }
    }

    async fn try_get_object(&self, key: &K) -> Option<Arc<O>> {
        self.objects.read().await.get(key).cloned()
    }

    async fn get_or_add<F>(&self, key: K, factory: F) -> Arc<O>
    where
        F: FnOnce(&K) -> O + Send,
    {
        if let Some(existing) = self.objects.read().await.get(&key) {
            return Arc::clone(existing);
        }
        // re-check under the write lock; another task may have inserted meanwhile
        let mut objects = self.objects.write().await;
        match objects.entry(key) {
            Entry::Occupied(slot) => Arc::clone(slot.get()),
            Entry::Vacant(slot) => {
                let obj = Arc::new(factory(slot.key()));
                slot.insert(Arc::clone(&obj));
                obj
            }
        }
    }

    async fn try_remove_object(&self, key: &K) -> Option<Arc<O>> {
        self.objects.write().await.remove(key)
    }

    async fn keys(&self) -> Vec<K> {
        self.objects.read().await.keys().cloned().collect()
    }

    async fn end_batch(&self, changes: &ChangeInventory<Arc<O>>) -> Result<(), StoreError> {
        if !changes.has_changes() {
            return Ok(());
        }
        let counts = changes.counts();
        tracing::debug!(%counts, observers = self.batches.receiver_count(), "store batch");
        // no observers is fine
        let _ = self.batches.send(Arc::new(StoreBatch {
            counts,
            changes: changes.clone(),
        }));
        Ok(())
    }
}
