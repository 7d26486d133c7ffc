//! Collaborator traits used by the reconciliation engine.

use crate::{ChangeInventory, Keyed, StoreError};
use async_trait::async_trait;
use std::sync::Arc;

/// Builds a local object from a server object. Only called on first insertion.
pub trait ObjectConverter<S, O>: Send + Sync {
    fn convert(&self, server: &S) -> O;
}

/// Brings an existing local object up to date with a server object.
#[async_trait]
pub trait ObjectUpdater<O, S>: Send + Sync
where
    O: Send + Sync,
    S: Send + Sync,
{
    /// Returns true if any field changed.
    async fn update(&self, local: &O, server: &S) -> bool;
}

/// Write access to a local keyed store.
///
/// Edits made through this trait do not notify store observers until [`end_batch`] is called.
///
/// Contract: `get_or_add` is atomic per key. Concurrent callers with the same key all get the
/// same object back, and `factory` runs at most once for that key.
///
/// [`end_batch`]: StoreEditor::end_batch
#[async_trait]
pub trait StoreEditor<K, O>: Send + Sync
where
    K: Send + Sync + 'static,
    O: Keyed<Key = K> + Send + Sync + 'static,
{
    /// Insert `obj` under its own key. Returns false if the key is already present.
    async fn try_add_object(&self, obj: Arc<O>) -> bool;

    /// The object stored under `key`, if any.
    async fn try_get_object(&self, key: &K) -> Option<Arc<O>>;

    /// Return the object stored under `key`, inserting `factory(&key)` if there is none.
    async fn get_or_add<F>(&self, key: K, factory: F) -> Arc<O>
    where
        F: FnOnce(&K) -> O + Send;

    /// Remove and return the object stored under `key`, if any.
    async fn try_remove_object(&self, key: &K) -> Option<Arc<O>>;

    /// Keys currently in the store, in no particular order.
    async fn keys(&self) -> Vec<K>;

    /// Notify observers once for all edits of a batch.
    async fn end_batch(&self, changes: &ChangeInventory<Arc<O>>) -> Result<(), StoreError>;
}
