//! Observable collection guarded by one async mutex.

use crate::{EntryMatch, LinkMatch, ValueMatch};
use std::fmt;
use std::marker::PhantomData;
use tokio::sync::{broadcast, Mutex};

const DEFAULT_NOTIFY_CAPACITY: usize = 64;

/// One mutation of a [`ConcurrentObservableSet`], in the order it was applied.
#[derive(Debug, Clone, PartialEq)]
pub enum SetChange<T> {
    Added(T),
    Removed(T),
    Replaced { old: T, new: T },
    Cleared(Vec<T>),
}

/// Ordered collection with set semantics under the match rule `M`.
///
/// Each compound operation (test then insert, find then replace) runs under the one mutex,
/// so observers never see a half-applied change. Changes are published on a broadcast
/// channel while the lock is held; receivers run on their own tasks, so reacting to a change
/// cannot re-enter the lock.
pub struct ConcurrentObservableSet<T, M = ValueMatch> {
    items: Mutex<Vec<T>>,
    changes: broadcast::Sender<SetChange<T>>,
    _match: PhantomData<fn() -> M>,
}

/// Set of link objects where a link and its reversed bidirectional twin are one entry.
pub type LinkSet<T> = ConcurrentObservableSet<T, LinkMatch>;

impl<T, M> fmt::Debug for ConcurrentObservableSet<T, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentObservableSet")
            .field("observers", &self.changes.receiver_count())
            .finish_non_exhaustive()
    }
}

impl<T, M> Default for ConcurrentObservableSet<T, M>
where
    T: Clone + Send + 'static,
    M: EntryMatch<T>,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, M> ConcurrentObservableSet<T, M>
where
    T: Clone + Send + 'static,
    M: EntryMatch<T>,
{
    pub fn new() -> Self {
        Self::with_notify_capacity(DEFAULT_NOTIFY_CAPACITY)
    }

    /// `capacity` bounds how many changes a slow observer may lag behind before it
    /// starts missing them.
    pub fn with_notify_capacity(capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(capacity.max(1));
        Self {
            items: Mutex::new(Vec::new()),
            changes,
            _match: PhantomData,
        }
    }

    /// Build from `items`, dropping later duplicates. No changes are published.
    pub fn from_items(items: impl IntoIterator<Item = T>) -> Self {
        let mut unique: Vec<T> = Vec::new();
        for item in items {
            if !unique.iter().any(|x| M::same_entry(x, &item)) {
                unique.push(item);
            }
        }
        let (changes, _) = broadcast::channel(DEFAULT_NOTIFY_CAPACITY);
        Self {
            items: Mutex::new(unique),
            changes,
            _match: PhantomData,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SetChange<T>> {
        self.changes.subscribe()
    }

    fn publish(&self, change: SetChange<T>) {
        // no receivers is fine
        let _ = self.changes.send(change);
    }

    /// Append `item` unless an equal entry is present. Returns whether it was added.
    pub async fn add(&self, item: T) -> bool {
        let mut items = self.items.lock().await;
        if items.iter().any(|x| M::same_entry(x, &item)) {
            return false;
        }
        items.push(item.clone());
        self.publish(SetChange::Added(item));
        true
    }

    /// Add each item not yet present. Returns how many were added.
    pub async fn add_range(&self, new_items: impl IntoIterator<Item = T>) -> usize {
        let mut items = self.items.lock().await;
        let mut added = 0;
        for item in new_items {
            if items.iter().any(|x| M::same_entry(x, &item)) {
                continue;
            }
            items.push(item.clone());
            self.publish(SetChange::Added(item));
            added += 1;
        }
        added
    }

    /// Remove the entry equal to `item`. Absent items are a no-op returning false.
    pub async fn remove(&self, item: &T) -> bool {
        let mut items = self.items.lock().await;
        match items.iter().position(|x| M::same_entry(x, item)) {
            Some(i) => {
                let removed = items.remove(i);
                self.publish(SetChange::Removed(removed));
                true
            }
            None => false,
        }
    }

    /// Remove every entry matching `pred` and return them.
    pub async fn remove_where<F>(&self, mut pred: F) -> Vec<T>
    where
        F: FnMut(&T) -> bool,
    {
        let mut items = self.items.lock().await;
        let mut removed = Vec::new();
        let mut i = 0;
        while i < items.len() {
            if pred(&items[i]) {
                let item = items.remove(i);
                self.publish(SetChange::Removed(item.clone()));
                removed.push(item);
            } else {
                i += 1;
            }
        }
        removed
    }

    /// Replace the entry equal to `item`. Returns false, and changes nothing, if absent.
    pub async fn update(&self, item: T) -> bool {
        let mut items = self.items.lock().await;
        match items.iter().position(|x| M::same_entry(x, &item)) {
            Some(i) => {
                let old = std::mem::replace(&mut items[i], item.clone());
                self.publish(SetChange::Replaced { old, new: item });
                true
            }
            None => false,
        }
    }

    /// Replace the entry equal to `item`, or append it. Returns true if it was an insert.
    pub async fn add_or_update(&self, item: T) -> bool {
        let mut items = self.items.lock().await;
        match items.iter().position(|x| M::same_entry(x, &item)) {
            Some(i) => {
                let old = std::mem::replace(&mut items[i], item.clone());
                self.publish(SetChange::Replaced { old, new: item });
                false
            }
            None => {
                items.push(item.clone());
                self.publish(SetChange::Added(item));
                true
            }
        }
    }

    /// True if an entry equal to `item` is present.
    pub async fn contains(&self, item: &T) -> bool {
        self.items
            .lock()
            .await
            .iter()
            .any(|x| M::same_entry(x, item))
    }

    /// Remove every entry, publishing one `Cleared` change if the set was not empty.
    pub async fn clear(&self) {
        let mut items = self.items.lock().await;
        if items.is_empty() {
            return;
        }
        let old = std::mem::take(&mut *items);
        self.publish(SetChange::Cleared(old));
    }

    /// Snapshot of the current entries in insertion order.
    pub async fn create_copy(&self) -> Vec<T> {
        self.items.lock().await.clone()
    }

    /// Number of entries.
    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    /// True if the set has no entries.
    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anno_types::StructureLinkKey;
    use std::sync::Arc;

    #[tokio::test]
    async fn add_rejects_duplicates() {
        let set: ConcurrentObservableSet<i64> = ConcurrentObservableSet::new();
        assert!(set.add(1).await);
        assert!(!set.add(1).await);
        assert_eq!(set.create_copy().await, vec![1]);
    }

    #[tokio::test]
    async fn remove_absent_is_noop() {
        let set: ConcurrentObservableSet<i64> = ConcurrentObservableSet::from_items([1, 2, 3]);
        let mut rx = set.subscribe();
        assert!(!set.remove(&9).await);
        assert_eq!(set.create_copy().await, vec![1, 2, 3]);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn from_items_drops_duplicates() {
        let set: ConcurrentObservableSet<i64> = ConcurrentObservableSet::from_items([4, 4, 5]);
        assert_eq!(set.len().await, 2);
    }

    #[tokio::test]
    async fn update_only_replaces_present_entries() {
        let set: LinkSet<StructureLinkKey> = LinkSet::new();
        assert!(!set.update(StructureLinkKey::new(1, 2, true)).await);
        assert!(set.is_empty().await);

        set.add(StructureLinkKey::new(1, 2, true)).await;
        assert!(set.update(StructureLinkKey::new(2, 1, true)).await);
        let copy = set.create_copy().await;
        assert_eq!(copy.len(), 1);
        assert_eq!(copy[0].source_id(), 2);
    }

    #[tokio::test]
    async fn add_or_update_reports_insert() {
        let set: ConcurrentObservableSet<i64> = ConcurrentObservableSet::new();
        assert!(set.add_or_update(3).await);
        assert!(!set.add_or_update(3).await);
        assert_eq!(set.len().await, 1);
    }

    #[tokio::test]
    async fn link_set_folds_reversed_bidirectional_links() {
        let set: LinkSet<StructureLinkKey> = LinkSet::new();
        assert!(set.add(StructureLinkKey::new(1, 2, true)).await);
        assert!(!set.add(StructureLinkKey::new(2, 1, true)).await);
        assert!(set.contains(&StructureLinkKey::new(2, 1, true)).await);

        // directed links keep their direction
        assert!(set.add(StructureLinkKey::new(2, 1, false)).await);
        assert!(set.add(StructureLinkKey::new(1, 2, false)).await);
        assert_eq!(set.len().await, 3);

        assert!(set.remove(&StructureLinkKey::new(2, 1, true)).await);
        assert_eq!(set.len().await, 2);
    }

    #[tokio::test]
    async fn observers_see_changes_in_order() {
        let set: ConcurrentObservableSet<i64> = ConcurrentObservableSet::new();
        let mut rx = set.subscribe();
        set.add(1).await;
        set.add(2).await;
        set.remove(&1).await;
        set.clear().await;

        assert_eq!(rx.recv().await.unwrap(), SetChange::Added(1));
        assert_eq!(rx.recv().await.unwrap(), SetChange::Added(2));
        assert_eq!(rx.recv().await.unwrap(), SetChange::Removed(1));
        assert_eq!(rx.recv().await.unwrap(), SetChange::Cleared(vec![2]));
    }

    #[tokio::test]
    async fn remove_where_returns_removed_entries() {
        let set: ConcurrentObservableSet<i64> = ConcurrentObservableSet::from_items([1, 2, 3, 4]);
        let removed = set.remove_where(|x| x % 2 == 0).await;
        assert_eq!(removed, vec![2, 4]);
        assert_eq!(set.create_copy().await, vec![1, 3]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_adds_never_duplicate() {
        let set: Arc<ConcurrentObservableSet<i64>> = Arc::new(ConcurrentObservableSet::new());
        let mut handles = Vec::new();
        for task in 0..16 {
            let set = Arc::clone(&set);
            handles.push(tokio::spawn(async move {
                let mut added = 0;
                for v in 0..50 {
                    if set.add((v + task) % 50).await {
                        added += 1;
                    }
                }
                added
            }));
        }
        let mut total = 0;
        for h in handles {
            total += h.await.unwrap();
        }
        assert_eq!(total, 50);
        let mut items = set.create_copy().await;
        items.sort();
        assert_eq!(items, (0..50).collect::<Vec<_>>());
    }
}
