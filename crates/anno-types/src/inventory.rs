//! Partitioned result of one reconciliation pass.

use std::fmt;

/// Every object of a reconciliation batch lands in exactly one partition.
///
/// `deleted` holds one entry per requested deletion; `None` marks a key that was not in
/// the local store.
#[derive(Debug, Clone)]
pub struct ChangeInventory<T> {
    /// Objects freshly added to the store.
    pub added: Vec<T>,
    /// Objects already in the store that had at least one field changed.
    pub updated: Vec<T>,
    /// Objects already in the store that needed no change.
    pub unchanged: Vec<T>,
    /// Objects removed from the store, in the order their keys were given.
    pub deleted: Vec<Option<T>>,
}

impl<T> Default for ChangeInventory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ChangeInventory<T> {
    pub fn new() -> Self {
        Self {
            added: Vec::new(),
            updated: Vec::new(),
            unchanged: Vec::new(),
            deleted: Vec::new(),
        }
    }

    pub fn with_capacity(objects: usize, deletions: usize) -> Self {
        Self {
            added: Vec::with_capacity(objects),
            updated: Vec::new(),
            unchanged: Vec::new(),
            deleted: Vec::with_capacity(deletions),
        }
    }

    /// Objects that were actually removed, skipping keys that were absent.
    pub fn deleted_objects(&self) -> impl Iterator<Item = &T> {
        self.deleted.iter().flatten()
    }

    /// Added, updated and unchanged objects; everything the batch left in the store.
    pub fn objects_in_store(&self) -> Vec<T>
    where
        T: Clone,
    {
        let mut out = Vec::with_capacity(self.added.len() + self.updated.len() + self.unchanged.len());
        out.extend(self.added.iter().cloned());
        out.extend(self.updated.iter().cloned());
        out.extend(self.unchanged.iter().cloned());
        out
    }

    /// Append every partition of `other` to ours.
    pub fn merge(&mut self, other: ChangeInventory<T>) {
        self.added.extend(other.added);
        self.updated.extend(other.updated);
        self.unchanged.extend(other.unchanged);
        self.deleted.extend(other.deleted);
    }

    /// Total entries across all partitions, absent deletions included.
    pub fn len(&self) -> usize {
        self.added.len() + self.updated.len() + self.unchanged.len() + self.deleted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when the batch added, updated or removed something.
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.updated.is_empty() || self.deleted_objects().next().is_some()
    }

    pub fn counts(&self) -> ChangeCounts {
        ChangeCounts {
            added: self.added.len(),
            updated: self.updated.len(),
            unchanged: self.unchanged.len(),
            deleted: self.deleted_objects().count(),
            missing: self.deleted.iter().filter(|d| d.is_none()).count(),
        }
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> ChangeInventory<U> {
        ChangeInventory {
            added: self.added.into_iter().map(&mut f).collect(),
            updated: self.updated.into_iter().map(&mut f).collect(),
            unchanged: self.unchanged.into_iter().map(&mut f).collect(),
            deleted: self
                .deleted
                .into_iter()
                .map(|d| d.map(&mut f))
                .collect(),
        }
    }
}

/// Partition sizes, for logs and batch notifications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeCounts {
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
    /// Deletions whose key was not in the store.
    pub missing: usize,
}

impl fmt::Display for ChangeCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "added={} updated={} unchanged={} deleted={} missing={}",
            self.added, self.updated, self.unchanged, self.deleted, self.missing
        )
    }
}
