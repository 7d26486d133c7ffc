//! Diff payload supplied by the remote annotation service.

use chrono::{DateTime, Utc};

/// New or changed objects plus deleted keys, as of `query_time` on the server.
#[derive(Debug, Clone)]
pub struct ServerUpdate<K, T> {
    pub query_time: DateTime<Utc>,
    pub new_or_updated: Vec<T>,
    pub deleted_ids: Vec<K>,
}

impl<K, T> ServerUpdate<K, T> {
    pub fn new(query_time: DateTime<Utc>, new_or_updated: Vec<T>, deleted_ids: Vec<K>) -> Self {
        Self {
            query_time,
            new_or_updated,
            deleted_ids,
        }
    }

    /// Single-object form.
    pub fn single(query_time: DateTime<Utc>, object: T, deleted_ids: Vec<K>) -> Self {
        Self::new(query_time, vec![object], deleted_ids)
    }

    pub fn deletions(query_time: DateTime<Utc>, deleted_ids: Vec<K>) -> Self {
        Self::new(query_time, Vec::new(), deleted_ids)
    }

    pub fn is_empty(&self) -> bool {
        self.new_or_updated.is_empty() && self.deleted_ids.is_empty()
    }
}
