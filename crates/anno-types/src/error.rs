//! Error types shared by the annotation crates.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("key {key} is not part of edge {edge}")]
    NotPartOfEdge { key: String, edge: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("node already exists: {0}")]
    NodeExists(String),
    #[error("node not found: {0}")]
    NodeNotFound(String),
    #[error("edge already exists: {0}")]
    EdgeExists(String),
    #[error("edge not found: {0}")]
    EdgeNotFound(String),
    #[error("edge key: {0}")]
    Key(#[from] KeyError),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store error: {0}")]
    Other(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("store: {0}")]
    Store(#[from] StoreError),
    #[error("reconciliation task failed: {0}")]
    Task(String),
    #[error("no result recorded for item {index}")]
    MissingResult { index: usize },
    #[error("invalid sync configuration: {0}")]
    Config(String),
}
