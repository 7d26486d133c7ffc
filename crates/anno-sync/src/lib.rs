//! Incremental synchronization of server annotation deltas into a local cache.
//!
//! A [`StoreServerQueryResultsHandler`] applies one delta for one object type to a
//! [`StoreEditor`](anno_types::StoreEditor) and partitions the outcome into a
//! [`ChangeInventory`](anno_types::ChangeInventory). Processors pair an entity handler with the
//! handler for the links nested in that entity, and [`AnnotationCache`] wires every store and
//! processor together.

mod cache;
mod config;
mod graph;
mod handler;
mod index;
pub mod objects;
mod processor;
mod store;

pub use cache::{
    AnnotationCache, LocationLinkStore, LocationStore, PermittedStructureLinkStore,
    StructureLinkStore, StructureStore,
};
pub use config::SyncConfig;
pub use graph::{build_structure_graph, StructureGraph};
pub use handler::StoreServerQueryResultsHandler;
pub use processor::{
    CompositeChanges, LocationProcessor, PermittedStructureLinkProcessor, Processor,
    StructureProcessor,
};
pub use store::{InMemoryStore, StoreBatch};
