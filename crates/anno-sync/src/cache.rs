//! AnnotationCache: the local stores for every annotation type plus their processors.

use crate::graph::{build_structure_graph, StructureGraph};
use crate::index::{LocationIndex, Placement, RootStructures};
use crate::objects::{
    LocationLinkObj, LocationObj, PermittedStructureLinkObj, StructureLinkObj, StructureObj,
};
use crate::{
    CompositeChanges, InMemoryStore, LocationProcessor, PermittedStructureLinkProcessor,
    Processor, StructureProcessor, SyncConfig,
};
use anno_types::{
    ChangeInventory, Keyed, Location, LocationLinkKey, PermittedStructureLink,
    PermittedStructureLinkKey, ServerUpdate, StoreEditor, Structure, StructureLinkKey, SyncError,
};
use std::sync::Arc;
use tokio::sync::RwLock;

pub type StructureStore = InMemoryStore<i64, StructureObj>;
pub type StructureLinkStore = InMemoryStore<StructureLinkKey, StructureLinkObj>;
pub type LocationStore = InMemoryStore<i64, LocationObj>;
pub type LocationLinkStore = InMemoryStore<LocationLinkKey, LocationLinkObj>;
pub type PermittedStructureLinkStore =
    InMemoryStore<PermittedStructureLinkKey, PermittedStructureLinkObj>;

/// Client-side mirror of the annotation service.
///
/// Stores are public for reads and subscriptions; writes should go through the `apply_*`
/// methods so entity link sets and the section, structure and root lookups stay in step with
/// the stores.
pub struct AnnotationCache {
    pub structures: Arc<StructureStore>,
    pub structure_links: Arc<StructureLinkStore>,
    pub locations: Arc<LocationStore>,
    pub location_links: Arc<LocationLinkStore>,
    pub permitted_links: Arc<PermittedStructureLinkStore>,
    structure_processor: StructureProcessor<StructureStore, StructureLinkStore>,
    location_processor: LocationProcessor<LocationStore, LocationLinkStore>,
    permitted_processor: PermittedStructureLinkProcessor<PermittedStructureLinkStore>,
    location_index: RwLock<LocationIndex>,
    root_structures: RwLock<RootStructures>,
}

impl AnnotationCache {
    pub fn new(config: SyncConfig) -> Result<Self, SyncError> {
        config.validate()?;
        let capacity = config.notify_capacity;
        let structures: Arc<StructureStore> = Arc::new(InMemoryStore::new(capacity));
        let structure_links: Arc<StructureLinkStore> = Arc::new(InMemoryStore::new(capacity));
        let locations: Arc<LocationStore> = Arc::new(InMemoryStore::new(capacity));
        let location_links: Arc<LocationLinkStore> = Arc::new(InMemoryStore::new(capacity));
        let permitted_links: Arc<PermittedStructureLinkStore> = Arc::new(InMemoryStore::new(capacity));
        Ok(Self {
            structure_processor: StructureProcessor::new(
                Arc::clone(&structures),
                Arc::clone(&structure_links),
                &config,
            ),
            location_processor: LocationProcessor::new(
                Arc::clone(&locations),
                Arc::clone(&location_links),
                &config,
            ),
            permitted_processor: PermittedStructureLinkProcessor::new(
                Arc::clone(&permitted_links),
                &config,
            ),
            structures,
            structure_links,
            locations,
            location_links,
            permitted_links,
            location_index: RwLock::new(LocationIndex::default()),
            root_structures: RwLock::new(RootStructures::default()),
        })
    }

    /// Cache configured from the environment (see [`SyncConfig::from_env`]).
    pub fn from_env() -> Result<Self, SyncError> {
        Self::new(SyncConfig::from_env()?)
    }

    pub async fn apply_structures(
        &self,
        update: ServerUpdate<i64, Structure>,
    ) -> Result<CompositeChanges<StructureObj, StructureLinkObj>, SyncError> {
        match self.structure_processor.process(update).await {
            Ok(changes) => {
                self.index_structures(&changes.entities).await;
                Ok(changes)
            }
            Err(e) => {
                self.reindex_structures().await;
                Err(e)
            }
        }
    }

    pub async fn apply_locations(
        &self,
        update: ServerUpdate<i64, Location>,
    ) -> Result<CompositeChanges<LocationObj, LocationLinkObj>, SyncError> {
        let result = self.location_processor.process(update).await;
        self.index_locations(result).await
    }

    pub async fn apply_permitted_links(
        &self,
        update: ServerUpdate<PermittedStructureLinkKey, PermittedStructureLink>,
    ) -> Result<ChangeInventory<Arc<PermittedStructureLinkObj>>, SyncError> {
        self.permitted_processor.process(update).await
    }

    /// Snapshot of the cached structures and links as a graph.
    pub async fn structure_graph(&self) -> StructureGraph {
        let structures = self.structures.snapshot().await;
        let links = self.structure_links.snapshot().await;
        build_structure_graph(&structures, &links)
    }

    /// True if some cached permission allows a link from `source_type_id` to `target_type_id`.
    pub async fn is_link_permitted(&self, source_type_id: i64, target_type_id: i64) -> bool {
        self.permitted_links
            .snapshot()
            .await
            .iter()
            .any(|p| p.permits(source_type_id, target_type_id))
    }

    /// Cached locations on `section`, in ascending id order.
    pub async fn locations_for_section(&self, section: i64) -> Vec<Arc<LocationObj>> {
        let ids = self.location_index.read().await.in_section(section);
        lookup(&*self.locations, ids).await
    }

    /// Cached locations whose parent is `structure_id`, in ascending id order.
    pub async fn locations_for_structure(&self, structure_id: i64) -> Vec<Arc<LocationObj>> {
        let ids = self.location_index.read().await.for_structure(structure_id);
        lookup(&*self.locations, ids).await
    }

    /// Cached structures without a parent, in ascending id order.
    pub async fn root_structures(&self) -> Vec<Arc<StructureObj>> {
        let ids = self.root_structures.read().await.ids();
        lookup(&*self.structures, ids).await
    }

    /// Drop every cached location on `section`, with the links touching them.
    ///
    /// Nothing is sent to the server. Observers see the removals as ordinary deletions.
    pub async fn remove_section(
        &self,
        section: i64,
    ) -> Result<CompositeChanges<LocationObj, LocationLinkObj>, SyncError> {
        let ids = self.location_index.read().await.in_section(section);
        tracing::debug!(section, locations = ids.len(), "removing section locally");
        let result = self.location_processor.forget(ids).await;
        self.index_locations(result).await
    }

    async fn index_structures(&self, changes: &ChangeInventory<Arc<StructureObj>>) {
        let mut parents = Vec::new();
        for structure in changes.objects_in_store() {
            parents.push((structure.id(), structure.state().await.parent_id));
        }
        let mut roots = self.root_structures.write().await;
        for structure in changes.deleted_objects() {
            roots.forget(structure.id());
        }
        for (id, parent_id) in parents {
            roots.place(id, parent_id);
        }
    }

    /// Rebuild the root set from the store after a failed update left it unknown.
    async fn reindex_structures(&self) {
        let mut rebuilt = RootStructures::default();
        for structure in self.structures.snapshot().await {
            rebuilt.place(structure.id(), structure.state().await.parent_id);
        }
        *self.root_structures.write().await = rebuilt;
    }

    async fn index_locations(
        &self,
        result: Result<CompositeChanges<LocationObj, LocationLinkObj>, SyncError>,
    ) -> Result<CompositeChanges<LocationObj, LocationLinkObj>, SyncError> {
        let changes = match result {
            Ok(changes) => changes,
            Err(e) => {
                self.reindex_locations().await;
                return Err(e);
            }
        };
        let mut placements = Vec::new();
        for location in changes.entities.objects_in_store() {
            placements.push((location.id(), placement(&location).await));
        }
        let mut index = self.location_index.write().await;
        for location in changes.entities.deleted_objects() {
            index.forget(location.id());
        }
        for (id, placement) in placements {
            index.place(id, placement);
        }
        Ok(changes)
    }

    async fn reindex_locations(&self) {
        let mut rebuilt = LocationIndex::default();
        for location in self.locations.snapshot().await {
            rebuilt.place(location.id(), placement(&location).await);
        }
        tracing::debug!(locations = rebuilt.len(), "location index rebuilt");
        *self.location_index.write().await = rebuilt;
    }
}

async fn placement(location: &LocationObj) -> Placement {
    let state = location.state().await;
    Placement {
        section: state.section,
        parent_id: state.parent_id,
    }
}

/// Stored objects for `ids`, skipping any no longer in the store.
async fn lookup<O, St>(store: &St, ids: Vec<i64>) -> Vec<Arc<O>>
where
    O: Keyed<Key = i64> + Send + Sync + 'static,
    St: StoreEditor<i64, O>,
{
    let mut found = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(obj) = store.try_get_object(&id).await {
            found.push(obj);
        }
    }
    found
}
