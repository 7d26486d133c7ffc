//! Per-entity processors: reconcile an entity type together with the links it carries.

use crate::objects::{
    LocationConverter, LocationLinkConverter, LocationLinkObj, LocationObj, LocationUpdater,
    PermittedStructureLinkConverter, PermittedStructureLinkObj, StructureConverter,
    StructureLinkConverter, StructureLinkObj, StructureLinkUpdater, StructureObj,
    StructureUpdater,
};
use crate::{StoreServerQueryResultsHandler, SyncConfig};
use anno_types::{
    ChangeInventory, Keyed, Location, LocationLink, LocationLinkKey, PermittedStructureLink,
    PermittedStructureLinkKey, ServerUpdate, StoreEditor, Structure, StructureLink,
    StructureLinkKey, SyncError,
};
use async_trait::async_trait;
use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;

/// Applies one server delta for an entity type and publishes the resulting batches.
#[async_trait]
pub trait Processor: Send + Sync {
    type Key: Send + 'static;
    type ServerObject: Send + 'static;
    type Changes: Send;

    async fn process(
        &self,
        update: ServerUpdate<Self::Key, Self::ServerObject>,
    ) -> Result<Self::Changes, SyncError>;
}

/// Entity inventory plus the inventory of the links carried by those entities.
#[derive(Debug)]
pub struct CompositeChanges<O, L> {
    pub entities: ChangeInventory<Arc<O>>,
    pub links: ChangeInventory<Arc<L>>,
}

/// Links in first-seen order with repeats (including reversed bidirectional twins) dropped.
fn unique_links<T, K>(links: impl IntoIterator<Item = T>) -> (Vec<T>, HashSet<K>)
where
    T: Keyed<Key = K>,
    K: Eq + Hash,
{
    let mut seen = HashSet::new();
    let unique = links.into_iter().filter(|l| seen.insert(l.key())).collect();
    (unique, seen)
}

/// Stored link keys that touch a reconciled entity but were not reported again.
///
/// An entity's link list is authoritative for the links touching it, so anything missing from
/// it, or touching a deleted entity, is stale.
fn stale_links<K, F>(stored: Vec<K>, reported: &HashSet<K>, touches: F) -> Vec<K>
where
    K: Eq + Hash,
    F: Fn(&K) -> bool,
{
    stored
        .into_iter()
        .filter(|k| touches(k) && !reported.contains(k))
        .collect()
}

type StructureHandler<S> = StoreServerQueryResultsHandler<i64, StructureObj, Structure, S>;
type StructureLinkHandler<S> =
    StoreServerQueryResultsHandler<StructureLinkKey, StructureLinkObj, StructureLink, S>;

/// Structures and the structure links nested in them.
pub struct StructureProcessor<SS, LS> {
    structures: StructureHandler<SS>,
    links: StructureLinkHandler<LS>,
}

impl<SS, LS> StructureProcessor<SS, LS>
where
    SS: StoreEditor<i64, StructureObj> + 'static,
    LS: StoreEditor<StructureLinkKey, StructureLinkObj> + 'static,
{
    pub fn new(structures: Arc<SS>, links: Arc<LS>, config: &SyncConfig) -> Self {
        Self {
            structures: StoreServerQueryResultsHandler::new(
                structures,
                Arc::new(StructureConverter),
                Some(Arc::new(StructureUpdater)),
            )
            .with_config(config),
            links: StoreServerQueryResultsHandler::new(
                links,
                Arc::new(StructureLinkConverter),
                Some(Arc::new(StructureLinkUpdater)),
            )
            .with_config(config),
        }
    }

    /// Keep each structure's link set equal to the stored links touching it.
    async fn attach_links(&self, links: &ChangeInventory<Arc<StructureLinkObj>>) {
        for link in links.deleted_objects() {
            for id in [link.source_id(), link.target_id()] {
                if let Some(structure) = self.structures.store().try_get_object(&id).await {
                    structure.links().remove(link).await;
                }
            }
        }
        // `add` is a no-op for present entries; only updated links replace theirs.
        let present = links.added.iter().chain(links.unchanged.iter());
        let attach = present
            .map(|link| (link, false))
            .chain(links.updated.iter().map(|link| (link, true)));
        for (link, replace) in attach {
            let ends = [link.source_id(), link.target_id()];
            for id in ends {
                match self.structures.store().try_get_object(&id).await {
                    Some(structure) if replace => {
                        structure.links().add_or_update(Arc::clone(link)).await;
                    }
                    Some(structure) => {
                        structure.links().add(Arc::clone(link)).await;
                    }
                    None => tracing::warn!(
                        structure = id,
                        link = %link.key(),
                        "link endpoint structure is not in the local store"
                    ),
                }
                if ends[0] == ends[1] {
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl<SS, LS> Processor for StructureProcessor<SS, LS>
where
    SS: StoreEditor<i64, StructureObj> + 'static,
    LS: StoreEditor<StructureLinkKey, StructureLinkObj> + 'static,
{
    type Key = i64;
    type ServerObject = Structure;
    type Changes = CompositeChanges<StructureObj, StructureLinkObj>;

    async fn process(
        &self,
        update: ServerUpdate<i64, Structure>,
    ) -> Result<Self::Changes, SyncError> {
        let touched: HashSet<i64> = update
            .new_or_updated
            .iter()
            .map(|s| s.id)
            .chain(update.deleted_ids.iter().copied())
            .collect();
        let (reported, reported_keys) = unique_links(
            update
                .new_or_updated
                .iter()
                .flat_map(|s| s.links.iter().cloned()),
        );
        let stale = stale_links(self.links.store().keys().await, &reported_keys, |k| {
            touched.contains(&k.source_id()) || touched.contains(&k.target_id())
        });

        let links = self.links.process_server_objects(reported, stale).await?;
        let entities = self.structures.process_server_update(update).await?;
        self.attach_links(&links).await;

        self.links.end_batch(&links).await?;
        self.structures.end_batch(&entities).await?;
        tracing::debug!(
            entities = %entities.counts(),
            links = %links.counts(),
            "structure update applied"
        );
        Ok(CompositeChanges { entities, links })
    }
}

type LocationHandler<S> = StoreServerQueryResultsHandler<i64, LocationObj, Location, S>;
type LocationLinkHandler<S> =
    StoreServerQueryResultsHandler<LocationLinkKey, LocationLinkObj, LocationLink, S>;

/// Locations and the location links derived from their linked ids.
pub struct LocationProcessor<LS, LLS> {
    locations: LocationHandler<LS>,
    links: LocationLinkHandler<LLS>,
}

impl<LS, LLS> LocationProcessor<LS, LLS>
where
    LS: StoreEditor<i64, LocationObj> + 'static,
    LLS: StoreEditor<LocationLinkKey, LocationLinkObj> + 'static,
{
    pub fn new(locations: Arc<LS>, links: Arc<LLS>, config: &SyncConfig) -> Self {
        Self {
            locations: StoreServerQueryResultsHandler::new(
                locations,
                Arc::new(LocationConverter),
                Some(Arc::new(LocationUpdater)),
            )
            .with_config(config),
            links: StoreServerQueryResultsHandler::new(
                links,
                Arc::new(LocationLinkConverter),
                None,
            )
            .with_config(config),
        }
    }

    /// Mirror link changes into the linked-id sets of both endpoint locations.
    async fn attach_links(&self, links: &ChangeInventory<Arc<LocationLinkObj>>) {
        for link in links.deleted_objects() {
            let key = link.key();
            self.unlink(key.a(), key.b()).await;
            self.unlink(key.b(), key.a()).await;
        }
        for link in links.objects_in_store() {
            let key = link.key();
            self.link(key.a(), key.b()).await;
            self.link(key.b(), key.a()).await;
        }
    }

    async fn link(&self, id: i64, other: i64) {
        if let Some(location) = self.locations.store().try_get_object(&id).await {
            location.links().add(other).await;
        }
    }

    async fn unlink(&self, id: i64, other: i64) {
        if let Some(location) = self.locations.store().try_get_object(&id).await {
            location.links().remove(&other).await;
        }
    }
}

#[async_trait]
impl<LS, LLS> Processor for LocationProcessor<LS, LLS>
where
    LS: StoreEditor<i64, LocationObj> + 'static,
    LLS: StoreEditor<LocationLinkKey, LocationLinkObj> + 'static,
{
    type Key = i64;
    type ServerObject = Location;
    type Changes = CompositeChanges<LocationObj, LocationLinkObj>;

    async fn process(
        &self,
        update: ServerUpdate<i64, Location>,
    ) -> Result<Self::Changes, SyncError> {
        tracing::trace!(query_time = %update.query_time, "processing location update");
        self.reconcile(update.new_or_updated, update.deleted_ids).await
    }
}

impl<LS, LLS> LocationProcessor<LS, LLS>
where
    LS: StoreEditor<i64, LocationObj> + 'static,
    LLS: StoreEditor<LocationLinkKey, LocationLinkObj> + 'static,
{
    /// Drop `ids` from the local stores as if the server had deleted them, links included.
    pub async fn forget(
        &self,
        ids: Vec<i64>,
    ) -> Result<CompositeChanges<LocationObj, LocationLinkObj>, SyncError> {
        self.reconcile(Vec::new(), ids).await
    }

    async fn reconcile(
        &self,
        locations: Vec<Location>,
        deleted_ids: Vec<i64>,
    ) -> Result<CompositeChanges<LocationObj, LocationLinkObj>, SyncError> {
        let touched: HashSet<i64> = locations
            .iter()
            .map(|l| l.id)
            .chain(deleted_ids.iter().copied())
            .collect();
        let (reported, reported_keys) =
            unique_links(locations.iter().flat_map(|l| l.location_links()));
        let stale = stale_links(self.links.store().keys().await, &reported_keys, |k| {
            touched.contains(&k.a()) || touched.contains(&k.b())
        });

        let links = self.links.process_server_objects(reported, stale).await?;
        let entities = self
            .locations
            .process_server_objects(locations, deleted_ids)
            .await?;
        self.attach_links(&links).await;

        self.links.end_batch(&links).await?;
        self.locations.end_batch(&entities).await?;
        tracing::debug!(
            entities = %entities.counts(),
            links = %links.counts(),
            "location update applied"
        );
        Ok(CompositeChanges { entities, links })
    }
}

/// Permitted structure links have no nested objects; one handler does all the work.
pub struct PermittedStructureLinkProcessor<S> {
    handler: StoreServerQueryResultsHandler<
        PermittedStructureLinkKey,
        PermittedStructureLinkObj,
        PermittedStructureLink,
        S,
    >,
}

impl<S> PermittedStructureLinkProcessor<S>
where
    S: StoreEditor<PermittedStructureLinkKey, PermittedStructureLinkObj> + 'static,
{
    pub fn new(store: Arc<S>, config: &SyncConfig) -> Self {
        Self {
            handler: StoreServerQueryResultsHandler::new(
                store,
                Arc::new(PermittedStructureLinkConverter),
                None,
            )
            .with_config(config),
        }
    }
}

#[async_trait]
impl<S> Processor for PermittedStructureLinkProcessor<S>
where
    S: StoreEditor<PermittedStructureLinkKey, PermittedStructureLinkObj> + 'static,
{
    type Key = PermittedStructureLinkKey;
    type ServerObject = PermittedStructureLink;
    type Changes = ChangeInventory<Arc<PermittedStructureLinkObj>>;

    async fn process(
        &self,
        update: ServerUpdate<PermittedStructureLinkKey, PermittedStructureLink>,
    ) -> Result<Self::Changes, SyncError> {
        let changes = self.handler.process_server_update(update).await?;
        self.handler.end_batch(&changes).await?;
        Ok(changes)
    }
}
