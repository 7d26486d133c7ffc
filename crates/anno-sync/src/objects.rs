//! Local cache objects and the converters/updaters that keep them in step with the server.
//!
//! Each object keeps its key outside the lock and its mutable fields inside an async
//! `RwLock`, so updaters can run while readers hold other objects.

use anno_collections::{ConcurrentObservableSet, LinkIdentity, LinkSet};
use anno_types::{
    Keyed, Location, LocationLink, LocationLinkKey, ObjectConverter, ObjectUpdater,
    PermittedStructureLink, PermittedStructureLinkKey, Position, Structure, StructureLink,
    StructureLinkKey,
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Replace `state` with `fresh` if they differ. Returns whether it changed.
async fn replace_if_changed<T: PartialEq>(state: &RwLock<T>, fresh: T) -> bool {
    let mut current = state.write().await;
    if *current == fresh {
        return false;
    }
    *current = fresh;
    true
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructureState {
    pub type_id: i64,
    pub parent_id: Option<i64>,
    pub label: Option<String>,
    pub notes: Option<String>,
    pub confidence: f64,
    pub verified: bool,
}

impl From<&Structure> for StructureState {
    fn from(s: &Structure) -> Self {
        Self {
            type_id: s.type_id,
            parent_id: s.parent_id,
            label: s.label.clone(),
            notes: s.notes.clone(),
            confidence: s.confidence,
            verified: s.verified,
        }
    }
}

/// Cached structure. `links` holds every stored link with this structure at either end.
#[derive(Debug)]
pub struct StructureObj {
    id: i64,
    state: RwLock<StructureState>,
    links: LinkSet<Arc<StructureLinkObj>>,
}

impl StructureObj {
    pub fn new(id: i64, state: StructureState) -> Self {
        Self {
            id,
            state: RwLock::new(state),
            links: LinkSet::new(),
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub async fn state(&self) -> StructureState {
        self.state.read().await.clone()
    }

    pub fn links(&self) -> &LinkSet<Arc<StructureLinkObj>> {
        &self.links
    }
}

impl Keyed for StructureObj {
    type Key = i64;

    fn key(&self) -> i64 {
        self.id
    }
}

#[derive(Debug)]
pub struct StructureLinkObj {
    key: StructureLinkKey,
    tags: RwLock<Option<String>>,
}

impl StructureLinkObj {
    pub fn new(key: StructureLinkKey, tags: Option<String>) -> Self {
        Self {
            key,
            tags: RwLock::new(tags),
        }
    }

    pub fn source_id(&self) -> i64 {
        self.key.source_id()
    }

    pub fn target_id(&self) -> i64 {
        self.key.target_id()
    }

    pub fn bidirectional(&self) -> bool {
        self.key.bidirectional()
    }

    pub async fn tags(&self) -> Option<String> {
        self.tags.read().await.clone()
    }
}

impl Keyed for StructureLinkObj {
    type Key = StructureLinkKey;

    fn key(&self) -> StructureLinkKey {
        self.key
    }
}

impl LinkIdentity for StructureLinkObj {
    type Key = StructureLinkKey;

    fn link_key(&self) -> StructureLinkKey {
        self.key
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocationState {
    pub parent_id: i64,
    pub section: i64,
    pub position: Position,
    pub radius: f64,
    pub terminal: bool,
    pub off_edge: bool,
    pub untraceable: bool,
    pub tags: Option<String>,
}

impl From<&Location> for LocationState {
    fn from(l: &Location) -> Self {
        Self {
            parent_id: l.parent_id,
            section: l.section,
            position: l.position,
            radius: l.radius,
            terminal: l.terminal,
            off_edge: l.off_edge,
            untraceable: l.untraceable,
            tags: l.tags.clone(),
        }
    }
}

/// Cached location. `links` holds the ids of linked locations.
#[derive(Debug)]
pub struct LocationObj {
    id: i64,
    state: RwLock<LocationState>,
    links: ConcurrentObservableSet<i64>,
}

impl LocationObj {
    pub fn new(id: i64, state: LocationState) -> Self {
        Self {
            id,
            state: RwLock::new(state),
            links: ConcurrentObservableSet::new(),
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub async fn state(&self) -> LocationState {
        self.state.read().await.clone()
    }

    pub fn links(&self) -> &ConcurrentObservableSet<i64> {
        &self.links
    }
}

impl Keyed for LocationObj {
    type Key = i64;

    fn key(&self) -> i64 {
        self.id
    }
}

#[derive(Debug)]
pub struct LocationLinkObj {
    key: LocationLinkKey,
}

impl LocationLinkObj {
    pub fn new(key: LocationLinkKey) -> Self {
        Self { key }
    }
}

impl Keyed for LocationLinkObj {
    type Key = LocationLinkKey;

    fn key(&self) -> LocationLinkKey {
        self.key
    }
}

#[derive(Debug)]
pub struct PermittedStructureLinkObj {
    key: PermittedStructureLinkKey,
}

impl PermittedStructureLinkObj {
    pub fn new(key: PermittedStructureLinkKey) -> Self {
        Self { key }
    }

    /// True if a link from a structure of `source_type_id` to one of `target_type_id` is allowed.
    pub fn permits(&self, source_type_id: i64, target_type_id: i64) -> bool {
        let (s, t) = (self.key.source_type_id(), self.key.target_type_id());
        (s == source_type_id && t == target_type_id)
            || (self.key.bidirectional() && s == target_type_id && t == source_type_id)
    }
}

impl Keyed for PermittedStructureLinkObj {
    type Key = PermittedStructureLinkKey;

    fn key(&self) -> PermittedStructureLinkKey {
        self.key
    }
}

impl LinkIdentity for PermittedStructureLinkObj {
    type Key = PermittedStructureLinkKey;

    fn link_key(&self) -> PermittedStructureLinkKey {
        self.key
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StructureConverter;

impl ObjectConverter<Structure, StructureObj> for StructureConverter {
    fn convert(&self, server: &Structure) -> StructureObj {
        StructureObj::new(server.id, StructureState::from(server))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StructureUpdater;

#[async_trait]
impl ObjectUpdater<StructureObj, Structure> for StructureUpdater {
    async fn update(&self, local: &StructureObj, server: &Structure) -> bool {
        replace_if_changed(&local.state, StructureState::from(server)).await
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StructureLinkConverter;

impl ObjectConverter<StructureLink, StructureLinkObj> for StructureLinkConverter {
    fn convert(&self, server: &StructureLink) -> StructureLinkObj {
        StructureLinkObj::new(server.key(), server.tags.clone())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StructureLinkUpdater;

#[async_trait]
impl ObjectUpdater<StructureLinkObj, StructureLink> for StructureLinkUpdater {
    async fn update(&self, local: &StructureLinkObj, server: &StructureLink) -> bool {
        replace_if_changed(&local.tags, server.tags.clone()).await
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocationConverter;

impl ObjectConverter<Location, LocationObj> for LocationConverter {
    fn convert(&self, server: &Location) -> LocationObj {
        LocationObj::new(server.id, LocationState::from(server))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocationUpdater;

#[async_trait]
impl ObjectUpdater<LocationObj, Location> for LocationUpdater {
    async fn update(&self, local: &LocationObj, server: &Location) -> bool {
        replace_if_changed(&local.state, LocationState::from(server)).await
    }
}

/// Location links carry nothing but their key, so they never need an updater.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocationLinkConverter;

impl ObjectConverter<LocationLink, LocationLinkObj> for LocationLinkConverter {
    fn convert(&self, server: &LocationLink) -> LocationLinkObj {
        LocationLinkObj::new(server.key())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PermittedStructureLinkConverter;

impl ObjectConverter<PermittedStructureLink, PermittedStructureLinkObj>
    for PermittedStructureLinkConverter
{
    fn convert(&self, server: &PermittedStructureLink) -> PermittedStructureLinkObj {
        PermittedStructureLinkObj::new(server.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn structure(id: i64, label: &str) -> Structure {
        Structure {
            id,
            type_id: 1,
            parent_id: None,
            label: Some(label.to_string()),
            notes: None,
            confidence: 0.5,
            verified: false,
            links: Vec::new(),
        }
    }

    #[tokio::test]
    async fn structure_updater_reports_field_changes() {
        let local = StructureConverter.convert(&structure(1, "a"));
        assert!(!StructureUpdater.update(&local, &structure(1, "a")).await);
        assert!(StructureUpdater.update(&local, &structure(1, "b")).await);
        assert_eq!(local.state().await.label.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn structure_link_updater_tracks_tags() {
        let server = StructureLink {
            source_id: 1,
            target_id: 2,
            bidirectional: false,
            tags: None,
        };
        let local = StructureLinkConverter.convert(&server);
        let tagged = StructureLink {
            tags: Some("verified".to_string()),
            ..server.clone()
        };
        assert!(!StructureLinkUpdater.update(&local, &server).await);
        assert!(StructureLinkUpdater.update(&local, &tagged).await);
        assert_eq!(local.tags().await.as_deref(), Some("verified"));
    }

    #[test]
    fn permitted_link_honors_direction() {
        let one_way = PermittedStructureLinkObj::new(PermittedStructureLinkKey::new(3, 5, false));
        assert!(one_way.permits(3, 5));
        assert!(!one_way.permits(5, 3));

        let both = PermittedStructureLinkObj::new(PermittedStructureLinkKey::new(3, 5, true));
        assert!(both.permits(5, 3));
    }
}
