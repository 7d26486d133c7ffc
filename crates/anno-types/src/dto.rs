//! Server-side annotation objects as delivered by the remote annotation service.

use crate::{LocationLinkKey, PermittedStructureLinkKey, StructureLinkKey};
use serde::{Deserialize, Serialize};

/// Object with a stable identity in its store.
pub trait Keyed {
    type Key;

    fn key(&self) -> Self::Key;
}

/// A traced structure (cell, synapse, ...) and the links leaving or entering it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    pub id: i64,
    pub type_id: i64,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub links: Vec<StructureLink>,
}

/// Link between two structures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureLink {
    pub source_id: i64,
    pub target_id: i64,
    #[serde(default)]
    pub bidirectional: bool,
    #[serde(default)]
    pub tags: Option<String>,
}

/// 2D position on a section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// An annotated point on one section belonging to a structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: i64,
    /// Owning structure id.
    pub parent_id: i64,
    pub section: i64,
    pub position: Position,
    #[serde(default)]
    pub radius: f64,
    #[serde(default)]
    pub terminal: bool,
    #[serde(default)]
    pub off_edge: bool,
    #[serde(default)]
    pub untraceable: bool,
    #[serde(default)]
    pub tags: Option<String>,
    /// Ids of locations linked to this one.
    #[serde(default)]
    pub links: Vec<i64>,
}

/// Link between two locations. Derived from [`Location::links`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocationLink {
    pub a: i64,
    pub b: i64,
}

/// Link allowed between two structure types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermittedStructureLink {
    pub source_type_id: i64,
    pub target_type_id: i64,
    #[serde(default)]
    pub bidirectional: bool,
}

impl Keyed for Structure {
    type Key = i64;

    fn key(&self) -> i64 {
        self.id
    }
}

impl Keyed for StructureLink {
    type Key = StructureLinkKey;

    fn key(&self) -> StructureLinkKey {
        StructureLinkKey::new(self.source_id, self.target_id, self.bidirectional)
    }
}

impl Keyed for Location {
    type Key = i64;

    fn key(&self) -> i64 {
        self.id
    }
}

impl Keyed for LocationLink {
    type Key = LocationLinkKey;

    fn key(&self) -> LocationLinkKey {
        LocationLinkKey::new(self.a, self.b)
    }
}

impl Keyed for PermittedStructureLink {
    type Key = PermittedStructureLinkKey;

    fn key(&self) -> PermittedStructureLinkKey {
        PermittedStructureLinkKey::new(self.source_type_id, self.target_type_id, self.bidirectional)
    }
}

impl Location {
    /// Links of this location, one per linked id.
    pub fn location_links(&self) -> impl Iterator<Item = LocationLink> + '_ {
        self.links.iter().map(move |&other| LocationLink { a: self.id, b: other })
    }
}
