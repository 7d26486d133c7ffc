//! Canonical keys for links between annotation objects.
//!
//! A bidirectional link between `a` and `b` is the same link as one between `b` and `a`.
//! Every key type here folds that case to a canonical `(low, high)` pair before comparing,
//! hashing or ordering, so the two spellings can never live side by side in a map or set.

use crate::KeyError;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identity of one relationship between two node ids.
///
/// Directional keys keep `(source, target)` as given. Bidirectional keys store
/// `(min, max)`. Field order matters: the derived `Ord` sorts on the directional flag first
/// (bidirectional before directional) and then on the stored pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeKey<K> {
    directional: bool,
    source: K,
    target: K,
}

impl<K: Ord + Copy> EdgeKey<K> {
    pub fn new(source: K, target: K, directional: bool) -> Self {
        if directional || source <= target {
            Self {
                directional,
                source,
                target,
            }
        } else {
            Self {
                directional,
                source: target,
                target: source,
            }
        }
    }

    pub fn directional(source: K, target: K) -> Self {
        Self::new(source, target, true)
    }

    pub fn bidirectional(a: K, b: K) -> Self {
        Self::new(a, b, false)
    }

    /// Source endpoint; the lower id for bidirectional keys.
    pub fn source(&self) -> K {
        self.source
    }

    /// Target endpoint; the higher id for bidirectional keys.
    pub fn target(&self) -> K {
        self.target
    }

    pub fn is_directional(&self) -> bool {
        self.directional
    }

    pub fn is_loop(&self) -> bool {
        self.source == self.target
    }

    pub fn contains(&self, id: K) -> bool {
        self.source == id || self.target == id
    }

    /// The endpoint that is not `id`. For a loop both endpoints are `id`, so `id` comes back.
    pub fn other_key(&self, id: K) -> Result<K, KeyError>
    where
        K: fmt::Debug,
    {
        if self.source == id {
            Ok(self.target)
        } else if self.target == id {
            Ok(self.source)
        } else {
            Err(KeyError::NotPartOfEdge {
                key: format!("{:?}", id),
                edge: format!("{:?}", self),
            })
        }
    }

    /// True when the edge may be walked starting at `from`.
    pub fn can_travel_from(&self, from: K) -> bool {
        if self.directional {
            self.source == from
        } else {
            self.contains(from)
        }
    }
}

impl<K: fmt::Display> fmt::Display for EdgeKey<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.directional {
            write!(f, "{} -> {}", self.source, self.target)
        } else {
            write!(f, "{} <-> {}", self.source, self.target)
        }
    }
}

/// A key that can be reduced to a canonical [`EdgeKey`].
pub trait LinkKey {
    type Id: Ord + Copy;

    fn edge_key(&self) -> EdgeKey<Self::Id>;
}

impl<K: Ord + Copy> LinkKey for EdgeKey<K> {
    type Id = K;

    fn edge_key(&self) -> EdgeKey<K> {
        *self
    }
}

/// Equality, hashing and ordering through [`LinkKey::edge_key`].
macro_rules! impl_canonical_cmp {
    ($ty:ty) => {
        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                self.edge_key() == other.edge_key()
            }
        }

        impl Eq for $ty {}

        impl Hash for $ty {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.edge_key().hash(state);
            }
        }

        impl PartialOrd for $ty {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $ty {
            fn cmp(&self, other: &Self) -> Ordering {
                self.edge_key().cmp(&other.edge_key())
            }
        }
    };
}

/// Key of a link between two structures.
///
/// The endpoints are kept in the order the server reported them, since the server stores
/// them that way; comparisons use the folded form.
#[derive(Debug, Clone, Copy)]
pub struct StructureLinkKey {
    source_id: i64,
    target_id: i64,
    bidirectional: bool,
}

impl StructureLinkKey {
    pub fn new(source_id: i64, target_id: i64, bidirectional: bool) -> Self {
        Self {
            source_id,
            target_id,
            bidirectional,
        }
    }

    pub fn source_id(&self) -> i64 {
        self.source_id
    }

    pub fn target_id(&self) -> i64 {
        self.target_id
    }

    pub fn bidirectional(&self) -> bool {
        self.bidirectional
    }

    pub fn other_key(&self, id: i64) -> Result<i64, KeyError> {
        self.edge_key().other_key(id)
    }
}

impl LinkKey for StructureLinkKey {
    type Id = i64;

    fn edge_key(&self) -> EdgeKey<i64> {
        EdgeKey::new(self.source_id, self.target_id, !self.bidirectional)
    }
}

impl_canonical_cmp!(StructureLinkKey);

impl fmt::Display for StructureLinkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arrow = if self.bidirectional { "<->" } else { "->" };
        write!(f, "{} {} {}", self.source_id, arrow, self.target_id)
    }
}

/// Key of a permitted link between two structure types.
///
/// Bidirectional keys put the lower type id first at construction.
#[derive(Debug, Clone, Copy)]
pub struct PermittedStructureLinkKey {
    source_type_id: i64,
    target_type_id: i64,
    bidirectional: bool,
}

impl PermittedStructureLinkKey {
    pub fn new(source_type_id: i64, target_type_id: i64, bidirectional: bool) -> Self {
        let (source_type_id, target_type_id) = if bidirectional {
            (
                source_type_id.min(target_type_id),
                source_type_id.max(target_type_id),
            )
        } else {
            (source_type_id, target_type_id)
        };
        Self {
            source_type_id,
            target_type_id,
            bidirectional,
        }
    }

    pub fn source_type_id(&self) -> i64 {
        self.source_type_id
    }

    pub fn target_type_id(&self) -> i64 {
        self.target_type_id
    }

    pub fn bidirectional(&self) -> bool {
        self.bidirectional
    }
}

impl LinkKey for PermittedStructureLinkKey {
    type Id = i64;

    fn edge_key(&self) -> EdgeKey<i64> {
        EdgeKey::new(self.source_type_id, self.target_type_id, !self.bidirectional)
    }
}

impl_canonical_cmp!(PermittedStructureLinkKey);

/// Key of a link between two locations. Location links have no direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocationLinkKey {
    a: i64,
    b: i64,
}

impl LocationLinkKey {
    pub fn new(a: i64, b: i64) -> Self {
        Self {
            a: a.min(b),
            b: a.max(b),
        }
    }

    /// Lower location id.
    pub fn a(&self) -> i64 {
        self.a
    }

    /// Higher location id.
    pub fn b(&self) -> i64 {
        self.b
    }

    pub fn contains(&self, id: i64) -> bool {
        self.a == id || self.b == id
    }

    pub fn other_key(&self, id: i64) -> Result<i64, KeyError> {
        self.edge_key().other_key(id)
    }
}

impl LinkKey for LocationLinkKey {
    type Id = i64;

    fn edge_key(&self) -> EdgeKey<i64> {
        EdgeKey::bidirectional(self.a, self.b)
    }
}

impl fmt::Display for LocationLinkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <-> {}", self.a, self.b)
    }
}
