//! Entry identity rules for observable sets.

use anno_types::{
    Keyed, PermittedStructureLink, PermittedStructureLinkKey, StructureLink, StructureLinkKey,
};
use std::sync::Arc;

/// Decides whether two values occupy the same slot in a set.
pub trait EntryMatch<T>: Send + Sync + 'static {
    fn same_entry(a: &T, b: &T) -> bool;
}

/// Plain `PartialEq` identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueMatch;

impl<T: PartialEq> EntryMatch<T> for ValueMatch {
    fn same_entry(a: &T, b: &T) -> bool {
        a == b
    }
}

/// Value that represents a link between two objects.
pub trait LinkIdentity {
    /// Key with canonical equality; a link and its reversed bidirectional twin share one.
    type Key: Eq;

    fn link_key(&self) -> Self::Key;
}

/// Link identity: two links are the same entry when their canonical keys are equal, whatever
/// else differs between the objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkMatch;

impl<T: LinkIdentity> EntryMatch<T> for LinkMatch {
    fn same_entry(a: &T, b: &T) -> bool {
        a.link_key() == b.link_key()
    }
}

impl<T: LinkIdentity> LinkIdentity for Arc<T> {
    type Key = T::Key;

    fn link_key(&self) -> T::Key {
        (**self).link_key()
    }
}

impl LinkIdentity for StructureLinkKey {
    type Key = StructureLinkKey;

    fn link_key(&self) -> StructureLinkKey {
        *self
    }
}

impl LinkIdentity for PermittedStructureLinkKey {
    type Key = PermittedStructureLinkKey;

    fn link_key(&self) -> PermittedStructureLinkKey {
        *self
    }
}

impl LinkIdentity for StructureLink {
    type Key = StructureLinkKey;

    fn link_key(&self) -> StructureLinkKey {
        self.key()
    }
}

impl LinkIdentity for PermittedStructureLink {
    type Key = PermittedStructureLinkKey;

    fn link_key(&self) -> PermittedStructureLinkKey {
        self.key()
    }
}
