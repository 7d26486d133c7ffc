//! Secondary lookups over the local cache: locations by section and by parent structure, and
//! the set of root structures.

use std::collections::{BTreeSet, HashMap};

/// Section and parent structure of one location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Placement {
    pub section: i64,
    pub parent_id: i64,
}

/// Location ids grouped by section and by parent structure.
///
/// Each id is filed under exactly one section and one structure: the placement it was last
/// given. Ids within a group come back in ascending order.
#[derive(Debug, Default)]
pub(crate) struct LocationIndex {
    placements: HashMap<i64, Placement>,
    by_section: HashMap<i64, BTreeSet<i64>>,
    by_structure: HashMap<i64, BTreeSet<i64>>,
}

impl LocationIndex {
    /// File `id` under `placement`, moving it out of its previous groups.
    /// Returns false if it was already there.
    pub fn place(&mut self, id: i64, placement: Placement) -> bool {
        match self.placements.insert(id, placement) {
            Some(previous) if previous == placement => return false,
            Some(previous) => {
                tracing::trace!(location = id, ?previous, ?placement, "location moved");
                self.unfile(id, previous);
            }
            None => {}
        }
        self.by_section.entry(placement.section).or_default().insert(id);
        self.by_structure.entry(placement.parent_id).or_default().insert(id);
        true
    }

    pub fn forget(&mut self, id: i64) -> Option<Placement> {
        let placement = self.placements.remove(&id)?;
        self.unfile(id, placement);
        Some(placement)
    }

    pub fn in_section(&self, section: i64) -> Vec<i64> {
        ids(self.by_section.get(&section))
    }

    pub fn for_structure(&self, structure_id: i64) -> Vec<i64> {
        ids(self.by_structure.get(&structure_id))
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    fn unfile(&mut self, id: i64, placement: Placement) {
        remove_from_group(&mut self.by_section, placement.section, id);
        remove_from_group(&mut self.by_structure, placement.parent_id, id);
    }
}

fn ids(group: Option<&BTreeSet<i64>>) -> Vec<i64> {
    group.map(|g| g.iter().copied().collect()).unwrap_or_default()
}

/// Empty groups are dropped so the maps only hold live sections and structures.
fn remove_from_group(groups: &mut HashMap<i64, BTreeSet<i64>>, group: i64, id: i64) {
    if let Some(members) = groups.get_mut(&group) {
        members.remove(&id);
        if members.is_empty() {
            groups.remove(&group);
        }
    }
}

/// Ids of the cached structures that have no parent.
#[derive(Debug, Default)]
pub(crate) struct RootStructures {
    roots: BTreeSet<i64>,
}

impl RootStructures {
    /// Record the current parent of structure `id`.
    pub fn place(&mut self, id: i64, parent_id: Option<i64>) {
        if parent_id.is_none() {
            self.roots.insert(id);
        } else {
            self.roots.remove(&id);
        }
    }

    pub fn forget(&mut self, id: i64) {
        self.roots.remove(&id);
    }

    pub fn ids(&self) -> Vec<i64> {
        self.roots.iter().copied().collect()
    }
}
