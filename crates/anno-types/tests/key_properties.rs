//! Property tests for link key canonicalization.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use anno_types::{EdgeKey, LinkKey, PermittedStructureLinkKey, StructureLinkKey};
use proptest::prelude::*;

fn hash_of<T: Hash>(value: &T) -> u64 {
    let mut h = DefaultHasher::new();
    value.hash(&mut h);
    h.finish()
}

proptest! {
    /// Swapping endpoints of a bidirectional key changes nothing observable.
    #[test]
    fn bidirectional_swap_is_invisible(a in any::<i64>(), b in any::<i64>()) {
        let ab = EdgeKey::bidirectional(a, b);
        let ba = EdgeKey::bidirectional(b, a);
        prop_assert_eq!(ab, ba);
        prop_assert_eq!(hash_of(&ab), hash_of(&ba));
        prop_assert_eq!(ab.cmp(&ba), std::cmp::Ordering::Equal);
        prop_assert!(ab.source() <= ab.target());
    }

    /// Directional keys with distinct endpoints are order sensitive.
    #[test]
    fn directional_swap_is_distinct(a in any::<i64>(), b in any::<i64>()) {
        prop_assume!(a != b);
        prop_assert_ne!(EdgeKey::directional(a, b), EdgeKey::directional(b, a));
    }

    /// Structure link keys agree with their folded edge key.
    #[test]
    fn structure_link_key_matches_edge_key(a in -1000i64..1000, b in -1000i64..1000, bidi in any::<bool>()) {
        let forward = StructureLinkKey::new(a, b, bidi);
        let backward = StructureLinkKey::new(b, a, bidi);
        prop_assert_eq!(forward == backward, bidi || a == b);
        prop_assert_eq!(forward.edge_key().is_directional(), !bidi);
        if bidi {
            prop_assert_eq!(hash_of(&forward), hash_of(&backward));
        }
    }

    /// Permitted link keys never compare equal across direction classes.
    #[test]
    fn permitted_keys_respect_direction_class(a in -50i64..50, b in -50i64..50) {
        let bidi = PermittedStructureLinkKey::new(a, b, true);
        let directed = PermittedStructureLinkKey::new(a, b, false);
        prop_assert_ne!(bidi, directed);
        prop_assert!(bidi < directed);
    }

    /// `other_key` is an involution on the endpoints.
    #[test]
    fn other_key_round_trips(a in any::<i32>(), b in any::<i32>(), directional in any::<bool>()) {
        let key = EdgeKey::new(a, b, directional);
        let other = key.other_key(a).unwrap();
        prop_assert_eq!(other, b);
        prop_assert_eq!(key.other_key(other).unwrap(), if a == b { b } else { a });
    }
}
