//! Concurrent observable collections.
//!
//! [`ConcurrentObservableSet`] keeps a plain ordered sequence behind one async mutex and
//! publishes every mutation to subscribers. [`LinkSet`] swaps the identity rule so a link and
//! its reversed bidirectional twin count as the same entry.

mod matching;
mod set;

pub use matching::{EntryMatch, LinkIdentity, LinkMatch, ValueMatch};
pub use set::{ConcurrentObservableSet, LinkSet, SetChange};
