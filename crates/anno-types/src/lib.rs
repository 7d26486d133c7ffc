//! Core types for annotation synchronization.
//!
//! Link keys with canonical equality, change inventories, the server diff payload,
//! server-side DTOs and the traits the reconciliation engine is written against.

mod dto;
mod error;
mod inventory;
mod keys;
mod traits;
mod update;

pub use dto::*;
pub use error::*;
pub use inventory::{ChangeCounts, ChangeInventory};
pub use keys::{EdgeKey, LinkKey, LocationLinkKey, PermittedStructureLinkKey, StructureLinkKey};
pub use traits::*;
pub use update::ServerUpdate;
