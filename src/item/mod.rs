pub mod item;
pub mod origin;

pub use crate::types::identifiers::ItemId;
pub use item::{Item, ItemBuilder, Provenance};
pub use origin::{decode_upload, Origin, VectorPosition};
