//! Warehouse access

mod warehouse;

pub use warehouse::{ArtistStreamRow, PlaylistRow, PlaylistStreamRow, Warehouse};
