//! Catalog synchronization module

pub mod gate;
pub mod model;
pub mod repository;

// Re-export main types
pub use gate::TransferGate;
pub use model::{Album, AlbumEntry, Catalog, CatalogDocument, Song, SongEntry, decode_catalog};
pub use repository::CatalogRepository;
