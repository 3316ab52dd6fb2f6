//! # Shellac Core
//!
//! Data-access layer for the album catalog: the record codec, the store port
//! with its Redis and in-memory adapters, and the repository that keeps the
//! per-album records and the global likes ranking consistent under
//! concurrent writers.

pub mod album;
pub mod error;
pub mod repository;
pub mod store;

pub use album::Album;
pub use error::{CatalogError, Result};
pub use repository::{AlbumRepository, CatalogKeys, TOP_COUNT};
pub use store::{MemoryStore, RecordFields, RedisStore, Store};
