//! Exact vector search and persistence of index/chunk pairs.

pub mod index;
pub mod schema;
pub mod store;

pub use index::FlatIndex;
pub use schema::StoreManifest;
pub use store::{IndexStore, LoadedCorpus};
