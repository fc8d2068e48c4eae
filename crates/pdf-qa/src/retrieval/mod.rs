//! Retrieval: embedding, indexing, search and relevance filtering

mod adapter;
mod filter;
mod index;
mod store;

pub use adapter::IndexAdapter;
pub use filter::filter;
pub use index::{IndexEntry, VectorIndex};
pub use store::IndexStore;
