pub mod format;
pub mod generation;
pub mod search;
pub mod store;

pub use generation::ArtifactPaths;
pub use store::{IndexSnapshot, StoreState, VectorStore};
