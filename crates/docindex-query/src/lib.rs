//! Query engine: the integration point handed to the answer synthesizer.
//!
//! Builds go document -> chunks -> one embedding batch -> vector store;
//! queries go text -> one query vector -> exact top-k -> passages.

use std::sync::Arc;

use docindex_core::error::{Error, Result};
use docindex_core::extract::ChunkExtractor;
use docindex_core::{Chunk, SearchHit, CORPUS_SEPARATOR};
use docindex_embed::EmbeddingGateway;
use docindex_vector::{StoreState, VectorStore};
use serde_json::Value;
use tracing::{debug, instrument, warn};

pub const DEFAULT_TOP_K: usize = 3;

pub struct QueryEngine {
    store: Arc<VectorStore>,
    gateway: EmbeddingGateway,
    extractor: ChunkExtractor,
}

impl QueryEngine {
    pub fn new(store: Arc<VectorStore>, gateway: EmbeddingGateway) -> Self {
        Self { store, gateway, extractor: ChunkExtractor::new() }
    }

    pub fn state(&self) -> StoreState {
        self.store.state()
    }

    /// Load the persisted index and check it was built with an embedder of
    /// the same dimension as ours.
    pub fn load(&self) -> Result<usize> {
        let count = self.store.load_expecting(self.gateway.dim())?;
        let snapshot = self.store.snapshot()?;
        if snapshot.embedder_id != self.gateway.embedder_id() {
            warn!(index = %snapshot.embedder_id, gateway = %self.gateway.embedder_id(), "index was built by a different embedder");
        }
        Ok(count)
    }

    pub fn build(&self, chunks: &[Chunk]) -> Result<usize> {
        self.store.build(chunks, &self.gateway)
    }

    /// Extract and index a refined document (field -> string | list of strings).
    pub fn build_document(&self, document: &Value) -> Result<usize> {
        let chunks = self.extractor.extract(document)?;
        self.build(&chunks)
    }

    /// Ranked hits with distances.
    #[instrument(skip(self), fields(embedder = %self.gateway.embedder_id()))]
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        // fail before spending an embedding call
        let snapshot = self.store.snapshot()?;
        if k == 0 {
            return Err(Error::InvalidArgument("k must be at least 1".to_string()));
        }
        let vector = self.gateway.embed_one(query)?;
        let hits = snapshot.search(&vector, k)?;
        debug!(hits = hits.len(), "query answered");
        Ok(hits)
    }

    /// Passage texts only, closest first.
    pub fn answer_context(&self, query: &str, k: usize) -> Result<Vec<String>> {
        Ok(self.search(query, k)?.into_iter().map(|h| h.text).collect())
    }

    /// Passages joined by a blank line, the form handed to the answer prompt.
    pub fn context_block(&self, query: &str, k: usize) -> Result<String> {
        Ok(self.answer_context(query, k)?.join(CORPUS_SEPARATOR))
    }
}
