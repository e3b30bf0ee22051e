//! The single seam between the engine and the external embedding function.
//!
//! One `embed` call maps to exactly one `Embedder::embed_batch` call. Results
//! are checked for count, dimension and finiteness before anything downstream
//! sees them, and the dimension of the first successful call is pinned for
//! the lifetime of the gateway.

use std::sync::{Arc, OnceLock};

use docindex_core::error::{Error, Result};
use docindex_core::traits::Embedder;
use tracing::{debug, instrument};

#[derive(Clone)]
pub struct EmbeddingGateway {
    embedder: Arc<dyn Embedder>,
    dim: Arc<OnceLock<usize>>,
}

impl EmbeddingGateway {
    pub fn new(embedder: Box<dyn Embedder>) -> Self {
        Self::from_arc(Arc::from(embedder))
    }

    pub fn from_arc(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder, dim: Arc::new(OnceLock::new()) }
    }

    pub fn embedder_id(&self) -> &str {
        self.embedder.embedder_id()
    }

    /// Pinned dimension, or the embedder's declared one before the first call.
    pub fn dim(&self) -> usize {
        self.dim.get().copied().unwrap_or_else(|| self.embedder.dim())
    }

    /// Embed a whole batch with one call to the embedder.
    #[instrument(skip_all, fields(texts = texts.len(), embedder = self.embedder.embedder_id()))]
    pub fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let vectors = self
            .embedder
            .embed_batch(texts)
            .map_err(|e| Error::Embedding(format!("{e:#}")))?;
        if vectors.len() != texts.len() {
            return Err(Error::Embedding(format!("returned {} vectors for {} texts", vectors.len(), texts.len())));
        }

        let width = vectors[0].len();
        if width == 0 {
            return Err(Error::Embedding("returned zero-length vectors".to_string()));
        }
        if let Some((i, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != width) {
            return Err(Error::Embedding(format!("vector {i} has {} components, expected {width}", v.len())));
        }
        if let Some(i) = vectors.iter().position(|v| v.iter().any(|x| !x.is_finite())) {
            return Err(Error::Embedding(format!("vector {i} has non-finite components")));
        }

        match self.dim.get() {
            Some(&pinned) if pinned != width => {
                return Err(Error::DimensionMismatch { expected: pinned, actual: width });
            }
            Some(_) => {}
            None => {
                let declared = self.embedder.dim();
                if declared != width {
                    return Err(Error::Embedding(format!(
                        "embedder declares {declared} dimensions but returned {width}"
                    )));
                }
                let pinned = *self.dim.get_or_init(|| width);
                if pinned != width {
                    return Err(Error::DimensionMismatch { expected: pinned, actual: width });
                }
                debug!(dim = width, "pinned embedding dimension");
            }
        }
        Ok(vectors)
    }

    /// Embed a single query text.
    pub fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed(&[text.to_string()])?;
        match vectors.pop() {
            Some(v) if vectors.is_empty() => Ok(v),
            _ => Err(Error::Embedding("expected exactly one query vector".to_string())),
        }
    }
}

impl std::fmt::Debug for EmbeddingGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingGateway")
            .field("embedder", &self.embedder.embedder_id())
            .field("dim", &self.dim.get())
            .finish()
    }
}
