pub mod device;
pub mod gateway;
pub mod hash;
pub mod model;
pub mod pool;
pub mod tokenize;

use anyhow::Result;
use docindex_core::config::{expand_path, EmbedderKind, EmbedderSettings};
use docindex_core::traits::Embedder;
use tracing::info;

pub use gateway::EmbeddingGateway;
pub use hash::HashEmbedder;
pub use model::EmbeddingModel;
pub use pool::masked_mean_l2;

/// Build the embedder named by `settings`. `APP_USE_FAKE_EMBEDDINGS=1`
/// forces the hash embedder so tests never load model weights.
pub fn get_default_embedder(settings: &EmbedderSettings) -> Result<Box<dyn Embedder>> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if use_fake || settings.kind == EmbedderKind::Hash {
        info!(dim = settings.dim, "using hash embedder");
        return Ok(Box::new(HashEmbedder::new(settings.dim)));
    }
    let model_dir = settings.model_dir.as_deref().map(expand_path);
    Ok(Box::new(EmbeddingModel::new(model_dir.as_deref(), settings.max_len, settings.batch_size)?))
}
