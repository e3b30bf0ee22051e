/// External text-to-vector function behind the embedding gateway.
///
/// `embed_batch` must be length- and order-preserving: `out[i]` embeds `texts[i]`.
pub trait Embedder: Send + Sync {
    /// Stable identifier for the model (e.g. `bge-m3:d1024`).
    fn embedder_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}
