//! Feature-hashing embedder: deterministic, dependency-free vectors for
//! development and tests. Identical texts map to identical vectors.

use std::hash::Hasher;

use anyhow::{ensure, Result};
use docindex_core::traits::Embedder;
use twox_hash::XxHash64;

pub struct HashEmbedder {
    dim: usize,
    id: String,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim, id: format!("hash-xxh64:d{dim}") }
    }

    pub fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        ensure!(self.dim > 0, "hash embedder dimension must be non-zero");
        let mut v = vec![0f32; self.dim];
        for token in tokens(text) {
            let mut hasher = XxHash64::with_seed(0);
            hasher.write(token.as_bytes());
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
            v[idx] += sign;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v { *x /= norm; }
        }
        Ok(v)
    }
}

impl Embedder for HashEmbedder {
    fn embedder_id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_text(t)).collect()
    }
}

/// Lower-cased alphanumeric runs.
fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn punctuation_and_case_do_not_matter() {
        let e = HashEmbedder::new(64);
        assert_eq!(e.embed_text("Rooms, per SESSION!").unwrap(), e.embed_text("rooms per session").unwrap());
    }

    #[test]
    fn blank_text_is_the_zero_vector() {
        let v = HashEmbedder::new(16).embed_text("  ...  ").unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }
}
