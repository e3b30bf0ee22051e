//! Persistent vector index paired 1:1 with its corpus text.
//!
//! The store is either `Unbuilt` or `Ready`. A ready store holds an
//! immutable [`IndexSnapshot`] behind an `Arc`; a build replaces the `Arc`
//! and never touches memory an in-flight reader is scanning.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use docindex_core::error::{Error, Result};
use docindex_core::{Chunk, Metric, SearchHit};
use docindex_embed::EmbeddingGateway;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::format::{digest, join_corpus, read_corpus, split_corpus, write_corpus, IndexFile};
use crate::generation::{flip_pointer, prune, read_pointer, ArtifactPaths, Staging};
use crate::search::top_k;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    Unbuilt,
    Ready,
}

/// One loaded (index, corpus) pair. `corpus[i]` is the text of vector `i`.
#[derive(Debug)]
pub struct IndexSnapshot {
    pub generation: String,
    pub metric: Metric,
    pub dim: usize,
    pub embedder_id: String,
    vectors: Vec<f32>,
    corpus: Vec<String>,
}

impl IndexSnapshot {
    pub fn len(&self) -> usize {
        self.corpus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corpus.is_empty()
    }

    pub fn corpus(&self) -> &[String] {
        &self.corpus
    }

    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        self.vectors.chunks_exact(self.dim).nth(position)
    }

    /// Exact top-k by the snapshot's metric.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if k == 0 {
            return Err(Error::InvalidArgument("k must be at least 1".to_string()));
        }
        if query.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: query.len() });
        }
        if query.iter().any(|x| !x.is_finite()) {
            return Err(Error::InvalidArgument("query vector has non-finite components".to_string()));
        }
        let hits = top_k(self.metric, &self.vectors, self.dim, query, k)
            .into_iter()
            .map(|n| SearchHit { position: n.position, text: self.corpus[n.position].clone(), distance: n.distance })
            .collect();
        Ok(hits)
    }
}

pub struct VectorStore {
    root: PathBuf,
    current: RwLock<Option<Arc<IndexSnapshot>>>,
    build_lock: Mutex<()>,
}

impl VectorStore {
    /// Open a store rooted at `root`, creating the directory. Nothing is
    /// loaded: the store starts `Unbuilt` until `build` or `load`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root, current: RwLock::new(None), build_lock: Mutex::new(()) })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state(&self) -> StoreState {
        if self.current.read().is_some() { StoreState::Ready } else { StoreState::Unbuilt }
    }

    /// Current snapshot; holders keep reading it even after a rebuild.
    pub fn snapshot(&self) -> Result<Arc<IndexSnapshot>> {
        self.current.read().clone().ok_or(Error::IndexNotBuilt)
    }

    /// Files of the active persisted generation.
    pub fn artifact_paths(&self) -> Result<ArtifactPaths> {
        let generation = read_pointer(&self.root)?
            .ok_or_else(|| Error::NotFound(format!("no index under {}", self.root.display())))?;
        Ok(ArtifactPaths::new(&self.root, &generation))
    }

    /// Embed `chunks` in one batch, persist index and corpus as one
    /// generation and make it current. Returns the number of chunks indexed.
    ///
    /// On any error the previously persisted pair and the in-memory state
    /// are left as they were.
    #[instrument(skip_all, fields(root = %self.root.display(), chunks = chunks.len()))]
    pub fn build(&self, chunks: &[Chunk], gateway: &EmbeddingGateway) -> Result<usize> {
        if chunks.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        for (i, chunk) in chunks.iter().enumerate() {
            if let Some(reason) = chunk.violation(i) {
                return Err(Error::InvalidChunk { position: i, reason });
            }
        }

        let _guard = self.build_lock.lock();
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = gateway.embed(&texts)?;
        let dim = gateway.dim();

        let corpus_text = join_corpus(&texts.iter().map(String::as_str).collect::<Vec<_>>());
        let corpus_digest = digest(&corpus_text);
        let vectors: Vec<f32> = embeddings.into_iter().flatten().collect();
        let index = IndexFile::new(Metric::SquaredL2, dim, gateway.embedder_id(), corpus_digest, vectors);

        let staging = Staging::create(&self.root)?;
        index.write(&staging.index_path())?;
        write_corpus(&staging.corpus_path(), &corpus_text)?;
        let paths = staging.commit()?;
        flip_pointer(&self.root, &paths.generation)?;

        let snapshot = IndexSnapshot {
            generation: paths.generation.clone(),
            metric: Metric::SquaredL2,
            dim,
            embedder_id: index.embedder_id,
            vectors: index.data,
            corpus: texts,
        };
        *self.current.write() = Some(Arc::new(snapshot));

        let pruned = prune(&self.root, &paths.generation);
        info!(count = chunks.len(), dim, generation = %paths.generation, pruned, "indexed chunks");
        Ok(chunks.len())
    }

    /// Read the active generation from disk and make it current.
    /// Returns the number of chunks loaded.
    pub fn load(&self) -> Result<usize> {
        self.load_checked(None)
    }

    /// Like [`load`](Self::load), but fails with `DimensionMismatch` before
    /// anything is swapped in when the persisted vectors are not `dim` wide.
    pub fn load_expecting(&self, dim: usize) -> Result<usize> {
        self.load_checked(Some(dim))
    }

    // Holds the build lock so a concurrent build can neither prune the files
    // being read nor be rolled back by an older generation.
    #[instrument(skip_all, fields(root = %self.root.display()))]
    fn load_checked(&self, expected_dim: Option<usize>) -> Result<usize> {
        let _guard = self.build_lock.lock();
        let paths = self.artifact_paths()?;
        for file in [&paths.index, &paths.corpus] {
            if !file.is_file() {
                return Err(Error::NotFound(file.display().to_string()));
            }
        }

        let index = IndexFile::read(&paths.index)?;
        let corpus_text = read_corpus(&paths.corpus)?;
        let corpus = split_corpus(&corpus_text);
        if corpus.len() as u64 != index.count {
            return Err(Error::CorpusIndexMismatch { corpus: corpus.len(), index: index.count as usize });
        }
        if digest(&corpus_text) != index.corpus_digest {
            return Err(Error::CorpusChecksum { generation: paths.generation });
        }
        let metric = index
            .metric()
            .ok_or_else(|| Error::CorruptIndex { path: paths.index.clone(), reason: "unknown metric".to_string() })?;
        let dim = index.dim as usize;
        if let Some(expected) = expected_dim {
            if dim != expected {
                return Err(Error::DimensionMismatch { expected: dim, actual: expected });
            }
        }

        let snapshot = IndexSnapshot {
            generation: paths.generation,
            metric,
            dim,
            embedder_id: index.embedder_id,
            vectors: index.data,
            corpus,
        };
        let count = snapshot.len();
        debug!(count, dim, generation = %snapshot.generation, "loaded index");
        let previous = self.current.write().replace(Arc::new(snapshot));
        if let Some(prev) = previous {
            if prev.dim != dim {
                warn!(old = prev.dim, new = dim, "loaded index changed dimension");
            }
        }
        Ok(count)
    }

    /// Top-k nearest chunks to `query` in the current snapshot.
    #[instrument(level = "debug", skip_all, fields(k = k))]
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        self.snapshot()?.search(query, k)
    }
}
