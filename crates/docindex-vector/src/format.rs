//! On-disk encoding of one (index, corpus) generation.
//!
//! `index.bin` is bincode: header fields then the flat `f32` data in position
//! order. `corpus.txt` is the chunk texts joined by [`CORPUS_SEPARATOR`].

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use docindex_core::error::{Error, Result};
use docindex_core::{Metric, CORPUS_SEPARATOR};
use serde::{Deserialize, Serialize};

pub const INDEX_FILE: &str = "index.bin";
pub const CORPUS_FILE: &str = "corpus.txt";

const MAGIC: [u8; 4] = *b"DIDX";
const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexFile {
    magic: [u8; 4],
    version: u32,
    pub metric: u8,
    pub dim: u32,
    pub count: u64,
    pub embedder_id: String,
    /// blake3 hex digest of the paired corpus text.
    pub corpus_digest: String,
    pub data: Vec<f32>,
}

impl IndexFile {
    pub fn new(metric: Metric, dim: usize, embedder_id: &str, corpus_digest: String, data: Vec<f32>) -> Self {
        let count = if dim == 0 { 0 } else { data.len() / dim };
        Self {
            magic: MAGIC,
            version: FORMAT_VERSION,
            metric: metric.id(),
            dim: dim as u32,
            count: count as u64,
            embedder_id: embedder_id.to_string(),
            corpus_digest,
            data,
        }
    }

    pub fn metric(&self) -> Option<Metric> {
        Metric::from_id(self.metric)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(&mut writer, self).map_err(|e| corrupt(path, e.to_string()))?;
        let file = writer.into_inner().map_err(|e| Error::Io(e.into_error()))?;
        file.sync_all()?;
        Ok(())
    }

    /// Decode and check the header against the payload.
    pub fn read(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let file: Self = bincode::deserialize_from(reader).map_err(|e| corrupt(path, e.to_string()))?;
        if file.magic != MAGIC {
            return Err(corrupt(path, "bad magic".to_string()));
        }
        if file.version != FORMAT_VERSION {
            return Err(corrupt(path, format!("unsupported format version {}", file.version)));
        }
        if file.metric().is_none() {
            return Err(corrupt(path, format!("unknown metric id {}", file.metric)));
        }
        if file.dim == 0 || file.count == 0 {
            return Err(corrupt(path, "empty index".to_string()));
        }
        let expected = (file.dim as u64).checked_mul(file.count);
        if expected != Some(file.data.len() as u64) {
            return Err(corrupt(
                path,
                format!("{} values for {} vectors of dimension {}", file.data.len(), file.count, file.dim),
            ));
        }
        Ok(file)
    }
}

pub fn join_corpus(texts: &[&str]) -> String {
    texts.join(CORPUS_SEPARATOR)
}

pub fn split_corpus(corpus: &str) -> Vec<String> {
    corpus.split(CORPUS_SEPARATOR).map(str::to_string).collect()
}

pub fn digest(corpus: &str) -> String {
    blake3::hash(corpus.as_bytes()).to_hex().to_string()
}

pub fn write_corpus(path: &Path, corpus: &str) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(corpus.as_bytes())?;
    file.sync_all()?;
    Ok(())
}

pub fn read_corpus(path: &Path) -> Result<String> {
    Ok(fs::read_to_string(path)?)
}

fn corrupt(path: &Path, reason: String) -> Error {
    Error::CorruptIndex { path: path.to_path_buf(), reason }
}
