//! Generation directories and the active-generation pointer.
//!
//! Each build writes a complete `gen-*` directory, then flips `CURRENT` with a
//! temp-file rename. Readers only ever follow `CURRENT`, so they see either
//! the previous pair or the new one.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use docindex_core::error::{Error, Result};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::format::{CORPUS_FILE, INDEX_FILE};

pub const POINTER_FILE: &str = "CURRENT";
const GENERATION_PREFIX: &str = "gen-";
const STAGING_PREFIX: &str = ".staging-";

/// Files making up one persisted generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub generation: String,
    pub dir: PathBuf,
    pub index: PathBuf,
    pub corpus: PathBuf,
}

impl ArtifactPaths {
    pub fn new(root: &Path, generation: &str) -> Self {
        let dir = root.join(generation);
        Self { generation: generation.to_string(), index: dir.join(INDEX_FILE), corpus: dir.join(CORPUS_FILE), dir }
    }
}

/// A staging directory that is removed unless `commit` renames it into place.
pub struct Staging {
    root: PathBuf,
    generation: String,
    dir: PathBuf,
    committed: bool,
}

impl Staging {
    pub fn create(root: &Path) -> Result<Self> {
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%6fZ");
        for attempt in 0..1000u32 {
            let generation = format!("{GENERATION_PREFIX}{stamp}-{attempt}");
            let dir = root.join(format!("{STAGING_PREFIX}{generation}"));
            if root.join(&generation).exists() {
                continue;
            }
            match fs::create_dir(&dir) {
                Ok(()) => return Ok(Self { root: root.to_path_buf(), generation, dir, committed: false }),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(Error::Io(std::io::Error::new(ErrorKind::AlreadyExists, "no free generation name")))
    }

    pub fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    pub fn corpus_path(&self) -> PathBuf {
        self.dir.join(CORPUS_FILE)
    }

    /// Move the staged files to their final generation directory.
    pub fn commit(mut self) -> Result<ArtifactPaths> {
        let paths = ArtifactPaths::new(&self.root, &self.generation);
        fs::rename(&self.dir, &paths.dir)?;
        self.committed = true;
        sync_dir(&self.root)?;
        Ok(paths)
    }
}

impl Drop for Staging {
    fn drop(&mut self) {
        if !self.committed {
            if let Err(e) = fs::remove_dir_all(&self.dir) {
                warn!(dir = %self.dir.display(), error = %e, "failed to remove staging directory");
            }
        }
    }
}

/// Name of the active generation, `None` if nothing was ever built.
pub fn read_pointer(root: &Path) -> Result<Option<String>> {
    match fs::read_to_string(root.join(POINTER_FILE)) {
        Ok(s) => {
            let name = s.trim();
            if !name.starts_with(GENERATION_PREFIX) || name.contains(['/', '\\']) {
                return Err(Error::CorruptIndex {
                    path: root.join(POINTER_FILE),
                    reason: format!("invalid generation name {name:?}"),
                });
            }
            Ok(Some(name.to_string()))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Atomically point `CURRENT` at `generation`.
pub fn flip_pointer(root: &Path, generation: &str) -> Result<()> {
    let mut tmp = NamedTempFile::new_in(root)?;
    tmp.write_all(generation.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(root.join(POINTER_FILE)).map_err(|e| Error::Io(e.error))?;
    sync_dir(root)?;
    debug!(generation, "flipped active generation");
    Ok(())
}

/// Make renames inside `dir` durable.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    fs::File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}

/// Remove every generation and staging directory except `keep`.
/// Failures are logged; a stale directory never affects readers.
pub fn prune(root: &Path, keep: &str) -> usize {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(root = %root.display(), error = %e, "cannot list index root for pruning");
            return 0;
        }
    };
    let mut removed = 0;
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        let stale = (name.starts_with(GENERATION_PREFIX) && name != keep) || name.starts_with(STAGING_PREFIX);
        if !stale || !entry.path().is_dir() {
            continue;
        }
        match fs::remove_dir_all(entry.path()) {
            Ok(()) => removed += 1,
            Err(e) => warn!(dir = %entry.path().display(), error = %e, "failed to prune generation"),
        }
    }
    removed
}
