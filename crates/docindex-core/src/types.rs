//! Domain types shared by the extractor, the vector store and the query engine.

use serde::{Deserialize, Serialize};

/// Separator between chunk texts in the persisted corpus.
pub const CORPUS_SEPARATOR: &str = "\n\n";

/// A unit of retrievable text.
///
/// - `text`: trimmed payload, never contains [`CORPUS_SEPARATOR`]
/// - `source_field`: document field it came from (`overview`, `faqs[2]`)
/// - `position`: 0-based slot in the corpus; joins corpus text and vector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source_field: String,
    pub position: usize,
}

impl Chunk {
    pub fn new(text: impl Into<String>, source_field: impl Into<String>, position: usize) -> Self {
        Self { text: text.into(), source_field: source_field.into(), position }
    }

    /// Why this chunk cannot be stored at slot `expected`, if anything.
    pub fn violation(&self, expected: usize) -> Option<String> {
        if self.position != expected {
            return Some(format!("position {} out of order, expected {}", self.position, expected));
        }
        if self.text.trim().is_empty() {
            return Some("text is blank".to_string());
        }
        if self.text.trim() != self.text {
            return Some("text has leading or trailing whitespace".to_string());
        }
        if self.text.contains(CORPUS_SEPARATOR) {
            return Some("text contains a blank line".to_string());
        }
        None
    }
}

/// Distance function an index was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    SquaredL2,
}

impl Metric {
    pub fn id(self) -> u8 {
        match self {
            Metric::SquaredL2 => 0,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Metric::SquaredL2),
            _ => None,
        }
    }

    pub fn distance(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Metric::SquaredL2 => a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum(),
        }
    }
}

/// One ranked result. Lower `distance` is closer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub position: usize,
    pub text: String,
    pub distance: f32,
}
