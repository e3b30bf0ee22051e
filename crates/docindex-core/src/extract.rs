//! Flattens a refined document (field -> string | list of strings) into chunks.
//!
//! Field order follows the document (serde_json is built with
//! `preserve_order`), so rebuilding the same document yields the same
//! positions. Numbers, booleans, nulls and nested objects carry no
//! retrievable text and are skipped.

use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::Chunk;

const JSON_OPEN: &str = "===DOC_JSON===";
const JSON_CLOSE: &str = "===END_DOC_JSON===";
const MARKDOWN_OPEN: &str = "===DOC_MARKDOWN===";
const MARKDOWN_CLOSE: &str = "===END_DOC_MARKDOWN===";

/// The two fenced blocks a refiner response carries.
#[derive(Debug, Clone)]
pub struct RefinedDocument {
    pub markdown: Option<String>,
    pub fields: Value,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ChunkExtractor;

impl ChunkExtractor {
    pub fn new() -> Self { Self }

    /// Extract chunks from an already decoded document.
    pub fn extract(&self, document: &Value) -> Result<Vec<Chunk>> {
        let fields = document
            .as_object()
            .ok_or_else(|| Error::Extraction(format!("expected an object of fields, got {}", kind(document))))?;

        let mut chunks = Vec::new();
        for (name, value) in fields {
            match value {
                Value::String(s) => push_chunk(&mut chunks, s, name.clone()),
                Value::Array(items) => {
                    for (i, item) in items.iter().enumerate() {
                        if let Value::String(s) = item {
                            push_chunk(&mut chunks, s, format!("{name}[{i}]"));
                        }
                    }
                }
                other => debug!(field = %name, kind = kind(other), "skipping field without text"),
            }
        }
        debug!(fields = fields.len(), chunks = chunks.len(), "extracted chunks");
        Ok(chunks)
    }

    /// Decode `input` as JSON and extract chunks from it.
    pub fn extract_str(&self, input: &str) -> Result<Vec<Chunk>> {
        let document: Value =
            serde_json::from_str(input).map_err(|e| Error::Extraction(format!("not decodable as JSON: {e}")))?;
        self.extract(&document)
    }

    /// Extract chunks from a raw refiner response that wraps the JSON
    /// document in `===DOC_JSON===` fences.
    pub fn extract_refiner_output(&self, raw: &str) -> Result<Vec<Chunk>> {
        let refined = parse_refiner_output(raw)?;
        self.extract(&refined.fields)
    }
}

/// Split a refiner response into its markdown and JSON blocks.
/// The JSON block is required, the markdown block is optional.
pub fn parse_refiner_output(raw: &str) -> Result<RefinedDocument> {
    let json = fenced(raw, JSON_OPEN, JSON_CLOSE)
        .ok_or_else(|| Error::Extraction(format!("no {JSON_OPEN} block in refiner output")))?;
    let fields: Value = serde_json::from_str(json)
        .map_err(|e| Error::Extraction(format!("{JSON_OPEN} block is not valid JSON: {e}")))?;
    let markdown = fenced(raw, MARKDOWN_OPEN, MARKDOWN_CLOSE).map(str::to_string);
    Ok(RefinedDocument { markdown, fields })
}

fn fenced<'a>(raw: &'a str, open: &str, close: &str) -> Option<&'a str> {
    let start = raw.find(open)? + open.len();
    let len = raw[start..].find(close)?;
    Some(raw[start..start + len].trim())
}

fn push_chunk(chunks: &mut Vec<Chunk>, raw: &str, source_field: String) {
    let text = normalize(raw);
    if text.is_empty() {
        return;
    }
    let position = chunks.len();
    chunks.push(Chunk { text, source_field, position });
}

/// Trim and collapse blank-line runs to one newline so chunk text never
/// contains the corpus separator.
pub fn normalize(raw: &str) -> String {
    let unified = raw.replace("\r\n", "\n");
    let mut out = String::with_capacity(unified.len());
    for line in unified.trim().lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(line);
    }
    out
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_blank_lines() {
        assert_eq!(normalize("  one\n\n\n two  \r\n\r\nthree \n"), "one\n two\nthree");
        assert_eq!(normalize(" \n\t "), "");
    }

    #[test]
    fn fenced_block_is_trimmed() {
        let raw = "noise ===DOC_JSON===\n {\"a\": 1} \n===END_DOC_JSON=== tail";
        assert_eq!(fenced(raw, JSON_OPEN, JSON_CLOSE), Some("{\"a\": 1}"));
        assert_eq!(fenced("===DOC_JSON=== unterminated", JSON_OPEN, JSON_CLOSE), None);
    }
}
