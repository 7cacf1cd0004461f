//! Core data models used throughout the chunking pipeline.
//!
//! These types represent the catalogued documents, the heading outline of a
//! document, and the chunks that flow from the splitter into deduplication,
//! section mapping, and quality reporting.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Kind of course document, derived from the logical id in the filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocType {
    Lecture,
    Homework,
    Solution,
}

impl DocType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocType::Lecture => "lecture",
            DocType::Homework => "homework",
            DocType::Solution => "solution",
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recognized source file in the corpus directory.
///
/// Created once per scan and never mutated afterwards. The catalog persists
/// a list of these as a JSON array so later runs can skip rescanning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub file_path: PathBuf,
    pub file_name: String,
    pub content_hash: String,
    pub doc_id: String,
    pub doc_type: DocType,
    pub sequence_index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub related_ids: Vec<String>,
}

/// A heading-delimited span of a cleaned document.
///
/// `start_offset..end_offset` is the hierarchical extent: it runs up to the
/// next heading of the same or a higher level. `start_offset..content_end_offset`
/// is the text the heading owns directly, up to the next heading of any
/// level; those ranges never overlap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub level: u8,
    pub title: String,
    pub start_line: usize,
    pub end_line: usize,
    pub start_offset: usize,
    pub end_offset: usize,
    pub content_end_offset: usize,
}

/// A bounded slice of document text with positional and section metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub source_file: String,
    pub doc_id: String,
    pub doc_type: DocType,
    pub section_title: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub content_type: DocType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Position in the document's heading outline of the section this
    /// chunk was cut from; `None` for text outside any heading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_index: Option<usize>,
}

impl Chunk {
    /// Flatten into the scalar-only record consumed by the vector store.
    pub fn metadata(&self) -> ChunkMetadata {
        ChunkMetadata {
            source_file: self.source_file.clone(),
            doc_type: self.doc_type.as_str().to_string(),
            doc_id: self.doc_id.clone(),
            section_title: self.section_title.clone(),
            chunk_index: self.chunk_index,
            total_chunks: self.total_chunks,
            content_type: self.content_type.as_str().to_string(),
            title: self.title.clone().filter(|t| !t.is_empty()),
        }
    }
}

/// Scalar metadata for a chunk. No nested values: the downstream store only
/// accepts strings and integers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source_file: String,
    pub doc_type: String,
    pub doc_id: String,
    pub section_title: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// `(first_index, duplicate_index)` into a flat chunk list.
/// `first_index` is always the earlier, first-seen position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DuplicatePair {
    pub first_index: usize,
    pub duplicate_index: usize,
}
