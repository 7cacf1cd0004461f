//! Section → chunk map.
//!
//! Rebuilds the document → section → chunk tree from the splitter output by
//! grouping consecutive chunks with the same `section_title`. The map is a
//! view for inspection and citation, never a second source of truth: reading
//! the chunk indices of a document's records in order gives back exactly the
//! splitter's chunk order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{Chunk, Section};
use crate::pipeline::DocumentChunks;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRef {
    pub chunk_index: usize,
}

/// A run of consecutive chunks sharing one section title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRecord {
    pub section_title: String,
    /// Heading level of the title, or 0 when no heading carries it.
    pub section_level: u8,
    pub chunks: Vec<ChunkRef>,
}

/// Serialized as `{"documents": {doc_id: [SectionRecord, ...]}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionChunkMap {
    pub documents: BTreeMap<String, Vec<SectionRecord>>,
}

impl SectionChunkMap {
    pub fn build(docs: &[DocumentChunks]) -> Self {
        let documents = docs
            .iter()
            .map(|d| (d.doc_id().to_string(), map_sections(&d.chunks, &d.sections)))
            .collect();
        Self { documents }
    }

    /// Chunk indices of a document in map order.
    pub fn chunk_order(&self, doc_id: &str) -> Option<Vec<usize>> {
        let records = self.documents.get(doc_id)?;
        Some(
            records
                .iter()
                .flat_map(|r| r.chunks.iter().map(|c| c.chunk_index))
                .collect(),
        )
    }
}

/// Level of the first heading with this title.
fn level_of(title: &str, sections: &[Section]) -> u8 {
    if title.is_empty() {
        return 0;
    }
    sections
        .iter()
        .find(|s| s.title == title)
        .map(|s| s.level)
        .unwrap_or(0)
}

/// Group one document's chunks into section records.
pub fn map_sections(chunks: &[Chunk], sections: &[Section]) -> Vec<SectionRecord> {
    let mut records: Vec<SectionRecord> = Vec::new();
    for chunk in chunks {
        let chunk_ref = ChunkRef {
            chunk_index: chunk.chunk_index,
        };
        if let Some(last) = records
            .last_mut()
            .filter(|r| r.section_title == chunk.section_title)
        {
            last.chunks.push(chunk_ref);
            continue;
        }
        records.push(SectionRecord {
            section_title: chunk.section_title.clone(),
            section_level: level_of(&chunk.section_title, sections),
            chunks: vec![chunk_ref],
        });
    }
    records
}
