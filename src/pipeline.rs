//! Corpus-wide slicing.
//!
//! Each catalog entry is read, cleaned, sectioned and split independently,
//! so documents are processed in parallel with rayon. Results are collected
//! in catalog order, which keeps the flat chunk list (and with it the
//! first-seen rule of dedup) deterministic.

use anyhow::Result;
use rayon::prelude::*;
use std::path::Path;
use tracing::{info, warn};

use crate::catalog::DocumentCatalog;
use crate::chunk::{slice_document, ChunkParams};
use crate::config::Config;
use crate::models::{Chunk, DocumentEntry, Section};
use crate::sections::load_document;

/// One document after slicing, with the heading outline it was cut from.
#[derive(Debug, Clone)]
pub struct DocumentChunks {
    pub entry: DocumentEntry,
    pub sections: Vec<Section>,
    pub chunks: Vec<Chunk>,
}

impl DocumentChunks {
    pub fn doc_id(&self) -> &str {
        &self.entry.doc_id
    }
}

/// Slice every document in the catalog.
///
/// Entries whose file cannot be found or read are skipped with a warning.
pub fn process_corpus(
    catalog: &DocumentCatalog,
    fallback_dir: &Path,
    params: &ChunkParams,
) -> Vec<DocumentChunks> {
    let docs: Vec<DocumentChunks> = catalog
        .entries()
        .par_iter()
        .filter_map(|entry| process_entry(entry, fallback_dir, params))
        .collect();

    let total: usize = docs.iter().map(|d| d.chunks.len()).sum();
    info!("sliced {} documents into {} chunks", docs.len(), total);
    docs
}

fn process_entry(
    entry: &DocumentEntry,
    fallback_dir: &Path,
    params: &ChunkParams,
) -> Option<DocumentChunks> {
    let Some(path) = DocumentCatalog::resolve_path(entry, fallback_dir) else {
        warn!("skipping {}: file not found", entry.file_name);
        return None;
    };
    let doc = match load_document(&path) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("skipping {}: {:#}", entry.file_name, e);
            return None;
        }
    };
    let chunks = slice_document(&doc, entry, params);
    Some(DocumentChunks {
        entry: entry.clone(),
        sections: doc.sections,
        chunks,
    })
}

/// Concatenate per-document chunks in document order.
pub fn flat_chunks(docs: &[DocumentChunks]) -> Vec<Chunk> {
    docs.iter().flat_map(|d| d.chunks.iter().cloned()).collect()
}

/// Load the saved index if there is one, otherwise scan the source directory.
pub fn open_catalog(config: &Config) -> Result<DocumentCatalog> {
    let corpus = &config.corpus;
    if corpus.index_path.is_file() {
        return DocumentCatalog::load(&corpus.index_path);
    }
    DocumentCatalog::scan(
        &corpus.source_dir,
        corpus.enrichment_root.as_deref(),
        &corpus.catalog_options(),
    )
}
