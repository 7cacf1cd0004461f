//! Implementations behind the `cchunk` subcommands.
//!
//! Each `run_*` function takes the loaded [`Config`], does its work through
//! the library modules and prints the result. JSON payloads go to stdout or
//! to the requested file; status lines go to stderr so stdout stays
//! machine-readable.

use anyhow::{anyhow, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::catalog::{analyze_structure, DocumentCatalog};
use crate::config::Config;
use crate::dedup::{dedup, find_duplicates, DedupMethod};
use crate::models::ChunkMetadata;
use crate::pipeline::{flat_chunks, open_catalog, process_corpus, DocumentChunks};
use crate::quality::compute_quality;
use crate::section_map::SectionChunkMap;

/// Number of duplicate pairs listed by `cchunk dedup`.
const SAMPLE_PAIRS: usize = 5;

/// One chunk as handed to a vector store: text plus flat metadata.
#[derive(Debug, Serialize)]
pub struct ChunkRecord<'a> {
    pub content: &'a str,
    pub metadata: ChunkMetadata,
}

fn write_output(output: Option<&Path>, contents: &str) -> Result<()> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, contents)?;
            eprintln!("Wrote {}", path.display());
        }
        None => println!("{}", contents),
    }
    Ok(())
}

fn slice_corpus(config: &Config, catalog: &DocumentCatalog) -> Vec<DocumentChunks> {
    process_corpus(
        catalog,
        &config.corpus.source_dir,
        &config.chunking.params(),
    )
}

/// `cchunk index`: scan the source directory and persist the index.
pub fn run_index(
    config: &Config,
    source_dir: Option<PathBuf>,
    enrichment_root: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let source_dir = source_dir.unwrap_or_else(|| config.corpus.source_dir.clone());
    let enrichment_root = enrichment_root.or_else(|| config.corpus.enrichment_root.clone());
    let catalog = DocumentCatalog::scan(
        &source_dir,
        enrichment_root.as_deref(),
        &config.corpus.catalog_options(),
    )?;

    let output = output.unwrap_or_else(|| config.corpus.index_path.clone());
    catalog.save(&output)?;
    println!(
        "Indexed {} documents from {} -> {}",
        catalog.len(),
        source_dir.display(),
        output.display()
    );
    Ok(())
}

/// `cchunk structure`: size and heading profile per document.
pub fn run_structure(config: &Config) -> Result<()> {
    let catalog = open_catalog(config)?;
    let reports = analyze_structure(catalog.entries(), &config.corpus.source_dir);

    println!(
        "{:<12} {:<9} {:>8} {:>6} {:>4} {:>4} {:>4}",
        "DOC_ID", "TYPE", "CHARS", "LINES", "H1", "H2", "H3"
    );
    println!("{}", "-".repeat(53));
    for r in &reports {
        println!(
            "{:<12} {:<9} {:>8} {:>6} {:>4} {:>4} {:>4}",
            r.doc_id,
            r.doc_type,
            r.char_count,
            r.line_count,
            r.headings.h1,
            r.headings.h2,
            r.headings.h3
        );
    }
    eprintln!("{} documents", reports.len());
    Ok(())
}

/// `cchunk chunk`: slice the corpus (or one document) into chunk records.
pub fn run_chunk(
    config: &Config,
    doc_id: Option<&str>,
    dedup_first: bool,
    output: Option<&Path>,
) -> Result<()> {
    let mut catalog = open_catalog(config)?;
    if let Some(doc_id) = doc_id {
        let entry = catalog
            .get(doc_id)
            .cloned()
            .ok_or_else(|| anyhow!("Unknown doc_id: {}", doc_id))?;
        catalog = DocumentCatalog::new(vec![entry]);
    }

    let mut chunks = flat_chunks(&slice_corpus(config, &catalog));
    if dedup_first {
        let before = chunks.len();
        chunks = dedup(&chunks, DedupMethod::Hash);
        eprintln!("Dropped {} duplicate chunks", before - chunks.len());
    }

    let records: Vec<ChunkRecord> = chunks
        .iter()
        .map(|c| ChunkRecord {
            content: &c.content,
            metadata: c.metadata(),
        })
        .collect();
    write_output(output, &serde_json::to_string_pretty(&records)?)?;
    eprintln!("{} chunks", records.len());
    Ok(())
}

/// `cchunk dedup`: duplicate report over the whole corpus.
pub fn run_dedup(config: &Config, method: &str) -> Result<()> {
    let method: DedupMethod = method.parse()?;
    let catalog = open_catalog(config)?;
    let chunks = flat_chunks(&slice_corpus(config, &catalog));
    let pairs = find_duplicates(&chunks, method);

    let total = chunks.len();
    let rate = if total > 0 {
        pairs.len() as f64 * 100.0 / total as f64
    } else {
        0.0
    };
    println!("Total chunks:        {}", total);
    println!("Duplicate chunks:    {}", pairs.len());
    println!("Duplicate rate:      {:.2}%", rate);
    println!("Unique after dedup:  {}", total - pairs.len());

    if !pairs.is_empty() {
        println!();
        println!("Sample pairs (doc_id / chunk_index):");
        for pair in pairs.iter().take(SAMPLE_PAIRS) {
            let a = &chunks[pair.first_index];
            let b = &chunks[pair.duplicate_index];
            println!(
                "  [{}] {} chunk {} <-> [{}] {} chunk {}",
                pair.first_index,
                a.doc_id,
                a.chunk_index,
                pair.duplicate_index,
                b.doc_id,
                b.chunk_index
            );
        }
    }
    Ok(())
}

/// `cchunk map`: section → chunk map as JSON.
pub fn run_map(config: &Config, output: Option<&Path>) -> Result<()> {
    let catalog = open_catalog(config)?;
    let map = SectionChunkMap::build(&slice_corpus(config, &catalog));
    write_output(output, &serde_json::to_string_pretty(&map)?)
}

/// `cchunk quality`: print the quality summary, optionally writing the
/// JSON and Markdown reports.
pub fn run_quality(config: &Config, output_dir: Option<&Path>) -> Result<()> {
    let catalog = open_catalog(config)?;
    if catalog.is_empty() {
        println!("No documents in the index.");
        return Ok(());
    }
    let report = compute_quality(&slice_corpus(config, &catalog), config.chunking.min_chunk);

    println!("Total chunks:        {}", report.total_chunks);
    println!("Unique after dedup:  {}", report.total_unique_after_dedup);
    println!("Duplicate rate:      {:.2}%", report.duplicate_rate * 100.0);
    println!(
        "Section coverage:    {:.2}%",
        report.section_coverage.overall * 100.0
    );

    if let Some(dir) = output_dir {
        std::fs::create_dir_all(dir)?;
        write_output(
            Some(&dir.join("quality_report.json")),
            &serde_json::to_string_pretty(&report)?,
        )?;
        write_output(Some(&dir.join("quality_report.md")), &report.to_markdown())?;
    }
    Ok(())
}
