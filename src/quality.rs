//! Corpus quality metrics.
//!
//! Aggregates chunk counts, length statistics, the exact-duplicate rate and
//! section coverage over a sliced corpus. Lengths are UTF-8 byte lengths,
//! the same unit the splitter works in.
//!
//! A heading section counts as covered when at least one chunk was cut from
//! it. A document without headings is treated as fully covered.

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt::Write as _;

use crate::dedup::{find_duplicates, DedupMethod};
use crate::models::{Chunk, Section};
use crate::pipeline::{flat_chunks, DocumentChunks};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocStats {
    pub chunk_count: usize,
    pub avg_len: f64,
    pub min_len: usize,
    pub max_len: usize,
    /// Chunks shorter than the configured `min_chunk`.
    pub short_chunks: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SectionCoverage {
    pub by_doc: BTreeMap<String, f64>,
    pub overall: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QualityReport {
    pub by_doc: BTreeMap<String, DocStats>,
    pub total_chunks: usize,
    pub duplicate_count: usize,
    pub total_unique_after_dedup: usize,
    pub duplicate_rate: f64,
    pub section_coverage: SectionCoverage,
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        1.0
    } else {
        part as f64 / whole as f64
    }
}

pub fn doc_stats(chunks: &[Chunk], min_chunk: usize) -> DocStats {
    if chunks.is_empty() {
        return DocStats::default();
    }
    let lengths: Vec<usize> = chunks.iter().map(|c| c.content.len()).collect();
    let sum: usize = lengths.iter().sum();
    DocStats {
        chunk_count: lengths.len(),
        avg_len: round_to(sum as f64 / lengths.len() as f64, 1),
        min_len: lengths.iter().copied().min().unwrap_or(0),
        max_len: lengths.iter().copied().max().unwrap_or(0),
        short_chunks: lengths.iter().filter(|&&len| len < min_chunk).count(),
    }
}

/// Covered and total heading sections of one document.
pub fn section_coverage(chunks: &[Chunk], sections: &[Section]) -> (usize, usize) {
    let owned: HashSet<usize> = chunks.iter().filter_map(|c| c.section_index).collect();
    let covered = (0..sections.len()).filter(|i| owned.contains(i)).count();
    (covered, sections.len())
}

/// Compute the full report for a sliced corpus.
pub fn compute_quality(docs: &[DocumentChunks], min_chunk: usize) -> QualityReport {
    let all = flat_chunks(docs);
    let total_chunks = all.len();
    let duplicate_count = find_duplicates(&all, DedupMethod::Hash).len();
    let duplicate_rate = if total_chunks == 0 {
        0.0
    } else {
        duplicate_count as f64 / total_chunks as f64
    };

    let mut by_doc = BTreeMap::new();
    let mut coverage_by_doc = BTreeMap::new();
    let (mut covered_total, mut sections_total) = (0, 0);
    for doc in docs {
        by_doc.insert(doc.doc_id().to_string(), doc_stats(&doc.chunks, min_chunk));

        let (covered, total) = section_coverage(&doc.chunks, &doc.sections);
        covered_total += covered;
        sections_total += total;
        coverage_by_doc.insert(doc.doc_id().to_string(), ratio(covered, total));
    }

    QualityReport {
        by_doc,
        total_chunks,
        duplicate_count,
        total_unique_after_dedup: total_chunks - duplicate_count,
        duplicate_rate: round_to(duplicate_rate, 4),
        section_coverage: SectionCoverage {
            by_doc: coverage_by_doc,
            overall: round_to(ratio(covered_total, sections_total), 4),
        },
    }
}

impl QualityReport {
    /// Render a short Markdown summary with a per-document table.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Data Quality Report");
        let _ = writeln!(out);
        let _ = writeln!(out, "| Metric | Value |");
        let _ = writeln!(out, "|--------|-------|");
        let _ = writeln!(out, "| Total chunks | {} |", self.total_chunks);
        let _ = writeln!(out, "| Unique after dedup | {} |", self.total_unique_after_dedup);
        let _ = writeln!(out, "| Duplicate rate | {:.2}% |", self.duplicate_rate * 100.0);
        let _ = writeln!(
            out,
            "| Section coverage (overall) | {:.2}% |",
            self.section_coverage.overall * 100.0
        );
        let _ = writeln!(out);
        let _ = writeln!(out, "## By document");
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "| doc_id | chunks | avg len | min | max | short | section coverage |"
        );
        let _ = writeln!(
            out,
            "|--------|--------|---------|-----|-----|-------|------------------|"
        );
        for (doc_id, stats) in &self.by_doc {
            let coverage = self
                .section_coverage
                .by_doc
                .get(doc_id)
                .copied()
                .unwrap_or(0.0);
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} | {} | {} | {:.0}% |",
                doc_id,
                stats.chunk_count,
                stats.avg_len,
                stats.min_len,
                stats.max_len,
                stats.short_chunks,
                coverage * 100.0
            );
        }
        out
    }
}
