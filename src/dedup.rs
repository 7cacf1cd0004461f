//! Exact-duplicate detection over a flat chunk list.
//!
//! Chunk text is whitespace-normalized and hashed with SHA-256; the first
//! chunk with a given hash wins and every later one is reported against it.
//! Only the `hash` strategy exists. Asking for any other strategy is a
//! programming error and fails with [`DedupError::UnsupportedMethod`].

use sha2::{Digest, Sha256};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use thiserror::Error;

use crate::models::{Chunk, DuplicatePair};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DedupError {
    #[error("Unsupported dedup method: '{0}'. Supported: hash")]
    UnsupportedMethod(String),
}

/// Deduplication strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DedupMethod {
    /// SHA-256 over whitespace-normalized content.
    #[default]
    Hash,
}

impl FromStr for DedupMethod {
    type Err = DedupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hash" => Ok(DedupMethod::Hash),
            other => Err(DedupError::UnsupportedMethod(other.to_string())),
        }
    }
}

/// Collapse every whitespace run to one space and trim both ends.
pub fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Hex SHA-256 of the normalized text.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize(text).as_bytes());
    format!("{:x}", hasher.finalize())
}

fn key(chunk: &Chunk, method: DedupMethod) -> String {
    match method {
        DedupMethod::Hash => content_hash(&chunk.content),
    }
}

/// Report every chunk whose normalized content was already seen.
pub fn find_duplicates(chunks: &[Chunk], method: DedupMethod) -> Vec<DuplicatePair> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut pairs = Vec::new();
    for (i, chunk) in chunks.iter().enumerate() {
        match seen.entry(key(chunk, method)) {
            Entry::Occupied(first) => pairs.push(DuplicatePair {
                first_index: *first.get(),
                duplicate_index: i,
            }),
            Entry::Vacant(slot) => {
                slot.insert(i);
            }
        }
    }
    pairs
}

/// Keep only first-seen chunks, in their original relative order.
pub fn dedup(chunks: &[Chunk], method: DedupMethod) -> Vec<Chunk> {
    let mut seen = HashSet::new();
    chunks
        .iter()
        .filter(|chunk| seen.insert(key(chunk, method)))
        .cloned()
        .collect()
}

/// [`find_duplicates`] with the strategy given by name.
pub fn find_duplicates_by_name(
    chunks: &[Chunk],
    method: &str,
) -> Result<Vec<DuplicatePair>, DedupError> {
    Ok(find_duplicates(chunks, method.parse()?))
}

/// [`dedup`] with the strategy given by name.
pub fn dedup_by_name(chunks: &[Chunk], method: &str) -> Result<Vec<Chunk>, DedupError> {
    Ok(dedup(chunks, method.parse()?))
}
