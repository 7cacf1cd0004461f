//! Document catalog: the ordered list of recognized course files.
//!
//! Source files follow the naming convention
//! `<32-hex hash>_<course token>_<logical id>.md`, where the logical id is
//! `lecNN`, `hwNN` or `hwNN_sol`. Anything else in the directory is ignored.
//!
//! When an enrichment root is given, titles and descriptions are looked up
//! through `<root>/content_map.json`, which maps the dashed form of the hash
//! (see [`hash_to_dashed`]) to a resource path such as
//! `/resources/lec01/data.json`, resolved relative to the root.
//!
//! The catalog is built once per scan and can be persisted as a JSON array
//! so later runs skip the directory walk.

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::models::{DocType, DocumentEntry};
use crate::sections::{count_headings, HeadingCounts};

/// Course token used by the MIT OCW export the corpus was built from.
pub const DEFAULT_COURSE_TOKEN: &str = "MITRES_6_007S11";

/// Name of the id-to-resource table inside an enrichment root.
pub const CONTENT_MAP_FILE: &str = "content_map.json";

static DEFAULT_PATTERN: Lazy<FilenamePattern> =
    Lazy::new(|| FilenamePattern::new(DEFAULT_COURSE_TOKEN).unwrap());

/// The pieces of a recognized filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFilename {
    pub content_hash: String,
    pub doc_id: String,
    pub doc_type: DocType,
}

/// Filename matcher for one course token. Matching is case-insensitive;
/// the hash and doc id are returned lowercased.
#[derive(Debug, Clone)]
pub struct FilenamePattern {
    regex: Regex,
}

impl FilenamePattern {
    pub fn new(course_token: &str) -> Result<Self> {
        let pattern = format!(
            r"(?i)^([0-9a-f]{{32}})_{}_(lec[0-9]{{2}}|hw[0-9]{{2}}_sol|hw[0-9]{{2}})\.md$",
            regex::escape(course_token)
        );
        let regex = Regex::new(&pattern)
            .with_context(|| format!("Invalid course token: {}", course_token))?;
        Ok(Self { regex })
    }

    pub fn parse(&self, name: &str) -> Option<ParsedFilename> {
        let caps = self.regex.captures(name)?;
        let content_hash = caps[1].to_ascii_lowercase();
        let doc_id = caps[2].to_ascii_lowercase();
        let doc_type = if doc_id.starts_with("lec") {
            DocType::Lecture
        } else if doc_id.ends_with("_sol") {
            DocType::Solution
        } else {
            DocType::Homework
        };
        Some(ParsedFilename {
            content_hash,
            doc_id,
            doc_type,
        })
    }
}

/// Parse a filename with the default course token. `None` means the file
/// is not part of the corpus.
pub fn parse_filename(name: &str) -> Option<ParsedFilename> {
    DEFAULT_PATTERN.parse(name)
}

/// Reformat a 32-char hash as 8-4-4-4-12 groups. Any other input is
/// returned unchanged.
pub fn hash_to_dashed(hash: &str) -> String {
    if hash.len() != 32 || !hash.is_ascii() {
        return hash.to_string();
    }
    format!(
        "{}-{}-{}-{}-{}",
        &hash[..8],
        &hash[8..12],
        &hash[12..16],
        &hash[16..20],
        &hash[20..]
    )
}

/// Numeric suffix of a logical id: `lec03` → 3, `hw12_sol` → 12.
fn sequence_index(doc_id: &str) -> u32 {
    doc_id
        .chars()
        .filter(char::is_ascii_digit)
        .collect::<String>()
        .parse()
        .unwrap_or(0)
}

/// Sibling documents sharing the same sequence index.
fn related_ids(doc_type: DocType, index: u32) -> Vec<String> {
    let lec = format!("lec{:02}", index);
    let hw = format!("hw{:02}", index);
    let sol = format!("hw{:02}_sol", index);
    match doc_type {
        DocType::Lecture => vec![hw, sol],
        DocType::Homework => vec![lec, sol],
        DocType::Solution => vec![lec, hw],
    }
}

#[derive(Debug, Default, Deserialize)]
struct ResourceInfo {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// External title/description lookup keyed by dashed content hash.
#[derive(Debug, Clone, Default)]
pub struct Enrichment {
    root: PathBuf,
    content_map: HashMap<String, String>,
}

impl Enrichment {
    /// Load the content map under `root`. A missing or unreadable map gives
    /// an empty lookup; enrichment never fails a scan.
    pub fn load(root: &Path) -> Self {
        let path = root.join(CONTENT_MAP_FILE);
        let content_map = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("ignoring malformed {}: {}", path.display(), e);
                HashMap::new()
            }),
            Err(_) => {
                debug!("no content map at {}", path.display());
                HashMap::new()
            }
        };
        Self {
            root: root.to_path_buf(),
            content_map,
        }
    }

    fn lookup(&self, content_hash: &str) -> Option<ResourceInfo> {
        let resource = self.content_map.get(&hash_to_dashed(content_hash))?;
        let path = self.root.join(resource.trim_start_matches('/'));
        let raw = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(info) => Some(info),
            Err(e) => {
                warn!("ignoring malformed {}: {}", path.display(), e);
                None
            }
        }
    }

    fn apply(&self, entry: &mut DocumentEntry) {
        if let Some(info) = self.lookup(&entry.content_hash) {
            entry.title = info.title;
            entry.description = info.description;
        }
    }
}

/// Scan options beyond the directory itself.
#[derive(Debug, Clone)]
pub struct CatalogOptions {
    pub course_token: String,
    /// Glob patterns matched against the file name; matches are skipped.
    pub exclude_globs: Vec<String>,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            course_token: DEFAULT_COURSE_TOKEN.to_string(),
            exclude_globs: Vec::new(),
        }
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// List recognized files in `dir` (non-recursive, sorted by name) and turn
/// each into a [`DocumentEntry`]. A missing directory yields an empty list.
pub fn build_catalog(
    dir: &Path,
    enrichment_root: Option<&Path>,
    options: &CatalogOptions,
) -> Result<Vec<DocumentEntry>> {
    if !dir.is_dir() {
        warn!("source directory {} does not exist", dir.display());
        return Ok(Vec::new());
    }

    let pattern = FilenamePattern::new(&options.course_token)?;
    let exclude_set = build_globset(&options.exclude_globs)?;
    let enrichment = enrichment_root.map(Enrichment::load);

    let mut entries = Vec::new();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();
    for item in walker {
        let item = item?;
        if !item.file_type().is_file() {
            continue;
        }
        let file_name = item.file_name().to_string_lossy().to_string();

        if exclude_set.is_match(&file_name) {
            debug!("excluded {}", file_name);
            continue;
        }
        let Some(parsed) = pattern.parse(&file_name) else {
            debug!("skipping {}: not recognized", file_name);
            continue;
        };

        let sequence_index = sequence_index(&parsed.doc_id);
        let path = item.path();
        let mut entry = DocumentEntry {
            file_path: std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf()),
            file_name,
            content_hash: parsed.content_hash,
            related_ids: related_ids(parsed.doc_type, sequence_index),
            doc_id: parsed.doc_id,
            doc_type: parsed.doc_type,
            sequence_index,
            title: None,
            description: None,
        };
        if let Some(enrichment) = &enrichment {
            enrichment.apply(&mut entry);
        }
        entries.push(entry);
    }

    info!("catalogued {} documents from {}", entries.len(), dir.display());
    Ok(entries)
}

/// The catalog as an explicit repository object, built once and passed to
/// every consumer.
#[derive(Debug, Clone, Default)]
pub struct DocumentCatalog {
    entries: Vec<DocumentEntry>,
}

impl DocumentCatalog {
    pub fn new(entries: Vec<DocumentEntry>) -> Self {
        Self { entries }
    }

    pub fn scan(
        dir: &Path,
        enrichment_root: Option<&Path>,
        options: &CatalogOptions,
    ) -> Result<Self> {
        Ok(Self::new(build_catalog(dir, enrichment_root, options)?))
    }

    /// Load a previously saved index.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read document index: {}", path.display()))?;
        let entries = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse document index: {}", path.display()))?;
        Ok(Self::new(entries))
    }

    /// Write the index as a pretty-printed JSON array.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write document index: {}", path.display()))?;
        Ok(())
    }

    pub fn entries(&self) -> &[DocumentEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, doc_id: &str) -> Option<&DocumentEntry> {
        self.entries.iter().find(|e| e.doc_id == doc_id)
    }

    /// Locate the file for an entry: its recorded path, or the same file
    /// name under `fallback_dir` (for indexes built on another machine).
    pub fn resolve_path(entry: &DocumentEntry, fallback_dir: &Path) -> Option<PathBuf> {
        if entry.file_path.is_file() {
            return Some(entry.file_path.clone());
        }
        let candidate = fallback_dir.join(&entry.file_name);
        candidate.is_file().then_some(candidate)
    }
}

/// Size and heading profile of one raw source file.
#[derive(Debug, Clone, Serialize)]
pub struct StructureReport {
    pub file_name: String,
    pub doc_id: String,
    pub doc_type: DocType,
    pub char_count: usize,
    pub line_count: usize,
    pub headings: HeadingCounts,
}

/// Profile every entry whose file can be read. Unreadable files are skipped.
pub fn analyze_structure(entries: &[DocumentEntry], fallback_dir: &Path) -> Vec<StructureReport> {
    entries
        .iter()
        .filter_map(|entry| {
            let path = DocumentCatalog::resolve_path(entry, fallback_dir)?;
            let text = match std::fs::read(&path) {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) => {
                    warn!("skipping {}: {}", path.display(), e);
                    return None;
                }
            };
            Some(StructureReport {
                file_name: entry.file_name.clone(),
                doc_id: entry.doc_id.clone(),
                doc_type: entry.doc_type,
                char_count: text.chars().count(),
                line_count: text.lines().count(),
                headings: count_headings(&text),
            })
        })
        .collect()
}
