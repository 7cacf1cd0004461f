use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::catalog::{CatalogOptions, DEFAULT_COURSE_TOKEN};
use crate::chunk::ChunkParams;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,
    #[serde(default)]
    pub enrichment_root: Option<PathBuf>,
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,
    #[serde(default = "default_course_token")]
    pub course_token: String,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            source_dir: default_source_dir(),
            enrichment_root: None,
            index_path: default_index_path(),
            course_token: default_course_token(),
            exclude_globs: Vec::new(),
        }
    }
}

impl CorpusConfig {
    pub fn catalog_options(&self) -> CatalogOptions {
        CatalogOptions {
            course_token: self.course_token.clone(),
            exclude_globs: self.exclude_globs.clone(),
        }
    }
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("results")
}
fn default_index_path() -> PathBuf {
    PathBuf::from("config/doc_index.json")
}
fn default_course_token() -> String {
    DEFAULT_COURSE_TOKEN.to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
    #[serde(default = "default_min_chunk")]
    pub min_chunk: usize,
    #[serde(default = "default_max_chunk")]
    pub max_chunk: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
            min_chunk: default_min_chunk(),
            max_chunk: default_max_chunk(),
        }
    }
}

fn default_chunk_size() -> usize {
    600
}
fn default_overlap() -> usize {
    75
}
fn default_min_chunk() -> usize {
    300
}
fn default_max_chunk() -> usize {
    800
}

/// Environment variables that override `[chunking]` values.
pub const ENV_CHUNK_SIZE: &str = "SPLITTER_CHUNK_SIZE";
pub const ENV_CHUNK_OVERLAP: &str = "SPLITTER_CHUNK_OVERLAP";
pub const ENV_MIN_CHUNK: &str = "SPLITTER_MIN_CHUNK";
pub const ENV_MAX_CHUNK: &str = "SPLITTER_MAX_CHUNK";

impl ChunkingConfig {
    /// Apply overrides from a variable lookup. Values that are not plain
    /// unsigned integers are ignored and the current value kept.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let fields: [(&str, &mut usize); 4] = [
            (ENV_CHUNK_SIZE, &mut self.chunk_size),
            (ENV_CHUNK_OVERLAP, &mut self.overlap),
            (ENV_MIN_CHUNK, &mut self.min_chunk),
            (ENV_MAX_CHUNK, &mut self.max_chunk),
        ];
        for (name, slot) in fields {
            let Some(raw) = lookup(name) else { continue };
            match raw.trim().parse::<usize>() {
                Ok(v) => *slot = v,
                Err(_) => warn!("ignoring {}={:?}: not an unsigned integer", name, raw),
            }
        }
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    pub fn params(&self) -> ChunkParams {
        ChunkParams {
            chunk_size: self.chunk_size,
            overlap: self.overlap,
            max_chunk: self.max_chunk,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            anyhow::bail!("chunking.chunk_size must be > 0");
        }
        if self.overlap >= self.chunk_size {
            anyhow::bail!(
                "chunking.overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.overlap,
                self.chunk_size
            );
        }
        if self.max_chunk < self.chunk_size {
            anyhow::bail!(
                "chunking.max_chunk ({}) must be >= chunking.chunk_size ({})",
                self.max_chunk,
                self.chunk_size
            );
        }
        if self.min_chunk > self.chunk_size {
            anyhow::bail!(
                "chunking.min_chunk ({}) must be <= chunking.chunk_size ({})",
                self.min_chunk,
                self.chunk_size
            );
        }
        Ok(())
    }
}

impl Config {
    /// Built-in defaults with environment overrides, for runs without a
    /// config file.
    pub fn from_env() -> Result<Config> {
        let mut config = Config::default();
        config.chunking.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;
        if self.corpus.course_token.trim().is_empty() {
            anyhow::bail!("corpus.course_token must not be empty");
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config = parse_config(&content)?;
    config.chunking.apply_env_overrides();
    config.validate()?;

    Ok(config)
}

fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).with_context(|| "Failed to parse config file")
}
