//! # Course Chunker
//!
//! Preprocessing for a course-material retrieval index.
//!
//! Course documents (lectures, homework, solutions) arrive as Markdown files
//! converted from PDF. This crate catalogs them from their filenames, cleans
//! and sections the text, splits it into bounded, overlapping chunks that
//! avoid cutting through formulas, list items and table rows, and then
//! reports exact duplicates, the section → chunk tree and corpus quality.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌─────────────┐
//! │ Catalog  │──▶│ Sections │──▶│ Splitter │──▶│ flat chunks │
//! │ (names)  │   │ (clean)  │   │ (chunk)  │   └──────┬──────┘
//! └──────────┘   └──────────┘   └──────────┘          │
//!                                   ┌─────────────────┼──────────────┐
//!                                   ▼                 ▼              ▼
//!                              ┌─────────┐     ┌─────────────┐  ┌─────────┐
//!                              │  Dedup  │     │ Section map │  │ Quality │
//!                              └─────────┘     └─────────────┘  └─────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! cchunk index --source-dir results       # build config/doc_index.json
//! cchunk chunk --dedup --output chunks.json
//! cchunk quality --output-dir reports
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and env overrides |
//! | [`models`] | Core data types |
//! | [`catalog`] | Filename recognition, enrichment, index persistence |
//! | [`sections`] | Markdown cleaning and heading outline |
//! | [`chunk`] | Section-aware, formula-safe splitting |
//! | [`dedup`] | Exact-duplicate detection |
//! | [`section_map`] | Section → chunk tree |
//! | [`quality`] | Corpus quality metrics |
//! | [`pipeline`] | Parallel corpus slicing |
//! | [`commands`] | CLI command implementations |

pub mod catalog;
pub mod chunk;
pub mod commands;
pub mod config;
pub mod dedup;
pub mod models;
pub mod pipeline;
pub mod quality;
pub mod section_map;
pub mod sections;
