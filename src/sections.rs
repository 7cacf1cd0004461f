//! Markdown cleaning and heading outline.
//!
//! [`clean`] normalizes raw converted Markdown (line endings, known footer
//! boilerplate, runs of blank lines). [`parse_headings`] then walks the
//! cleaned text line by line and records a [`Section`] for every `#`, `##`
//! or `###` heading.
//!
//! All offsets are byte offsets into the cleaned text and always fall on
//! line starts, so they are valid char boundaries.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::path::Path;

use crate::models::Section;

/// Footer blocks appended by the PDF-to-Markdown export of the course site.
static FOOTER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?is)---\s*\nMIT OpenCourseWare\s*\n\[.*?\]\(.*?\).*").unwrap(),
        Regex::new(r"(?is)Resource:.*?Professor Alan V\. Oppenheim\s*$").unwrap(),
    ]
});

/// Two or more blank (or whitespace-only) lines in a row.
static BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n(?:[ \t]*\n){2,}").unwrap());

/// Normalize converted Markdown before sectioning.
///
/// - `\r\n` and lone `\r` become `\n`
/// - known footer blocks are removed
/// - runs of blank lines collapse to a single blank line
/// - leading and trailing whitespace is trimmed
pub fn clean(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let mut out = text.replace("\r\n", "\n").replace('\r', "\n");
    for pattern in FOOTER_PATTERNS.iter() {
        out = pattern.replace_all(&out, "").into_owned();
    }
    let out = BLANK_RUN.replace_all(&out, "\n\n");
    out.trim().to_string()
}

/// Heading level and title for a single line (without its newline).
///
/// `### ` is tested before `## ` before `# `; `#### ` and deeper are plain text.
pub fn heading_level(line: &str) -> Option<(u8, &str)> {
    let s = line.trim_start();
    for (prefix, level) in [("### ", 3u8), ("## ", 2), ("# ", 1)] {
        if let Some(rest) = s.strip_prefix(prefix) {
            return Some((level, rest.trim()));
        }
    }
    None
}

struct Line<'a> {
    offset: usize,
    heading: Option<(u8, &'a str)>,
}

/// Parse the heading outline of cleaned text.
///
/// Returns sections ordered by `start_offset`. A text without headings
/// yields an empty list.
pub fn parse_headings(text: &str) -> Vec<Section> {
    let lines: Vec<Line> = text
        .split_inclusive('\n')
        .scan(0usize, |offset, raw| {
            let line = Line {
                offset: *offset,
                heading: heading_level(raw.trim_end_matches(['\n', '\r'])),
            };
            *offset += raw.len();
            Some(line)
        })
        .collect();

    let offset_of = |j: usize| lines.get(j).map(|l| l.offset).unwrap_or(text.len());

    let mut sections = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let Some((level, title)) = line.heading else {
            continue;
        };

        // Extent runs to the next heading of the same or a higher level.
        let end = lines[i + 1..]
            .iter()
            .position(|l| matches!(l.heading, Some((lv, _)) if lv <= level))
            .map(|p| i + 1 + p)
            .unwrap_or(lines.len());

        // Own content stops at the next heading of any level.
        let content_end = lines[i + 1..]
            .iter()
            .position(|l| l.heading.is_some())
            .map(|p| i + 1 + p)
            .unwrap_or(lines.len());

        sections.push(Section {
            level,
            title: title.to_string(),
            start_line: i + 1,
            end_line: end,
            start_offset: line.offset,
            end_offset: offset_of(end),
            content_end_offset: offset_of(content_end),
        });
    }
    sections
}

/// A cleaned document together with its heading outline.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub text: String,
    pub sections: Vec<Section>,
}

impl ParsedDocument {
    pub fn from_raw(raw: &str) -> Self {
        let text = clean(raw);
        let sections = parse_headings(&text);
        Self { text, sections }
    }
}

/// Read, clean and section a Markdown file. Invalid UTF-8 is replaced
/// rather than rejected.
pub fn load_document(path: &Path) -> Result<ParsedDocument> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(ParsedDocument::from_raw(&String::from_utf8_lossy(&bytes)))
}

/// Heading counts per level, as used by the structure report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HeadingCounts {
    pub h1: usize,
    pub h2: usize,
    pub h3: usize,
}

pub fn count_headings(text: &str) -> HeadingCounts {
    let mut counts = HeadingCounts::default();
    for line in text.lines() {
        match heading_level(line) {
            Some((1, _)) => counts.h1 += 1,
            Some((2, _)) => counts.h2 += 1,
            Some((3, _)) => counts.h3 += 1,
            _ => {}
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_line_endings_and_blank_runs() {
        let out = clean("Line 1\n\n\n\nLine 2\r\nLine 3\rLine 4");
        assert_eq!(out, "Line 1\n\nLine 2\nLine 3\nLine 4");
        assert!(!out.contains("\n\n\n"));
    }

    #[test]
    fn test_clean_whitespace_only_lines_collapse() {
        assert_eq!(clean("a\n  \n\t\n\nb"), "a\n\nb");
        assert_eq!(clean("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_clean_strips_footer() {
        let footer = "---\nMIT OpenCourseWare\n[http://ocw.mit.edu](http://ocw.mit.edu)\n\nResource: Signals and Systems\nProfessor Alan V. Oppenheim\n";
        let out = clean(&format!("Content here\n\n{}", footer));
        assert_eq!(out, "Content here");
    }

    #[test]
    fn test_clean_strips_resource_block() {
        let out = clean("Body text\n\nResource: Signals\nThe license terms.\nProfessor Alan V. Oppenheim\n");
        assert_eq!(out, "Body text");
    }

    #[test]
    fn test_clean_empty() {
        assert_eq!(clean(""), "");
        assert_eq!(clean("  \n\n "), "");
    }

    #[test]
    fn test_heading_priority() {
        assert_eq!(heading_level("### Sub"), Some((3, "Sub")));
        assert_eq!(heading_level("## Section "), Some((2, "Section")));
        assert_eq!(heading_level("  # Title"), Some((1, "Title")));
        assert_eq!(heading_level("#### Deep"), None);
        assert_eq!(heading_level("#hashtag"), None);
        assert_eq!(heading_level("## "), Some((2, "")));
    }

    #[test]
    fn test_parse_headings_levels_and_lines() {
        let text = "# Title\n\n## Section 1\n\nBody 1\n\n### Sub\n\nBody 2\n\n## Section 2\n\nEnd";
        let sections = parse_headings(text);
        assert_eq!(sections.len(), 4);

        assert_eq!((sections[0].level, sections[0].title.as_str()), (1, "Title"));
        assert_eq!(sections[0].start_line, 1);
        assert_eq!(sections[0].end_line, 13);
        assert_eq!(sections[0].end_offset, text.len());
        assert_eq!(sections[0].content_end_offset, text.find("## Section 1").unwrap());

        assert_eq!((sections[1].level, sections[1].title.as_str()), (2, "Section 1"));
        assert_eq!(sections[1].start_line, 3);
        assert_eq!(sections[1].end_line, 10);
        assert_eq!(sections[1].end_offset, text.find("## Section 2").unwrap());
        assert_eq!(sections[1].content_end_offset, text.find("### Sub").unwrap());

        assert_eq!((sections[2].level, sections[2].title.as_str()), (3, "Sub"));
        assert_eq!(sections[2].end_offset, sections[2].content_end_offset);

        assert_eq!(sections[3].title, "Section 2");
        assert_eq!(sections[3].end_line, 13);
        assert_eq!(&text[sections[3].start_offset..sections[3].end_offset], "## Section 2\n\nEnd");
    }

    #[test]
    fn test_heading_only_document() {
        let sections = parse_headings("## Only");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].start_line, 1);
        assert_eq!(sections[0].end_line, 1);
        assert_eq!(sections[0].end_offset, 7);
    }

    #[test]
    fn test_no_headings() {
        assert!(parse_headings("plain text\nwith lines").is_empty());
        assert!(parse_headings("").is_empty());
    }

    #[test]
    fn test_content_ranges_partition_after_first_heading() {
        let text = "intro\n# A\na\n## B\nb\n### C\nc\n# D\nd";
        let sections = parse_headings(text);
        assert_eq!(sections.len(), 4);
        for pair in sections.windows(2) {
            assert!(pair[0].start_offset < pair[1].start_offset);
            assert_eq!(pair[0].content_end_offset, pair[1].start_offset);
        }
        assert_eq!(sections.last().unwrap().content_end_offset, text.len());
    }

    #[test]
    fn test_count_headings() {
        let counts = count_headings("# A\n## B\n## C\n### D\n#### E\ntext");
        assert_eq!(counts, HeadingCounts { h1: 1, h2: 2, h3: 1 });
    }

    #[test]
    fn test_load_document_replaces_invalid_utf8() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("doc.md");
        std::fs::write(&path, b"# T\r\n\r\nok \xff end\r\n").unwrap();
        let doc = load_document(&path).unwrap();
        assert!(doc.text.starts_with("# T\n\nok "));
        assert_eq!(doc.sections.len(), 1);
    }
}
