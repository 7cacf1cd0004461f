//! Section-aware, formula-safe text chunker.
//!
//! Splits cleaned document text into [`Chunk`]s bounded by
//! [`ChunkParams::max_chunk`]. Sections from [`crate::sections`] are kept
//! whole when they fit; longer sections, text before the first heading, and
//! heading-less documents go through the size-based splitter.
//!
//! # Algorithm
//!
//! 1. Tentative cut at `start + chunk_size`.
//! 2. Look up to [`LOOKBACK`] bytes back and [`LOOKAHEAD`] bytes forward for
//!    a safe break, in order of preference: blank line, newline, sentence
//!    end followed by a space, plain space. A newline break whose line is a
//!    `- ` list item or `|` table row moves back to the start of that line.
//!    A break must land past the previous window's end.
//! 3. If the cut leaves a `$$`, `\(`, `\[` or inline `$` open, extend it to
//!    the closer as long as the chunk stays within `max_chunk`.
//! 4. The next window starts `overlap` bytes before the cut, but always
//!    strictly after the previous start.
//!
//! Offsets are byte offsets snapped to UTF-8 char boundaries. The output is
//! a pure function of the input text and parameters.
//!
//! # Example
//!
//! ```rust
//! use course_chunker::chunk::{split_by_size, ChunkParams};
//!
//! let params = ChunkParams { chunk_size: 600, overlap: 75, max_chunk: 800 };
//! let chunks = split_by_size("Hello world.\n\nSecond paragraph.", &params);
//! assert_eq!(chunks, vec!["Hello world.\n\nSecond paragraph."]);
//! ```

use std::ops::Range;

use crate::models::{Chunk, DocumentEntry, Section};
use crate::sections::ParsedDocument;

/// How far before the tentative cut the safe-break search starts.
pub const LOOKBACK: usize = 150;
/// How far past the tentative cut the safe-break search may look.
pub const LOOKAHEAD: usize = 100;

/// Sentence terminators recognised as break points (terminator + space).
const SENTENCE_ENDS: [&str; 4] = [". ", "? ", "! ", "。 "];

/// Size parameters for the splitter, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkParams {
    /// Target window size.
    pub chunk_size: usize,
    /// Bytes repeated at the start of the next window.
    pub overlap: usize,
    /// Hard ceiling for any emitted chunk.
    pub max_chunk: usize,
}

impl Default for ChunkParams {
    fn default() -> Self {
        Self {
            chunk_size: 600,
            overlap: 75,
            max_chunk: 800,
        }
    }
}

impl ChunkParams {
    fn ceiling(&self) -> usize {
        self.max_chunk.max(self.chunk_size)
    }
}

/// Compute the raw (untrimmed) windows the size-based splitter cuts.
///
/// Windows are ordered, each starts strictly after the previous one and no
/// later than the previous end, the first starts at 0 and the last ends at
/// `text.len()`. Whitespace-only text yields no windows.
pub fn split_spans(text: &str, params: &ChunkParams) -> Vec<Range<usize>> {
    let len = text.len();
    if text.trim().is_empty() {
        return Vec::new();
    }
    if len <= params.chunk_size {
        return vec![0..len];
    }

    let mut spans = Vec::new();
    let mut start = 0;
    // End of the previous window; every new window must reach past it.
    let mut prev_end = 0;
    while start < len {
        let mut end = snap_to_char_boundary(text, start + params.chunk_size.max(1));
        if end <= prev_end {
            end = next_char_boundary(text, prev_end);
        }
        if end < len {
            end = find_safe_break(text, start, prev_end, end, params);
            end = extend_past_formula(text, start, end, params.ceiling());
        }
        spans.push(start..end);
        if end >= len {
            break;
        }
        prev_end = end;

        let mut next_start = snap_to_char_boundary(text, end.saturating_sub(params.overlap));
        if next_start <= start {
            next_start = end;
        }
        start = next_start;
    }
    spans
}

/// Split a text blob into trimmed, non-empty pieces.
///
/// Text no longer than `chunk_size` comes back as a single piece.
pub fn split_by_size<'a>(text: &'a str, params: &ChunkParams) -> Vec<&'a str> {
    split_spans(text, params)
        .into_iter()
        .map(|span| text[span].trim())
        .filter(|piece| !piece.is_empty())
        .collect()
}

/// Pick the break for a window starting at `start` with tentative cut `end`.
/// Only breaks after `floor` (the previous window's end) are accepted.
fn find_safe_break(
    text: &str,
    start: usize,
    floor: usize,
    end: usize,
    params: &ChunkParams,
) -> usize {
    let search_from = snap_to_char_boundary(text, floor.max(end.saturating_sub(LOOKBACK)));
    let limit = (start + params.ceiling()).min(text.len());
    let search_to = snap_to_char_boundary(text, (end + LOOKAHEAD).min(limit)).max(end);
    let segment = &text[search_from..search_to];

    if let Some(pos) = segment.rfind("\n\n") {
        return search_from + pos + 2;
    }
    if let Some(pos) = segment.rfind('\n') {
        return veto_structured_line(text, start, floor, search_from + pos + 1);
    }
    let sentence_end = SENTENCE_ENDS
        .iter()
        .filter_map(|sep| segment.rfind(sep).map(|pos| pos + sep.len()))
        .max();
    if let Some(pos) = sentence_end {
        return search_from + pos;
    }
    if let Some(pos) = segment.rfind(' ') {
        return search_from + pos + 1;
    }
    end
}

/// `brk` sits right after a newline. If the line that newline terminates is
/// a `- ` list item or a `|` table row, cut before that line instead, as
/// long as the cut stays after `floor`.
///
/// Only this single line is inspected; a table whose rows do not start with
/// `|` is not detected.
fn veto_structured_line(text: &str, start: usize, floor: usize, brk: usize) -> usize {
    let line_end = brk - 1;
    let line_start = text[start..line_end]
        .rfind('\n')
        .map(|pos| start + pos + 1)
        .unwrap_or(start);
    if line_start > start.max(floor) && is_structured_line(&text[line_start..line_end]) {
        line_start
    } else {
        brk
    }
}

fn is_structured_line(line: &str) -> bool {
    let line = line.trim_start();
    line.starts_with("- ") || line.starts_with('|')
}

/// If `text[start..end]` leaves a math span open, move `end` past its closer
/// when the resulting chunk is at most `max_chunk` bytes. Otherwise the cut
/// stands.
fn extend_past_formula(text: &str, start: usize, end: usize, max_chunk: usize) -> usize {
    let chunk = &text[start..end];
    let rest = &text[end..];
    let fits = |close_end: usize| close_end - start <= max_chunk;

    if chunk.matches("$$").count() % 2 == 1 {
        if let Some(pos) = rest.find("$$") {
            if fits(end + pos + 2) {
                return end + pos + 2;
            }
        }
    }

    for (open, close) in [(r"\(", r"\)"), (r"\[", r"\]")] {
        let unclosed = match (chunk.rfind(open), chunk.rfind(close)) {
            (Some(o), Some(c)) => o > c,
            (Some(_), None) => true,
            _ => false,
        };
        if unclosed {
            if let Some(pos) = rest.find(close) {
                if fits(end + pos + close.len()) {
                    return end + pos + close.len();
                }
            }
        }
    }

    if inline_dollars(chunk).count() % 2 == 1 {
        if let Some(pos) = inline_dollars(rest).next() {
            if fits(end + pos + 1) {
                return end + pos + 1;
            }
        }
    }

    end
}

/// Positions of single `$` delimiters, skipping `$$` pairs and `\$`.
fn inline_dollars(s: &str) -> impl Iterator<Item = usize> + '_ {
    let bytes = s.as_bytes();
    let mut i = 0;
    std::iter::from_fn(move || {
        while i < bytes.len() {
            let pos = i;
            if bytes[pos] != b'$' {
                i += 1;
                continue;
            }
            if bytes.get(pos + 1) == Some(&b'$') {
                i += 2;
                continue;
            }
            i += 1;
            if pos > 0 && bytes[pos - 1] == b'\\' {
                continue;
            }
            return Some(pos);
        }
        None
    })
}

/// One piece of document text attributed to a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece<'a> {
    pub section_title: &'a str,
    /// Index into the section list, `None` for untitled text.
    pub section_index: Option<usize>,
    pub content: &'a str,
}

/// Split cleaned text into section-attributed pieces, in document order.
///
/// Without sections the whole text goes through [`split_by_size`]. With
/// sections, text before the first heading is split the same way under an
/// empty title, then each section's own content is emitted whole if it fits
/// in `max_chunk` and size-split otherwise. Splits never cross a heading.
pub fn split_document<'a>(
    text: &'a str,
    sections: &'a [Section],
    params: &ChunkParams,
) -> Vec<Piece<'a>> {
    let untitled = |content: &'a str| Piece {
        section_title: "",
        section_index: None,
        content,
    };

    let Some(first) = sections.first() else {
        return split_by_size(text, params).into_iter().map(untitled).collect();
    };

    let preamble = &text[..first.start_offset.min(text.len())];
    let mut pieces: Vec<Piece> = split_by_size(preamble, params)
        .into_iter()
        .map(untitled)
        .collect();

    for (index, section) in sections.iter().enumerate() {
        let from = section.start_offset.min(text.len());
        let to = section.content_end_offset.clamp(from, text.len());
        let body = text[from..to].trim();
        if body.is_empty() {
            continue;
        }
        if body.len() <= params.ceiling() {
            pieces.push(Piece {
                section_title: &section.title,
                section_index: Some(index),
                content: body,
            });
        } else {
            pieces.extend(split_by_size(body, params).into_iter().map(|content| Piece {
                section_title: &section.title,
                section_index: Some(index),
                content,
            }));
        }
    }
    pieces
}

/// Slice one parsed document into numbered chunks carrying its metadata.
///
/// `chunk_index` runs `0..n` across the whole document and every chunk's
/// `total_chunks` is `n`. Empty documents produce no chunks.
pub fn slice_document(
    doc: &ParsedDocument,
    entry: &DocumentEntry,
    params: &ChunkParams,
) -> Vec<Chunk> {
    let mut chunks: Vec<Chunk> = split_document(&doc.text, &doc.sections, params)
        .into_iter()
        .enumerate()
        .map(|(chunk_index, piece)| Chunk {
            content: piece.content.to_string(),
            source_file: entry.file_name.clone(),
            doc_id: entry.doc_id.clone(),
            doc_type: entry.doc_type,
            section_title: piece.section_title.to_string(),
            chunk_index,
            total_chunks: 0,
            content_type: entry.doc_type,
            title: entry.title.clone(),
            section_index: piece.section_index,
        })
        .collect();

    let total = chunks.len();
    for chunk in &mut chunks {
        chunk.total_chunks = total;
    }
    chunks
}

/// Snap a byte index back to the nearest valid UTF-8 char boundary.
fn snap_to_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Byte index of the char boundary following `index`.
fn next_char_boundary(s: &str, index: usize) -> usize {
    s[index..]
        .char_indices()
        .nth(1)
        .map(|(i, _)| index + i)
        .unwrap_or(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocType;
    use proptest::prelude::*;
    use std::path::PathBuf;

    fn entry(doc_id: &str) -> DocumentEntry {
        DocumentEntry {
            file_path: PathBuf::from(format!("/corpus/{}.md", doc_id)),
            file_name: format!("{}.md", doc_id),
            content_hash: "0".repeat(32),
            doc_id: doc_id.to_string(),
            doc_type: DocType::Lecture,
            sequence_index: 1,
            title: Some("Signals".to_string()),
            description: None,
            related_ids: vec![],
        }
    }

    fn slice(raw: &str, params: &ChunkParams) -> Vec<Chunk> {
        slice_document(&ParsedDocument::from_raw(raw), &entry("lec01"), params)
    }

    fn rebuild(text: &str, spans: &[Range<usize>]) -> String {
        let mut out = String::new();
        let mut covered = 0;
        for span in spans {
            assert!(span.start <= covered, "gap before {:?}", span);
            out.push_str(&text[covered.max(span.start)..span.end]);
            covered = span.end;
        }
        out
    }

    #[test]
    fn test_two_short_sections() {
        let chunks = slice(
            "## A\n\nShort body.\n\n## B\n\nAnother short body.",
            &ChunkParams::default(),
        );
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].section_title, "A");
        assert_eq!(chunks[0].content, "## A\n\nShort body.");
        assert_eq!(chunks[1].section_title, "B");
        assert_eq!(chunks[1].content, "## B\n\nAnother short body.");
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i);
            assert_eq!(c.total_chunks, 2);
            assert_eq!(c.doc_id, "lec01");
            assert_eq!(c.content_type, DocType::Lecture);
            assert_eq!(c.title.as_deref(), Some("Signals"));
        }
    }

    #[test]
    fn test_long_unbroken_section() {
        let params = ChunkParams {
            chunk_size: 600,
            overlap: 75,
            max_chunk: 800,
        };
        let raw = format!("## A\n\n{}", "x".repeat(1000));
        let doc = ParsedDocument::from_raw(&raw);
        let spans = split_spans(&doc.text, &params);
        let chunks = slice_document(&doc, &entry("lec01"), &params);

        assert_eq!(chunks.len(), 2);
        assert!((600..=700).contains(&chunks[0].content.len()));
        assert_eq!(spans.len(), 2);
        assert!(spans[1].start <= spans[0].end - 75);
        assert!(chunks.iter().all(|c| c.section_title == "A"));
        assert_eq!(rebuild(&doc.text, &spans), doc.text);
    }

    #[test]
    fn test_display_formula_not_split() {
        let text = format!("{}$$ a = b $${}", "word ".repeat(118), "y".repeat(300));
        let open = text.find("$$").unwrap();
        let close = text.rfind("$$").unwrap() + 2;
        // A plain cut at chunk_size would land inside the formula.
        assert!(open < 600 && 600 < close);

        let chunks = split_by_size(&text, &ChunkParams::default());
        assert!(chunks[0].ends_with("$$ a = b $$"), "got {:?}", &chunks[0][580..]);
    }

    #[test]
    fn test_inline_formula_not_split() {
        let text = format!("{}$a + b + c + d + e + f${}", "word ".repeat(115), "z".repeat(300));
        let chunks = split_by_size(&text, &ChunkParams::default());
        assert!(chunks[0].ends_with("+ f$"), "got {:?}", &chunks[0][560..]);
    }

    #[test]
    fn test_paren_formula_not_split() {
        let text = format!("{}\\(a + b\\){}", "word ".repeat(118), "q".repeat(300));
        let chunks = split_by_size(&text, &ChunkParams::default());
        assert!(chunks[0].ends_with("\\(a + b\\)"), "got {:?}", &chunks[0][580..]);
    }

    #[test]
    fn test_unterminated_formula_stays_bounded() {
        let params = ChunkParams {
            chunk_size: 600,
            overlap: 75,
            max_chunk: 650,
        };
        let text = format!("$$ {}", "term ".repeat(400));
        let chunks = split_by_size(&text, &params);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.len() <= 650));
    }

    #[test]
    fn test_formula_extension_respects_ceiling() {
        let params = ChunkParams {
            chunk_size: 600,
            overlap: 75,
            max_chunk: 610,
        };
        // The closer is 200 bytes past the cut: extending would exceed 610.
        let text = format!("{}$$ {} $$", "word ".repeat(118), "k".repeat(200));
        let chunks = split_by_size(&text, &params);
        assert!(chunks[0].len() <= 610);
        assert!(chunks[0].ends_with("word $$"));
        assert!(!chunks[0].contains('k'));
    }

    #[test]
    fn test_prefers_paragraph_break() {
        let text = format!(
            "{}\n\n{}. More words follow here. {}",
            "a".repeat(500),
            "b".repeat(40),
            "c ".repeat(200)
        );
        let chunks = split_by_size(&text, &ChunkParams::default());
        assert_eq!(chunks[0], "a".repeat(500));
    }

    #[test]
    fn test_sentence_break_before_space() {
        let text = format!("{}. Then {}", "w".repeat(560), "v ".repeat(200));
        let chunks = split_by_size(&text, &ChunkParams::default());
        // Last sentence end in the window wins over later spaces.
        assert_eq!(chunks[0], format!("{}.", "w".repeat(560)));
    }

    #[test]
    fn test_list_item_moves_to_next_chunk() {
        let text = format!("{}\n- item one\n{}", "p".repeat(560), "q".repeat(400));
        let chunks = split_by_size(&text, &ChunkParams::default());
        assert_eq!(chunks[0], "p".repeat(560));
        assert!(chunks[1].contains("- item one"));
    }

    #[test]
    fn test_table_row_moves_to_next_chunk() {
        let text = format!("{}\n| a | b |\n{}", "p".repeat(560), "q".repeat(400));
        let chunks = split_by_size(&text, &ChunkParams::default());
        assert_eq!(chunks[0], "p".repeat(560));
        assert!(chunks[1].contains("| a | b |"));
    }

    #[test]
    fn test_plain_line_break_kept() {
        let text = format!("{}\nplain line\n{}", "p".repeat(560), "q".repeat(400));
        let chunks = split_by_size(&text, &ChunkParams::default());
        assert_eq!(chunks[0], format!("{}\nplain line", "p".repeat(560)));
    }

    #[test]
    fn test_structured_line_detection() {
        assert!(is_structured_line("- item"));
        assert!(is_structured_line("  - nested"));
        assert!(is_structured_line("| x |"));
        assert!(!is_structured_line("* item"));
        assert!(!is_structured_line("+ item"));
        assert!(!is_structured_line("12. step"));
        assert!(!is_structured_line("-5 degrees"));
        assert!(!is_structured_line("text"));
    }

    #[test]
    fn test_only_dash_and_pipe_lines_are_vetoed() {
        for marker in ["1. numbered step", "* starred", "+ plus"] {
            let text = format!("{}\n{}\n{}", "p".repeat(560), marker, "q".repeat(400));
            let chunks = split_by_size(&text, &ChunkParams::default());
            assert_eq!(chunks[0], format!("{}\n{}", "p".repeat(560), marker));
        }
    }

    #[test]
    fn test_small_windows_always_advance() {
        let params = ChunkParams {
            chunk_size: 100,
            overlap: 10,
            max_chunk: 130,
        };
        let text = format!("{}$x$ {}\n\n{}", "a".repeat(80), "b".repeat(30), "c ".repeat(200));
        let spans = split_spans(&text, &params);
        assert_eq!(spans[0], 0..116);
        assert_eq!(spans[1].start, 106);
        for pair in spans.windows(2) {
            assert!(pair[1].end > pair[0].end, "{:?} adds nothing", pair[1]);
        }
        assert_eq!(rebuild(&text, &spans), text);
    }

    #[test]
    fn test_inline_dollars_skip_display_and_escaped() {
        let found: Vec<usize> = inline_dollars("a $x$ $$y$$ \\$ $").collect();
        assert_eq!(found, vec![2, 4, 15]);
    }

    #[test]
    fn test_no_headings_fallback() {
        let raw = "Sentence here. ".repeat(100);
        let chunks = slice(&raw, &ChunkParams::default());
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.section_title.is_empty()));
    }

    #[test]
    fn test_preamble_before_first_heading() {
        let chunks = slice("Course intro.\n\n## Part 1\n\nBody.", &ChunkParams::default());
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].section_title, "");
        assert_eq!(chunks[0].content, "Course intro.");
        assert_eq!(chunks[1].section_title, "Part 1");
    }

    #[test]
    fn test_nested_headings_not_duplicated() {
        let chunks = slice("# Title\n\n## Sec\n\nBody\n\n### Sub\n\nMore", &ChunkParams::default());
        let titles: Vec<&str> = chunks.iter().map(|c| c.section_title.as_str()).collect();
        assert_eq!(titles, vec!["Title", "Sec", "Sub"]);
        assert_eq!(chunks[0].content, "# Title");
        assert_eq!(chunks.iter().filter(|c| c.content.contains("More")).count(), 1);
    }

    #[test]
    fn test_long_section_splits_stay_inside_section() {
        let body = "Lorem ipsum dolor sit amet. ".repeat(60);
        let raw = format!("## First\n\n{}\n\n## Second\n\nTail.", body);
        let chunks = slice(&raw, &ChunkParams::default());
        let first: Vec<&Chunk> = chunks.iter().filter(|c| c.section_title == "First").collect();
        assert!(first.len() > 1);
        assert!(first.iter().all(|c| !c.content.contains("Second")));
        assert_eq!(chunks.last().unwrap().content, "## Second\n\nTail.");
    }

    #[test]
    fn test_empty_document() {
        assert!(slice("", &ChunkParams::default()).is_empty());
        assert!(slice("   \n\n\t ", &ChunkParams::default()).is_empty());
        assert!(split_spans("", &ChunkParams::default()).is_empty());
    }

    #[test]
    fn test_multibyte_utf8_chars() {
        let params = ChunkParams {
            chunk_size: 7,
            overlap: 2,
            max_chunk: 9,
        };
        let text = "┌──────────────────┐\n│ Hello world      │\n└──────────────────┘";
        let spans = split_spans(text, &params);
        assert_eq!(rebuild(text, &spans), text);
        assert!(!split_by_size(text, &params).is_empty());
    }

    #[test]
    fn test_deterministic() {
        let raw = format!("# T\n\n{}\n\n## S\n\n{}", "alpha beta. ".repeat(90), "$x$ y ".repeat(150));
        let c1 = slice(&raw, &ChunkParams::default());
        let c2 = slice(&raw, &ChunkParams::default());
        assert_eq!(c1, c2);
    }

    fn params_strategy() -> impl Strategy<Value = ChunkParams> {
        (20usize..300).prop_flat_map(|chunk_size| {
            (0..chunk_size / 2, chunk_size..chunk_size * 2).prop_map(move |(overlap, max_chunk)| {
                ChunkParams {
                    chunk_size,
                    overlap,
                    max_chunk,
                }
            })
        })
    }

    proptest! {
        #[test]
        fn prop_spans_cover_text(text in "[a-zé $.|\n-]{0,2000}", params in params_strategy()) {
            let spans = split_spans(&text, &params);
            if text.trim().is_empty() {
                prop_assert!(spans.is_empty());
            } else {
                prop_assert_eq!(spans[0].start, 0);
                prop_assert_eq!(spans.last().unwrap().end, text.len());
                for pair in spans.windows(2) {
                    prop_assert!(pair[1].start > pair[0].start);
                    prop_assert!(pair[1].start <= pair[0].end);
                    prop_assert!(pair[1].end > pair[0].end);
                }
                prop_assert_eq!(rebuild(&text, &spans), text);
            }
        }

        #[test]
        fn prop_chunks_bounded(text in "[a-z $\\\\()\\[\\]\n|-]{0,2000}", params in params_strategy()) {
            for piece in split_by_size(&text, &params) {
                prop_assert!(piece.len() <= params.max_chunk, "len {} > {}", piece.len(), params.max_chunk);
            }
        }

        #[test]
        fn prop_numbering_contiguous(body in "[a-z #.\n]{0,3000}", params in params_strategy()) {
            let chunks = slice(&body, &params);
            let n = chunks.len();
            for (i, c) in chunks.iter().enumerate() {
                prop_assert_eq!(c.chunk_index, i);
                prop_assert_eq!(c.total_chunks, n);
                prop_assert!(!c.content.trim().is_empty());
                prop_assert!(c.content.len() <= params.max_chunk);
            }
        }

        #[test]
        fn prop_rerun_identical(body in "[a-z #$.\n]{0,2000}") {
            let params = ChunkParams::default();
            prop_assert_eq!(slice(&body, &params), slice(&body, &params));
        }
    }
}
