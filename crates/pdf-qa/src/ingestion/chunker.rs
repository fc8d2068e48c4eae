//! Sentence- and paragraph-aware text chunking with overlap

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

use crate::config::ChunkingConfig;
use crate::types::Chunk;

static PARAGRAPH_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n").expect("Invalid paragraph regex"));
static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

/// Separator placed between paragraphs in normalized text
const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// A sentence (or a piece of an oversized sentence) in normalized text
#[derive(Debug, Clone, Copy)]
struct Unit {
    start: usize,
    end: usize,
    paragraph_start: bool,
}

/// Text chunker with configurable size, overlap and minimum size
///
/// Sizes are measured in bytes of normalized text. Chunks never exceed
/// `chunk_size`, except that a trailing fragment shorter than `min_size`
/// is folded into the previous chunk.
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Maximum chunk size
    chunk_size: usize,
    /// Maximum overlap between consecutive chunks
    overlap: usize,
    /// Minimum chunk size
    min_size: usize,
}

impl TextChunker {
    /// Create a new chunker
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
            min_size: 50.min(chunk_size),
        }
    }

    /// Set the minimum chunk size
    pub fn with_min_size(mut self, min_size: usize) -> Self {
        self.min_size = min_size.min(self.chunk_size);
        self
    }

    /// Create from configuration
    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap).with_min_size(config.min_chunk_size)
    }

    /// Collapse the whitespace layout left by PDF extraction
    ///
    /// Paragraphs (separated by blank lines) are kept apart by `"\n\n"`;
    /// every other whitespace run becomes a single space.
    pub fn normalize(text: &str) -> String {
        let text = text.replace('\0', "").replace("\r\n", "\n").replace('\r', "\n");

        PARAGRAPH_BREAK
            .split(&text)
            .map(|para| WHITESPACE_RUN.replace_all(para.trim(), " ").into_owned())
            .filter(|para| !para.is_empty())
            .collect::<Vec<_>>()
            .join(PARAGRAPH_SEPARATOR)
    }

    /// Split text into chunks
    ///
    /// Returns an empty vector for empty, whitespace-only or content-free input.
    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        let normalized = Self::normalize(text);
        if !normalized.chars().any(char::is_alphanumeric) {
            return Vec::new();
        }

        let units = self.split_into_units(&normalized);
        let spans = self.assemble(&normalized, &units);

        spans
            .into_iter()
            .filter_map(|(start, end)| trimmed_span(&normalized, start, end))
            .enumerate()
            .map(|(ordinal, (start, end))| {
                Chunk::new(ordinal as u32, normalized[start..end].to_string(), start, end)
            })
            .collect()
    }

    /// Sentence units for every paragraph, oversized sentences split further
    fn split_into_units(&self, text: &str) -> Vec<Unit> {
        let mut units = Vec::new();
        let mut para_start = 0usize;

        for para in text.split(PARAGRAPH_SEPARATOR) {
            let mut first = true;
            for (offset, sentence) in para.split_sentence_bound_indices() {
                let start = para_start + offset;
                let end = start + sentence.len();
                for (piece_start, piece_end) in self.split_long(text, start, end) {
                    units.push(Unit {
                        start: piece_start,
                        end: piece_end,
                        paragraph_start: first,
                    });
                    first = false;
                }
            }
            para_start += para.len() + PARAGRAPH_SEPARATOR.len();
        }

        units
    }

    /// Break a span longer than `chunk_size` at spaces (or char boundaries)
    fn split_long(&self, text: &str, start: usize, end: usize) -> Vec<(usize, usize)> {
        let mut pieces = Vec::new();
        let mut cursor = start;

        while end - cursor > self.chunk_size {
            let mut cut = cursor + self.chunk_size;
            while cut > cursor && !text.is_char_boundary(cut) {
                cut -= 1;
            }
            if cut == cursor {
                // A single char wider than chunk_size
                cut = cursor + text[cursor..].chars().next().map_or(1, char::len_utf8);
            }

            let split_at = match text[cursor..cut].rfind(' ') {
                Some(pos) if pos > 0 => cursor + pos + 1,
                _ => cut,
            };
            pieces.push((cursor, split_at));
            cursor = split_at;
        }

        if cursor < end {
            pieces.push((cursor, end));
        }
        pieces
    }

    /// Group units into chunk spans
    fn assemble(&self, text: &str, units: &[Unit]) -> Vec<(usize, usize)> {
        let mut spans: Vec<(usize, usize)> = Vec::new();
        let mut current: Option<(usize, usize)> = None;
        let mut unit_starts: Vec<usize> = Vec::new();

        for unit in units {
            let Some((start, end)) = current else {
                current = Some((unit.start, unit.end));
                unit_starts = vec![unit.start];
                continue;
            };

            let content = text[start..end].trim().len();
            let paragraph_done = unit.paragraph_start && content >= self.min_size;
            let would_overflow = unit.end - start > self.chunk_size;

            if would_overflow && content < self.min_size {
                // Too small to stand alone: top it up with the head of the unit
                if let Some(split) = self.fill_point(text, start, unit.start, unit.end) {
                    spans.push((start, split));
                    current = Some((split, unit.end));
                    unit_starts = vec![split];
                    continue;
                }
            }

            if paragraph_done || would_overflow {
                spans.push((start, end));

                let mut next_start = self.overlap_start(text, start, end, &unit_starts, unit.start);
                if unit.end - next_start > self.chunk_size {
                    next_start = unit.start;
                }

                unit_starts.retain(|&s| s >= next_start);
                unit_starts.push(unit.start);
                current = Some((next_start, unit.end));
            } else {
                unit_starts.push(unit.start);
                current = Some((start, unit.end));
            }
        }

        if let Some((start, end)) = current {
            match spans.last_mut() {
                Some(last) if text[start..end].trim().len() < self.min_size => last.1 = end,
                _ => spans.push((start, end)),
            }
        }

        spans
    }

    /// Where to cut `unit_start..unit_end` so that `start..cut` fills a chunk
    ///
    /// Prefers the last space that still leaves `min_size` bytes of content,
    /// then a hard cut at `chunk_size`. `None` if neither works.
    fn fill_point(
        &self,
        text: &str,
        start: usize,
        unit_start: usize,
        unit_end: usize,
    ) -> Option<usize> {
        let mut target = (start + self.chunk_size).min(unit_end);
        while target > unit_start && !text.is_char_boundary(target) {
            target -= 1;
        }
        if target <= unit_start {
            return None;
        }

        let big_enough = |cut: usize| text[start..cut].trim().len() >= self.min_size;

        let at_space = text[unit_start..target]
            .rfind(' ')
            .filter(|&pos| pos > 0)
            .map(|pos| unit_start + pos + 1)
            .filter(|&cut| big_enough(cut));

        at_space.or_else(|| Some(target).filter(|&cut| big_enough(cut)))
    }

    /// Where the next chunk starts so it repeats the tail of `start..end`
    ///
    /// Prefers the earliest sentence start inside the overlap window, then
    /// the earliest word start. Falls back to `next_unit` (no overlap).
    fn overlap_start(
        &self,
        text: &str,
        start: usize,
        end: usize,
        unit_starts: &[usize],
        next_unit: usize,
    ) -> usize {
        if self.overlap == 0 {
            return next_unit;
        }

        let mut window = end.saturating_sub(self.overlap).max(start);
        while window < end && !text.is_char_boundary(window) {
            window += 1;
        }

        if let Some(&sentence) = unit_starts
            .iter()
            .find(|&&s| s >= window && s > start && s < end)
        {
            return sentence;
        }

        let tail = &text[window..end];
        if let Some(ws) = tail.find(char::is_whitespace) {
            let after_ws = tail[ws..]
                .find(|c: char| !c.is_whitespace())
                .map(|pos| window + ws + pos);
            if let Some(word) = after_ws {
                if word > start && word < end {
                    return word;
                }
            }
        }

        next_unit
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::from_config(&ChunkingConfig::default())
    }
}

/// Shrink `start..end` to exclude surrounding whitespace; `None` if nothing is left
fn trimmed_span(text: &str, start: usize, end: usize) -> Option<(usize, usize)> {
    let slice = &text[start..end];
    let trimmed = slice.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lead = slice.len() - slice.trim_start().len();
    Some((start + lead, start + lead + trimmed.len()))
}
