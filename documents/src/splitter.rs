//! Two-stage text splitting.
//!
//! Markdown is first cut at `#`, `##` and `###` headers; each section is
//! then cut into windows of at most `chunk_size` characters, preferring
//! paragraph breaks over line breaks over sentence punctuation over
//! spaces. Consecutive windows share up to `chunk_overlap` characters.

use std::cmp::Reverse;
use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::chunk::{DocumentChunk, HeaderMap};
use crate::error::{DocumentError, Result};
use crate::loader::SourceDocument;

/// Markdown headers that start a new section, with their metadata keys.
pub const HEADERS_TO_SPLIT_ON: [(&str, &str); 3] =
    [("#", "Header 1"), ("##", "Header 2"), ("###", "Header 3")];

/// Split points, most preferred first. The empty separator splits between
/// characters.
pub const SEPARATORS: [&str; 8] = ["\n\n", "\n", ".", "!", "?", ",", " ", ""];

pub const DEFAULT_CHUNK_SIZE: usize = 2000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 400;

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// A run of markdown under one header hierarchy, header lines removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub content: String,
    pub headers: HeaderMap,
}

/// Splits markdown at header lines outside fenced code blocks.
#[derive(Debug, Clone)]
pub struct MarkdownHeaderSplitter {
    /// `(marker, key)` pairs, longest marker first.
    headers: Vec<(String, String)>,
}

impl Default for MarkdownHeaderSplitter {
    fn default() -> Self {
        Self::new(&HEADERS_TO_SPLIT_ON)
    }
}

impl MarkdownHeaderSplitter {
    pub fn new(headers: &[(&str, &str)]) -> Self {
        let mut headers: Vec<(String, String)> = headers
            .iter()
            .map(|(marker, key)| ((*marker).to_string(), (*key).to_string()))
            .collect();
        headers.sort_by_key(|(marker, _)| Reverse(marker.len()));
        Self { headers }
    }

    fn header_for<'a>(&'a self, line: &str) -> Option<(&'a str, &'a str)> {
        self.headers.iter().find_map(|(marker, key)| {
            let rest = line.strip_prefix(marker.as_str())?;
            (rest.is_empty() || rest.starts_with(' ')).then_some((marker.as_str(), key.as_str()))
        })
    }

    pub fn split(&self, text: &str) -> Vec<Section> {
        let mut sections: Vec<Section> = Vec::new();
        let mut content: Vec<&str> = Vec::new();
        let mut content_headers = HeaderMap::new();
        let mut active = HeaderMap::new();
        let mut stack: Vec<(usize, &str)> = Vec::new();
        let mut fence: Option<&str> = None;

        for raw in text.split('\n') {
            let line = raw.trim();

            match fence {
                None if line.starts_with("```") && line.matches("```").count() == 1 => {
                    fence = Some("```");
                }
                None if line.starts_with("~~~") => fence = Some("~~~"),
                Some(marker) if line.starts_with(marker) => fence = None,
                _ => {}
            }
            if fence.is_some() {
                content.push(line);
                continue;
            }

            if let Some((marker, key)) = self.header_for(line) {
                let level = marker.len();
                while let Some(&(top, name)) = stack.last() {
                    if top < level {
                        break;
                    }
                    stack.pop();
                    active.remove(name);
                }
                stack.push((level, key));
                active.insert(key.to_string(), line[marker.len()..].trim().to_string());
                flush_section(&mut content, &content_headers, &mut sections);
            } else if !line.is_empty() {
                content.push(line);
            } else {
                flush_section(&mut content, &content_headers, &mut sections);
            }

            content_headers = active.clone();
        }
        flush_section(&mut content, &content_headers, &mut sections);

        // Paragraphs under the same headers belong to one section.
        let mut merged: Vec<Section> = Vec::with_capacity(sections.len());
        for section in sections {
            match merged.last_mut() {
                Some(last) if last.headers == section.headers => {
                    last.content.push_str("  \n");
                    last.content.push_str(&section.content);
                }
                _ => merged.push(section),
            }
        }
        merged
    }
}

fn flush_section(content: &mut Vec<&str>, headers: &HeaderMap, sections: &mut Vec<Section>) {
    if !content.is_empty() {
        sections.push(Section {
            content: content.join("\n"),
            headers: headers.clone(),
        });
        content.clear();
    }
}

/// Splits text into overlapping windows along the preferred separators.
#[derive(Debug, Clone)]
pub struct RecursiveCharacterSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl Default for RecursiveCharacterSplitter {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            separators: SEPARATORS.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

impl RecursiveCharacterSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(DocumentError::InvalidSplitter(
                "chunk size must be positive".to_string(),
            ));
        }
        if chunk_overlap > chunk_size {
            return Err(DocumentError::InvalidSplitter(format!(
                "overlap {chunk_overlap} is larger than chunk size {chunk_size}"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            ..Self::default()
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn separators(&self) -> &[String] {
        &self.separators
    }

    /// Split `text` into trimmed, non-empty chunks.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let separators: Vec<&str> = self.separators.iter().map(String::as_str).collect();
        self.split_with(text, &separators)
    }

    fn split_with(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let mut separator = separators.last().copied().unwrap_or_default();
        let mut finer: &[&str] = &[];
        for (i, &candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = candidate;
                break;
            }
            if text.contains(candidate) {
                separator = candidate;
                finer = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut fitting: Vec<&str> = Vec::new();
        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                fitting.push(piece);
                continue;
            }

            if !fitting.is_empty() {
                chunks.extend(self.merge(&fitting));
                fitting.clear();
            }
            if finer.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    chunks.push(trimmed.to_string());
                }
            } else {
                chunks.extend(self.split_with(piece, finer));
            }
        }
        if !fitting.is_empty() {
            chunks.extend(self.merge(&fitting));
        }
        chunks
    }

    /// Greedily pack pieces into windows, carrying the tail of each window
    /// into the next as overlap.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0;

        for &piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !window.is_empty() {
                if total > self.chunk_size {
                    warn!(
                        "Created a chunk of {total} characters, longer than the limit of {}",
                        self.chunk_size
                    );
                }
                chunks.extend(join_window(&window));

                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    let Some(first) = window.pop_front() else {
                        break;
                    };
                    total -= char_len(first);
                }
            }
            window.push_back(piece);
            total += len;
        }
        chunks.extend(join_window(&window));
        chunks
    }
}

fn join_window(window: &VecDeque<&str>) -> Option<String> {
    let joined: String = window.iter().copied().collect();
    let trimmed = joined.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Split `text` at every occurrence of `separator`, keeping the separator
/// at the start of the following piece. Empty pieces are dropped.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(&text[start..idx]);
        }
        start = idx;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

/// Header splitting followed by window splitting, producing stored chunks.
#[derive(Debug, Clone, Default)]
pub struct DocumentSplitter {
    headers: MarkdownHeaderSplitter,
    text: RecursiveCharacterSplitter,
}

impl DocumentSplitter {
    pub fn new(text: RecursiveCharacterSplitter) -> Self {
        Self {
            headers: MarkdownHeaderSplitter::default(),
            text,
        }
    }

    pub fn text_splitter(&self) -> &RecursiveCharacterSplitter {
        &self.text
    }

    pub fn split(&self, document: &SourceDocument) -> Vec<DocumentChunk> {
        let mut chunks = Vec::new();
        for section in self.headers.split(&document.content) {
            for content in self.text.split_text(&section.content) {
                let ordinal = chunks.len();
                chunks.push(DocumentChunk::new(
                    document.source.as_str(),
                    ordinal,
                    content,
                    section.headers.clone(),
                ));
            }
        }
        debug!("Split {} into {} chunks", document.source, chunks.len());
        chunks
    }
}
