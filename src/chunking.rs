use anyhow::Result;
use log::warn;
use std::collections::VecDeque;

/// Maximum number of characters per chunk
pub const DEFAULT_CHUNK_SIZE: usize = 500;
/// Characters shared between consecutive chunks
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Separators tried in order, from paragraph breaks down to single characters
const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Represents a text chunk with metadata
#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    /// The actual text content of this chunk
    pub text: String,
    /// Zero-based index of the page this chunk was taken from
    pub page: usize,
    /// Byte offset of this chunk in its page text
    pub start_position: usize,
    /// Position of this chunk in the document
    pub chunk_index: usize,
}

/// Chunk window settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        ChunkingConfig {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkingConfig {
    /// Check that the window settings can make progress
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(anyhow::anyhow!("Chunk size must be greater than zero"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(anyhow::anyhow!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                self.chunk_overlap,
                self.chunk_size
            ));
        }
        Ok(())
    }
}

/// Split every page into chunks, numbering them across the whole document
pub fn split_pages(pages: &[String], config: &ChunkingConfig) -> Vec<TextChunk> {
    let mut chunks = Vec::new();

    for (page, text) in pages.iter().enumerate() {
        for (start_position, piece) in split_recursive(text, 0, &SEPARATORS, config) {
            chunks.push(TextChunk {
                text: piece,
                page,
                start_position,
                chunk_index: chunks.len(),
            });
        }
    }

    chunks
}

/// Split text into overlapping windows of at most `chunk_size` characters
pub fn split_text(text: &str, config: &ChunkingConfig) -> Vec<String> {
    split_recursive(text, 0, &SEPARATORS, config)
        .into_iter()
        .map(|(_, piece)| piece)
        .collect()
}

/// Every returned window carries the byte offset of its first character,
/// `offset` being the position of `text` in the page
fn split_recursive(
    text: &str,
    offset: usize,
    separators: &[&str],
    config: &ChunkingConfig,
) -> Vec<(usize, String)> {
    let mut final_chunks = Vec::new();

    // The first separator present in the text wins; "" always matches
    let position = separators
        .iter()
        .position(|sep| sep.is_empty() || text.contains(sep))
        .unwrap_or(separators.len().saturating_sub(1));
    let separator = separators.get(position).copied().unwrap_or("");
    let remaining = separators.get(position + 1..).unwrap_or(&[]);

    let mut good_splits = Vec::new();
    for (start, piece) in split_with_offsets(text, offset, separator) {
        if char_len(piece) < config.chunk_size {
            good_splits.push((start, piece));
            continue;
        }

        if !good_splits.is_empty() {
            final_chunks.extend(merge_splits(&good_splits, separator, config));
            good_splits.clear();
        }

        if remaining.is_empty() {
            final_chunks.push((start, piece.to_string()));
        } else {
            final_chunks.extend(split_recursive(piece, start, remaining, config));
        }
    }

    if !good_splits.is_empty() {
        final_chunks.extend(merge_splits(&good_splits, separator, config));
    }

    final_chunks
}

/// Non-empty pieces of `text` between separators, with their page offsets
fn split_with_offsets<'a>(text: &'a str, offset: usize, separator: &str) -> Vec<(usize, &'a str)> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| (offset + i, &text[i..i + c.len_utf8()]))
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (i, _) in text.match_indices(separator) {
        pieces.push((offset + start, &text[start..i]));
        start = i + separator.len();
    }
    pieces.push((offset + start, &text[start..]));

    pieces.retain(|(_, piece)| !piece.is_empty());
    pieces
}

/// Greedily join small pieces into windows, carrying a tail of the previous
/// window forward as overlap
fn merge_splits(
    splits: &[(usize, &str)],
    separator: &str,
    config: &ChunkingConfig,
) -> Vec<(usize, String)> {
    let separator_len = char_len(separator);
    let mut docs = Vec::new();
    let mut current: VecDeque<(usize, &str)> = VecDeque::new();
    let mut total = 0;

    for &(start, piece) in splits {
        let len = char_len(piece);
        let joiner = if current.is_empty() { 0 } else { separator_len };

        if total + len + joiner > config.chunk_size {
            if total > config.chunk_size {
                warn!(
                    "Created a chunk of size {}, which is longer than the specified {}",
                    total, config.chunk_size
                );
            }

            if !current.is_empty() {
                if let Some(doc) = join_pieces(&current, separator) {
                    docs.push(doc);
                }

                loop {
                    let joiner = if current.is_empty() { 0 } else { separator_len };
                    let overflows = total > 0 && total + len + joiner > config.chunk_size;
                    if total <= config.chunk_overlap && !overflows {
                        break;
                    }

                    let dropped_joiner = if current.len() > 1 { separator_len } else { 0 };
                    let Some((_, first)) = current.pop_front() else {
                        break;
                    };
                    total -= char_len(first) + dropped_joiner;
                }
            }
        }

        current.push_back((start, piece));
        total += len;
        if current.len() > 1 {
            total += separator_len;
        }
    }

    if let Some(doc) = join_pieces(&current, separator) {
        docs.push(doc);
    }

    docs
}

/// Join a window and trim it. Separators are whitespace, so the trimmed text
/// starts inside the first piece that is not all whitespace.
fn join_pieces(pieces: &VecDeque<(usize, &str)>, separator: &str) -> Option<(usize, String)> {
    let joined = pieces
        .iter()
        .map(|&(_, piece)| piece)
        .collect::<Vec<_>>()
        .join(separator);
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        return None;
    }

    let start = pieces
        .iter()
        .find(|(_, piece)| !piece.trim_start().is_empty())
        .map(|&(start, piece)| start + piece.len() - piece.trim_start().len())?;

    Some((start, trimmed.to_string()))
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
