//! Text chunking — paragraph-aware splitting with overlap.

/// Preferred chunk size in characters.
pub const TARGET_CHUNK_CHARS: usize = 600;
/// Hard upper bound for a single chunk.
pub const MAX_CHUNK_CHARS: usize = 900;
/// Characters repeated between adjacent chunks of an oversized block.
pub const OVERLAP_CHARS: usize = 80;

/// A single chunk of a document as stored and retrieved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChunk {
    pub id: String,
    pub document_id: String,
    pub source: String,
    pub title: String,
    pub chunk_index: usize,
    pub text: String,
}

/// Split text into `(chunk_index, text)` pairs. Paragraph-aware first
/// (blank-line boundaries), then size-limited with overlap for blocks over
/// [`MAX_CHUNK_CHARS`].
pub fn chunk_text(text: &str) -> Vec<(usize, String)> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let mut result = Vec::new();
    let mut chunk_index = 0;
    for paragraph in trimmed.split("\n\n") {
        let block = paragraph.trim();
        if block.is_empty() {
            continue;
        }
        if block.chars().count() <= MAX_CHUNK_CHARS {
            result.push((chunk_index, block.to_string()));
            chunk_index += 1;
            continue;
        }
        for sub in split_by_size(block, MAX_CHUNK_CHARS, OVERLAP_CHARS) {
            result.push((chunk_index, sub));
            chunk_index += 1;
        }
    }
    result
}

/// Split an oversized block into at-most-`max_size`-char pieces, preferring
/// to break at the last space (then newline) inside the window, carrying
/// `overlap` characters into the next piece.
fn split_by_size(text: &str, max_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut result = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let mut end = (start + max_size).min(chars.len());
        if end < chars.len() {
            let window = &chars[start..end];
            if let Some(pos) = window.iter().rposition(|&c| c == ' ') {
                end = start + pos + 1;
            } else if let Some(pos) = window.iter().rposition(|&c| c == '\n') {
                end = start + pos + 1;
            }
        }
        result.push(chars[start..end].iter().collect());
        if end >= chars.len() {
            break;
        }
        let next = end.saturating_sub(overlap);
        start = if next > start { next } else { end };
    }
    result
}
