//! Document cleaning and sliding-window chunking.
//!
//! Offsets are in characters (Unicode scalar values), so a window never
//! splits a multi-byte code point.

use scribe_core::error::{Result, ScribeError};
use scribe_core::types::Chunk;

/// Collapse every whitespace run (newlines included) to one space, then trim.
pub fn clean_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Check `chunk_size > overlap`, the precondition for the window to advance.
pub fn validate_window(chunk_size: usize, overlap: usize) -> Result<()> {
    if chunk_size == 0 || overlap >= chunk_size {
        return Err(ScribeError::InvalidConfiguration(format!(
            "chunk_size ({chunk_size}) must be greater than overlap ({overlap})"
        )));
    }
    Ok(())
}

/// Split `text` into overlapping windows of `chunk_size` characters.
///
/// Each window starts `overlap` characters before the previous one ended.
/// Whitespace-only windows are skipped and do not consume an index.
pub fn segment(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    validate_window(chunk_size, overlap)?;

    // Byte offset of every char boundary, plus the end of the string.
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let len = bounds.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < len {
        let end = (start + chunk_size).min(len);
        let window = text[bounds[start]..bounds[end]].trim();
        if !window.is_empty() {
            chunks.push(Chunk {
                text: window.to_string(),
                chunk_index: chunks.len(),
                start_char: start,
                end_char: end,
            });
        }
        if end == len {
            break;
        }
        start = end - overlap;
    }

    tracing::debug!("✂️ Segmented {len} chars into {} chunks", chunks.len());
    Ok(chunks)
}

/// Split after `.`, `!` or `?` when followed by whitespace.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().is_some_and(|n| n.is_whitespace()) {
            while chars.peek().is_some_and(|n| n.is_whitespace()) {
                chars.next();
            }
            let sentence = current.trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            current.clear();
        }
    }
    let rest = current.trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }
    sentences
}
