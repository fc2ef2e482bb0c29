//! Splits extracted document text into passages.
//!
//! Passages are separated by blank-line runs (one or more lines that are
//! empty after trimming). Empty segments are discarded and ordinals are
//! reassigned densely, so they always run 0..n with no gaps.

use doctalk_core::error::{DocTalkError, Result};
use doctalk_core::types::Passage;

/// Split `raw_text` into passages.
///
/// Fails with [`DocTalkError::EmptyDocument`] when nothing survives — the
/// caller must not proceed to embedding or storage.
pub fn chunk(raw_text: &str) -> Result<Vec<Passage>> {
    let mut passages: Vec<Passage> = Vec::new();
    let mut current = String::new();

    let flush = |current: &mut String, passages: &mut Vec<Passage>| {
        let trimmed = current.trim();
        if !trimmed.is_empty() {
            passages.push(Passage {
                text: trimmed.to_string(),
                ordinal: passages.len(),
            });
        }
        current.clear();
    };

    for line in raw_text.lines() {
        if line.trim().is_empty() {
            flush(&mut current, &mut passages);
        } else {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
        }
    }
    flush(&mut current, &mut passages);

    if passages.is_empty() {
        return Err(DocTalkError::EmptyDocument);
    }

    tracing::debug!(passages = passages.len(), "chunked document text");
    Ok(passages)
}
