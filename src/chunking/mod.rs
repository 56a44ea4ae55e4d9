
use anyhow::Result;
use fancy_regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::config::ChunkingConfig;

/// End-of-sentence punctuation followed by whitespace and a capital letter.
/// The lookahead keeps abbreviations and decimal numbers intact in the
/// common case.
static SENTENCE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+(?=\s+[A-Z])").expect("valid regex"));

/// Split a document's text into overlapping passages suitable for embedding
/// and citation.
///
/// Documents shorter than `min_input_len` are not worth splitting and come
/// back as a single trimmed chunk (or none at all when blank). Longer text is
/// split on sentence boundaries and accumulated greedily up to `chunk_size`
/// characters; each closed chunk seeds the next one with a small word-level
/// overlap so context survives the cut.
///
/// Deterministic: identical input always yields the identical chunk sequence.
#[inline]
pub fn chunk_document(text: &str, config: &ChunkingConfig) -> Result<Vec<String>> {
    if text.chars().count() < config.min_input_len {
        let trimmed = text.trim();
        return Ok(if trimmed.is_empty() {
            Vec::new()
        } else {
            vec![trimmed.to_string()]
        });
    }

    let overlap_words = config.overlap / 10;
    let mut chunks = Vec::new();
    let mut current = String::new();

    for piece in SENTENCE_BOUNDARY.split(text) {
        let sentence = piece?.trim();
        if sentence.is_empty() {
            continue;
        }

        if !current.is_empty()
            && current.chars().count() + sentence.chars().count() > config.chunk_size
        {
            let closed = current.trim().to_string();
            current = seed_with_overlap(&closed, sentence, overlap_words);
            chunks.push(closed);
        } else if current.is_empty() {
            current = sentence.to_string();
        } else {
            current.push(' ');
            current.push_str(sentence);
        }
    }

    let tail = current.trim();
    if !tail.is_empty() {
        chunks.push(tail.to_string());
    }

    debug!("Chunked {} chars into {} chunks", text.len(), chunks.len());

    Ok(chunks)
}

/// Start the next chunk with the trailing words of the one just closed,
/// followed by the sentence that did not fit.
fn seed_with_overlap(closed: &str, sentence: &str, overlap_words: usize) -> String {
    let words: Vec<&str> = closed.split_whitespace().collect();
    if words.len() > overlap_words && overlap_words > 0 {
        let mut seeded = words[words.len() - overlap_words..].join(" ");
        seeded.push(' ');
        seeded.push_str(sentence);
        seeded
    } else {
        sentence.to_string()
    }
}
