#[cfg(test)]
mod tests;

use itertools::Itertools;
use std::cmp::Reverse;
use tracing::debug;

use crate::Result;
use crate::config::RetrievalConfig;
use crate::corpus::ChunkMetadata;
use crate::embeddings::EmbeddingClient;
use crate::index::{Neighbor, VectorIndex};

/// A passage surfaced to the caller: content plus provenance, never the
/// ranking score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievedPassage {
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// Embed the query, fetch the nearest candidates, and apply the two-tier
/// source-priority selection.
///
/// Candidates whose source file is on the priority allow-list are taken
/// first, up to `priority_limit`; the remaining slots are filled from the
/// other candidates, both tiers ordered ascending by distance. This biases
/// answers toward canonical reference documents without excluding the rest
/// of the corpus when priority coverage is thin.
#[inline]
pub async fn retrieve(
    query: &str,
    index: &VectorIndex,
    chunks: &[String],
    metadata: &[ChunkMetadata],
    client: &EmbeddingClient,
    policy: &RetrievalConfig,
) -> Result<Vec<RetrievedPassage>> {
    if chunks.is_empty() {
        return Ok(Vec::new());
    }

    let query_vector = client.embed_query(query).await?;
    let pool = policy.candidate_pool.min(chunks.len());
    let candidates = index.query(&query_vector, pool);

    Ok(select_candidates(&candidates, chunks, metadata, policy))
}

/// The selection rule, separated from the network path so it can be tested
/// against hand-built candidate sets.
fn select_candidates(
    candidates: &[Neighbor],
    chunks: &[String],
    metadata: &[ChunkMetadata],
    policy: &RetrievalConfig,
) -> Vec<RetrievedPassage> {
    // Candidates arrive distance-sorted; partitioning preserves that order
    // within each tier.
    let (priority, other): (Vec<&Neighbor>, Vec<&Neighbor>) = candidates.iter().partition(|n| {
        policy
            .priority_files
            .iter()
            .any(|file| file == &metadata[n.index].file)
    });

    let mut selected: Vec<&Neighbor> = priority.into_iter().take(policy.priority_limit).collect();
    for neighbor in other {
        if selected.len() >= policy.top_n {
            break;
        }
        selected.push(neighbor);
    }
    selected.truncate(policy.top_n);

    debug!(
        "Selected {} of {} candidates ({} priority files configured)",
        selected.len(),
        candidates.len(),
        policy.priority_files.len()
    );

    selected
        .into_iter()
        .map(|n| RetrievedPassage {
            content: chunks[n.index].clone(),
            metadata: metadata[n.index].clone(),
        })
        .collect()
}

/// Degraded, dependency-free retrieval used when no vector index exists:
/// rank chunks by how many query words they contain, descending, ties broken
/// by original order. A query with zero matching words yields an empty list,
/// not an error.
#[inline]
pub fn lexical_search(
    query: &str,
    chunks: &[String],
    metadata: &[ChunkMetadata],
    top_n: usize,
) -> Vec<RetrievedPassage> {
    let query_words: Vec<String> = query
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect();

    chunks
        .iter()
        .enumerate()
        .filter_map(|(i, chunk)| {
            let chunk_lower = chunk.to_lowercase();
            let score = query_words
                .iter()
                .filter(|word| chunk_lower.contains(word.as_str()))
                .count();
            (score > 0).then_some((score, i))
        })
        .sorted_by_key(|&(score, i)| (Reverse(score), i))
        .take(top_n)
        .map(|(_, i)| RetrievedPassage {
            content: chunks[i].clone(),
            metadata: metadata[i].clone(),
        })
        .collect()
}
