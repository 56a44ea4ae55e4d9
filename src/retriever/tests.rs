use super::*;

fn meta(file: &str, chunk_index: usize) -> ChunkMetadata {
    ChunkMetadata {
        file: file.to_string(),
        chunk_index,
        file_size: 1000,
        chunk_length: 20,
    }
}

fn corpus() -> (Vec<String>, Vec<ChunkMetadata>) {
    let chunks = vec![
        "Commands are registered in the handler table.".to_string(),
        "The scheduler fires webhooks on a timer.".to_string(),
        "Payments flow through the invoice API.".to_string(),
        "Sessions persist per chat identifier.".to_string(),
        "Inline keyboards attach to any reply.".to_string(),
    ];
    let metadata = vec![
        meta("api-reference.md", 0),
        meta("changelog.md", 0),
        meta("api-reference.md", 1),
        meta("core-concepts.md", 0),
        meta("faq.md", 0),
    ];
    (chunks, metadata)
}

fn policy_with_priority() -> RetrievalConfig {
    RetrievalConfig {
        priority_files: vec!["api-reference.md".to_string(), "core-concepts.md".to_string()],
        ..RetrievalConfig::default()
    }
}

fn neighbor(index: usize, distance: f32) -> Neighbor {
    Neighbor { distance, index }
}

#[test]
fn priority_capped_at_two_then_filled_from_other() {
    let (chunks, metadata) = corpus();
    // Three priority hits (indices 0, 2, 3) and two others, distance-sorted.
    let candidates = vec![
        neighbor(1, 0.1),
        neighbor(0, 0.2),
        neighbor(3, 0.3),
        neighbor(2, 0.4),
        neighbor(4, 0.5),
    ];

    let selected = select_candidates(&candidates, &chunks, &metadata, &policy_with_priority());

    assert_eq!(selected.len(), 3);
    // Two nearest priority hits first, in distance order.
    assert_eq!(selected[0].metadata.file, "api-reference.md");
    assert_eq!(selected[0].metadata.chunk_index, 0);
    assert_eq!(selected[1].metadata.file, "core-concepts.md");
    // Third slot filled from the non-priority tier, nearest first.
    assert_eq!(selected[2].metadata.file, "changelog.md");
}

#[test]
fn no_priority_files_falls_back_to_pure_distance() {
    let (chunks, metadata) = corpus();
    let candidates = vec![neighbor(4, 0.1), neighbor(1, 0.2), neighbor(0, 0.3)];

    let policy = RetrievalConfig::default();
    let selected = select_candidates(&candidates, &chunks, &metadata, &policy);

    let files: Vec<&str> = selected.iter().map(|p| p.metadata.file.as_str()).collect();
    assert_eq!(files, vec!["faq.md", "changelog.md", "api-reference.md"]);
}

#[test]
fn never_more_than_top_n_and_no_duplicates() {
    let (chunks, metadata) = corpus();
    let candidates: Vec<Neighbor> = (0..5).map(|i| neighbor(i, i as f32 * 0.1)).collect();

    let selected = select_candidates(&candidates, &chunks, &metadata, &policy_with_priority());

    assert!(selected.len() <= 3);
    let mut seen: Vec<(&str, usize)> = selected
        .iter()
        .map(|p| (p.metadata.file.as_str(), p.metadata.chunk_index))
        .collect();
    seen.sort_unstable();
    seen.dedup();
    assert_eq!(seen.len(), selected.len());
}

#[test]
fn thin_priority_coverage_is_filled_from_other() {
    let (chunks, metadata) = corpus();
    // Only one priority hit in the pool.
    let candidates = vec![neighbor(0, 0.3), neighbor(1, 0.1), neighbor(4, 0.2)];

    let selected = select_candidates(&candidates, &chunks, &metadata, &policy_with_priority());

    assert_eq!(selected.len(), 3);
    assert_eq!(selected[0].metadata.file, "api-reference.md");
    assert_eq!(selected[1].metadata.file, "changelog.md");
    assert_eq!(selected[2].metadata.file, "faq.md");
}

#[test]
fn lexical_search_ranks_by_word_count() {
    let (chunks, metadata) = corpus();

    let results = lexical_search("webhooks timer scheduler", &chunks, &metadata, 3);

    assert!(!results.is_empty());
    assert_eq!(results[0].metadata.file, "changelog.md");
}

#[test]
fn lexical_search_zero_matches_is_empty() {
    let (chunks, metadata) = corpus();
    let results = lexical_search("quantum chromodynamics", &chunks, &metadata, 3);
    assert!(results.is_empty());
}

#[test]
fn lexical_search_ties_keep_original_order() {
    let chunks = vec![
        "alpha beta".to_string(),
        "alpha gamma".to_string(),
        "alpha delta".to_string(),
        "alpha epsilon".to_string(),
    ];
    let metadata: Vec<ChunkMetadata> = (0..4).map(|i| meta("doc.md", i)).collect();

    let results = lexical_search("alpha", &chunks, &metadata, 3);

    assert_eq!(results.len(), 3);
    let order: Vec<usize> = results.iter().map(|p| p.metadata.chunk_index).collect();
    assert_eq!(order, vec![0, 1, 2]);
}

#[test]
fn lexical_search_is_case_insensitive() {
    let (chunks, metadata) = corpus();
    let results = lexical_search("INVOICE payments", &chunks, &metadata, 3);
    assert_eq!(results[0].metadata.file, "api-reference.md");
    assert_eq!(results[0].metadata.chunk_index, 1);
}
