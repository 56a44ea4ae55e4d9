use super::*;
use tempfile::TempDir;

fn sample_bundle(fingerprint: String) -> CacheBundle {
    CacheBundle::new(
        fingerprint,
        vec![vec![0.1, 0.2], vec![0.3, 0.4]],
        vec!["first chunk".to_string(), "second chunk".to_string()],
        vec![
            ChunkMetadata {
                file: "a.md".to_string(),
                chunk_index: 0,
                file_size: 11,
                chunk_length: 11,
            },
            ChunkMetadata {
                file: "b.md".to_string(),
                chunk_index: 0,
                file_size: 12,
                chunk_length: 12,
            },
        ],
    )
}

#[test]
fn fingerprint_is_order_independent_and_stable() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("a.md"), "alpha").expect("write");
    std::fs::write(dir.path().join("b.md"), "beta").expect("write");

    let first = fingerprint(dir.path()).expect("Failed to fingerprint");
    let second = fingerprint(dir.path()).expect("Failed to fingerprint");
    assert_eq!(first, second);
}

#[test]
fn fingerprint_changes_on_any_byte() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("a.md"), "alpha").expect("write");
    let before = fingerprint(dir.path()).expect("Failed to fingerprint");

    std::fs::write(dir.path().join("a.md"), "alphb").expect("write");
    let after = fingerprint(dir.path()).expect("Failed to fingerprint");
    assert_ne!(before, after);
}

#[test]
fn fingerprint_changes_when_document_added() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("a.md"), "alpha").expect("write");
    let before = fingerprint(dir.path()).expect("Failed to fingerprint");

    std::fs::write(dir.path().join("b.md"), "beta").expect("write");
    let after = fingerprint(dir.path()).expect("Failed to fingerprint");
    assert_ne!(before, after);
}

#[test]
fn save_then_load_round_trip() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("a.md"), "alpha").expect("write");

    let print = fingerprint(dir.path()).expect("Failed to fingerprint");
    let bundle = sample_bundle(print);
    save(dir.path(), &bundle);

    let loaded = load(dir.path()).expect("Cache should be valid");
    assert_eq!(loaded, bundle);
}

#[test]
fn missing_cache_file_is_a_miss() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("a.md"), "alpha").expect("write");
    assert!(load(dir.path()).is_none());
}

#[test]
fn corrupt_cache_file_is_a_miss() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("a.md"), "alpha").expect("write");
    std::fs::write(cache_path(dir.path()), "not json {").expect("write");
    assert!(load(dir.path()).is_none());
}

#[test]
fn document_mutation_invalidates_cache() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("a.md"), "alpha").expect("write");

    let print = fingerprint(dir.path()).expect("Failed to fingerprint");
    save(dir.path(), &sample_bundle(print));
    assert!(load(dir.path()).is_some());

    std::fs::write(dir.path().join("a.md"), "alphX").expect("write");
    assert!(load(dir.path()).is_none());
}

#[test]
fn schema_version_mismatch_invalidates_cache() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("a.md"), "alpha").expect("write");

    let print = fingerprint(dir.path()).expect("Failed to fingerprint");
    let mut bundle = sample_bundle(print);
    bundle.version = 999;
    save(dir.path(), &bundle);

    // Fingerprint matches but the schema tag does not.
    assert!(load(dir.path()).is_none());
}

#[test]
fn misaligned_bundle_invalidates_cache() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("a.md"), "alpha").expect("write");

    let print = fingerprint(dir.path()).expect("Failed to fingerprint");
    let mut bundle = sample_bundle(print);
    bundle.chunks.pop();
    save(dir.path(), &bundle);

    assert!(load(dir.path()).is_none());
}

#[test]
fn save_failure_is_swallowed() {
    // Saving into a directory that does not exist must not panic or error.
    let dir = TempDir::new().expect("Failed to create temp dir");
    let missing = dir.path().join("gone");
    save(&missing, &sample_bundle("deadbeef".to_string()));
}
