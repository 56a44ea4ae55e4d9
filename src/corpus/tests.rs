use super::*;
use tempfile::TempDir;

#[test]
fn reads_only_markdown_sorted_by_name() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("b.md"), "second").expect("write");
    std::fs::write(dir.path().join("a.md"), "first").expect("write");
    std::fs::write(dir.path().join("notes.txt"), "ignored").expect("write");
    std::fs::write(dir.path().join("embeddings_cache.json"), "{}").expect("write");

    let documents = read_corpus(dir.path()).expect("Failed to read corpus");

    assert_eq!(documents.len(), 2);
    assert_eq!(documents[0].name, "a.md");
    assert_eq!(documents[0].content, "first");
    assert_eq!(documents[0].size, 5);
    assert_eq!(documents[1].name, "b.md");
}

#[test]
fn empty_directory_yields_empty_corpus() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let documents = read_corpus(dir.path()).expect("Failed to read corpus");
    assert!(documents.is_empty());
}

#[test]
fn missing_directory_is_an_error() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let missing = dir.path().join("does-not-exist");
    assert!(read_corpus(&missing).is_err());
}
