#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::Result;

/// Extension of files that make up the corpus.
const DOC_EXTENSION: &str = "md";

/// A named unit of source text, read once per cache rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub name: String,
    pub content: String,
    pub size: u64,
}

/// Provenance record for one chunk, index-aligned with the chunk list and the
/// embedding matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Source document file name.
    pub file: String,
    /// Position of the chunk within its document.
    pub chunk_index: usize,
    /// Size in bytes of the originating document.
    pub file_size: u64,
    /// Length in characters of the chunk.
    pub chunk_length: usize,
}

/// List the corpus files in the docs directory, sorted by file name so the
/// fingerprint and chunk order are reproducible across runs and platforms.
#[inline]
pub fn list_doc_files(docs_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(docs_dir)?
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry.path()),
            Err(e) => {
                warn!("Skipping unreadable directory entry: {e}");
                None
            }
        })
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(DOC_EXTENSION))
        })
        .collect();

    files.sort();
    Ok(files)
}

/// Read every corpus document wholesale into memory. A file that fails to
/// read is skipped with a warning rather than aborting the rebuild.
#[inline]
pub fn read_corpus(docs_dir: &Path) -> Result<Vec<Document>> {
    let mut documents = Vec::new();

    for path in list_doc_files(docs_dir)? {
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };

        match fs::read_to_string(&path) {
            Ok(content) => {
                let size = content.len() as u64;
                documents.push(Document {
                    name,
                    content,
                    size,
                });
            }
            Err(e) => {
                warn!("Skipping unreadable document {}: {e}", path.display());
            }
        }
    }

    debug!(
        "Read {} documents from {}",
        documents.len(),
        docs_dir.display()
    );

    Ok(documents)
}
