#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::Result;
use crate::corpus::{ChunkMetadata, list_doc_files};

/// Bumped whenever the serialized layout changes; an old blob is rebuilt
/// rather than partially patched.
const CACHE_SCHEMA_VERSION: u32 = 1;

/// Name of the cache blob stored next to the documents.
const CACHE_FILE_NAME: &str = "embeddings_cache.json";

/// Everything needed to answer queries without re-embedding the corpus.
///
/// The three lists are index-aligned: `embeddings.len() == chunks.len() ==
/// metadata.len()` on every load/build path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheBundle {
    pub version: u32,
    pub fingerprint: String,
    pub embeddings: Vec<Vec<f32>>,
    pub chunks: Vec<String>,
    pub metadata: Vec<ChunkMetadata>,
}

impl CacheBundle {
    #[inline]
    pub fn new(
        fingerprint: String,
        embeddings: Vec<Vec<f32>>,
        chunks: Vec<String>,
        metadata: Vec<ChunkMetadata>,
    ) -> Self {
        Self {
            version: CACHE_SCHEMA_VERSION,
            fingerprint,
            embeddings,
            chunks,
            metadata,
        }
    }

    fn is_aligned(&self) -> bool {
        self.embeddings.len() == self.chunks.len() && self.chunks.len() == self.metadata.len()
    }
}

/// Path of the cache blob for a given docs directory.
#[inline]
pub fn cache_path(docs_dir: &Path) -> std::path::PathBuf {
    docs_dir.join(CACHE_FILE_NAME)
}

/// Hash the byte content of every corpus file, sorted by name. Any change to
/// any document, or adding/removing one, produces a different fingerprint.
#[inline]
pub fn fingerprint(docs_dir: &Path) -> Result<String> {
    let mut hasher = blake3::Hasher::new();

    for path in list_doc_files(docs_dir)? {
        let bytes = fs::read(&path)?;
        hasher.update(&bytes);
    }

    Ok(hex::encode(hasher.finalize().as_bytes()))
}

/// Load the cache bundle for a docs directory, returning `None` unless the
/// blob exists, parses, matches the schema version, passes the alignment
/// check, and carries a fingerprint identical to the one recomputed from the
/// current documents.
///
/// Fails soft: every miss reason is logged and collapsed into `None` so the
/// caller always rebuilds rather than erroring out.
#[inline]
pub fn load(docs_dir: &Path) -> Option<CacheBundle> {
    let path = cache_path(docs_dir);

    if !path.exists() {
        debug!("No cache file at {}", path.display());
        return None;
    }

    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) => {
            debug!("Failed to read cache file {}: {e}", path.display());
            return None;
        }
    };

    let bundle: CacheBundle = match serde_json::from_str(&content) {
        Ok(bundle) => bundle,
        Err(e) => {
            debug!("Failed to parse cache file {}: {e}", path.display());
            return None;
        }
    };

    if bundle.version != CACHE_SCHEMA_VERSION {
        debug!(
            "Cache schema version {} does not match {}",
            bundle.version, CACHE_SCHEMA_VERSION
        );
        return None;
    }

    if !bundle.is_aligned() {
        debug!(
            "Cache bundle is misaligned: {} embeddings, {} chunks, {} metadata",
            bundle.embeddings.len(),
            bundle.chunks.len(),
            bundle.metadata.len()
        );
        return None;
    }

    let current = match fingerprint(docs_dir) {
        Ok(current) => current,
        Err(e) => {
            debug!("Failed to fingerprint {}: {e}", docs_dir.display());
            return None;
        }
    };

    if bundle.fingerprint != current {
        debug!("Cache fingerprint is stale, rebuilding");
        return None;
    }

    debug!("Cache hit with {} chunks", bundle.chunks.len());
    Some(bundle)
}

/// Persist the bundle next to the documents. Best-effort: the in-memory
/// result is already usable, so a write failure is logged and swallowed.
#[inline]
pub fn save(docs_dir: &Path, bundle: &CacheBundle) {
    let path = cache_path(docs_dir);

    let serialized = match serde_json::to_string(bundle) {
        Ok(serialized) => serialized,
        Err(e) => {
            warn!("Failed to serialize embeddings cache: {e}");
            return;
        }
    };

    if let Err(e) = fs::write(&path, serialized) {
        warn!("Failed to write cache file {}: {e}", path.display());
    } else {
        debug!(
            "Saved cache with {} chunks to {}",
            bundle.chunks.len(),
            path.display()
        );
    }
}
