
use tracing::{info, warn};

use crate::cache::{self, CacheBundle};
use crate::chunking::chunk_document;
use crate::config::Config;
use crate::corpus::{ChunkMetadata, read_corpus};
use crate::embeddings::EmbeddingClient;
use crate::generation::{GenerationClient, build_grounding_context, load_system_instructions};
use crate::index::VectorIndex;
use crate::retriever::{RetrievedPassage, lexical_search, retrieve};
use crate::{RagError, Result};

/// Everything query time needs: the chunk texts, their provenance, and the
/// vector index built over them. `index` is absent when construction failed,
/// in which case retrieval degrades to the lexical path.
#[derive(Debug)]
pub struct CorpusIndex {
    pub index: Option<VectorIndex>,
    pub chunks: Vec<String>,
    pub metadata: Vec<ChunkMetadata>,
}

/// Drives the full retrieval pipeline: cache lifecycle, chunking, embedding,
/// index construction, retrieval, and the grounding handoff to generation.
pub struct RagPipeline {
    config: Config,
    embedder: EmbeddingClient,
    generator: GenerationClient,
}

impl RagPipeline {
    #[inline]
    pub fn new(config: Config) -> Result<Self> {
        config
            .validate()
            .map_err(|e| RagError::Config(e.to_string()))?;

        let embedder = EmbeddingClient::new(&config.embedding)?;
        let generator = GenerationClient::new(&config.embedding, &config.generation)?;

        Ok(Self {
            config,
            embedder,
            generator,
        })
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Load the cached bundle if it is still valid, otherwise rebuild it from
    /// the documents on disk, then construct the vector index over it.
    #[inline]
    pub async fn ensure_index(&self) -> Result<CorpusIndex> {
        let bundle = match cache::load(&self.config.docs_dir) {
            Some(bundle) => bundle,
            None => self.rebuild_bundle().await?,
        };

        debug_assert!(
            bundle.embeddings.len() == bundle.chunks.len()
                && bundle.chunks.len() == bundle.metadata.len()
        );

        Ok(Self::corpus_index(bundle))
    }

    /// Rebuild the cache bundle unconditionally, ignoring any existing blob.
    #[inline]
    pub async fn rebuild(&self) -> Result<CorpusIndex> {
        let bundle = self.rebuild_bundle().await?;
        Ok(Self::corpus_index(bundle))
    }

    fn corpus_index(bundle: CacheBundle) -> CorpusIndex {
        let index = match VectorIndex::build(bundle.embeddings) {
            Ok(index) => Some(index),
            Err(e) => {
                warn!("Vector index unavailable, falling back to lexical search: {e}");
                None
            }
        };

        CorpusIndex {
            index,
            chunks: bundle.chunks,
            metadata: bundle.metadata,
        }
    }

    /// Answer a query: fail fast on misconfiguration, retrieve grounding
    /// passages, assemble the prompt, and hand off to the generation call.
    #[inline]
    pub async fn answer(&self, query: &str) -> Result<String> {
        if query.trim().is_empty() {
            return Err(RagError::Config("Query must not be empty".to_string()));
        }
        self.config
            .require_api_key()
            .map_err(|e| RagError::Config(e.to_string()))?;

        let corpus = self.ensure_index().await?;
        let passages = self.grounding_passages(query, &corpus).await?;

        let instructions = load_system_instructions(&self.config.instructions_path);
        let prompt = build_grounding_context(&instructions, &passages);

        self.generator
            .complete(&prompt, query)
            .await
            .map_err(|e| RagError::Generation(e.to_string()))
    }

    async fn grounding_passages(
        &self,
        query: &str,
        corpus: &CorpusIndex,
    ) -> Result<Vec<RetrievedPassage>> {
        match &corpus.index {
            Some(index) => retrieve(
                query,
                index,
                &corpus.chunks,
                &corpus.metadata,
                &self.embedder,
                &self.config.retrieval,
            )
            .await,
            None => Ok(lexical_search(
                query,
                &corpus.chunks,
                &corpus.metadata,
                self.config.retrieval.top_n,
            )),
        }
    }

    /// Chunk and embed the corpus and persist the result. The save is
    /// best-effort; the in-memory bundle is returned regardless.
    ///
    /// A placeholder API key is rejected before anything is embedded: every
    /// batch would fail and the resulting all-zero bundle would be persisted
    /// under the current fingerprint, so fixing the key later would never
    /// trigger a rebuild.
    async fn rebuild_bundle(&self) -> Result<CacheBundle> {
        self.config
            .require_api_key()
            .map_err(|e| RagError::Config(e.to_string()))?;

        let docs_dir = &self.config.docs_dir;
        let documents = read_corpus(docs_dir)?;

        if documents.is_empty() {
            return Err(RagError::NoData(format!(
                "No documents found in {}",
                docs_dir.display()
            )));
        }

        let mut chunks = Vec::new();
        let mut metadata = Vec::new();

        for document in &documents {
            let doc_chunks = chunk_document(&document.content, &self.config.chunking)?;
            for (chunk_index, chunk) in doc_chunks.into_iter().enumerate() {
                metadata.push(ChunkMetadata {
                    file: document.name.clone(),
                    chunk_index,
                    file_size: document.size,
                    chunk_length: chunk.chars().count(),
                });
                chunks.push(chunk);
            }
        }

        if chunks.is_empty() {
            return Err(RagError::NoData(format!(
                "Corpus in {} produced no chunks",
                docs_dir.display()
            )));
        }

        info!(
            "Rebuilding embeddings for {} chunks from {} documents",
            chunks.len(),
            documents.len()
        );

        let embeddings = self
            .embedder
            .embed(&chunks)
            .await
            .map_err(|e| RagError::Embedding(e.to_string()))?;

        let fingerprint = cache::fingerprint(docs_dir)?;
        let bundle = CacheBundle::new(fingerprint, embeddings, chunks, metadata);
        cache::save(docs_dir, &bundle);

        Ok(bundle)
    }
}
