//! File-persisted in-memory vector store.
//!
//! Holds (text-or-ciphertext, embedding, metadata) records for the whole
//! corpus. Persistence is a single JSON document written once at the end of
//! a build and loaded verbatim on restart — no partial rewrites, no online
//! updates. Once built or loaded the store is read-only for the process
//! lifetime, so concurrent searches need no synchronization beyond `Arc`.
//!
//! Similarity search is brute-force cosine over all stored vectors; the
//! corpus is assumed small and memory-resident.

use std::cmp::Ordering;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::embedding::{cosine_similarity, embed_query, EmbeddingProvider};
use crate::models::{Chunk, PreparedChunk};

/// On-disk shape of the store: dimensionality plus every chunk record.
#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    dims: usize,
    chunks: Vec<Chunk>,
}

/// In-memory vector store over one embedding space.
pub struct VectorStore {
    dims: usize,
    chunks: Vec<Chunk>,
}

impl VectorStore {
    /// Embed every prepared chunk and assemble the store.
    ///
    /// Embeddings are computed in batches. The dimensionality is fixed by
    /// the provider for the lifetime of the store.
    pub async fn build(
        prepared: Vec<PreparedChunk>,
        embedder: &dyn EmbeddingProvider,
        batch_size: usize,
    ) -> Result<Self> {
        let batch_size = batch_size.max(1);
        let mut chunks = Vec::with_capacity(prepared.len());

        for batch in prepared.chunks(batch_size) {
            let texts: Vec<String> = batch.iter().map(|p| p.text.clone()).collect();
            let vectors = embedder.embed(&texts).await?;
            if vectors.len() != batch.len() {
                anyhow::bail!(
                    "embedding batch size mismatch: sent {}, got {}",
                    batch.len(),
                    vectors.len()
                );
            }
            for (p, embedding) in batch.iter().zip(vectors) {
                chunks.push(Chunk {
                    text: p.text.clone(),
                    embedding,
                    metadata: p.metadata.clone(),
                });
            }
        }

        Ok(Self {
            dims: embedder.dims(),
            chunks,
        })
    }

    /// Serialize the full collection to `path`, creating parent directories
    /// as needed. Called exactly once per build.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        let file = StoreFile {
            dims: self.dims,
            chunks: self.chunks.clone(),
        };
        let json = serde_json::to_string(&file)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write store file {}", path.display()))?;
        info!(path = %path.display(), chunks = self.chunks.len(), "vector store saved");
        Ok(())
    }

    /// Restore a previously saved store, bypassing re-ingestion entirely.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read store file {}", path.display()))?;
        let file: StoreFile = serde_json::from_str(&json)
            .with_context(|| format!("malformed store file {}", path.display()))?;
        Ok(Self {
            dims: file.dims,
            chunks: file.chunks,
        })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Embed the query and return the `top_k` chunks ranked by cosine
    /// similarity, first-seen order winning ties.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<Vec<Chunk>> {
        if self.chunks.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let query_vec = embed_query(embedder, query).await?;

        let mut scored: Vec<(f32, &Chunk)> = self
            .chunks
            .iter()
            .map(|c| (cosine_similarity(&query_vec, &c.embedding), c))
            .collect();
        // Stable sort keeps insertion order for equal scores
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(_, c)| c.clone())
            .collect())
    }
}
