//! Store lifecycle orchestration.
//!
//! At startup the persisted store file is loaded verbatim when it exists —
//! no re-ingestion. Otherwise the full build runs exactly once:
//! resolve → ingest → (encrypt) → embed → save. Ingestion is synchronous
//! and single-threaded; the store is fully built before any question is
//! answered.

use anyhow::Result;
use tracing::info;

use crate::config::Config;
use crate::crypto::{codec_from_config, Codec};
use crate::embedding::EmbeddingProvider;
use crate::ingest::ingest_sources;
use crate::resolve::resolve_sources;
use crate::store::VectorStore;

/// Load the persisted store, or build and persist it when missing.
pub async fn init_store(config: &Config, embedder: &dyn EmbeddingProvider) -> Result<VectorStore> {
    info!(
        model = embedder.model_name(),
        dims = embedder.dims(),
        "embedding model in use"
    );

    let path = &config.store.path;
    if path.exists() {
        let store = VectorStore::load(path)?;
        info!(path = %path.display(), chunks = store.len(), "loaded existing vector store");
        return Ok(store);
    }

    info!("no existing vector store; reading and indexing documents");

    // Key resolution is fatal here when encryption is enabled, before any
    // document is read.
    let codec = codec_from_config(&config.encryption)?;

    let sources = resolve_sources(config).await?;
    if sources.is_empty() {
        info!("no documents found; building an empty store");
    } else {
        info!(count = sources.len(), "documents found for indexing");
    }

    let prepared = ingest_sources(&sources, config.documents.chunk_max_tokens, codec.as_ref());
    let store = VectorStore::build(prepared, embedder, config.embedding.batch_size).await?;
    store.save(path)?;
    Ok(store)
}

/// Codec used at answer time, resolved through the same chain as at build
/// time. `None` when encryption is disabled.
pub fn answer_codec(config: &Config) -> Result<Option<Codec>> {
    codec_from_config(&config.encryption)
}
