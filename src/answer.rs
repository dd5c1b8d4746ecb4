//! Retrieval merge, chunk decryption, and prompt assembly.
//!
//! Runs one similarity search per query variant, merges the hits
//! (deduplicated on exact text, capped at the retrieval limit), decrypts
//! what needs decrypting, renders the prompt template, and invokes the chat
//! model once. A chunk that fails to decrypt is replaced with an inline
//! placeholder naming its source — best-effort answering over a partially
//! undecryptable corpus is deliberate.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::warn;

use crate::chat::ChatProvider;
use crate::crypto::Codec;
use crate::embedding::EmbeddingProvider;
use crate::expand::expand_query;
use crate::models::{Chunk, META_ENC_IV, META_SOURCE};
use crate::store::VectorStore;

/// Prompt template with `{input}` and `{documents}` placeholders, loaded
/// once at startup and reused per request.
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn load(path: &Path) -> Result<Self> {
        let template = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read prompt template {}", path.display()))?;
        Ok(Self { template })
    }

    pub fn from_text(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    pub fn render(&self, input: &str, documents: &str) -> String {
        self.template
            .replace("{input}", input)
            .replace("{documents}", documents)
    }
}

/// Answer a question against the store: expand, retrieve, decrypt, compose.
pub async fn answer_question(
    question: &str,
    store: &VectorStore,
    embedder: &dyn EmbeddingProvider,
    chat: &dyn ChatProvider,
    codec: Option<&Codec>,
    template: &PromptTemplate,
    top_k: usize,
) -> Result<String> {
    let variants = expand_query(chat, question).await;

    let mut batches = Vec::with_capacity(variants.len());
    for variant in &variants {
        batches.push(store.search(variant, top_k, embedder).await?);
    }
    let merged = merge_hits(batches, top_k);

    let contents: Vec<String> = merged.iter().map(|c| chunk_text(c, codec)).collect();

    let prompt = template.render(question, &contents.join("\n"));
    chat.complete(&prompt).await
}

/// Concatenate per-variant hits in order, drop exact-text duplicates
/// (first-seen wins), and cap the merged result.
pub(crate) fn merge_hits(batches: Vec<Vec<Chunk>>, cap: usize) -> Vec<Chunk> {
    let mut merged: Vec<Chunk> = Vec::new();
    for batch in batches {
        for chunk in batch {
            if merged.len() >= cap {
                return merged;
            }
            if merged.iter().any(|c| c.text == chunk.text) {
                continue;
            }
            merged.push(chunk);
        }
    }
    merged
}

/// Plaintext of a retrieved chunk, decrypting when its metadata says so.
/// Failure yields an inline placeholder instead of aborting the answer.
fn chunk_text(chunk: &Chunk, codec: Option<&Codec>) -> String {
    if !chunk.is_encrypted() {
        return chunk.text.clone();
    }

    let source = chunk
        .metadata
        .get(META_SOURCE)
        .map(String::as_str)
        .unwrap_or("(unknown source)");

    let iv = match chunk.metadata.get(META_ENC_IV) {
        Some(iv) => iv,
        None => {
            warn!(source, "encrypted chunk missing enc_iv");
            return placeholder(source);
        }
    };

    match codec {
        Some(codec) => match codec.decrypt(iv, &chunk.text) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                warn!(source, error = %e, "failed to decrypt chunk");
                placeholder(source)
            }
        },
        None => {
            warn!(source, "encrypted chunk retrieved but no decryption key configured");
            placeholder(source)
        }
    }
}

fn placeholder(source: &str) -> String {
    format!("[unable to decrypt chunk - source: {}]", source)
}
