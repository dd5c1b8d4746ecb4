//! Ingestion pipeline: parse → metadata → split → encrypt.
//!
//! Each resolved source is parsed into raw text, tagged with
//! content-type/provenance metadata, and split into bounded chunks. Any
//! per-source failure (parse error, empty parse, empty split) is logged and
//! that source skipped; one bad document never aborts the whole build.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::chunk::split_text;
use crate::crypto::Codec;
use crate::models::{
    PreparedChunk, ENC_FORMAT_VERSION, META_CONTENT_TYPE, META_ENC, META_ENC_IV, META_ENC_V,
    META_FILENAME, META_SOURCE,
};
use crate::resolve::{ResolvedSource, IMAGE_EXTENSIONS};

/// Ingest all sources into prepared chunks, encrypting when a codec is given.
pub fn ingest_sources(
    sources: &[ResolvedSource],
    max_tokens: usize,
    codec: Option<&Codec>,
) -> Vec<PreparedChunk> {
    let mut prepared = Vec::new();

    for source in sources {
        match ingest_one(source, max_tokens, codec) {
            Ok(mut chunks) => {
                debug!(source = %source.location, chunks = chunks.len(), "ingested source");
                prepared.append(&mut chunks);
            }
            Err(e) => warn!(source = %source.location, error = %e, "skipping source"),
        }
    }

    prepared
}

fn ingest_one(
    source: &ResolvedSource,
    max_tokens: usize,
    codec: Option<&Codec>,
) -> anyhow::Result<Vec<PreparedChunk>> {
    let is_image = IMAGE_EXTENSIONS.contains(&source.extension.as_str());

    let body = if is_image {
        // No OCR path; images are stored as a filename-derived stub so they
        // remain discoverable by name.
        format!("Image file: {}", source.filename)
    } else {
        crate::extract::extract_text(&source.path, &source.extension)?
    };

    if body.trim().is_empty() {
        anyhow::bail!("no text extracted");
    }

    let pieces = split_text(&body, max_tokens);
    if pieces.is_empty() {
        anyhow::bail!("no chunks produced");
    }

    let content_type = if is_image { "image" } else { "text" };

    let mut chunks = Vec::with_capacity(pieces.len());
    for piece in pieces {
        let mut metadata = BTreeMap::new();
        metadata.insert(META_CONTENT_TYPE.to_string(), content_type.to_string());
        metadata.insert(META_FILENAME.to_string(), source.filename.clone());
        metadata.insert(META_SOURCE.to_string(), source.location.clone());

        let text = match codec {
            Some(codec) => {
                let enc = codec.encrypt(&piece)?;
                metadata.insert(META_ENC.to_string(), "aesgcm".to_string());
                metadata.insert(META_ENC_IV.to_string(), enc.iv_base64);
                metadata.insert(META_ENC_V.to_string(), ENC_FORMAT_VERSION.to_string());
                enc.cipher_base64
            }
            None => piece,
        };

        chunks.push(PreparedChunk { text, metadata });
    }

    Ok(chunks)
}
