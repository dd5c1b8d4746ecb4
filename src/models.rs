//! Core data models used throughout sitechat.
//!
//! These types represent the embedded chunks that flow through the
//! ingestion and retrieval pipeline, the flat audit log that backs
//! conversation history, and the derived conversation DTOs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata key marking a chunk as encrypted. Value is always `"aesgcm"`.
pub const META_ENC: &str = "enc";
/// Metadata key holding the Base64-encoded 12-byte IV of an encrypted chunk.
pub const META_ENC_IV: &str = "enc_iv";
/// Metadata key holding the encryption format version.
pub const META_ENC_V: &str = "enc_v";
/// Metadata key for the content type (`text` or `image`).
pub const META_CONTENT_TYPE: &str = "content_type";
/// Metadata key for the source filename.
pub const META_FILENAME: &str = "filename";
/// Metadata key for the full source location (path or URL).
pub const META_SOURCE: &str = "source";

/// Current encryption format version written into `enc_v`.
pub const ENC_FORMAT_VERSION: &str = "1";

/// A chunk of document text prepared by ingestion but not yet embedded.
///
/// `text` is plaintext, or Base64 AEAD ciphertext when the metadata carries
/// `enc = "aesgcm"`. The `enc` flag is authoritative: the retrieval path
/// decides whether to decrypt based on it, never on the text itself.
#[derive(Debug, Clone)]
pub struct PreparedChunk {
    pub text: String,
    pub metadata: BTreeMap<String, String>,
}

/// A stored chunk: text (or ciphertext), its embedding, and metadata.
///
/// Immutable after creation. The store is write-once (built), then
/// read-many, or replaced by a full rebuild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: BTreeMap<String, String>,
}

impl Chunk {
    /// Whether the retrieval path must decrypt this chunk's text.
    pub fn is_encrypted(&self) -> bool {
        self.metadata.get(META_ENC).map(String::as_str) == Some("aesgcm")
    }
}

/// One record of the append-only request/response audit log.
///
/// A `path` ending in `:response` marks an assistant-authored entry; any
/// other path marks a user-authored entry. Entries are never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: i64,
    pub path: String,
    pub method: String,
    pub payload: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requester_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A single message inside a reconstructed conversation.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub id: i64,
    pub role: &'static str,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// A full conversation derived from the audit log. Not persisted; the id
/// is a 1-based position within the current partition.
#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    pub id: i64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub messages: Vec<Message>,
}

/// Conversation listing entry with a derived preview.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub id: i64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub message_count: usize,
    pub preview: String,
}
