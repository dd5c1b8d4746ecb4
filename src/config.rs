use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub store: StoreConfig,
    #[serde(default)]
    pub documents: DocumentsConfig,
    #[serde(default)]
    pub encryption: EncryptionConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    pub embedding: EmbeddingConfig,
    pub chat: ChatConfig,
    pub prompt: PromptConfig,
    #[serde(default)]
    pub conversations: ConversationsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Path to the persisted vector store JSON file, e.g. `data/vectorstore.json`.
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DocumentsConfig {
    /// Explicit source locations (paths or http(s) URLs). Wins over `dir`.
    #[serde(default)]
    pub sources: Vec<String>,
    /// Base directory scanned recursively by extension when `sources` is empty.
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default = "default_max_tokens")]
    pub chunk_max_tokens: usize,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            dir: None,
            chunk_max_tokens: default_max_tokens(),
        }
    }
}

fn default_max_tokens() -> usize {
    800
}

#[derive(Debug, Deserialize, Clone)]
pub struct EncryptionConfig {
    /// Encrypt chunk text at rest. Default: true.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Base64-encoded 32-byte AES-256 key. Falls back to the
    /// `SITECHAT_ENC_KEY` environment variable when absent.
    #[serde(default)]
    pub key_base64: Option<String>,
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            key_base64: None,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Per-variant similarity search depth and the merged result cap.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    40
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    pub model: String,
    pub dims: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    pub model: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_chat_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_chat_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct PromptConfig {
    /// Template text file with `{input}` and `{documents}` placeholders.
    pub template_path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConversationsConfig {
    /// Default idle gap (minutes) that splits conversations.
    #[serde(default = "default_gap_minutes")]
    pub default_gap_minutes: i64,
    /// JSONL audit log location used by the CLI.
    #[serde(default = "default_audit_log_path")]
    pub audit_log_path: PathBuf,
}

impl Default for ConversationsConfig {
    fn default() -> Self {
        Self {
            default_gap_minutes: default_gap_minutes(),
            audit_log_path: default_audit_log_path(),
        }
    }
}

fn default_gap_minutes() -> i64 {
    20
}

fn default_audit_log_path() -> PathBuf {
    PathBuf::from("data/audit.jsonl")
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.documents.chunk_max_tokens == 0 {
        anyhow::bail!("documents.chunk_max_tokens must be > 0");
    }

    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }

    if config.embedding.model.is_empty() {
        anyhow::bail!("embedding.model must be specified");
    }
    if config.embedding.dims == 0 {
        anyhow::bail!("embedding.dims must be > 0");
    }

    if config.chat.model.is_empty() {
        anyhow::bail!("chat.model must be specified");
    }

    if !(0..=1440).contains(&config.conversations.default_gap_minutes) {
        anyhow::bail!("conversations.default_gap_minutes must be between 0 and 1440");
    }

    Ok(config)
}
