//! # sitechat CLI
//!
//! Command-line front end for the sitechat RAG core. All commands accept a
//! `--config` flag pointing to a TOML configuration file; see
//! `config/sitechat.example.toml`.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `sitechat build` | Build the vector store (or confirm the persisted one loads) |
//! | `sitechat ask "<question>"` | Answer a question against the corpus |
//! | `sitechat conversations` | List conversations reconstructed from the audit log |
//! | `sitechat conversation <id>` | Show one conversation by its 1-based id |

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use sitechat::answer::{answer_question, PromptTemplate};
use sitechat::audit::{AuditLog, JsonlAuditLog};
use sitechat::chat::OpenAiChat;
use sitechat::config::load_config;
use sitechat::conversation::Segmenter;
use sitechat::embedding::OpenAiEmbedder;
use sitechat::pipeline::{answer_codec, init_store};

/// Questions longer than this are rejected before any model call.
const MAX_PROMPT_CHARS: usize = 3000;

#[derive(Parser)]
#[command(
    name = "sitechat",
    about = "RAG core for a personal-site chatbot",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/sitechat.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the vector store from configured documents.
    ///
    /// Loads the persisted store when its file already exists; otherwise
    /// resolves sources, ingests, embeds, and saves it once.
    Build,

    /// Ask a question against the indexed corpus.
    Ask {
        question: String,

        /// Requester identifier recorded on the audit log entries.
        #[arg(long)]
        requester_id: Option<String>,
    },

    /// List conversations reconstructed from the audit log.
    Conversations {
        /// Idle gap (minutes) that splits conversations.
        #[arg(long)]
        gap_minutes: Option<i64>,

        /// Only include entries for this requester.
        #[arg(long)]
        requester_id: Option<String>,
    },

    /// Show one conversation by its 1-based id.
    Conversation {
        id: i64,

        #[arg(long)]
        gap_minutes: Option<i64>,

        #[arg(long)]
        requester_id: Option<String>,
    },
}

fn gap_from_minutes(minutes: Option<i64>) -> Result<Option<chrono::Duration>> {
    match minutes {
        None => Ok(None),
        Some(m) if (0..=1440).contains(&m) => Ok(Some(chrono::Duration::minutes(m))),
        Some(m) => anyhow::bail!("gap minutes must be between 0 and 1440, got {}", m),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Build => {
            let embedder = OpenAiEmbedder::new(&config.embedding)?;
            let store = init_store(&config, &embedder).await?;
            println!("store ready: {} chunks", store.len());
        }

        Commands::Ask {
            question,
            requester_id,
        } => {
            if question.chars().count() > MAX_PROMPT_CHARS {
                anyhow::bail!("question too long (max {} characters)", MAX_PROMPT_CHARS);
            }

            let embedder = OpenAiEmbedder::new(&config.embedding)?;
            let chat = OpenAiChat::new(&config.chat)?;
            let store = init_store(&config, &embedder).await?;
            let codec = answer_codec(&config)?;
            let template = PromptTemplate::load(&config.prompt.template_path)?;

            let log = JsonlAuditLog::open(&config.conversations.audit_log_path)?;
            log.append("/ask", "POST", &question, requester_id.as_deref())?;

            let answer = answer_question(
                &question,
                &store,
                &embedder,
                &chat,
                codec.as_ref(),
                &template,
                config.retrieval.top_k,
            )
            .await?;

            log.append("/ask:response", "POST", &answer, requester_id.as_deref())?;
            println!("{}", answer);
        }

        Commands::Conversations {
            gap_minutes,
            requester_id,
        } => {
            let log = JsonlAuditLog::open(&config.conversations.audit_log_path)?;
            let segmenter = Segmenter::new(&log);
            let gap = gap_from_minutes(gap_minutes)?.unwrap_or_else(|| {
                chrono::Duration::minutes(config.conversations.default_gap_minutes)
            });
            let summaries = segmenter.list_conversations(Some(gap), requester_id.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }

        Commands::Conversation {
            id,
            gap_minutes,
            requester_id,
        } => {
            let log = JsonlAuditLog::open(&config.conversations.audit_log_path)?;
            let segmenter = Segmenter::new(&log);
            let gap = gap_from_minutes(gap_minutes)?.unwrap_or_else(|| {
                chrono::Duration::minutes(config.conversations.default_gap_minutes)
            });
            match segmenter.get_conversation(id, Some(gap), requester_id.as_deref())? {
                Some(conversation) => {
                    println!("{}", serde_json::to_string_pretty(&conversation)?)
                }
                None => println!("conversation {} not found", id),
            }
        }
    }

    Ok(())
}
