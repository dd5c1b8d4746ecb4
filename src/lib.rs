//! # sitechat
//!
//! The RAG core behind a personal-site chatbot.
//!
//! sitechat ingests a small corpus of documents, turns them into searchable
//! embedded chunks (optionally encrypted at rest), answers natural-language
//! questions by retrieving relevant chunks and prompting a language model,
//! and reconstructs conversations from a flat audit log of
//! requests/responses.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────────────┐   ┌─────────────┐
//! │ Resolver │──▶│ Ingest                 │──▶│ VectorStore │
//! │ fs/http  │   │ extract+split+encrypt │   │  JSON file  │
//! └──────────┘   └───────────────────────┘   └──────┬──────┘
//!                                                   │
//!                 ┌─────────────────────────────────┤
//!                 ▼                                 ▼
//!          ┌─────────────┐                  ┌──────────────┐
//!          │ expand +    │                  │ conversation │
//!          │ answer      │                  │ segmentation │
//!          └─────────────┘                  └──────────────┘
//! ```
//!
//! The store is built once at startup (or loaded verbatim from its file)
//! and read-only afterwards; question answering runs per request; the
//! conversation segmenter runs over an audit-log snapshot on demand.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`crypto`] | AES-256-GCM codec for chunk text at rest |
//! | [`resolve`] | Source document discovery |
//! | [`extract`] | Text extraction (pdf, docx, txt, md) |
//! | [`chunk`] | Bounded-size text splitting |
//! | [`ingest`] | Per-source ingestion with failure containment |
//! | [`embedding`] | Embedding capability + OpenAI implementation |
//! | [`chat`] | Chat-completion capability + OpenAI implementation |
//! | [`store`] | File-persisted in-memory vector store |
//! | [`expand`] | Multilingual query expansion |
//! | [`answer`] | Retrieval merge, decryption, prompt assembly |
//! | [`audit`] | Append-only request/response log |
//! | [`conversation`] | Idle-gap conversation segmentation |
//! | [`pipeline`] | Store lifecycle (load-or-build) |

pub mod answer;
pub mod audit;
pub mod chat;
pub mod chunk;
pub mod config;
pub mod conversation;
pub mod crypto;
pub mod embedding;
pub mod expand;
pub mod extract;
pub mod ingest;
pub mod models;
pub mod pipeline;
pub mod resolve;
pub mod store;
