//! Source discovery for ingestion.
//!
//! Resolution precedence:
//! 1. an explicit `documents.sources` list wins outright,
//! 2. otherwise the vector store's own directory is scanned (non-recursive)
//!    for seed files, so a fresh store can be re-seeded from its output
//!    directory,
//! 3. otherwise `documents.dir` is scanned recursively per extension.
//!
//! Remote `http(s)` sources are downloaded to local temporary storage before
//! parsing, with the extension inferred from the URL path or the declared
//! content type. A candidate that fails to resolve is logged and skipped;
//! an empty result set is non-fatal and yields an empty store.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::config::Config;

/// Fixed extension allow-list for discovery.
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "pdf", "docx", "doc", "txt", "md", "png", "jpg", "jpeg", "gif", "bmp", "tiff", "webp", "svg",
];

/// Image extensions within the allow-list; these get `content_type = "image"`.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "tiff", "webp", "svg"];

/// A resolvable source document, materialized to a local path.
#[derive(Debug, Clone)]
pub struct ResolvedSource {
    /// Original location as configured (path or URL); recorded as `source`
    /// metadata on every chunk.
    pub location: String,
    /// Local file to parse (the location itself, or a temp download).
    pub path: PathBuf,
    pub filename: String,
    /// Lowercased extension.
    pub extension: String,
}

/// Discover the ordered, deduplicated set of ingestible sources.
pub async fn resolve_sources(config: &Config) -> Result<Vec<ResolvedSource>> {
    let candidates: Vec<String> = if !config.documents.sources.is_empty() {
        config.documents.sources.clone()
    } else {
        let seed_dir = config
            .store
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf);
        let seeds = seed_dir.as_deref().map(scan_seed_dir).unwrap_or_default();
        if !seeds.is_empty() {
            debug!(count = seeds.len(), "using seed files from store directory");
            seeds
        } else if let Some(dir) = &config.documents.dir {
            scan_dir_recursive(dir)
        } else {
            warn!("no document sources configured; the store will be empty");
            Vec::new()
        }
    };

    let mut seen = HashSet::new();
    let mut resolved = Vec::new();
    for location in candidates {
        if !seen.insert(location.clone()) {
            continue;
        }
        match resolve_one(&location).await {
            Ok(source) => resolved.push(source),
            Err(e) => warn!(source = %location, error = %e, "skipping unresolvable source"),
        }
    }
    Ok(resolved)
}

/// Non-recursive scan of the store's output directory for seed files.
fn scan_seed_dir(dir: &Path) -> Vec<String> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };
    let mut found: Vec<String> = entries
        .flatten()
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.path())
        .filter(|p| has_allowed_extension(p))
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
    found.sort();
    found
}

/// Recursive scan of the configured base directory, per extension.
fn scan_dir_recursive(dir: &Path) -> Vec<String> {
    if !dir.exists() {
        warn!(dir = %dir.display(), "documents directory does not exist");
        return Vec::new();
    }
    let mut found: Vec<String> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .filter(|p| has_allowed_extension(p))
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
    // Sort for deterministic ordering
    found.sort();
    found
}

fn has_allowed_extension(path: &Path) -> bool {
    extension_of(path)
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().to_lowercase())
}

async fn resolve_one(location: &str) -> Result<ResolvedSource> {
    if location.starts_with("http://") || location.starts_with("https://") {
        return materialize_remote(location).await;
    }

    let path = PathBuf::from(location);
    if !path.is_file() {
        anyhow::bail!("not a readable file: {}", location);
    }
    let extension =
        extension_of(&path).ok_or_else(|| anyhow::anyhow!("missing extension: {}", location))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| location.to_string());
    Ok(ResolvedSource {
        location: location.to_string(),
        path,
        filename,
        extension,
    })
}

/// Download a remote source to a temp file so the parsers can work on a path.
async fn materialize_remote(url: &str) -> Result<ResolvedSource> {
    let response = reqwest::get(url)
        .await
        .with_context(|| format!("failed to fetch {}", url))?
        .error_for_status()
        .with_context(|| format!("failed to fetch {}", url))?;

    let url_path = response.url().path().to_string();
    let filename = url_path
        .rsplit('/')
        .next()
        .filter(|n| !n.is_empty())
        .unwrap_or("download")
        .to_string();

    let extension = Path::new(&filename)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .or_else(|| {
            response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .and_then(extension_from_content_type)
                .map(str::to_string)
        })
        .ok_or_else(|| anyhow::anyhow!("cannot infer document type for {}", url))?;

    let bytes = response.bytes().await?;
    let tmp_path = std::env::temp_dir().join(format!("sitechat-{}.{}", Uuid::new_v4(), extension));
    tokio::fs::write(&tmp_path, &bytes)
        .await
        .with_context(|| format!("failed to write {}", tmp_path.display()))?;

    Ok(ResolvedSource {
        location: url.to_string(),
        path: tmp_path,
        filename,
        extension,
    })
}

fn extension_from_content_type(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next().unwrap_or("").trim();
    match essence {
        "application/pdf" => Some("pdf"),
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => Some("docx"),
        "text/markdown" => Some("md"),
        "text/plain" => Some("txt"),
        "image/png" => Some("png"),
        "image/jpeg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/svg+xml" => Some("svg"),
        _ => None,
    }
}
