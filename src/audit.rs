//! Append-only audit log of requests and responses.
//!
//! The segmenter only needs two read patterns: "all entries ascending by
//! time" and "all entries for requester X ascending by time". Writes are
//! one append per request and one per response; appends must be safe under
//! concurrency but need no ordering beyond `created_at` reflecting
//! wall-clock order.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, RwLock};

use anyhow::{Context, Result};
use chrono::Utc;

use crate::models::AuditLogEntry;

pub trait AuditLog: Send + Sync {
    /// Append one entry, assigning a monotonic id and the current time.
    fn append(
        &self,
        path: &str,
        method: &str,
        payload: &str,
        requester_id: Option<&str>,
    ) -> Result<AuditLogEntry>;

    /// All entries, ascending by creation time.
    fn all_ascending(&self) -> Result<Vec<AuditLogEntry>>;

    /// Entries for one requester, ascending by creation time.
    fn by_requester_ascending(&self, requester_id: &str) -> Result<Vec<AuditLogEntry>>;
}

fn make_entry(
    id: i64,
    path: &str,
    method: &str,
    payload: &str,
    requester_id: Option<&str>,
) -> AuditLogEntry {
    AuditLogEntry {
        id,
        path: path.to_string(),
        method: method.to_string(),
        payload: payload.to_string(),
        requester_id: requester_id.map(str::to_string),
        created_at: Utc::now(),
    }
}

/// In-memory audit log for tests and embedding in other processes.
pub struct MemoryAuditLog {
    entries: RwLock<Vec<AuditLogEntry>>,
    next_id: AtomicI64,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Insert a fully specified entry, used by tests that need fixed
    /// timestamps. Entries must be pushed in ascending time order.
    pub fn push_raw(&self, entry: AuditLogEntry) {
        self.entries.write().unwrap().push(entry);
    }
}

impl Default for MemoryAuditLog {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditLog for MemoryAuditLog {
    fn append(
        &self,
        path: &str,
        method: &str,
        payload: &str,
        requester_id: Option<&str>,
    ) -> Result<AuditLogEntry> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let entry = make_entry(id, path, method, payload, requester_id);
        self.entries.write().unwrap().push(entry.clone());
        Ok(entry)
    }

    fn all_ascending(&self) -> Result<Vec<AuditLogEntry>> {
        Ok(self.entries.read().unwrap().clone())
    }

    fn by_requester_ascending(&self, requester_id: &str) -> Result<Vec<AuditLogEntry>> {
        Ok(self
            .entries
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.requester_id.as_deref() == Some(requester_id))
            .cloned()
            .collect())
    }
}

/// JSON-lines audit log: one serialized entry per line, append-only.
pub struct JsonlAuditLog {
    path: PathBuf,
    write_lock: Mutex<()>,
    next_id: AtomicI64,
}

impl JsonlAuditLog {
    /// Open (or create) the log file, resuming the id sequence from the
    /// highest id already present.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        let max_id = if path.exists() {
            read_entries(path)?.iter().map(|e| e.id).max().unwrap_or(0)
        } else {
            0
        };
        Ok(Self {
            path: path.to_path_buf(),
            write_lock: Mutex::new(()),
            next_id: AtomicI64::new(max_id + 1),
        })
    }
}

fn read_entries(path: &Path) -> Result<Vec<AuditLogEntry>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open audit log {}", path.display()))?;
    let mut entries = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: AuditLogEntry = serde_json::from_str(&line)
            .with_context(|| format!("malformed audit log line in {}", path.display()))?;
        entries.push(entry);
    }
    // Append order is creation order, but sort defensively on read
    entries.sort_by_key(|e| (e.created_at, e.id));
    Ok(entries)
}

impl AuditLog for JsonlAuditLog {
    fn append(
        &self,
        path: &str,
        method: &str,
        payload: &str,
        requester_id: Option<&str>,
    ) -> Result<AuditLogEntry> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let entry = make_entry(id, path, method, payload, requester_id);
        let line = serde_json::to_string(&entry)?;

        let _guard = self.write_lock.lock().unwrap();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open audit log {}", self.path.display()))?;
        writeln!(file, "{}", line)?;
        Ok(entry)
    }

    fn all_ascending(&self) -> Result<Vec<AuditLogEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        read_entries(&self.path)
    }

    fn by_requester_ascending(&self, requester_id: &str) -> Result<Vec<AuditLogEntry>> {
        Ok(self
            .all_ascending()?
            .into_iter()
            .filter(|e| e.requester_id.as_deref() == Some(requester_id))
            .collect())
    }
}
