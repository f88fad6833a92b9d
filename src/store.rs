//! Persisted ticket state over an opaque string-keyed store.
//!
//! Four keys: the ticket array, the topic summary, and the two prompt
//! templates. Loads are best-effort: a corrupt value is preserved with a
//! warning and treated as absent, so bad persisted state never blocks a fresh
//! fetch. Writes go through `persist()` explicitly; the batch runner calls it
//! once per completed batch.

use crate::error::Error;
use crate::llm::prompts::{DEFAULT_AGGREGATION_PROMPT, DEFAULT_CLASSIFICATION_PROMPT};
use crate::ticket::{Ticket, TopicSummary};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const TICKETS_KEY: &str = "tickets";
const TOPIC_SUMMARY_KEY: &str = "topic_summary";
const CLASSIFICATION_PROMPT_KEY: &str = "classification_prompt";
const AGGREGATION_PROMPT_KEY: &str = "aggregation_prompt";

/// Opaque string-keyed persistence. The dashboard never needs more than
/// get/set/remove over whole values.
pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// File-per-key store rooted at a data directory.
pub struct FileKvStore {
    dir: PathBuf,
}

impl FileKvStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create data directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl KvStore for FileKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        // Write-then-rename so a crash mid-write cannot truncate the stored set.
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, value)
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("failed to replace {}", path.display()))?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("failed to remove {}", path.display())),
        }
    }
}

/// In-memory store for tests and dry runs.
#[derive(Default)]
pub struct MemoryKvStore {
    entries: HashMap<String, String>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Owner of the in-memory ticket set and its persisted form.
///
/// Lifecycle: `load → replace_all/mutate → persist → clear`. Only the
/// classification field of a stored ticket is ever mutated in place.
pub struct TicketStore<K: KvStore> {
    kv: K,
    tickets: Vec<Ticket>,
    batch_flag: Arc<AtomicBool>,
}

impl<K: KvStore> TicketStore<K> {
    /// Load the persisted ticket set, treating absent or corrupt state as empty.
    pub fn load(kv: K) -> Self {
        let tickets = match kv.get(TICKETS_KEY) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(tickets) => tickets,
                Err(err) => {
                    eprintln!(
                        "  Warning: stored tickets were corrupted ({}); starting empty.",
                        err
                    );
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                eprintln!("  Warning: could not read stored tickets: {}", err);
                Vec::new()
            }
        };
        Self {
            kv,
            tickets,
            batch_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Consume the store, handing back the underlying key-value backend.
    pub fn into_kv(self) -> K {
        self.kv
    }

    pub fn tickets(&self) -> &[Ticket] {
        &self.tickets
    }

    pub fn tickets_mut(&mut self) -> &mut [Ticket] {
        &mut self.tickets
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    /// Replace the whole stored set, discarding prior classifications.
    /// Used after a fresh fetch; does not persist on its own.
    pub fn replace_all(&mut self, tickets: Vec<Ticket>) {
        self.tickets = tickets;
    }

    /// Serialize the full ticket set to the backing store.
    pub fn persist(&mut self) -> Result<()> {
        let raw = serde_json::to_string(&self.tickets).context("failed to serialize tickets")?;
        self.kv.set(TICKETS_KEY, &raw)
    }

    /// Remove all tickets and the persisted topic summary.
    pub fn clear(&mut self) -> Result<()> {
        self.tickets.clear();
        self.kv.remove(TICKETS_KEY)?;
        self.kv.remove(TOPIC_SUMMARY_KEY)?;
        Ok(())
    }

    pub fn topic_summary(&self) -> Option<TopicSummary> {
        match self.kv.get(TOPIC_SUMMARY_KEY) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(summary) => Some(summary),
                Err(err) => {
                    eprintln!("  Warning: stored topic summary was corrupted ({})", err);
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                eprintln!("  Warning: could not read topic summary: {}", err);
                None
            }
        }
    }

    /// Replace the stored topic summary wholesale.
    pub fn save_topic_summary(&mut self, summary: &TopicSummary) -> Result<()> {
        let raw = serde_json::to_string(summary).context("failed to serialize topic summary")?;
        self.kv.set(TOPIC_SUMMARY_KEY, &raw)
    }

    pub fn classification_prompt(&self) -> String {
        self.prompt_or_default(CLASSIFICATION_PROMPT_KEY, DEFAULT_CLASSIFICATION_PROMPT)
    }

    pub fn aggregation_prompt(&self) -> String {
        self.prompt_or_default(AGGREGATION_PROMPT_KEY, DEFAULT_AGGREGATION_PROMPT)
    }

    pub fn set_classification_prompt(&mut self, template: &str) -> Result<()> {
        self.kv.set(CLASSIFICATION_PROMPT_KEY, template)
    }

    pub fn set_aggregation_prompt(&mut self, template: &str) -> Result<()> {
        self.kv.set(AGGREGATION_PROMPT_KEY, template)
    }

    /// Restore both prompt templates to the built-in defaults.
    pub fn reset_prompts(&mut self) -> Result<()> {
        self.kv.remove(CLASSIFICATION_PROMPT_KEY)?;
        self.kv.remove(AGGREGATION_PROMPT_KEY)?;
        Ok(())
    }

    fn prompt_or_default(&self, key: &str, default: &str) -> String {
        match self.kv.get(key) {
            Ok(Some(template)) if !template.trim().is_empty() => template,
            _ => default.to_string(),
        }
    }

    /// Claim the single batch slot for this store.
    ///
    /// Batches are serialized: a second caller gets `Error::BatchInProgress`
    /// instead of interleaving LLM calls against the same ticket set. The slot
    /// frees when the returned guard drops.
    pub fn begin_batch(&self) -> std::result::Result<BatchGuard, Error> {
        if self
            .batch_flag
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::BatchInProgress);
        }
        Ok(BatchGuard {
            flag: Arc::clone(&self.batch_flag),
        })
    }
}

/// RAII handle for the in-flight batch slot.
pub struct BatchGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
