use chrono::{DateTime, Utc};
use ensemble_core::{EnsembleResult, Task, TaskResult};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Result cache tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of entries held before LRU eviction kicks in.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Entry lifetime; expired entries read as misses and are deleted.
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: u64,
    /// Disables the cache entirely when false.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_capacity() -> usize {
    100
}

fn default_ttl_ms() -> u64 {
    3_600_000
}

fn default_enabled() -> bool {
    true
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            ttl_ms: default_ttl_ms(),
            enabled: default_enabled(),
        }
    }
}

/// Derive the cache key for a task's semantic identity.
///
/// Two tasks with the same category, description, and dependency set map to
/// the same key regardless of their ids.
pub fn cache_key(task: &Task) -> String {
    let mut deps = task.dependencies.clone();
    deps.sort_unstable();

    let mut hasher = Sha256::new();
    hasher.update(task.category.to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(task.description.as_bytes());
    hasher.update(b"|");
    hasher.update(deps.join(",").as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    result: TaskResult,
    stored_at: DateTime<Utc>,
    last_access: DateTime<Utc>,
}

/// Bounded LRU cache mapping task semantic identity to a prior result.
///
/// One mutex guards the map and its access-time index; get/put are safe
/// under concurrent intra-stage execution.
pub struct ResultCache {
    capacity: usize,
    ttl_ms: u64,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ResultCache {
    /// Create an empty cache with the given tuning.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            capacity: config.capacity.max(1),
            ttl_ms: config.ttl_ms,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn expired(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(entry.stored_at)
            > chrono::Duration::milliseconds(self.ttl_ms as i64)
    }

    /// Look up a prior result for this task. Reading an expired entry
    /// deletes it and misses.
    pub fn get(&self, task: &Task) -> Option<TaskResult> {
        let key = cache_key(task);
        let now = Utc::now();
        let mut entries = self.entries.lock();

        match entries.get_mut(&key) {
            None => None,
            Some(entry) if self.expired(entry, now) => {
                entries.remove(&key);
                None
            }
            Some(entry) => {
                entry.last_access = now;
                Some(entry.result.clone())
            }
        }
    }

    /// Store a result under the task's semantic identity, evicting the
    /// least-recently-accessed entry if the cache is full.
    pub fn put(&self, task: &Task, result: &TaskResult) {
        let key = cache_key(task);
        let now = Utc::now();
        let mut entries = self.entries.lock();

        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            let lru = entries
                .iter()
                .min_by_key(|(_, e)| e.last_access)
                .map(|(k, _)| k.clone());
            if let Some(lru_key) = lru {
                debug!(key = %lru_key, "evicting least-recently-used cache entry");
                entries.remove(&lru_key);
            }
        }

        entries.insert(
            key,
            CacheEntry {
                result: result.clone(),
                stored_at: now,
                last_access: now,
            },
        );
    }

    /// Number of live entries (including not-yet-collected expired ones).
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Persist unexpired entries as JSON, for reuse across process restarts.
    pub async fn save(&self, path: impl AsRef<Path>) -> EnsembleResult<()> {
        let snapshot: HashMap<String, CacheEntry> = {
            let now = Utc::now();
            let entries = self.entries.lock();
            entries
                .iter()
                .filter(|(_, e)| !self.expired(e, now))
                .map(|(k, e)| (k.clone(), e.clone()))
                .collect()
        };

        if let Some(parent) = path.as_ref().parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(&snapshot)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Load a previously saved cache, dropping entries that expired while
    /// the process was down and trimming to capacity by access time.
    pub async fn load(config: &CacheConfig, path: impl AsRef<Path>) -> EnsembleResult<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let saved: HashMap<String, CacheEntry> = serde_json::from_str(&content)?;

        let cache = Self::new(config);
        let now = Utc::now();
        {
            let mut entries = cache.entries.lock();
            let mut live: Vec<(String, CacheEntry)> = saved
                .into_iter()
                .filter(|(_, e)| !cache.expired(e, now))
                .collect();
            // Keep the most recently accessed entries when over capacity.
            live.sort_by_key(|(_, e)| std::cmp::Reverse(e.last_access));
            live.truncate(cache.capacity);
            entries.extend(live);
        }
        Ok(cache)
    }
}
