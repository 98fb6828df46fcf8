//! Daily AI request quota, persisted in a small key/value store.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::{PromptError, Result};

/// Default number of AI requests allowed per local calendar day.
pub const DAILY_LIMIT: u32 = 100;

const DATE_KEY: &str = "ai_usage_date";
const USAGE_KEY: &str = "ai_usage";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// String key/value persistence for usage counters.
pub trait UsageStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// In-memory store, lost on exit.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryUsageStore {
    values: BTreeMap<String, String>,
}

#[cfg(test)]
impl MemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl UsageStore for MemoryUsageStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON object on disk.
///
/// Every read goes back to the file so that several processes sharing one
/// usage file see each other's requests. The whole file is rewritten on
/// every set.
#[derive(Debug)]
pub struct FileUsageStore {
    path: PathBuf,
}

impl FileUsageStore {
    /// Open the store at `path`. A missing file starts empty; an unreadable
    /// one is logged and replaced on the next write.
    pub fn open(path: &Path) -> Result<Self> {
        load(path)?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

fn load(path: &Path) -> Result<BTreeMap<String, String>> {
    match fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(values) => Ok(values),
            Err(e) => {
                warn!(path = ?path, error = %e, "usage_file_unreadable");
                Ok(BTreeMap::new())
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(e) => Err(e.into()),
    }
}

impl UsageStore for FileUsageStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(load(&self.path)?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut values = load(&self.path)?;
        values.insert(key.to_string(), value.to_string());
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&values)?)?;
        Ok(())
    }
}

/// Snapshot of today's usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaStatus {
    pub used: u32,
    pub limit: u32,
    pub remaining: u32,
}

/// Per-day request counter.
pub struct QuotaTracker {
    store: Box<dyn UsageStore>,
    clock: Arc<dyn Clock>,
    limit: u32,
}

impl QuotaTracker {
    pub fn new(store: Box<dyn UsageStore>, clock: Arc<dyn Clock>, limit: u32) -> Self {
        Self {
            store,
            clock,
            limit,
        }
    }

    fn today(&self) -> String {
        self.clock.today().format(DATE_FORMAT).to_string()
    }

    /// Requests used today. A stored date other than today counts as zero.
    fn used_today(&self) -> Result<u32> {
        let today = self.today();
        if self.store.get(DATE_KEY)?.as_deref() != Some(today.as_str()) {
            return Ok(0);
        }
        Ok(self
            .store
            .get(USAGE_KEY)?
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0))
    }

    /// Count one request against today's quota. Returns the new count.
    ///
    /// Fails with `QuotaExceeded` without touching the counter once the
    /// limit is reached.
    pub fn try_consume(&mut self) -> Result<u32> {
        let today = self.today();
        if self.store.get(DATE_KEY)?.as_deref() != Some(today.as_str()) {
            debug!(date = %today, "quota_day_rollover");
            self.store.set(DATE_KEY, &today)?;
            self.store.set(USAGE_KEY, "0")?;
        }

        let used = self.used_today()?;
        if used >= self.limit {
            info!(used, limit = self.limit, "quota_exceeded");
            return Err(PromptError::QuotaExceeded { limit: self.limit });
        }

        let used = used + 1;
        self.store.set(USAGE_KEY, &used.to_string())?;
        debug!(used, limit = self.limit, "quota_consumed");
        Ok(used)
    }

    /// Read today's usage without modifying anything.
    pub fn status(&self) -> Result<QuotaStatus> {
        let used = self.used_today()?;
        Ok(QuotaStatus {
            used,
            limit: self.limit,
            remaining: self.limit.saturating_sub(used),
        })
    }
}
