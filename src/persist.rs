use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::columns::PersistedColumnState;
use crate::core::{EngineError, Result};
use crate::filter::FilterSpec;
use crate::pipeline::PageSize;
use crate::sort::SortKey;

// ============================================================================
// SettingsStore - abstract namespaced key-value storage
// ============================================================================

/// Storage seam for persisted view state. Implementations are free to back
/// this with a settings file, a registry, a database table or anything else
/// that can hold bytes under a `(namespace, key)` pair.
pub trait SettingsStore {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>>;
    fn put(&self, namespace: &str, key: &str, value: &[u8]) -> Result<()>;
    fn remove(&self, namespace: &str, key: &str) -> Result<()>;
}

impl<S: SettingsStore + ?Sized> SettingsStore for &S {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).get(namespace, key)
    }

    fn put(&self, namespace: &str, key: &str, value: &[u8]) -> Result<()> {
        (**self).put(namespace, key, value)
    }

    fn remove(&self, namespace: &str, key: &str) -> Result<()> {
        (**self).remove(namespace, key)
    }
}

impl<S: SettingsStore + ?Sized> SettingsStore for Arc<S> {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).get(namespace, key)
    }

    fn put(&self, namespace: &str, key: &str, value: &[u8]) -> Result<()> {
        (**self).put(namespace, key, value)
    }

    fn remove(&self, namespace: &str, key: &str) -> Result<()> {
        (**self).remove(namespace, key)
    }
}

impl<S: SettingsStore + ?Sized> SettingsStore for Box<S> {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).get(namespace, key)
    }

    fn put(&self, namespace: &str, key: &str, value: &[u8]) -> Result<()> {
        (**self).put(namespace, key, value)
    }

    fn remove(&self, namespace: &str, key: &str) -> Result<()> {
        (**self).remove(namespace, key)
    }
}

// ============================================================================
// MemoryStore - ephemeral store for tests and throwaway profiles
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<(String, String), Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| EngineError::PersistenceRead("settings store mutex poisoned".into()))?;
        Ok(entries.get(&(namespace.to_string(), key.to_string())).cloned())
    }

    fn put(&self, namespace: &str, key: &str, value: &[u8]) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| EngineError::PersistenceWrite("settings store mutex poisoned".into()))?;
        entries.insert((namespace.to_string(), key.to_string()), value.to_vec());
        Ok(())
    }

    fn remove(&self, namespace: &str, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| EngineError::PersistenceWrite("settings store mutex poisoned".into()))?;
        entries.remove(&(namespace.to_string(), key.to_string()));
        Ok(())
    }
}

// ============================================================================
// FileStore - single settings file, write-through
// ============================================================================

/// All namespaces live in one MessagePack-encoded file. Every `put`/`remove`
/// rewrites it through a temp file and rename, so readers never observe a
/// half-written store.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, BTreeMap<String, Vec<u8>>>>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let bytes = std::fs::read(&path).map_err(|e| {
                EngineError::PersistenceRead(format!("read {}: {}", path.display(), e))
            })?;
            rmp_serde::from_slice(&bytes).map_err(|e| {
                EngineError::PersistenceRead(format!("decode {}: {}", path.display(), e))
            })?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, BTreeMap<String, Vec<u8>>>) -> Result<()> {
        let bytes = rmp_serde::to_vec(entries).map_err(|e| {
            EngineError::PersistenceWrite(format!("encode {}: {}", self.path.display(), e))
        })?;

        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(parent).map_err(|e| {
            EngineError::PersistenceWrite(format!("create temp file in {}: {}", parent.display(), e))
        })?;
        tmp.write_all(&bytes).map_err(|e| {
            EngineError::PersistenceWrite(format!("write {}: {}", self.path.display(), e))
        })?;
        tmp.persist(&self.path).map_err(|e| {
            EngineError::PersistenceWrite(format!("replace {}: {}", self.path.display(), e))
        })?;
        Ok(())
    }
}

impl SettingsStore for FileStore {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| EngineError::PersistenceRead("settings store mutex poisoned".into()))?;
        Ok(entries
            .get(namespace)
            .and_then(|bucket| bucket.get(key))
            .cloned())
    }

    fn put(&self, namespace: &str, key: &str, value: &[u8]) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| EngineError::PersistenceWrite("settings store mutex poisoned".into()))?;
        entries
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value.to_vec());
        self.persist(&entries)
    }

    fn remove(&self, namespace: &str, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| EngineError::PersistenceWrite("settings store mutex poisoned".into()))?;
        if let Some(bucket) = entries.get_mut(namespace) {
            bucket.remove(key);
            if bucket.is_empty() {
                entries.remove(namespace);
            }
        }
        self.persist(&entries)
    }
}

// ============================================================================
// PersistedTableState - versioned snapshot of one table's view state
// ============================================================================

pub const STATE_VERSION: u32 = 1;

const STATE_KEY: &str = "state";

fn table_namespace(table_id: &str) -> String {
    format!("table:{}", table_id)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedTableState {
    pub version: u32,
    #[serde(default)]
    pub columns: BTreeMap<String, PersistedColumnState>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub filters: BTreeMap<String, FilterSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort_keys: Vec<SortKey>,
    #[serde(default)]
    pub page_size: PageSize,
}

impl PersistedTableState {
    pub fn new() -> Self {
        Self {
            version: STATE_VERSION,
            columns: BTreeMap::new(),
            filters: BTreeMap::new(),
            sort_keys: Vec::new(),
            page_size: PageSize::DEFAULT,
        }
    }
}

impl Default for PersistedTableState {
    fn default() -> Self {
        Self::new()
    }
}

/// Peeked before the full decode so foreign-version payloads can be skipped
/// without tripping over their layout.
#[derive(Debug, Deserialize)]
struct VersionProbe {
    #[serde(default)]
    version: u32,
}

// ============================================================================
// TableStateStore - JSON state blobs under table:<id> namespaces
// ============================================================================

#[derive(Debug, Clone)]
pub struct TableStateStore<S> {
    store: S,
}

impl<S: SettingsStore> TableStateStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn save(&self, table_id: &str, state: &PersistedTableState) -> Result<()> {
        let bytes = serde_json::to_vec(state).map_err(|e| {
            EngineError::PersistenceWrite(format!("encode state for '{}': {}", table_id, e))
        })?;
        self.store.put(&table_namespace(table_id), STATE_KEY, &bytes)?;
        debug!(table = %table_id, "table state saved");
        Ok(())
    }

    /// Reads the saved state for a table. Corrupt and foreign-version
    /// payloads are reported as absent after a warning; only store failures
    /// surface as errors.
    pub fn load(&self, table_id: &str) -> Result<Option<PersistedTableState>> {
        let namespace = table_namespace(table_id);
        let Some(bytes) = self.store.get(&namespace, STATE_KEY)? else {
            return Ok(None);
        };

        let probe: VersionProbe = match serde_json::from_slice(&bytes) {
            Ok(probe) => probe,
            Err(e) => {
                warn!(table = %table_id, error = %e, "discarding unreadable table state");
                return Ok(None);
            }
        };
        if probe.version != STATE_VERSION {
            warn!(
                table = %table_id,
                found = probe.version,
                supported = STATE_VERSION,
                "discarding table state with unsupported version"
            );
            return Ok(None);
        }

        match serde_json::from_slice(&bytes) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                warn!(table = %table_id, error = %e, "discarding unreadable table state");
                Ok(None)
            }
        }
    }

    pub fn clear(&self, table_id: &str) -> Result<()> {
        self.store.remove(&table_namespace(table_id), STATE_KEY)
    }
}
