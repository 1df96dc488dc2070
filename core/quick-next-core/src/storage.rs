//! Key-value storage capability and position persistence.
//!
//! The page runs against whichever storage the host offers. That choice is
//! made once, at startup, by [`StorageProvider::select`]; afterwards the engine
//! only sees the [`KeyValueStorage`] interface.
//!
//! ## Degradation
//!
//! - No storage in this context: positions fall back to the anchored default
//!   and writes are skipped.
//! - Unreadable or malformed stored value: logged, default used.
//!
//! ## Atomic Writes
//!
//! [`JsonFileStorage`] writes through a temp file + rename so a crash never
//! leaves a half-written store behind.

use fs_err as fs;
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

use crate::error::{QuickNextError, Result};
use crate::types::Position;

/// The `{get, set}` capability the engine persists through.
pub trait KeyValueStorage {
    /// Short name for logs (e.g. "memory", "file").
    fn name(&self) -> &'static str;

    /// Returns `Ok(None)` when the key has never been written.
    fn get(&self, key: &str) -> Result<Option<Value>>;

    fn set(&self, key: &str, value: Value) -> Result<()>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// Providers
// ═══════════════════════════════════════════════════════════════════════════════

/// In-memory store. Clones share the same map, so a test can keep a handle
/// while the engine owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    values: Rc<RefCell<HashMap<String, Value>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.values.borrow().clone()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        self.values.borrow_mut().insert(key.to_string(), value);
        Ok(())
    }
}

/// A single JSON object on disk, one entry per key.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_all(&self) -> Result<Map<String, Value>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(err) => {
                return Err(QuickNextError::StorageIo {
                    path: self.path.clone(),
                    source: err,
                })
            }
        };

        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        serde_json::from_str(&content).map_err(|source| QuickNextError::Json {
            context: format!("reading {}", self.path.display()),
            source,
        })
    }

    fn write_all(&self, values: &Map<String, Value>) -> Result<()> {
        let io_err = |source| QuickNextError::StorageIo {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let payload = serde_json::to_vec_pretty(values).map_err(|source| QuickNextError::Json {
            context: "serializing storage".to_string(),
            source,
        })?;
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, payload).map_err(io_err)?;
        fs::rename(&tmp_path, &self.path).map_err(io_err)?;
        Ok(())
    }
}

impl KeyValueStorage for JsonFileStorage {
    fn name(&self) -> &'static str {
        "file"
    }

    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.read_all()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        // A corrupt file is replaced rather than blocking every future save.
        let mut values = self.read_all().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "Discarding unreadable storage file");
            Map::new()
        });
        values.insert(key.to_string(), value);
        self.write_all(&values)
    }
}

/// Stand-in when the execution context exposes no storage at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableStorage;

impl KeyValueStorage for UnavailableStorage {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn get(&self, _key: &str) -> Result<Option<Value>> {
        Err(QuickNextError::StorageUnavailable)
    }

    fn set(&self, _key: &str, _value: Value) -> Result<()> {
        Err(QuickNextError::StorageUnavailable)
    }
}

/// Which storage backend the runtime offers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageProvider {
    Memory,
    File(PathBuf),
    Unavailable,
}

impl StorageProvider {
    /// Picks a backend once. An explicit path wins, then the platform data
    /// directory; with neither, storage is unavailable.
    pub fn select(explicit_path: Option<PathBuf>) -> Self {
        match explicit_path.or_else(crate::config::get_storage_path) {
            Some(path) => Self::File(path),
            None => Self::Unavailable,
        }
    }

    pub fn open(self) -> Box<dyn KeyValueStorage> {
        match self {
            Self::Memory => Box::new(MemoryStorage::new()),
            Self::File(path) => Box::new(JsonFileStorage::new(path)),
            Self::Unavailable => Box::new(UnavailableStorage),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Position Store
// ═══════════════════════════════════════════════════════════════════════════════

/// Reads and writes the control's [`Position`] under a single key.
pub struct PositionStore {
    storage: Box<dyn KeyValueStorage>,
    key: String,
    default: Position,
}

impl PositionStore {
    pub fn new(storage: Box<dyn KeyValueStorage>, key: impl Into<String>, default: Position) -> Self {
        Self {
            storage,
            key: key.into(),
            default,
        }
    }

    pub fn default_position(&self) -> Position {
        self.default
    }

    /// Last saved position, or the default when nothing usable is stored.
    pub fn load(&self) -> Position {
        match self.storage.get(&self.key) {
            Ok(Some(value)) => match serde_json::from_value::<Position>(value) {
                Ok(position) => position,
                Err(err) => {
                    tracing::warn!(error = %err, key = %self.key, "Stored position malformed; using default");
                    self.default
                }
            },
            Ok(None) => self.default,
            Err(QuickNextError::StorageUnavailable) => {
                tracing::debug!("Storage unavailable; using default position");
                self.default
            }
            Err(err) => {
                tracing::warn!(error = %err, backend = self.storage.name(), "Failed to load position");
                self.default
            }
        }
    }

    pub fn save(&self, position: &Position) -> Result<()> {
        let value = serde_json::to_value(position).map_err(|source| QuickNextError::Json {
            context: "serializing position".to_string(),
            source,
        })?;
        self.storage.set(&self.key, value)
    }

    /// Fire-and-forget save: failures are logged, never returned.
    pub fn save_detached(&self, position: &Position) {
        match self.save(position) {
            Ok(()) => tracing::debug!(?position, "Position saved"),
            Err(QuickNextError::StorageUnavailable) => {
                tracing::debug!("Storage unavailable; position not persisted")
            }
            Err(err) => {
                tracing::warn!(error = %err, backend = self.storage.name(), "Failed to save position")
            }
        }
    }

    /// Writes the anchored default back, undoing any pinned position.
    pub fn reset(&self) -> Result<Position> {
        self.save(&self.default)?;
        Ok(self.default)
    }
}
