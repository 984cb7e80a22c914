//! ConfigStore - observable TOML settings shared by the host and extensions
//!
//! Keys are dotted paths into a TOML table (`extensions.enabled`,
//! `extensions.rockbox_coverart.convert_size`). Observers are notified
//! synchronously after a value actually changes, with every internal lock
//! released, so an observer may write back into the store.

use serde::{Serialize, de::DeserializeOwned};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use toml::{Table, Value};

use crate::error::ExtensionError;

/// Top-level table holding all extension settings
pub const EXTENSIONS_NAMESPACE: &str = "extensions";

/// Key holding the names of the extensions the user enabled
pub const ENABLED_KEY: &str = "extensions.enabled";

/// A change notification delivered to observers
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigChange {
    /// Dotted key that changed
    pub key: String,
    /// Previous value (`None` if the key did not exist)
    pub old_value: Option<Value>,
    /// New value
    pub new_value: Option<Value>,
}

/// Callback invoked on every configuration change
pub type Observer = Arc<dyn Fn(&ConfigChange) + Send + Sync>;

/// Handle returned by [`ConfigStore::add_observer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Observable settings tree. Cloning yields another handle to the same store.
#[derive(Clone, Default)]
pub struct ConfigStore {
    inner: Arc<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    values: RwLock<Table>,
    observers: Mutex<Vec<(ObserverId, Observer)>>,
    next_observer: AtomicU64,
    dirty: AtomicBool,
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("values", &self.snapshot())
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

impl ConfigStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the given values
    pub fn from_table(values: Table) -> Self {
        let store = Self::new();
        *store.write_values() = values;
        store
    }

    /// Load settings from a TOML file. A missing file yields an empty store.
    pub fn load(path: &Path) -> Result<Self, ExtensionError> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)?;
        let values: Table =
            toml::from_str(&content).map_err(|e| ExtensionError::Config(e.to_string()))?;
        Ok(Self::from_table(values))
    }

    /// Save settings to a TOML file, creating parent directories as needed
    pub fn save(&self, path: &Path) -> Result<(), ExtensionError> {
        let content = toml::to_string_pretty(&self.snapshot())
            .map_err(|e| ExtensionError::Config(e.to_string()))?;

        if let Some(parent) = path.parent().filter(|p| !p.exists()) {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        self.mark_clean();
        Ok(())
    }

    /// Copy of the whole settings tree
    pub fn snapshot(&self) -> Table {
        self.read_values().clone()
    }

    /// Read a raw value by dotted key
    pub fn get(&self, key: &str) -> Option<Value> {
        lookup(&self.read_values(), key).cloned()
    }

    /// Read a typed value by dotted key
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| v.try_into().ok())
    }

    /// Write a typed value by dotted key, notifying observers on change
    pub fn set<T: Serialize>(&self, key: &str, value: T) -> Result<(), ExtensionError> {
        let value =
            Value::try_from(value).map_err(|e| ExtensionError::Config(e.to_string()))?;
        self.set_value(key, value)
    }

    /// Write a raw value by dotted key, notifying observers on change
    pub fn set_value(&self, key: &str, value: Value) -> Result<(), ExtensionError> {
        let old_value = {
            let mut values = self.write_values();
            let old_value = lookup(&values, key).cloned();
            if old_value.as_ref() == Some(&value) {
                return Ok(());
            }
            let parts: Vec<&str> = key.split('.').collect();
            insert_path(&mut values, &parts, value.clone())?;
            old_value
        };
        self.inner.dirty.store(true, Ordering::SeqCst);

        self.notify(&ConfigChange {
            key: key.to_string(),
            old_value,
            new_value: Some(value),
        });
        Ok(())
    }

    /// Merge default values into the tree without overriding existing ones.
    ///
    /// Defaults are not user changes: observers are not notified and the
    /// store does not become dirty.
    pub fn register_defaults(&self, defaults: &Table) {
        merge_defaults(&mut self.write_values(), defaults);
    }

    /// Scoped view rooted at a dotted key
    pub fn section(&self, path: impl Into<String>) -> ConfigSection {
        ConfigSection {
            store: self.clone(),
            path: path.into(),
        }
    }

    /// The settings section belonging to one extension
    pub fn extension_section(&self, name: &str) -> ConfigSection {
        self.section(format!("{}.{}", EXTENSIONS_NAMESPACE, name))
    }

    /// Names of the extensions the user enabled
    pub fn enabled_extensions(&self) -> Vec<String> {
        self.get_as(ENABLED_KEY).unwrap_or_default()
    }

    /// Replace the set of enabled extensions
    pub fn set_enabled_extensions(&self, names: Vec<String>) -> Result<(), ExtensionError> {
        self.set(ENABLED_KEY, names)
    }

    /// Register an observer; it stays registered until removed
    pub fn add_observer<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(&ConfigChange) + Send + Sync + 'static,
    {
        let id = ObserverId(self.inner.next_observer.fetch_add(1, Ordering::SeqCst));
        self.observers().push((id, Arc::new(observer)));
        id
    }

    /// Remove an observer, returning whether it was registered
    pub fn remove_observer(&self, id: ObserverId) -> bool {
        let mut observers = self.observers();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    /// Whether values changed since loading or saving
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.load(Ordering::SeqCst)
    }

    /// Mark the store as saved
    pub fn mark_clean(&self) {
        self.inner.dirty.store(false, Ordering::SeqCst);
    }

    fn notify(&self, change: &ConfigChange) {
        let observers: Vec<Observer> = self
            .observers()
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();
        for observer in observers {
            observer(change);
        }
    }

    fn read_values(&self) -> std::sync::RwLockReadGuard<'_, Table> {
        self.inner
            .values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_values(&self) -> std::sync::RwLockWriteGuard<'_, Table> {
        self.inner
            .values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn observers(&self) -> std::sync::MutexGuard<'_, Vec<(ObserverId, Observer)>> {
        self.inner
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// A view of the settings tree below one dotted key
#[derive(Debug, Clone)]
pub struct ConfigSection {
    store: ConfigStore,
    path: String,
}

impl ConfigSection {
    /// Dotted key this section is rooted at
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The store this section reads from
    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Read a value relative to the section
    ///
    /// # Example
    /// ```ignore
    /// let size: u32 = ctx.config().get("convert_size").unwrap_or(500);
    /// ```
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.store.get_as(&self.key(key))
    }

    /// Read a value relative to the section, with a fallback
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// Write a value relative to the section
    pub fn set<T: Serialize>(&self, key: &str, value: T) -> Result<(), ExtensionError> {
        self.store.set(&self.key(key), value)
    }

    /// Merge defaults below this section without overriding user values
    pub fn register_defaults(&self, defaults: &Table) {
        let mut nested = defaults.clone();
        for part in self.path.rsplit('.') {
            let mut parent = Table::new();
            parent.insert(part.to_string(), Value::Table(nested));
            nested = parent;
        }
        self.store.register_defaults(&nested);
    }

    /// Current contents of the section (empty if it does not exist)
    pub fn table(&self) -> Table {
        self.store
            .get(&self.path)
            .and_then(|v| v.as_table().cloned())
            .unwrap_or_default()
    }

    fn key(&self, key: &str) -> String {
        format!("{}.{}", self.path, key)
    }
}

fn lookup<'a>(table: &'a Table, key: &str) -> Option<&'a Value> {
    let mut parts = key.split('.');
    let mut value = table.get(parts.next()?)?;
    for part in parts {
        value = value.as_table()?.get(part)?;
    }
    Some(value)
}

fn insert_path(table: &mut Table, parts: &[&str], value: Value) -> Result<(), ExtensionError> {
    let (last, parents) = parts
        .split_last()
        .ok_or_else(|| ExtensionError::config("empty configuration key"))?;

    let mut current = table;
    for part in parents {
        current = current
            .entry(part.to_string())
            .or_insert(Value::Table(Table::new()))
            .as_table_mut()
            .ok_or_else(|| ExtensionError::config(format!("'{}' is not a table", part)))?;
    }
    current.insert(last.to_string(), value);
    Ok(())
}

fn merge_defaults(target: &mut Table, defaults: &Table) {
    for (key, default) in defaults {
        match (target.get_mut(key), default) {
            (Some(Value::Table(existing)), Value::Table(nested)) => {
                merge_defaults(existing, nested);
            }
            (Some(_), _) => {}
            (None, _) => {
                target.insert(key.clone(), default.clone());
            }
        }
    }
}
