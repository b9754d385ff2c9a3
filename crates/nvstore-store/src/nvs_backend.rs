//! Namespaced key-value store (ESP32 NVS style).

use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use spin::Mutex;
use log::{debug, warn};

use nvstore_core::{Location, StoreError, StoreResult, WriteOutcome};
use nvstore_hal::{BackendConfig, BackendKind, StorageBackend};

/// NVS limit for namespace names and keys.
pub const MAX_KEY_LEN: usize = 15;

type Namespaces = BTreeMap<String, BTreeMap<String, Vec<u8>>>;

struct Partition {
    namespaces: Namespaces,
    capacity: usize,
}

impl Partition {
    fn used(&self) -> usize {
        self.namespaces
            .values()
            .flat_map(|ns| ns.iter())
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

/// An emulated NVS partition shared by every namespace opened on it.
#[derive(Clone)]
pub struct NvsPartition {
    inner: Arc<Mutex<Partition>>,
}

impl NvsPartition {
    /// `capacity` bounds the total key + value bytes held.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Partition { namespaces: BTreeMap::new(), capacity })),
        }
    }

    pub fn used(&self) -> usize {
        self.inner.lock().used()
    }

    /// Raw blob under `namespace`/`key`.
    pub fn get(&self, namespace: &str, key: &str) -> Option<Vec<u8>> {
        self.inner.lock().namespaces.get(namespace)?.get(key).cloned()
    }

    /// Raw overwrite, bypassing the record layer and the capacity check.
    pub fn put(&self, namespace: &str, key: &str, blob: Vec<u8>) {
        self.inner
            .lock()
            .namespaces
            .entry(String::from(namespace))
            .or_default()
            .insert(String::from(key), blob);
    }

    pub fn key_count(&self, namespace: &str) -> usize {
        self.inner.lock().namespaces.get(namespace).map_or(0, |ns| ns.len())
    }
}

fn valid_name(name: &str) -> bool {
    !name.is_empty() && name.len() <= MAX_KEY_LEN
}

/// Records stored as blobs under string keys of one namespace.
pub struct NamespaceStore {
    partition: NvsPartition,
    namespace: Option<String>,
}

impl NamespaceStore {
    pub fn new(partition: NvsPartition) -> Self {
        Self { partition, namespace: None }
    }

    pub fn partition(&self) -> NvsPartition {
        self.partition.clone()
    }

    /// `Addr(n)` maps to key `a{n}`.
    pub fn key_for(location: &Location) -> StoreResult<String> {
        let key = match location {
            Location::Addr(a) => format!("a{}", a),
            Location::Key(k) => k.clone(),
        };
        if valid_name(&key) { Ok(key) } else { Err(StoreError::InvalidLocation) }
    }

    fn namespace(&self) -> StoreResult<&str> {
        self.namespace.as_deref().ok_or(StoreError::NotInitialized)
    }
}

impl StorageBackend for NamespaceStore {
    fn kind(&self) -> BackendKind {
        BackendKind::NamespaceStore
    }

    fn init(&mut self, config: &BackendConfig) -> StoreResult<()> {
        if !valid_name(&config.name) {
            warn!("[nvs] Invalid namespace name '{}'", config.name);
            return Err(StoreError::BackendFailure);
        }
        self.partition
            .inner
            .lock()
            .namespaces
            .entry(config.name.clone())
            .or_default();
        debug!("[nvs] Namespace '{}' open", config.name);
        self.namespace = Some(config.name.clone());
        Ok(())
    }

    fn read(&self, location: &Location, len: usize) -> StoreResult<Vec<u8>> {
        let ns = self.namespace()?;
        let key = Self::key_for(location)?;
        let mut blob = self.partition.get(ns, &key).ok_or(StoreError::NotFound)?;
        blob.truncate(len);
        Ok(blob)
    }

    fn write(&mut self, location: &Location, bytes: &[u8]) -> StoreResult<WriteOutcome> {
        let ns = self.namespace()?;
        let key = Self::key_for(location)?;

        let mut part = self.partition.inner.lock();
        let previous = part
            .namespaces
            .get(ns)
            .and_then(|n| n.get(&key))
            .map_or(0, |v| key.len() + v.len());
        let projected = part.used() - previous + key.len() + bytes.len();
        if projected > part.capacity {
            warn!("[nvs] Partition full: need {} of {} bytes", projected, part.capacity);
            return Err(StoreError::BackendFailure);
        }

        part.namespaces
            .entry(String::from(ns))
            .or_default()
            .insert(key, bytes.to_vec());
        Ok(WriteOutcome::Written)
    }

    fn erase_all(&mut self) -> StoreResult<()> {
        let ns = self.namespace()?;
        if let Some(keys) = self.partition.inner.lock().namespaces.get_mut(ns) {
            debug!("[nvs] Clearing {} keys in '{}'", keys.len(), ns);
            keys.clear();
        }
        Ok(())
    }
}
