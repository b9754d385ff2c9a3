#![cfg(feature = "std")]

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::format;
use std::string::String;
use std::vec::Vec;
use log::{debug, warn};

use nvstore_core::{Location, StoreError, StoreResult, WriteOutcome};
use nvstore_hal::{BackendConfig, BackendKind, StorageBackend};

const RECORD_EXT: &str = "bin";
const TMP_EXT: &str = "tmp";
const MAX_KEY_LEN: usize = 32;

fn io_fail(op: &str, path: &Path, err: std::io::Error) -> StoreError {
    warn!("[fs] {} {} failed: {}", op, path.display(), err);
    StoreError::BackendFailure
}

/// Store names and keys: `[A-Za-z0-9_-]{1,32}`, so neither can leave its directory.
fn valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_KEY_LEN
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// One file per record under `<mount>/<name>/` (LittleFS style).
pub struct FileStore {
    mount: PathBuf,
    root: Option<PathBuf>,
}

impl FileStore {
    pub fn new(mount: impl Into<PathBuf>) -> Self {
        Self { mount: mount.into(), root: None }
    }

    /// Directory holding the records, once mounted.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// `Addr(n)` maps to `s{n}.bin`, `Key(k)` to `{k}.bin`.
    pub fn file_name(location: &Location) -> StoreResult<String> {
        match location {
            Location::Addr(a) => Ok(format!("s{}.{}", a, RECORD_EXT)),
            Location::Key(k) if valid_name(k) => Ok(format!("{}.{}", k, RECORD_EXT)),
            Location::Key(_) => Err(StoreError::InvalidLocation),
        }
    }

    fn get_path(&self, location: &Location) -> StoreResult<PathBuf> {
        let root = self.root.as_ref().ok_or(StoreError::NotInitialized)?;
        Ok(root.join(Self::file_name(location)?))
    }
}

impl StorageBackend for FileStore {
    fn kind(&self) -> BackendKind {
        BackendKind::FileStore
    }

    fn init(&mut self, config: &BackendConfig) -> StoreResult<()> {
        if !valid_name(&config.name) {
            warn!("[fs] Invalid store name '{}'", config.name);
            return Err(StoreError::InvalidLocation);
        }
        let root = self.mount.join(&config.name);
        fs::create_dir_all(&root).map_err(|e| io_fail("mount", &root, e))?;
        debug!("[fs] Mounted {}", root.display());
        self.root = Some(root);
        Ok(())
    }

    fn read(&self, location: &Location, len: usize) -> StoreResult<Vec<u8>> {
        let path = self.get_path(location)?;
        if !path.exists() {
            return Err(StoreError::NotFound);
        }
        let file = File::open(&path).map_err(|e| io_fail("open", &path, e))?;
        let mut buf = Vec::with_capacity(len);
        file.take(len as u64)
            .read_to_end(&mut buf)
            .map_err(|e| io_fail("read", &path, e))?;
        Ok(buf)
    }

    fn write(&mut self, location: &Location, bytes: &[u8]) -> StoreResult<WriteOutcome> {
        let path = self.get_path(location)?;
        let tmp_path = path.with_extension(TMP_EXT);

        {
            let mut file = OpenOptions::new()
                .write(true).create(true).truncate(true)
                .open(&tmp_path).map_err(|e| io_fail("create", &tmp_path, e))?;
            file.write_all(bytes).map_err(|e| io_fail("write", &tmp_path, e))?;
            file.sync_all().map_err(|e| io_fail("sync", &tmp_path, e))?;
        }

        // Readers see either the old record or the new one, never a torn file.
        fs::rename(&tmp_path, &path).map_err(|e| io_fail("rename", &path, e))?;

        if let Some(root) = &self.root {
            if let Ok(dir) = File::open(root) { let _ = dir.sync_all(); }
        }
        Ok(WriteOutcome::Written)
    }

    fn erase_all(&mut self) -> StoreResult<()> {
        let root = self.root.clone().ok_or(StoreError::NotInitialized)?;
        let entries = fs::read_dir(&root).map_err(|e| io_fail("list", &root, e))?;

        let mut removed = 0usize;
        for entry in entries {
            let path = entry.map_err(|e| io_fail("list", &root, e))?.path();
            let managed = path.is_file()
                && matches!(path.extension().and_then(|e| e.to_str()), Some(RECORD_EXT) | Some(TMP_EXT));
            if managed {
                fs::remove_file(&path).map_err(|e| io_fail("remove", &path, e))?;
                removed += 1;
            }
        }
        debug!("[fs] Removed {} record files from {}", removed, root.display());
        Ok(())
    }
}
