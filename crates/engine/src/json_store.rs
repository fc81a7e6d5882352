//! Write-through JSON file store.
//!
//! Contents live in a [`MemoryStore`]; every successful mutation rewrites the
//! whole file via a temporary sibling and an atomic rename.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use reveille_core::{AlarmError, AlarmId, AlarmInstance, AlarmRecord, InstanceId, InstanceRow};
use tracing::{debug, info};

use crate::memory::{MemoryStore, StoreSnapshot};
use crate::traits::{InstanceStore, RecordStore, StoreResult};

pub struct JsonFileStore {
    path: PathBuf,
    inner: MemoryStore,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open the store at `path`, creating an empty one if the file is missing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AlarmError> {
        let path = path.as_ref().to_path_buf();
        let inner = match std::fs::read(&path) {
            Ok(bytes) => {
                let snapshot: StoreSnapshot = serde_json::from_slice(&bytes)?;
                info!(
                    path = %path.display(),
                    records = snapshot.records.len(),
                    instances = snapshot.instances.len(),
                    "loaded alarm store"
                );
                MemoryStore::from_snapshot(snapshot)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no alarm store yet, starting empty");
                MemoryStore::new()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            inner,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), AlarmError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let snapshot = self.inner.snapshot();
        let bytes = serde_json::to_vec_pretty(&snapshot)?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "alarm store flushed");
        Ok(())
    }

    /// Run a mutation and persist if it changed anything.
    fn write<T>(&self, op: impl FnOnce(&MemoryStore) -> StoreResult<T>, changed: impl Fn(&T) -> bool) -> StoreResult<T> {
        let result = op(&self.inner)?;
        if changed(&result) {
            self.flush()?;
        }
        Ok(result)
    }
}

impl InstanceStore for JsonFileStore {
    fn get(&self, id: InstanceId) -> StoreResult<Option<AlarmInstance>> {
        InstanceStore::get(&self.inner, id)
    }

    fn by_alarm_id(&self, alarm_id: AlarmId) -> StoreResult<Vec<AlarmInstance>> {
        self.inner.by_alarm_id(alarm_id)
    }

    fn pending(&self) -> StoreResult<Vec<AlarmInstance>> {
        self.inner.pending()
    }

    fn all_rows(&self) -> StoreResult<Vec<InstanceRow>> {
        self.inner.all_rows()
    }

    fn insert_or_merge(&self, instance: AlarmInstance) -> StoreResult<AlarmInstance> {
        self.write(|s| s.insert_or_merge(instance), |_| true)
    }

    fn update(&self, instance: &AlarmInstance) -> StoreResult<bool> {
        self.write(|s| InstanceStore::update(s, instance), |found| *found)
    }

    fn delete(&self, id: InstanceId) -> StoreResult<bool> {
        self.write(|s| InstanceStore::delete(s, id), |found| *found)
    }
}

impl RecordStore for JsonFileStore {
    fn get(&self, id: AlarmId) -> StoreResult<Option<AlarmRecord>> {
        RecordStore::get(&self.inner, id)
    }

    fn all(&self) -> StoreResult<Vec<AlarmRecord>> {
        self.inner.all()
    }

    fn insert(&self, record: AlarmRecord) -> StoreResult<AlarmRecord> {
        self.write(|s| RecordStore::insert(s, record), |_| true)
    }

    fn update(&self, record: &AlarmRecord) -> StoreResult<bool> {
        self.write(|s| RecordStore::update(s, record), |found| *found)
    }

    fn delete(&self, id: AlarmId) -> StoreResult<bool> {
        self.write(|s| RecordStore::delete(s, id), |found| *found)
    }

    fn disable(&self, id: AlarmId) -> StoreResult<bool> {
        self.write(|s| s.disable(id), |found| *found)
    }
}
