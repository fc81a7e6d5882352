//! In-memory record and instance tables.
//!
//! [`MemoryStore`] backs both store traits with plain maps. The JSON file
//! store wraps it and writes a snapshot after every mutation.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use reveille_core::{AlarmId, AlarmInstance, AlarmRecord, InstanceId, InstanceRow, InstanceState};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::traits::{InstanceStore, RecordStore, StoreResult};

/// Serializable image of the store contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub next_alarm_id: i64,
    pub next_instance_id: i64,
    pub records: Vec<AlarmRecord>,
    pub instances: Vec<InstanceRow>,
}

#[derive(Default)]
struct Tables {
    next_alarm_id: i64,
    next_instance_id: i64,
    records: BTreeMap<AlarmId, AlarmRecord>,
    instances: BTreeMap<InstanceId, InstanceRow>,
}

impl Tables {
    fn allocate_alarm_id(&mut self) -> AlarmId {
        self.next_alarm_id += 1;
        AlarmId(self.next_alarm_id)
    }

    fn allocate_instance_id(&mut self) -> InstanceId {
        self.next_instance_id += 1;
        InstanceId(self.next_instance_id)
    }

    /// Decode rows matching `filter`, skipping rows with an unknown state.
    fn decoded(&self, filter: impl Fn(&InstanceRow) -> bool) -> Vec<AlarmInstance> {
        self.instances
            .values()
            .filter(|&row| filter(row))
            .filter_map(|row| match AlarmInstance::try_from(row.clone()) {
                Ok(instance) => Some(instance),
                Err(e) => {
                    warn!(instance_id = %row.id, error = %e, "skipping undecodable instance row");
                    None
                }
            })
            .collect()
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let mut tables = Tables {
            next_alarm_id: snapshot.next_alarm_id,
            next_instance_id: snapshot.next_instance_id,
            ..Tables::default()
        };
        for record in snapshot.records {
            tables.next_alarm_id = tables.next_alarm_id.max(record.id.0);
            tables.records.insert(record.id, record);
        }
        for row in snapshot.instances {
            tables.next_instance_id = tables.next_instance_id.max(row.id.0);
            tables.instances.insert(row.id, row);
        }
        Self {
            tables: Mutex::new(tables),
        }
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let tables = self.tables();
        StoreSnapshot {
            next_alarm_id: tables.next_alarm_id,
            next_instance_id: tables.next_instance_id,
            records: tables.records.values().cloned().collect(),
            instances: tables.instances.values().cloned().collect(),
        }
    }

    /// Store a raw row as-is, keeping its id. Used to load foreign data.
    pub fn insert_row(&self, row: InstanceRow) {
        let mut tables = self.tables();
        tables.next_instance_id = tables.next_instance_id.max(row.id.0);
        tables.instances.insert(row.id, row);
    }

    pub fn instance_count(&self) -> usize {
        self.tables().instances.len()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl InstanceStore for MemoryStore {
    fn get(&self, id: InstanceId) -> StoreResult<Option<AlarmInstance>> {
        match self.tables().instances.get(&id) {
            Some(row) => AlarmInstance::try_from(row.clone()).map(Some),
            None => Ok(None),
        }
    }

    fn by_alarm_id(&self, alarm_id: AlarmId) -> StoreResult<Vec<AlarmInstance>> {
        Ok(self.tables().decoded(|row| row.alarm_id == Some(alarm_id)))
    }

    fn pending(&self) -> StoreResult<Vec<AlarmInstance>> {
        let tables = self.tables();
        Ok(tables
            .decoded(|_| true)
            .into_iter()
            .filter(|i| i.state.is_pending())
            .collect())
    }

    fn all_rows(&self) -> StoreResult<Vec<InstanceRow>> {
        Ok(self.tables().instances.values().cloned().collect())
    }

    fn insert_or_merge(&self, mut instance: AlarmInstance) -> StoreResult<AlarmInstance> {
        let mut tables = self.tables();
        let existing = instance.alarm_id.and_then(|alarm_id| {
            tables
                .instances
                .values()
                .find(|row| {
                    row.alarm_id == Some(alarm_id) && row.scheduled_time == instance.scheduled_time
                })
                .map(|row| row.id)
        });

        instance.id = match existing {
            Some(id) => {
                // The stored row may already have moved on; details refresh, state stays.
                let stored = tables
                    .instances
                    .get(&id)
                    .and_then(|row| InstanceState::from_code(row.alarm_state).ok());
                if let Some(state) = stored {
                    instance.state = state;
                }
                debug!(instance_id = %id, state = ?instance.state, "merging instance into existing row");
                id
            }
            None => tables.allocate_instance_id(),
        };
        tables.instances.insert(instance.id, InstanceRow::from(&instance));
        Ok(instance)
    }

    fn update(&self, instance: &AlarmInstance) -> StoreResult<bool> {
        let mut tables = self.tables();
        match tables.instances.get_mut(&instance.id) {
            Some(row) => {
                *row = InstanceRow::from(instance);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete(&self, id: InstanceId) -> StoreResult<bool> {
        Ok(self.tables().instances.remove(&id).is_some())
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, id: AlarmId) -> StoreResult<Option<AlarmRecord>> {
        Ok(self.tables().records.get(&id).cloned())
    }

    fn all(&self) -> StoreResult<Vec<AlarmRecord>> {
        Ok(self.tables().records.values().cloned().collect())
    }

    fn insert(&self, mut record: AlarmRecord) -> StoreResult<AlarmRecord> {
        record.validate()?;
        let mut tables = self.tables();
        record.id = tables.allocate_alarm_id();
        tables.records.insert(record.id, record.clone());
        Ok(record)
    }

    fn update(&self, record: &AlarmRecord) -> StoreResult<bool> {
        record.validate()?;
        let mut tables = self.tables();
        match tables.records.get_mut(&record.id) {
            Some(stored) => {
                *stored = record.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete(&self, id: AlarmId) -> StoreResult<bool> {
        Ok(self.tables().records.remove(&id).is_some())
    }

    fn disable(&self, id: AlarmId) -> StoreResult<bool> {
        let mut tables = self.tables();
        match tables.records.get_mut(&id) {
            Some(record) => {
                record.enabled = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
