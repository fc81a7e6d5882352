//! Persisted generation counter used to recognise stale timer deliveries.
//!
//! Every armed transition carries the generation that was current when it
//! was armed. The counter is bumped once per process start, so anything
//! armed by an earlier process no longer matches.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use reveille_core::AlarmError;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Generation(pub u64);

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where the counter lives between processes.
pub trait GenerationStore: Send + Sync {
    fn load(&self) -> Result<u64, AlarmError>;

    fn save(&self, value: u64) -> Result<(), AlarmError>;
}

/// Counter kept in a small text file.
pub struct FileGenerationStore {
    path: PathBuf,
}

impl FileGenerationStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl GenerationStore for FileGenerationStore {
    fn load(&self) -> Result<u64, AlarmError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => text
                .trim()
                .parse()
                .map_err(|e| AlarmError::Store(format!("bad generation file {}: {}", self.path.display(), e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no generation file, starting at 0");
                Ok(0)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, value: u64) -> Result<(), AlarmError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, value.to_string())?;
        Ok(())
    }
}

/// Counter that only lives as long as the value.
#[derive(Default)]
pub struct MemoryGenerationStore {
    value: AtomicU64,
}

impl MemoryGenerationStore {
    pub fn new(value: u64) -> Self {
        Self {
            value: AtomicU64::new(value),
        }
    }
}

impl GenerationStore for MemoryGenerationStore {
    fn load(&self) -> Result<u64, AlarmError> {
        Ok(self.value.load(Ordering::SeqCst))
    }

    fn save(&self, value: u64) -> Result<(), AlarmError> {
        self.value.store(value, Ordering::SeqCst);
        Ok(())
    }
}

/// The counter itself: read once on construction, bumped on process start.
pub struct GenerationCounter {
    store: Box<dyn GenerationStore>,
    current: AtomicU64,
}

impl GenerationCounter {
    pub fn load(store: Box<dyn GenerationStore>) -> Result<Self, AlarmError> {
        let value = store.load()?;
        debug!(generation = value, "loaded generation counter");
        Ok(Self {
            store,
            current: AtomicU64::new(value),
        })
    }

    pub fn current(&self) -> Generation {
        Generation(self.current.load(Ordering::SeqCst))
    }

    /// Advance to the next generation and persist it.
    ///
    /// The in-memory value advances even when persisting fails.
    pub fn bump(&self) -> Result<Generation, AlarmError> {
        let next = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        info!(generation = next, "advanced generation counter");
        self.store.save(next)?;
        Ok(Generation(next))
    }
}
