//! File-backed store of edge weights resolved by earlier runs.
//!
//! Journey and walking queries are slow and rate limited, so every weight
//! they produce is kept here and reused. A later run only queries edges the
//! store does not know yet.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::{EdgeKey, EdgeTriple, HubId, Minutes};

use super::error::ResolveError;

const STORE_VERSION: u32 = 1;

/// One stored weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredWeight {
    pub source: HubId,
    pub target: HubId,
    pub key: EdgeKey,
    pub minutes: Minutes,
    pub observations: usize,
    pub resolved_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    entries: Vec<StoredWeight>,
}

/// Resolved weights keyed by edge, optionally backed by a JSON file.
#[derive(Debug, Clone, Default)]
pub struct ResolvedStore {
    path: Option<PathBuf>,
    entries: BTreeMap<EdgeTriple, StoredWeight>,
}

impl ResolvedStore {
    /// A store that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ResolveError> {
        let path = path.into();
        let mut store = Self {
            path: Some(path.clone()),
            entries: BTreeMap::new(),
        };

        let json = match std::fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No resolution store yet");
                return Ok(store);
            }
            Err(e) => return Err(e.into()),
        };

        let file: StoreFile = serde_json::from_str(&json)?;
        if file.version != STORE_VERSION {
            return Err(ResolveError::StoreVersion {
                found: file.version,
                supported: STORE_VERSION,
            });
        }
        for entry in file.entries {
            let triple =
                EdgeTriple::new(entry.source.clone(), entry.target.clone(), entry.key.clone());
            store.entries.insert(triple, entry);
        }
        info!(path = %path.display(), entries = store.len(), "Opened resolution store");
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, triple: &EdgeTriple) -> Option<Minutes> {
        self.entries.get(triple).map(|e| e.minutes)
    }

    /// Record a newly resolved weight, replacing any earlier one.
    pub fn insert(&mut self, triple: EdgeTriple, minutes: Minutes, observations: usize) {
        let entry = StoredWeight {
            source: triple.source.clone(),
            target: triple.target.clone(),
            key: triple.key.clone(),
            minutes,
            observations,
            resolved_at: Utc::now(),
        };
        self.entries.insert(triple, entry);
    }

    /// Write the store back to its file. In-memory stores do nothing.
    pub fn save(&self) -> Result<(), ResolveError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        let file = StoreFile {
            version: STORE_VERSION,
            entries: self.entries.values().cloned().collect(),
        };
        std::fs::write(path, serde_json::to_string_pretty(&file)?)?;
        info!(path = %path.display(), entries = self.len(), "Saved resolution store");
        Ok(())
    }
}
