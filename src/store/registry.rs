//! Contract registry - one versioned JSON document per installation
//!
//! The whole store serializes as a single envelope `{schema, deployers}` and
//! every mutation atomically replaces the file (write a temp sibling, then
//! rename), so no partial-write state is ever observable.
//!
//! Load-time migration handles two prior shapes:
//! - a bare array (the legacy flat format) carries no deployer attribution
//!   and cannot be placed in the deployer/chain structure; it is discarded
//!   with a logged notice rather than imported under a guessed deployer -
//!   deliberate data loss, not a bug;
//! - a bare object map (the un-enveloped nested shape) is lifted into the
//!   current envelope losslessly.
//!
//! Anything unparseable is treated as an empty store rather than failing
//! the session.

use std::fs;
use std::path::{Path, PathBuf};

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::domain::contract::{ContractStore, DeployedContractRecord};

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write registry {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize registry: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreDocument {
    schema: u32,
    deployers: ContractStore,
}

/// Registry of deployed contracts, persisted synchronously on every mutation
#[derive(Debug)]
pub struct ContractRegistry {
    path: PathBuf,
    store: ContractStore,
}

impl ContractRegistry {
    /// Open the registry at `path`. Never fails: a missing file is an empty
    /// store, and a corrupt or legacy payload is recovered as empty with a
    /// logged notice.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let store = load_store(&path);
        Self { path, store }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records for one deployer, optionally filtered to a chain,
    /// most-recent-first per chain.
    pub fn list(&self, deployer: Address, chain_id: Option<u64>) -> Vec<&DeployedContractRecord> {
        self.store.list(deployer, chain_id)
    }

    pub fn find(
        &self,
        deployer: Address,
        chain_id: u64,
        address: Address,
    ) -> Option<&DeployedContractRecord> {
        self.store.find(deployer, chain_id, address)
    }

    pub fn record_count(&self) -> usize {
        self.store.record_count()
    }

    /// Insert at the head of the (deployer, chain) bucket and persist.
    pub fn add(&mut self, record: DeployedContractRecord) -> Result<(), StoreError> {
        self.store.add(record);
        self.persist()
    }

    /// Remove by (deployer, chain, address); a hit persists, a miss is a
    /// no-op that leaves the file untouched.
    pub fn remove(
        &mut self,
        deployer: Address,
        chain_id: u64,
        address: Address,
    ) -> Result<bool, StoreError> {
        if !self.store.remove(deployer, chain_id, address) {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    /// Serialize the whole document and atomically replace the file.
    fn persist(&self) -> Result<(), StoreError> {
        let document = StoreDocument {
            schema: SCHEMA_VERSION,
            deployers: self.store.clone(),
        };
        let json = serde_json::to_string_pretty(&document)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                    path: self.path.clone(),
                    source,
                })?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(())
    }
}

fn load_store(path: &Path) -> ContractStore {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return ContractStore::new(),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "registry unreadable, starting empty");
            return ContractStore::new();
        }
    };

    let value: serde_json::Value = match serde_json::from_str(&content) {
        Ok(value) => value,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "registry corrupt, starting empty");
            return ContractStore::new();
        }
    };

    migrate_document(value, path)
}

/// Versioned migration from any known on-disk shape to the current store.
fn migrate_document(value: serde_json::Value, path: &Path) -> ContractStore {
    match value {
        // Legacy flat array: records with no deployer attribution. Dropped,
        // not guessed.
        serde_json::Value::Array(records) => {
            warn!(
                path = %path.display(),
                dropped = records.len(),
                "legacy flat-array registry carries no deployer attribution; starting empty"
            );
            ContractStore::new()
        }
        serde_json::Value::Object(map) => {
            let enveloped = map.contains_key("schema");
            let object = serde_json::Value::Object(map);
            if enveloped {
                match serde_json::from_value::<StoreDocument>(object) {
                    Ok(document) if document.schema == SCHEMA_VERSION => document.deployers,
                    Ok(document) => {
                        warn!(
                            path = %path.display(),
                            schema = document.schema,
                            "registry written by an unknown schema version, starting empty"
                        );
                        ContractStore::new()
                    }
                    Err(err) => {
                        warn!(path = %path.display(), error = %err, "registry corrupt, starting empty");
                        ContractStore::new()
                    }
                }
            } else {
                // Un-enveloped nested map (the original shape): lift it as-is.
                match serde_json::from_value::<ContractStore>(object) {
                    Ok(store) => store,
                    Err(err) => {
                        warn!(path = %path.display(), error = %err, "registry corrupt, starting empty");
                        ContractStore::new()
                    }
                }
            }
        }
        _ => {
            warn!(path = %path.display(), "registry has unexpected shape, starting empty");
            ContractStore::new()
        }
    }
}
