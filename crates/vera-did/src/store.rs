//! Identifier persistence.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use vera_core::Did;
use vera_crypto::ed25519::bytes_to_hex;

use crate::error::DidError;
use crate::identifier::Identifier;

/// Persistence contract for managed identifiers.
#[async_trait]
pub trait DidStore: Send + Sync {
    /// Insert or replace an identifier.
    async fn save(&self, identifier: &Identifier) -> Result<(), DidError>;

    /// Fetch by DID.
    async fn get(&self, did: &Did) -> Result<Option<Identifier>, DidError>;

    /// Every identifier, oldest first.
    async fn list(&self) -> Result<Vec<Identifier>, DidError>;

    /// Remove an identifier. Returns whether it existed.
    async fn delete(&self, did: &Did) -> Result<bool, DidError>;
}

/// In-memory identifier store.
#[derive(Debug, Default)]
pub struct MemoryDidStore {
    identifiers: RwLock<HashMap<Did, Identifier>>,
}

impl MemoryDidStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DidStore for MemoryDidStore {
    async fn save(&self, identifier: &Identifier) -> Result<(), DidError> {
        self.identifiers
            .write()
            .insert(identifier.did.clone(), identifier.clone());
        Ok(())
    }

    async fn get(&self, did: &Did) -> Result<Option<Identifier>, DidError> {
        Ok(self.identifiers.read().get(did).cloned())
    }

    async fn list(&self) -> Result<Vec<Identifier>, DidError> {
        let mut all: Vec<Identifier> = self.identifiers.read().values().cloned().collect();
        all.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.did.cmp(&b.did)));
        Ok(all)
    }

    async fn delete(&self, did: &Did) -> Result<bool, DidError> {
        Ok(self.identifiers.write().remove(did).is_some())
    }
}

/// Identifier store writing one JSON file per identifier.
///
/// File names are the hex encoding of the DID, so no DID can name a path
/// outside the directory. Writes go through a temp file and a rename.
#[derive(Debug)]
pub struct FileDidStore {
    dir: PathBuf,
    writes: AtomicU64,
}

impl FileDidStore {
    /// Open (and create if needed) an identifier directory.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, DidError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| DidError::Storage(format!("cannot create {}: {e}", dir.display())))?;
        Ok(Self {
            dir,
            writes: AtomicU64::new(0),
        })
    }

    /// The directory identifiers are written to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, did: &Did) -> PathBuf {
        self.dir
            .join(format!("{}.json", bytes_to_hex(did.as_str().as_bytes())))
    }

    async fn read(path: &Path) -> Result<Option<Identifier>, DidError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(DidError::Storage(format!("cannot read {}: {e}", path.display())))
            }
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| DidError::Storage(format!("corrupt identifier {}: {e}", path.display())))
    }
}

#[async_trait]
impl DidStore for FileDidStore {
    async fn save(&self, identifier: &Identifier) -> Result<(), DidError> {
        let path = self.path_for(&identifier.did);
        let n = self.writes.fetch_add(1, Ordering::Relaxed);
        let tmp = self.dir.join(format!(".{n}.{}.tmp", std::process::id()));
        let body = serde_json::to_vec_pretty(identifier)
            .map_err(|e| DidError::Storage(format!("cannot encode identifier: {e}")))?;
        tokio::fs::write(&tmp, &body)
            .await
            .map_err(|e| DidError::Storage(format!("cannot write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| DidError::Storage(format!("cannot commit {}: {e}", path.display())))
    }

    async fn get(&self, did: &Did) -> Result<Option<Identifier>, DidError> {
        Self::read(&self.path_for(did)).await
    }

    async fn list(&self) -> Result<Vec<Identifier>, DidError> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| DidError::Storage(format!("cannot list {}: {e}", self.dir.display())))?;
        let mut all = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| DidError::Storage(e.to_string()))?
        {
            let path = entry.path();
            let is_record = path.extension().is_some_and(|ext| ext == "json")
                && !entry.file_name().to_string_lossy().starts_with('.');
            if !is_record {
                continue;
            }
            if let Some(identifier) = Self::read(&path).await? {
                all.push(identifier);
            }
        }
        all.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.did.cmp(&b.did)));
        Ok(all)
    }

    async fn delete(&self, did: &Did) -> Result<bool, DidError> {
        match tokio::fs::remove_file(self.path_for(did)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(DidError::Storage(e.to_string())),
        }
    }
}
