//! Content-addressed artifact cache
//!
//! A durable key-to-file mapping in a configurable directory: each artifact
//! lives at `<sha256-hex>.mp3`, the only on-disk naming contract preserved
//! across restarts. Writes stage into a hidden temp name and rename, so a
//! partial artifact is never visible under its final name. Per-key async
//! locks give at-most-one in-flight synthesis per fingerprint while leaving
//! distinct keys fully concurrent.

use crate::error::TtsError;
use crate::types::{ArtifactKey, AudioArtifact};
use bytes::Bytes;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

pub struct ArtifactCache {
    dir: PathBuf,
    locks: DashMap<ArtifactKey, Arc<Mutex<()>>>,
}

impl ArtifactCache {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, TtsError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            locks: DashMap::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deterministic on-disk location for a key
    pub fn path_for(&self, key: &ArtifactKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Look up a stored artifact
    pub async fn get(&self, key: &ArtifactKey) -> Option<AudioArtifact> {
        let path = self.path_for(key);
        match tokio::fs::read(&path).await {
            Ok(data) if !data.is_empty() => {
                debug!(key = %key, "cache hit");
                Some(AudioArtifact::mp3(Bytes::from(data)))
            }
            Ok(_) => {
                // Zero-byte entries are corrupt leftovers; treat as a miss.
                warn!(key = %key, "removing empty cache entry");
                let _ = tokio::fs::remove_file(&path).await;
                None
            }
            Err(_) => None,
        }
    }

    /// Store an artifact under its key, atomically
    pub async fn put(&self, key: &ArtifactKey, artifact: &AudioArtifact) -> Result<PathBuf, TtsError> {
        let final_path = self.path_for(key);
        // The per-key lock serializes writers for this key, so the staging
        // name cannot collide with a concurrent write of the same artifact.
        let staging = self.dir.join(format!(".{}.tmp", key.as_str()));

        tokio::fs::write(&staging, &artifact.data).await?;

        if let Err(e) = tokio::fs::rename(&staging, &final_path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(TtsError::Io(e));
        }

        debug!(key = %key, bytes = artifact.len(), "cached artifact");
        Ok(final_path)
    }

    /// Delete a stored artifact; the hook an external retention policy
    /// layers on. Returns whether anything was removed.
    pub async fn remove(&self, key: &ArtifactKey) -> Result<bool, TtsError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(TtsError::Io(e)),
        }
    }

    /// Acquire the in-flight lock for a key. Concurrent callers with the
    /// same fingerprint serialize here; each re-checks `get` after the lock
    /// so only the first actually synthesizes. The table entry is dropped
    /// again once no caller holds or awaits it, so the map tracks in-flight
    /// keys rather than every fingerprint ever seen.
    pub async fn lock(&self, key: &ArtifactKey) -> KeyLock<'_> {
        let lock = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = lock.lock_owned().await;
        KeyLock {
            cache: self,
            key: key.clone(),
            guard: Some(guard),
        }
    }

    /// Number of keys with an in-flight lock entry
    pub fn pending_locks(&self) -> usize {
        self.locks.len()
    }
}

/// Held per-key lock; releasing it also evicts the table entry when no
/// other caller is waiting on the same key.
pub struct KeyLock<'a> {
    cache: &'a ArtifactCache,
    key: ArtifactKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyLock<'_> {
    fn drop(&mut self) {
        self.guard.take();
        // remove_if holds the shard lock, so no new waiter can clone the
        // Arc between the count check and the removal.
        self.cache
            .locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}
