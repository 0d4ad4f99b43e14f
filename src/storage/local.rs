//! Local filesystem checkpoint store.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── DEN_2012.json
//! ├── DEN_2013.json
//! └── ...
//! ```
//!
//! One pretty-printed JSON file per unit. Files are replaced atomically
//! (write to a temp file, then rename), so a crash mid-save never leaves a
//! truncated checkpoint behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{Checkpoint, UnitKey};
use crate::storage::CheckpointStore;

/// Checkpoints as JSON files under one directory.
#[derive(Debug, Clone)]
pub struct LocalCheckpointStore {
    root_dir: PathBuf,
}

impl LocalCheckpointStore {
    /// Create a store rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    fn key(unit: &UnitKey) -> String {
        format!("{}.json", unit.stem())
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl CheckpointStore for LocalCheckpointStore {
    async fn exists(&self, unit: &UnitKey) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.path(&Self::key(unit))).await?)
    }

    async fn load(&self, unit: &UnitKey) -> Result<Checkpoint> {
        let checkpoint: Checkpoint = self
            .read_json(&Self::key(unit))
            .await?
            .ok_or_else(|| AppError::not_found(format!("checkpoint for {unit}")))?;

        if checkpoint.unit != *unit {
            return Err(AppError::validation(format!(
                "checkpoint file for {} holds {}",
                unit, checkpoint.unit
            )));
        }
        Ok(checkpoint)
    }

    async fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        let key = Self::key(&checkpoint.unit);
        self.write_json(&key, checkpoint).await?;
        log::debug!(
            "Checkpoint {} saved with {} rows",
            self.path(&key).display(),
            checkpoint.rows.len()
        );
        Ok(())
    }

    async fn list(&self) -> Result<Vec<UnitKey>> {
        let mut entries = match tokio::fs::read_dir(&self.root_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AppError::Io(e)),
        };

        let mut units = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(unit) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(UnitKey::from_stem)
            {
                units.push(unit);
            }
        }
        units.sort_by(|a, b| (&a.entity, a.period).cmp(&(&b.entity, b.period)));
        Ok(units)
    }

    async fn remove(&self, unit: &UnitKey) -> Result<bool> {
        match tokio::fs::remove_file(self.path(&Self::key(unit))).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}
