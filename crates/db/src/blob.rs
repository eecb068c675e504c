//! Content-addressed blob sidecar.
//!
//! Large node outputs live under `<base_dir>/<sha256[0:2]>/<sha256>` rather
//! than inline in `task_queue.output_json` / `executions.completed_nodes_json`.
//! Writes go through a temp file and an atomic rename so a reader never
//! observes a partially-written blob.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::error::DbError;
use crate::models::ClaimCheck;

/// Root of the blob sidecar, conventionally `.nexum/blobs`.
#[derive(Debug, Clone)]
pub struct BlobStore {
    base_dir: PathBuf,
}

impl BlobStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn path_for(&self, sha256_hex: &str) -> PathBuf {
        self.base_dir.join(&sha256_hex[0..2]).join(sha256_hex)
    }

    /// Write `bytes`, returning a claim-check pointer. Content-addressed:
    /// if a blob with this hash already exists, it is left untouched.
    pub async fn store(&self, bytes: &[u8]) -> Result<ClaimCheck, DbError> {
        let sha256_hex = hex::encode(Sha256::digest(bytes));
        let path = self.path_for(&sha256_hex);

        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            if let Some(dir) = path.parent() {
                tokio::fs::create_dir_all(dir).await?;
            }
            let tmp_path = path.with_extension("tmp");
            tokio::fs::write(&tmp_path, bytes).await?;
            tokio::fs::rename(&tmp_path, &path).await?;
        }

        Ok(ClaimCheck::new(
            path.to_string_lossy().into_owned(),
            sha256_hex,
            bytes.len() as u64,
        ))
    }

    /// Read a blob back and verify its hash matches `pointer.sha256`.
    pub async fn read(&self, pointer: &ClaimCheck) -> Result<Vec<u8>, DbError> {
        let bytes = tokio::fs::read(Path::new(&pointer.path)).await?;
        let actual = hex::encode(Sha256::digest(&bytes));
        if actual != pointer.sha256 {
            return Err(DbError::BlobIntegrity {
                expected: pointer.sha256.clone(),
                actual,
            });
        }
        Ok(bytes)
    }
}
