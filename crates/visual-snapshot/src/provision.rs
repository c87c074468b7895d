//! Idempotent creation of the directory chain leading to a snapshot file
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use crate::errors::SnapshotError;
use crate::models::SnapshotId;

/// Directory-creation primitive, injectable so the chain walk can be tested without a disk.
#[async_trait]
pub trait DirBuilder: Send + Sync {
    /// Create exactly one directory; the parent must already exist.
    async fn create_dir(&self, path: &Path) -> io::Result<()>;

    /// Create a directory and any missing ancestors.
    async fn create_dir_all(&self, path: &Path) -> io::Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioDirs;

#[async_trait]
impl DirBuilder for TokioDirs {
    async fn create_dir(&self, path: &Path) -> io::Result<()> {
        match fs::create_dir(path).await {
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                // A plain file squatting on the name must not count as a directory.
                if fs::metadata(path).await?.is_dir() {
                    Err(err)
                } else {
                    Err(io::Error::new(
                        io::ErrorKind::Other,
                        format!("{} exists and is not a directory", path.display()),
                    ))
                }
            }
            other => other,
        }
    }

    async fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path).await
    }
}

/// Every directory between `root` and the snapshot file, parents first.
pub fn directory_chain(root: &Path, id: &SnapshotId) -> Vec<PathBuf> {
    id.parents()
        .iter()
        .scan(root.to_path_buf(), |current, segment| {
            current.push(segment);
            Some(current.clone())
        })
        .collect()
}

/// Ensure `root` and the chain for `id` exist, creating one directory at a time.
pub async fn ensure_directory_chain_with<B>(
    dirs: &B,
    root: &Path,
    id: &SnapshotId,
) -> Result<Vec<PathBuf>, SnapshotError>
where
    B: DirBuilder + ?Sized,
{
    dirs.create_dir_all(root)
        .await
        .map_err(|err| SnapshotError::io(root, err))?;

    let chain = directory_chain(root, id);
    for dir in &chain {
        match dirs.create_dir(dir).await {
            Ok(()) => debug!(dir = %dir.display(), "created snapshot directory"),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {}
            Err(err) => return Err(SnapshotError::io(dir, err)),
        }
    }
    Ok(chain)
}

pub async fn ensure_directory_chain(
    root: &Path,
    id: &SnapshotId,
) -> Result<Vec<PathBuf>, SnapshotError> {
    ensure_directory_chain_with(&TokioDirs, root, id).await
}
