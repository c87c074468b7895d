use std::io;
use std::path::Path;

use tokio::fs;
use tracing::debug;

/// Whether `path` exists. Any access error, not only "not found", reads as absent.
pub async fn exists(path: &Path) -> bool {
    match fs::metadata(path).await {
        Ok(_) => true,
        Err(err) => {
            if err.kind() != io::ErrorKind::NotFound {
                debug!(path = %path.display(), %err, "existence probe failed; treating as absent");
            }
            false
        }
    }
}
