//! Concurrent decoding of the golden / candidate pair
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use image::{ImageError, RgbaImage};
use tracing::debug;

use crate::errors::SnapshotError;

/// Decode both images concurrently; returns only once both decodes have finished.
///
/// The first failure wins. Which file finishes decoding first does not matter.
pub async fn load_pair(
    golden: &Path,
    candidate: &Path,
) -> Result<(RgbaImage, RgbaImage), SnapshotError> {
    let (golden, candidate) = tokio::try_join!(
        decode_task(golden.to_path_buf()),
        decode_task(candidate.to_path_buf())
    )?;
    debug!(
        golden = ?golden.dimensions(),
        candidate = ?candidate.dimensions(),
        "decoded snapshot pair"
    );
    Ok((golden, candidate))
}

async fn decode_task(path: PathBuf) -> Result<RgbaImage, SnapshotError> {
    tokio::task::spawn_blocking(move || decode_png(&path)).await?
}

/// Decode one PNG file into RGBA8.
pub fn decode_png(path: &Path) -> Result<RgbaImage, SnapshotError> {
    let file = File::open(path).map_err(|err| SnapshotError::io(path, err))?;
    let reader = image::io::Reader::with_format(BufReader::new(file), image::ImageFormat::Png);
    let decoded = reader.decode().map_err(|err| classify(path, err))?;
    Ok(decoded.to_rgba8())
}

fn classify(path: &Path, err: ImageError) -> SnapshotError {
    match err {
        // truncated or corrupt streams surface as I/O errors from the png codec
        ImageError::IoError(source)
            if !matches!(
                source.kind(),
                io::ErrorKind::UnexpectedEof | io::ErrorKind::InvalidData
            ) =>
        {
            SnapshotError::io(path, source)
        }
        other => SnapshotError::Decode {
            path: path.to_path_buf(),
            message: other.to_string(),
        },
    }
}
