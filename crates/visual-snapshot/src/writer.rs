//! Atomic image writes
use std::io::Cursor;
use std::path::Path;

use image::RgbaImage;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::errors::SnapshotError;

/// Write `data` to a sibling temp file, flush it to disk, then rename over `path`.
///
/// Readers of `path` never observe a partially written image.
pub async fn write_atomic(path: &Path, data: &[u8]) -> Result<(), SnapshotError> {
    let tmp = path.with_extension("tmp");
    let result = async {
        let mut file = fs::File::create(&tmp).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp, path).await
    }
    .await;

    if let Err(err) = result {
        let _ = fs::remove_file(&tmp).await;
        return Err(SnapshotError::io(path, err));
    }
    Ok(())
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    image.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[tokio::test]
    async fn replaces_existing_file_and_leaves_no_temp() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("shot.png");
        std::fs::write(&path, b"old").unwrap();

        write_atomic(&path, b"new contents").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"new contents");
        assert!(!tmp.path().join("shot.tmp").exists());
    }

    #[tokio::test]
    async fn missing_parent_is_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("absent/shot.png");
        let err = write_atomic(&path, b"x").await.unwrap_err();
        assert!(matches!(err, SnapshotError::Io { .. }));
    }

    #[test]
    fn encodes_png_signature() {
        let image = RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 255]));
        let bytes = encode_png(&image).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }
}
