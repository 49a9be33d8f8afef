//! Product image storage on local disk.

use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, instrument};

/// Route prefix under which stored images are served.
pub const IMAGE_ROUTE: &str = "/api/tanam/loadimage/uploads";

/// Upload errors.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The uploaded file name has no extension.
    #[error("image file extension is missing")]
    MissingExtension,

    /// The generated file name has no usable base name.
    #[error("invalid image file name")]
    InvalidName,

    #[error("failed to store image: {0}")]
    Io(#[from] std::io::Error),
}

/// A stored image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub file_name: String,
    pub url: String,
}

/// Writes product images into one directory and builds their public URLs.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
    public_base_url: String,
}

impl ImageStore {
    /// Create a store writing into `dir`. Images are linked under
    /// `public_base_url`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            dir: dir.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_owned(),
        }
    }

    /// Directory images are written to.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Store `bytes` as a new image for `product_name`.
    ///
    /// The file is named `<product name><unix nanos><ext>`, keeping only the
    /// last path component, with the extension taken from
    /// `original_file_name`. The directory is created if missing.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::MissingExtension` if `original_file_name` has no
    /// extension, or `UploadError::Io` if the file cannot be written.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn save(
        &self,
        product_name: &str,
        original_file_name: &str,
        bytes: &[u8],
    ) -> Result<StoredImage, UploadError> {
        let file_name = image_file_name(
            product_name,
            original_file_name,
            Utc::now().timestamp_nanos_opt().unwrap_or_default(),
        )?;

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(&file_name), bytes).await?;
        debug!(file = %file_name, "Stored product image");

        let url = format!(
            "{}{IMAGE_ROUTE}/{}",
            self.public_base_url,
            urlencoding::encode(&file_name)
        );
        Ok(StoredImage { file_name, url })
    }
}

fn image_file_name(
    product_name: &str,
    original_file_name: &str,
    nanos: i64,
) -> Result<String, UploadError> {
    let extension = Path::new(original_file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .ok_or(UploadError::MissingExtension)?;

    let candidate = format!("{product_name}{nanos}.{extension}");
    Path::new(&candidate)
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_owned)
        .ok_or(UploadError::InvalidName)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_layout() {
        let name = image_file_name("Sickle", "IMG_0042.jpg", 1_700_000_000).unwrap();
        assert_eq!(name, "Sickle1700000000.jpg");
    }

    #[test]
    fn test_file_name_strips_directories() {
        let name = image_file_name("../../etc/passwd", "x.png", 5).unwrap();
        assert_eq!(name, "passwd5.png");
    }

    #[test]
    fn test_missing_extension() {
        assert!(matches!(
            image_file_name("Sickle", "photo", 1),
            Err(UploadError::MissingExtension)
        ));
    }

    #[tokio::test]
    async fn test_save_writes_file_and_builds_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path().join("uploads"), "https://api.tanam.software/");

        let stored = store.save("Rice Seeds", "seed.png", b"png").await.unwrap();

        let written = std::fs::read(store.dir().join(&stored.file_name)).unwrap();
        assert_eq!(written, b"png");
        assert!(stored.file_name.starts_with("Rice Seeds"));
        assert!(
            stored
                .url
                .starts_with("https://api.tanam.software/api/tanam/loadimage/uploads/Rice%20Seeds")
        );
        assert!(stored.url.ends_with(".png"));
    }
}
