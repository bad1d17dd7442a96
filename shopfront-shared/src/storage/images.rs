/// On-disk storage for product images
///
/// Files are written to a primary upload directory under generated names
/// (`<unix-millis>-<uuid>.<ext>`) and exposed to clients as
/// `<public_prefix>/<file name>`, e.g. `/uploads/1735689600000-3f2a...png`.
/// An optional mirror directory receives a copy of every file; mirror
/// failures are logged and never fail the upload.
///
/// # Example
///
/// ```no_run
/// use shopfront_shared::storage::{ImageStore, ImageUpload, StorageConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = ImageStore::new(StorageConfig::new("uploads"));
/// store.ensure_dirs().await?;
///
/// let upload = ImageUpload {
///     file_name: "front.png".to_string(),
///     content_type: Some("image/png".to_string()),
///     data: bytes::Bytes::from_static(b"\x89PNG..."),
/// };
/// let stored = store.save(&upload).await?;
/// assert!(stored.url.starts_with("/uploads/"));
/// # Ok(())
/// # }
/// ```

use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
    time::SystemTime,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::DEFAULT_MAX_FILE_BYTES;

/// Error type for image storage
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Extension or declared content type is not an accepted image type
    #[error("Unsupported image '{file_name}': {reason}")]
    UnsupportedType { file_name: String, reason: String },

    /// File exceeds the per-file size limit
    #[error("Image '{file_name}' exceeds the {limit} byte limit")]
    TooLarge { file_name: String, limit: u64 },

    /// Filesystem operation failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// True for errors caused by the uploaded file rather than the server
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            StorageError::UnsupportedType { .. } | StorageError::TooLarge { .. }
        )
    }
}

/// Where and how images are stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Primary upload directory
    pub dir: PathBuf,

    /// Optional second directory kept in sync with `dir`
    pub mirror_dir: Option<PathBuf>,

    /// URL path prefix files are served under
    pub public_prefix: String,

    /// Per-file size limit in bytes
    pub max_file_bytes: u64,

    /// Maximum number of image files in one request
    pub max_files: usize,
}

impl StorageConfig {
    /// Config for `dir` with the default limits and no mirror
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            mirror_dir: None,
            public_prefix: "/uploads".to_string(),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            max_files: 10,
        }
    }
}

/// Accepted image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
    Avif,
}

impl ImageKind {
    /// Maps a lowercase file extension to its image kind
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "jpg" | "jpeg" => Some(ImageKind::Jpeg),
            "png" => Some(ImageKind::Png),
            "gif" => Some(ImageKind::Gif),
            "avif" => Some(ImageKind::Avif),
            _ => None,
        }
    }

    /// Content type a client must declare for this kind
    pub fn content_type(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
            ImageKind::Gif => "image/gif",
            ImageKind::Avif => "image/avif",
        }
    }
}

/// An uploaded file held in memory until it is stored
#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// File name as sent by the client
    pub file_name: String,

    /// Declared content type
    pub content_type: Option<String>,

    pub data: Bytes,
}

/// Result of storing one image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    /// Generated file name inside the upload directory
    pub file_name: String,

    /// Public path recorded on the product
    pub url: String,
}

/// Outcome of [`ImageStore::sync_mirror`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MirrorSyncReport {
    pub copied: usize,
    pub already_present: usize,
    pub failed: usize,
}

/// Handle to the upload directories; cheap to clone
#[derive(Debug, Clone)]
pub struct ImageStore {
    config: Arc<StorageConfig>,
}

impl ImageStore {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Creates the primary and mirror directories if missing
    ///
    /// Safe to call on every start-up.
    pub async fn ensure_dirs(&self) -> Result<(), StorageError> {
        for dir in std::iter::once(&self.config.dir).chain(self.config.mirror_dir.as_ref()) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| StorageError::io(dir, e))?;
            debug!(dir = %dir.display(), "Upload directory ready");
        }
        Ok(())
    }

    /// Public path for a stored file name
    pub fn public_url(&self, file_name: &str) -> String {
        format!(
            "{}/{}",
            self.config.public_prefix.trim_end_matches('/'),
            file_name
        )
    }

    /// Extracts the stored file name from a public path
    ///
    /// Returns `None` for paths outside the public prefix and for anything
    /// that could escape the upload directory.
    pub fn file_name_from_url<'a>(&self, url: &'a str) -> Option<&'a str> {
        let prefix = self.config.public_prefix.trim_end_matches('/');
        let name = url.strip_prefix(prefix)?.strip_prefix('/')?;

        let traversal = name.is_empty()
            || name.contains('/')
            || name.contains('\\')
            || name == "."
            || name == "..";

        if traversal {
            None
        } else {
            Some(name)
        }
    }

    /// Checks type and size of an upload without touching the disk
    ///
    /// The extension decides the kind; the declared content type must match
    /// it.
    pub fn validate(&self, upload: &ImageUpload) -> Result<ImageKind, StorageError> {
        let unsupported = |reason: String| StorageError::UnsupportedType {
            file_name: upload.file_name.clone(),
            reason,
        };

        let ext = Path::new(&upload.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| unsupported("missing file extension".to_string()))?;

        let kind = ImageKind::from_extension(&ext).ok_or_else(|| {
            unsupported(format!(
                "extension '{}' is not one of jpg, jpeg, png, gif, avif",
                ext
            ))
        })?;

        let declared = upload
            .content_type
            .as_deref()
            .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_ascii_lowercase());

        match declared {
            Some(ct) if ct == kind.content_type() => {}
            Some(ct) => {
                return Err(unsupported(format!(
                    "declared content type '{}' does not match '{}'",
                    ct,
                    kind.content_type()
                )))
            }
            None => return Err(unsupported("missing content type".to_string())),
        }

        if upload.data.len() as u64 > self.config.max_file_bytes {
            return Err(StorageError::TooLarge {
                file_name: upload.file_name.clone(),
                limit: self.config.max_file_bytes,
            });
        }

        Ok(kind)
    }

    /// Validates and writes one image, then mirrors it
    pub async fn save(&self, upload: &ImageUpload) -> Result<StoredImage, StorageError> {
        self.validate(upload)?;

        let ext = Path::new(&upload.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let file_name = generate_file_name(&ext);
        let path = self.config.dir.join(&file_name);

        tokio::fs::write(&path, &upload.data)
            .await
            .map_err(|e| StorageError::io(&path, e))?;

        debug!(
            file_name = %file_name,
            original = %upload.file_name,
            bytes = upload.data.len(),
            "Stored image"
        );

        self.mirror_file(&file_name).await;

        Ok(StoredImage {
            url: self.public_url(&file_name),
            file_name,
        })
    }

    /// Stores a batch of images, all or nothing
    ///
    /// Every upload is validated before the first write. If a write fails,
    /// files already written by this call are removed again.
    pub async fn save_all(&self, uploads: &[ImageUpload]) -> Result<Vec<StoredImage>, StorageError> {
        for upload in uploads {
            self.validate(upload)?;
        }

        let mut stored = Vec::with_capacity(uploads.len());
        for upload in uploads {
            match self.save(upload).await {
                Ok(image) => stored.push(image),
                Err(e) => {
                    for image in &stored {
                        self.remove_file(&image.file_name).await;
                    }
                    return Err(e);
                }
            }
        }

        Ok(stored)
    }

    /// Removes a stored file from both directories
    ///
    /// Missing files are fine. Returns true if at least one copy was deleted.
    pub async fn remove_file(&self, file_name: &str) -> bool {
        let mut removed = false;

        for dir in std::iter::once(&self.config.dir).chain(self.config.mirror_dir.as_ref()) {
            let path = dir.join(file_name);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    debug!(path = %path.display(), "Removed image file");
                    removed = true;
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!(path = %path.display(), "Image file already gone");
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to remove image file");
                }
            }
        }

        removed
    }

    /// Removes the files behind a list of public paths
    ///
    /// Paths outside the upload prefix are skipped. Returns the number of
    /// files that were actually deleted.
    pub async fn remove_urls(&self, urls: &[String]) -> usize {
        let mut removed = 0;

        for url in urls {
            match self.file_name_from_url(url) {
                Some(file_name) => {
                    if self.remove_file(file_name).await {
                        removed += 1;
                    }
                }
                None => warn!(url = %url, "Skipping image path outside the upload directory"),
            }
        }

        removed
    }

    /// Copies every primary file missing from the mirror
    ///
    /// Idempotent; failures are counted and logged, never fatal.
    pub async fn sync_mirror(&self) -> Result<MirrorSyncReport, StorageError> {
        let mut report = MirrorSyncReport::default();

        let Some(mirror) = self.config.mirror_dir.as_ref() else {
            return Ok(report);
        };

        for file_name in list_dir(&self.config.dir).await?.into_keys() {
            let target = mirror.join(&file_name);

            match tokio::fs::try_exists(&target).await {
                Ok(true) => report.already_present += 1,
                Ok(false) => {
                    let source = self.config.dir.join(&file_name);
                    match tokio::fs::copy(&source, &target).await {
                        Ok(_) => report.copied += 1,
                        Err(e) => {
                            warn!(file = %file_name, error = %e, "Failed to mirror image");
                            report.failed += 1;
                        }
                    }
                }
                Err(e) => {
                    warn!(file = %file_name, error = %e, "Failed to inspect mirror");
                    report.failed += 1;
                }
            }
        }

        info!(
            copied = report.copied,
            already_present = report.already_present,
            failed = report.failed,
            "Mirror sync finished"
        );

        Ok(report)
    }

    /// Every stored file name with its most recent modification time
    ///
    /// Covers both the primary and the mirror directory.
    pub async fn list_files(&self) -> Result<HashMap<String, SystemTime>, StorageError> {
        let mut files = list_dir(&self.config.dir).await?;

        if let Some(mirror) = self.config.mirror_dir.as_ref() {
            for (name, modified) in list_dir(mirror).await? {
                files
                    .entry(name)
                    .and_modify(|existing| *existing = (*existing).max(modified))
                    .or_insert(modified);
            }
        }

        Ok(files)
    }

    async fn mirror_file(&self, file_name: &str) {
        let Some(mirror) = self.config.mirror_dir.as_ref() else {
            return;
        };

        let source = self.config.dir.join(file_name);
        let target = mirror.join(file_name);

        if let Err(e) = tokio::fs::copy(&source, &target).await {
            warn!(
                file = %file_name,
                mirror = %mirror.display(),
                error = %e,
                "Failed to mirror image; it will be retried on the next sync"
            );
        }
    }
}

fn generate_file_name(ext: &str) -> String {
    format!(
        "{}-{}.{}",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple(),
        ext
    )
}

/// Regular files in `dir`; a missing directory counts as empty
async fn list_dir(dir: &Path) -> Result<HashMap<String, SystemTime>, StorageError> {
    let mut files = HashMap::new();

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(files),
        Err(e) => return Err(StorageError::io(dir, e)),
    };

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| StorageError::io(dir, e))?
    {
        let metadata = match entry.metadata().await {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "Skipping unreadable entry");
                continue;
            }
        };

        if !metadata.is_file() {
            continue;
        }

        if let Some(name) = entry.file_name().to_str() {
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            files.insert(name.to_string(), modified);
        }
    }

    Ok(files)
}
