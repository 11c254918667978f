// SPDX-License-Identifier: Apache-2.0

//! Binary uploads (thumbnails, videos) behind an async storage port.

use async_trait::async_trait;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum MediaErrorCode {
    InvalidPath,
    NotFound,
    UnsupportedType,
    TooLarge,
    Io,
}

impl MediaErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidPath => "invalid_path",
            Self::NotFound => "not_found",
            Self::UnsupportedType => "unsupported_media_type",
            Self::TooLarge => "payload_too_large",
            Self::Io => "io_error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaError {
    pub code: MediaErrorCode,
    pub message: String,
}

impl MediaError {
    #[must_use]
    pub fn new(code: MediaErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl Display for MediaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for MediaError {}

fn io_error(e: &std::io::Error) -> MediaError {
    if e.kind() == std::io::ErrorKind::NotFound {
        MediaError::new(MediaErrorCode::NotFound, "media object not found")
    } else {
        MediaError::new(MediaErrorCode::Io, e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    pub bucket: String,
    pub path: String,
    pub content_type: String,
    pub size: u64,
    pub public_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[async_trait]
pub trait MediaStore: Send + Sync + 'static {
    fn backend_tag(&self) -> &'static str {
        "unknown"
    }

    async fn put(
        &self,
        bucket: &str,
        path: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<StoredMedia, MediaError>;

    async fn get(&self, bucket: &str, path: &str) -> Result<MediaObject, MediaError>;

    fn public_url(&self, bucket: &str, path: &str) -> String;
}

/// What an upload endpoint accepts and where it lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadPolicy {
    pub bucket: &'static str,
    pub prefix: &'static str,
    pub max_bytes: usize,
    pub allowed_types: &'static [&'static str],
    pub default_extension: &'static str,
}

pub const THUMBNAIL_POLICY: UploadPolicy = UploadPolicy {
    bucket: "thumbnails",
    prefix: "thumbnails",
    max_bytes: 5 * 1024 * 1024,
    allowed_types: &["image/jpeg", "image/png", "image/webp", "image/gif"],
    default_extension: "jpg",
};

pub const VIDEO_POLICY: UploadPolicy = UploadPolicy {
    bucket: "content-media",
    prefix: "videos",
    max_bytes: 100 * 1024 * 1024,
    allowed_types: &["video/mp4", "video/webm", "video/quicktime", "video/x-msvideo"],
    default_extension: "mp4",
};

impl UploadPolicy {
    pub fn check(&self, content_type: &str, size: usize) -> Result<(), MediaError> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if !self.allowed_types.contains(&essence.as_str()) {
            return Err(MediaError::new(
                MediaErrorCode::UnsupportedType,
                format!(
                    "unsupported file type {essence:?}; allowed: {}",
                    self.allowed_types.join(", ")
                ),
            ));
        }
        if size == 0 {
            return Err(MediaError::new(MediaErrorCode::InvalidPath, "file is empty"));
        }
        if size > self.max_bytes {
            return Err(MediaError::new(
                MediaErrorCode::TooLarge,
                format!(
                    "file exceeds {} MiB",
                    self.max_bytes / (1024 * 1024)
                ),
            ));
        }
        Ok(())
    }
}

fn file_extension(filename: Option<&str>) -> Option<String> {
    let name = filename?.rsplit(['/', '\\']).next()?;
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.len() > 8 {
        return None;
    }
    ext.chars()
        .all(|c| c.is_ascii_alphanumeric())
        .then(|| ext.to_ascii_lowercase())
}

/// `<prefix>/<millis>-<suffix>.<ext>`, extension taken from the supplied
/// file name when it has a sane one.
#[must_use]
pub fn media_object_path(
    policy: &UploadPolicy,
    filename: Option<&str>,
    millis: i64,
    suffix: &str,
) -> String {
    let ext = file_extension(filename).unwrap_or_else(|| policy.default_extension.to_string());
    format!("{}/{millis}-{suffix}.{ext}", policy.prefix)
}

fn content_type_for(path: &str) -> &'static str {
    match path.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()).as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mov") => "video/quicktime",
        Some("avi") => "video/x-msvideo",
        _ => "application/octet-stream",
    }
}

fn safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}

pub struct LocalFsMediaStore {
    root: PathBuf,
    public_base: String,
}

impl LocalFsMediaStore {
    #[must_use]
    pub fn new(root: PathBuf, public_base: &str) -> Self {
        Self {
            root,
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Rejects traversal, absolute paths and unusual characters.
    fn resolve(&self, bucket: &str, path: &str) -> Result<PathBuf, MediaError> {
        let invalid = || MediaError::new(MediaErrorCode::InvalidPath, "invalid media path");
        if !safe_segment(bucket) || path.starts_with('/') {
            return Err(invalid());
        }
        let mut out = self.root.join(bucket);
        for segment in path.split('/') {
            if !safe_segment(segment) {
                return Err(invalid());
            }
            out.push(segment);
        }
        Ok(out)
    }
}

/// Any failure leaves `tmp` for the caller to remove.
async fn write_then_rename(tmp: &Path, target: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(tmp).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(tmp, target).await
}

#[async_trait]
impl MediaStore for LocalFsMediaStore {
    fn backend_tag(&self) -> &'static str {
        "localfs"
    }

    async fn put(
        &self,
        bucket: &str,
        path: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<StoredMedia, MediaError> {
        let target = self.resolve(bucket, path)?;
        let parent = target
            .parent()
            .ok_or_else(|| MediaError::new(MediaErrorCode::InvalidPath, "invalid media path"))?;
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| io_error(&e))?;
        let tmp = parent.join(format!(".upload-{}.tmp", uuid::Uuid::new_v4().simple()));
        if let Err(e) = write_then_rename(&tmp, &target, bytes).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_error(&e));
        }
        tracing::debug!(bucket, path, bytes = bytes.len(), "media stored");
        Ok(StoredMedia {
            bucket: bucket.to_string(),
            path: path.to_string(),
            content_type: content_type.to_string(),
            size: bytes.len() as u64,
            public_url: self.public_url(bucket, path),
        })
    }

    async fn get(&self, bucket: &str, path: &str) -> Result<MediaObject, MediaError> {
        let target = self.resolve(bucket, path)?;
        let bytes = tokio::fs::read(&target).await.map_err(|e| io_error(&e))?;
        Ok(MediaObject {
            bytes,
            content_type: content_type_for(path).to_string(),
        })
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/{bucket}/{path}", self.public_base)
    }
}
