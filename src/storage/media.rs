//! Upload payloads and the per-kind media rules applied before upload

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

const MIB: u64 = 1024 * 1024;

/// Endpoint family an upload goes to; also the multipart field name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadKind {
    File,
    Image,
    Video,
}

impl UploadKind {
    pub fn as_str(self) -> &'static str {
        match self {
            UploadKind::File => "file",
            UploadKind::Image => "image",
            UploadKind::Video => "video",
        }
    }
}

impl std::fmt::Display for UploadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file ready to upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub file_name: String,
    /// MIME type, e.g. `image/png`
    pub content_type: String,
    pub data: Vec<u8>,
}

impl FileUpload {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    /// Read a file from disk, guessing its MIME type from the extension
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await.map_err(|e| {
            ClientError::Validation(format!("cannot read {}: {e}", path.display()))
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self {
            file_name,
            content_type,
            data,
        })
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// MIME family and size ceiling for one kind of media
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaPolicy {
    pub kind: UploadKind,
    /// Required MIME prefix, e.g. `image/`
    pub mime_prefix: &'static str,
    /// Files of this size or larger are rejected
    pub max_size: u64,
    label: &'static str,
    limit_label: &'static str,
}

impl MediaPolicy {
    pub const IMAGE: MediaPolicy = MediaPolicy {
        kind: UploadKind::Image,
        mime_prefix: "image/",
        max_size: 10 * MIB,
        label: "an image",
        limit_label: "Image file size must be less than 10MB",
    };

    pub const VIDEO: MediaPolicy = MediaPolicy {
        kind: UploadKind::Video,
        mime_prefix: "video/",
        max_size: 100 * MIB,
        label: "a video",
        limit_label: "Video file size must be less than 100MB",
    };

    /// Check type then size. Never touches the network.
    pub fn validate(&self, file: &FileUpload) -> Result<()> {
        if !file
            .content_type
            .to_ascii_lowercase()
            .starts_with(self.mime_prefix)
        {
            return Err(ClientError::Validation(format!("File must be {}", self.label)));
        }
        if file.size() >= self.max_size {
            return Err(ClientError::Validation(self.limit_label.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sized(content_type: &str, size: u64) -> FileUpload {
        FileUpload::new("f", content_type, vec![0u8; size as usize])
    }

    #[test]
    fn image_policy_rejects_wrong_type() {
        let err = MediaPolicy::IMAGE
            .validate(&sized("application/pdf", 10))
            .unwrap_err();
        assert_eq!(err.to_string(), "Validation error: File must be an image");
        assert!(MediaPolicy::IMAGE.validate(&sized("video/mp4", 10)).is_err());
    }

    #[test]
    fn image_policy_boundary() {
        assert!(MediaPolicy::IMAGE
            .validate(&sized("image/png", 10 * MIB - 1))
            .is_ok());
        let err = MediaPolicy::IMAGE
            .validate(&sized("image/png", 10 * MIB))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation error: Image file size must be less than 10MB"
        );
    }

    #[test]
    fn video_policy_messages() {
        let err = MediaPolicy::VIDEO
            .validate(&sized("image/png", 1))
            .unwrap_err();
        assert_eq!(err.to_string(), "Validation error: File must be a video");
        assert!(MediaPolicy::VIDEO.validate(&sized("VIDEO/MP4", 1)).is_ok());
    }

    #[tokio::test]
    async fn from_path_guesses_mime_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("thumb.png");
        tokio::fs::write(&path, b"\x89PNG").await.unwrap();

        let file = FileUpload::from_path(&path).await.unwrap();
        assert_eq!(file.file_name, "thumb.png");
        assert_eq!(file.content_type, "image/png");
        assert_eq!(file.size(), 4);

        let unknown = dir.path().join("notes.unknownext");
        tokio::fs::write(&unknown, b"x").await.unwrap();
        let file = FileUpload::from_path(&unknown).await.unwrap();
        assert_eq!(file.content_type, "application/octet-stream");
    }

    #[tokio::test]
    async fn from_path_missing_file() {
        let err = FileUpload::from_path("/nonexistent/clip.mp4").await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }
}
