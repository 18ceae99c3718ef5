//! File storage for uploaded documents.
//!
//! Notes and admission documents are written to a [`FileStorage`] backend
//! under a generated key (e.g. `notes/8c1f...-algebra.pdf`). The database only
//! keeps the key, the original file name and the MIME type. Uploads are
//! checked against an [`UploadPolicy`] before they reach the backend.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use thiserror::Error;
use tokio::fs;

type StorageFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StorageError>> + Send + 'a>>;

pub trait FileStorage: Send + Sync {
    /// Stores `content` under `key` and returns the key.
    fn save<'a>(&'a self, key: &'a str, content: &'a [u8]) -> StorageFuture<'a, String>;

    fn read<'a>(&'a self, key: &'a str) -> StorageFuture<'a, Vec<u8>>;

    /// Removes the file. Missing files are not an error.
    fn delete<'a>(&'a self, key: &'a str) -> StorageFuture<'a, ()>;
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File exceeds maximum size of {max_bytes} bytes")]
    TooLarge { max_bytes: usize },

    #[error("File type '{received}' is not allowed. Allowed types: {}", allowed.join(", "))]
    InvalidMimeType {
        received: String,
        allowed: Vec<String>,
    },

    #[error("File is empty")]
    Empty,

    #[error("File not found")]
    NotFound,

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn into_app_error(self) -> crate::errors::AppError {
        use crate::errors::AppError;
        match self {
            StorageError::NotFound => AppError::not_found(self),
            StorageError::Io(_) => AppError::internal(self),
            _ => AppError::bad_request(self),
        }
    }
}

/// Size and content-type limits for one kind of upload.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub max_bytes: usize,
    pub allowed_mime_types: Vec<String>,
}

pub const PDF_MIME: &str = "application/pdf";
pub const DOC_MIME: &str = "application/msword";
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

impl UploadPolicy {
    pub fn new(max_bytes: usize, allowed: &[&str]) -> Self {
        Self {
            max_bytes,
            allowed_mime_types: allowed.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// PDF and Word documents.
    pub fn documents(max_bytes: usize) -> Self {
        Self::new(max_bytes, &[PDF_MIME, DOC_MIME, DOCX_MIME])
    }

    /// Images and PDFs, used for profile pictures and identity proofs.
    pub fn images_and_pdf(max_bytes: usize) -> Self {
        Self::new(max_bytes, &["image/png", "image/jpeg", "image/webp", PDF_MIME])
    }

    /// Any content type, size checked only.
    pub fn any(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            allowed_mime_types: Vec::new(),
        }
    }

    pub fn check(&self, content_type: &str, len: usize) -> Result<(), StorageError> {
        if len == 0 {
            return Err(StorageError::Empty);
        }
        if len > self.max_bytes {
            return Err(StorageError::TooLarge {
                max_bytes: self.max_bytes,
            });
        }
        if !self.allowed_mime_types.is_empty()
            && !self.allowed_mime_types.iter().any(|m| m == content_type)
        {
            return Err(StorageError::InvalidMimeType {
                received: content_type.to_string(),
                allowed: self.allowed_mime_types.clone(),
            });
        }
        Ok(())
    }
}

/// Builds a storage key under `prefix` that keeps a sanitised copy of the
/// original file name for readability.
pub fn build_key(prefix: &str, id: &str, original_name: &str) -> String {
    let mut cleaned: String = original_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    while cleaned.contains("..") {
        cleaned = cleaned.replace("..", "_");
    }
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        format!("{prefix}/{id}")
    } else {
        format!("{prefix}/{id}-{cleaned}")
    }
}

#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    base_dir: PathBuf,
}

impl LocalFileStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    fn validate_key(key: &str) -> Result<(), StorageError> {
        if key.is_empty() || key.contains("..") || key.starts_with('/') {
            return Err(StorageError::InvalidKey(
                "Key must not be empty, contain '..', or start with '/'".to_string(),
            ));
        }

        if !key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/' | '.'))
        {
            return Err(StorageError::InvalidKey(
                "Key contains invalid characters".to_string(),
            ));
        }

        Ok(())
    }
}

impl FileStorage for LocalFileStorage {
    fn save<'a>(&'a self, key: &'a str, content: &'a [u8]) -> StorageFuture<'a, String> {
        Box::pin(async move {
            Self::validate_key(key)?;

            let file_path = self.base_dir.join(key);
            if let Some(parent) = file_path.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::write(&file_path, content).await?;

            Ok(key.to_string())
        })
    }

    fn read<'a>(&'a self, key: &'a str) -> StorageFuture<'a, Vec<u8>> {
        Box::pin(async move {
            Self::validate_key(key)?;

            match fs::read(self.base_dir.join(key)).await {
                Ok(bytes) => Ok(bytes),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> StorageFuture<'a, ()> {
        Box::pin(async move {
            Self::validate_key(key)?;

            match fs::remove_file(self.base_dir.join(key)).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key_rejects_traversal() {
        assert!(LocalFileStorage::validate_key("../etc/passwd").is_err());
        assert!(LocalFileStorage::validate_key("/abs/path").is_err());
        assert!(LocalFileStorage::validate_key("").is_err());
        assert!(LocalFileStorage::validate_key("notes/a b.pdf").is_err());
        assert!(LocalFileStorage::validate_key("notes/abc-1.pdf").is_ok());
    }

    #[test]
    fn test_build_key_sanitises_name() {
        assert_eq!(
            build_key("notes", "42", "Chapter 1 (final).pdf"),
            "notes/42-Chapter_1__final_.pdf"
        );
        assert_eq!(build_key("notes", "42", "../../x"), "notes/42-____x");
        assert_eq!(build_key("notes", "42", ""), "notes/42");
    }

    #[test]
    fn test_build_key_output_is_valid() {
        let key = build_key("notes", "42", "../../x");
        assert!(LocalFileStorage::validate_key(&key).is_ok());
        let key = build_key("notes", "42", "report.docx");
        assert!(LocalFileStorage::validate_key(&key).is_ok());
    }

    #[test]
    fn test_policy_checks() {
        let policy = UploadPolicy::documents(10);
        assert!(policy.check(PDF_MIME, 5).is_ok());
        assert!(matches!(policy.check(PDF_MIME, 0), Err(StorageError::Empty)));
        assert!(matches!(
            policy.check(PDF_MIME, 11),
            Err(StorageError::TooLarge { max_bytes: 10 })
        ));
        assert!(matches!(
            policy.check("image/png", 5),
            Err(StorageError::InvalidMimeType { .. })
        ));
        assert!(UploadPolicy::any(10).check("text/plain", 3).is_ok());
    }

    #[tokio::test]
    async fn test_save_read_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path());

        let key = storage.save("notes/n1.pdf", b"%PDF-1.4").await.unwrap();
        assert_eq!(key, "notes/n1.pdf");
        assert_eq!(storage.read(&key).await.unwrap(), b"%PDF-1.4");

        storage.delete(&key).await.unwrap();
        assert!(matches!(storage.read(&key).await, Err(StorageError::NotFound)));
        // deleting again is fine
        storage.delete(&key).await.unwrap();
    }
}
