//! Durable storage for uploaded quote attachments.
//!
//! Files live in a single configured directory under opaque server-generated
//! names, so concurrent writers never collide and client filenames never
//! touch the filesystem.

use std::error::Error;
use std::path::PathBuf;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use tokio_util::io::ReaderStream;

/// A pinned, boxed stream of bytes for streaming downloads without loading
/// the whole file into memory.
pub type StorageByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

pub type StorageError = Box<dyn Error + Send + Sync>;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Persist a file under an opaque key.
    async fn save(&self, key: &str, data: Vec<u8>) -> Result<(), StorageError>;

    /// Whether the file for this key currently exists. Metadata rows and
    /// disk state can diverge, so callers check before streaming.
    async fn exists(&self, key: &str) -> bool;

    /// Open the file for streaming. Returns the stream and the byte size
    /// for the Content-Length header.
    async fn download_stream(&self, key: &str) -> Result<(StorageByteStream, u64), StorageError>;
}

pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create the upload directory if absent and return a handle to it.
    pub fn new(base_path: &str) -> Self {
        if let Err(e) = std::fs::create_dir_all(base_path) {
            tracing::warn!("failed to create upload directory {}: {:?}", base_path, e);
        }
        Self {
            base_path: PathBuf::from(base_path),
        }
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn save(&self, key: &str, data: Vec<u8>) -> Result<(), StorageError> {
        let path = self.base_path.join(key);
        tokio::fs::write(&path, data).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> bool {
        tokio::fs::try_exists(self.base_path.join(key))
            .await
            .unwrap_or(false)
    }

    async fn download_stream(&self, key: &str) -> Result<(StorageByteStream, u64), StorageError> {
        let path = self.base_path.join(key);
        let file = tokio::fs::File::open(&path).await?;
        let size = file.metadata().await?.len();
        let stream: StorageByteStream = Box::pin(ReaderStream::new(file));
        Ok((stream, size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_save_and_exists() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().to_str().unwrap());

        assert!(!storage.exists("abc123.png").await);
        storage.save("abc123.png", b"fake image".to_vec()).await.unwrap();
        assert!(storage.exists("abc123.png").await);
    }

    #[tokio::test]
    async fn test_download_stream_returns_all_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().to_str().unwrap());
        let payload = vec![7u8; 64 * 1024];
        storage.save("blob.bin", payload.clone()).await.unwrap();

        let (mut stream, size) = storage.download_stream("blob.bin").await.unwrap();
        assert_eq!(size, payload.len() as u64);

        let mut collected = Vec::new();
        while let Some(chunk) = stream.next().await {
            collected.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(collected, payload);
    }

    #[tokio::test]
    async fn test_download_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().to_str().unwrap());
        assert!(storage.download_stream("nope.pdf").await.is_err());
    }

    #[test]
    fn test_new_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("uploads");
        let _ = LocalStorage::new(nested.to_str().unwrap());
        assert!(nested.is_dir());
    }
}
