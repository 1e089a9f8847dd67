use anyhow::{Context, Result, bail};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

/// Content-addressed-by-path blob storage on the local filesystem.
///
/// Blobs live at `{root}/{bucket}/{path}` and resolve publicly as
/// `{public_base}/{bucket}/{path}`; the path segment after the bucket is the
/// stable storage key, recoverable from a stored URL.
pub struct BlobStore {
    root: PathBuf,
    public_base: String,
}

#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub url: String,
    pub path: String,
}

/// Result of a best-effort batch delete. Absent blobs count as `missing`
/// rather than failures so a repeated sweep stays a no-op.
#[derive(Debug, Default)]
pub struct DeleteOutcome {
    pub deleted: usize,
    pub missing: usize,
    pub failed: Vec<String>,
}

impl BlobStore {
    pub fn new(root: PathBuf, public_base: impl Into<String>) -> Result<Self> {
        fs::create_dir_all(&root)
            .with_context(|| format!("creating blob store root {}", root.display()))?;
        let public_base = public_base.into().trim_end_matches('/').to_string();
        info!("Blob store root: {}", root.display());
        Ok(Self { root, public_base })
    }

    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/{}/{}", self.public_base, bucket, path)
    }

    /// Storage key embedded in a public URL, or None for a foreign URL.
    pub fn path_from_url(url: &str, bucket: &str) -> Option<String> {
        let marker = format!("/{}/", bucket);
        url.split_once(&marker).map(|(_, path)| path.to_string())
    }

    /// Writes a new blob. Fails if the key already exists; callers build
    /// timestamped keys so a collision means a logic error, not a retry.
    pub fn upload(&self, bucket: &str, path: &str, bytes: &[u8]) -> Result<StoredBlob> {
        let full = self.blob_path(bucket, path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&full)
            .with_context(|| format!("creating blob {}", full.display()))?;
        std::io::Write::write_all(&mut file, bytes)
            .with_context(|| format!("writing blob {}", full.display()))?;

        Ok(StoredBlob {
            url: self.public_url(bucket, path),
            path: path.to_string(),
        })
    }

    /// Best-effort batch delete. IO failures are collected per path and
    /// reported, never raised; a missing blob is a no-op.
    pub fn delete(&self, bucket: &str, paths: &[String]) -> DeleteOutcome {
        let mut outcome = DeleteOutcome::default();
        for path in paths {
            let full = match self.blob_path(bucket, path) {
                Ok(p) => p,
                Err(e) => {
                    warn!("Refusing to delete blob '{}': {}", path, e);
                    outcome.failed.push(path.clone());
                    continue;
                }
            };
            match fs::remove_file(&full) {
                Ok(()) => outcome.deleted += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    outcome.missing += 1;
                }
                Err(e) => {
                    warn!("Failed to delete blob {}: {}", full.display(), e);
                    outcome.failed.push(path.clone());
                }
            }
        }
        if outcome.deleted > 0 {
            info!("Deleted {} blobs from {}", outcome.deleted, bucket);
        }
        outcome
    }

    pub fn exists(&self, bucket: &str, path: &str) -> bool {
        self.blob_path(bucket, path)
            .map(|p| p.exists())
            .unwrap_or(false)
    }

    fn blob_path(&self, bucket: &str, path: &str) -> Result<PathBuf> {
        // Keys come from our own builders, but URLs are stored data; never
        // let a crafted segment climb out of the root.
        for segment in path.split('/').chain(bucket.split('/')) {
            if segment.is_empty() || segment == "." || segment == ".." {
                bail!("invalid blob path segment in '{}/{}'", bucket, path);
            }
        }
        Ok(self.root.join(bucket).join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store() -> (tempfile::TempDir, BlobStore) {
        let dir = tempdir().unwrap();
        let store = BlobStore::new(dir.path().join("blobs"), "https://files.test").unwrap();
        (dir, store)
    }

    #[test]
    fn upload_returns_public_url_and_stores_bytes() {
        let (_dir, store) = store();
        let blob = store
            .upload("chat-uploads", "chat-media/7/pic.jpg", b"abc")
            .unwrap();
        assert_eq!(blob.url, "https://files.test/chat-uploads/chat-media/7/pic.jpg");
        assert_eq!(blob.path, "chat-media/7/pic.jpg");
        assert!(store.exists("chat-uploads", "chat-media/7/pic.jpg"));

        // Same key again is a logic error, not an overwrite.
        assert!(store.upload("chat-uploads", "chat-media/7/pic.jpg", b"x").is_err());
    }

    #[test]
    fn path_from_url_recovers_the_storage_key() {
        assert_eq!(
            BlobStore::path_from_url(
                "https://files.test/storage/v1/chat-uploads/chat-media/7/pic.jpg",
                "chat-uploads"
            ),
            Some("chat-media/7/pic.jpg".to_string())
        );
        assert_eq!(
            BlobStore::path_from_url("https://elsewhere.test/other/pic.jpg", "chat-uploads"),
            None
        );
    }

    #[test]
    fn delete_is_idempotent_per_path() {
        let (_dir, store) = store();
        store.upload("chat-uploads", "chat-media/7/a.jpg", b"a").unwrap();

        let paths = vec!["chat-media/7/a.jpg".to_string(), "chat-media/7/gone.jpg".to_string()];
        let first = store.delete("chat-uploads", &paths);
        assert_eq!(first.deleted, 1);
        assert_eq!(first.missing, 1);
        assert!(first.failed.is_empty());

        let second = store.delete("chat-uploads", &paths);
        assert_eq!(second.deleted, 0);
        assert_eq!(second.missing, 2);
        assert!(second.failed.is_empty());
    }

    #[test]
    fn traversal_segments_are_rejected() {
        let (_dir, store) = store();
        assert!(store.upload("chat-uploads", "../escape.jpg", b"x").is_err());
        let outcome = store.delete("chat-uploads", &["../escape.jpg".to_string()]);
        assert_eq!(outcome.failed.len(), 1);
    }
}
