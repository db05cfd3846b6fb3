//! On-disk storage for uploaded document files.
//!
//! Uploads are validated before anything touches the pipeline: the file
//! must be non-empty, within the configured size limit, and carry a
//! supported extension. Stored files get a UUID-prefixed name under the
//! storage root; reads and deletes resolve names through a traversal
//! guard so a crafted name can never escape the root.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::error::{Error, Result};
use crate::extract;

pub struct FileStorage {
    root: PathBuf,
    max_bytes: u64,
}

impl FileStorage {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            root: config.path.clone(),
            max_bytes: config.max_file_size_mb * 1024 * 1024,
        }
    }

    /// Validate an upload and return its MIME type.
    pub fn validate(&self, original_name: &str, bytes: &[u8]) -> Result<&'static str> {
        if bytes.is_empty() {
            return Err(Error::InvalidInput("uploaded file is empty".to_string()));
        }
        if bytes.len() as u64 > self.max_bytes {
            return Err(Error::InvalidInput(format!(
                "file exceeds size limit of {} bytes",
                self.max_bytes
            )));
        }
        extract::mime_for_name(original_name).ok_or_else(|| {
            Error::InvalidInput(format!(
                "unsupported file type: {original_name} (expected .pdf or .docx)"
            ))
        })
    }

    /// SHA-256 of the file content, lowercase hex. The dedup key.
    pub fn content_hash(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        format!("{:x}", hasher.finalize())
    }

    /// Write the file under the storage root.
    ///
    /// Returns `(file_name, file_path)`. The stored name is
    /// `{uuid}_{sanitized-original}` so collisions are impossible and the
    /// original name stays recognizable on disk.
    pub fn save(&self, original_name: &str, bytes: &[u8]) -> Result<(String, PathBuf)> {
        std::fs::create_dir_all(&self.root)?;
        let file_name = format!("{}_{}", Uuid::new_v4(), sanitize_name(original_name));
        let path = self.root.join(&file_name);
        std::fs::write(&path, bytes)?;
        Ok((file_name, path))
    }

    pub fn read(&self, file_name: &str) -> Result<Vec<u8>> {
        let path = self.resolve(file_name)?;
        Ok(std::fs::read(path)?)
    }

    /// Remove a stored file. A file already gone is not an error.
    pub fn delete(&self, file_name: &str) -> Result<()> {
        let path = self.resolve(file_name)?;
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Resolve a stored file name, rejecting anything that could walk
    /// outside the storage root.
    fn resolve(&self, file_name: &str) -> Result<PathBuf> {
        if file_name.is_empty()
            || file_name.contains('/')
            || file_name.contains('\\')
            || file_name.contains("..")
        {
            return Err(Error::Storage(format!(
                "illegal stored file name: {file_name}"
            )));
        }
        Ok(self.root.join(file_name))
    }
}

/// Keep alphanumerics, dot, dash and underscore; everything else becomes
/// an underscore.
fn sanitize_name(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("file");
    base.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
