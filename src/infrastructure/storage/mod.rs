//! Attachment Store
//!
//! Local-disk persistence for message attachments. Files live under
//! `<root>/<message_id>/<file_name>` and the same tree is served
//! statically over HTTP, so both the public URL and the on-disk path
//! are derivable from the owning message id.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};

use crate::domain::Attachment;
use crate::shared::error::AppError;

/// Verify that a resolved path stays within the expected base directory.
/// Prevents path traversal attacks.
fn ensure_within(base: &Path, target: &Path) -> Result<PathBuf, AppError> {
    // Canonicalize base; target may not exist yet so normalize manually
    let canonical_base = base.canonicalize().unwrap_or_else(|_| base.to_path_buf());
    let mut resolved = canonical_base.clone();
    for component in target
        .strip_prefix(&canonical_base)
        .unwrap_or(target)
        .components()
    {
        match component {
            std::path::Component::Normal(c) => resolved.push(c),
            std::path::Component::ParentDir => {
                return Err(AppError::BadRequest("Path traversal detected".to_string()));
            }
            _ => {} // RootDir, CurDir, Prefix: skip
        }
    }
    if !resolved.starts_with(&canonical_base) {
        return Err(AppError::BadRequest("Path traversal detected".to_string()));
    }
    Ok(resolved)
}

/// Reject separators and traversal sequences in client-supplied names.
fn sanitize_file_name(file_name: &str) -> Result<String, AppError> {
    if file_name.contains('/') || file_name.contains('\\') || file_name.contains("..") {
        return Err(AppError::BadRequest(
            "Invalid attachment file name".to_string(),
        ));
    }
    let trimmed = file_name.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest(
            "Attachment file name is required".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Clone)]
pub struct AttachmentStore {
    root: PathBuf,
    public_base_url: String,
}

impl AttachmentStore {
    pub async fn new(
        root: impl Into<PathBuf>,
        public_base_url: impl Into<String>,
    ) -> Result<Self, AppError> {
        let root = root.into();
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::Internal(format!(
                "Failed to create attachment directory '{}': {}",
                root.display(),
                e
            ))
        })?;

        info!(path = %root.display(), "Attachment store initialized");

        Ok(Self {
            root,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist one uploaded file under the owning message's directory
    /// and return the attachment value recorded on the message.
    pub async fn persist(
        &self,
        message_id: i64,
        file_name: &str,
        data: &[u8],
    ) -> Result<Attachment, AppError> {
        let safe_name = sanitize_file_name(file_name)?;

        let dir = self.root.join(message_id.to_string());
        fs::create_dir_all(&dir).await.map_err(|e| {
            AppError::Internal(format!(
                "Failed to create attachment directory '{}': {}",
                dir.display(),
                e
            ))
        })?;
        let dir = fs::canonicalize(&dir).await.map_err(|e| {
            AppError::Internal(format!(
                "Failed to resolve attachment directory '{}': {}",
                dir.display(),
                e
            ))
        })?;

        let path = ensure_within(&self.root, &dir.join(&safe_name))?;
        fs::write(&path, data).await.map_err(|e| {
            AppError::Internal(format!("Failed to write attachment '{}': {}", safe_name, e))
        })?;

        debug!(
            message_id = message_id,
            file = %safe_name,
            size = data.len(),
            "Stored attachment"
        );

        Ok(Attachment {
            url: format!(
                "{}/static/{}/{}",
                self.public_base_url, message_id, safe_name
            ),
            local_path: path.to_string_lossy().into_owned(),
        })
    }

    /// Remove a stored attachment file.
    pub async fn remove(&self, local_path: &str) -> Result<(), AppError> {
        let path = ensure_within(&self.root, Path::new(local_path))?;

        fs::remove_file(&path).await.map_err(|e| {
            AppError::Internal(format!(
                "Failed to delete attachment '{}': {}",
                path.display(),
                e
            ))
        })?;

        debug!(path = %path.display(), "Deleted attachment");
        Ok(())
    }
}
