use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::models::image::ImageKind;

/// Uploaded-image storage on the local media root.
///
/// The pipeline reads inputs from the same tree, so the layout
/// (`project_<id>/<generated name>`) is part of the processing contract.
pub struct LocalStorage {
    media_root: PathBuf,
}

impl LocalStorage {
    pub fn new(media_root: impl Into<PathBuf>) -> Self {
        Self {
            media_root: media_root.into(),
        }
    }

    /// Absolute path of one stored image.
    pub fn image_path(&self, project_id: i64, file_name: &str) -> PathBuf {
        self.project_dir(project_id).join(file_name)
    }

    fn project_dir(&self, project_id: i64) -> PathBuf {
        self.media_root.join(format!("project_{project_id}"))
    }

    /// Store uploaded image bytes under a generated collision-free name.
    /// Returns the name the image is stored as.
    pub async fn save(
        &self,
        project_id: i64,
        kind: ImageKind,
        data: &[u8],
    ) -> Result<String, StorageError> {
        let file_name = format!("{}.{kind}", Uuid::new_v4());
        let dir = self.project_dir(project_id);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(&file_name), data).await?;
        Ok(file_name)
    }

    /// Delete one stored image. Already-gone files are not an error.
    pub async fn delete(&self, project_id: i64, file_name: &str) -> Result<(), StorageError> {
        match tokio::fs::remove_file(self.image_path(project_id, file_name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a project's whole upload directory.
    pub async fn delete_project_dir(&self, project_id: i64) -> Result<(), StorageError> {
        match tokio::fs::remove_dir_all(self.project_dir(project_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn media_root(&self) -> &Path {
        &self.media_root
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
}
