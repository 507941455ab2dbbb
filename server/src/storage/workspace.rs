//! Per-user scratch workspaces
//!
//! Each user gets `user_data/{username}_{id}/` holding an `exports/` and an
//! `imports/` directory. Their contents are transient working state for the
//! archive codec and are not part of the durable data model.
//!
//! Concurrent exports or imports for the same user share these directories
//! without any locking.

use crate::database::User;
use crate::error::Result;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Root of all user workspaces
#[derive(Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Create a workspace rooted at the given directory
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Create the root directory if needed
    pub async fn initialize(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await?;
        tracing::info!("Workspace initialized at: {:?}", self.root);
        Ok(())
    }

    /// Directory owned by one user
    pub fn user_dir(&self, user: &User) -> PathBuf {
        self.root.join(format!("{}_{}", user.username, user.id))
    }

    pub fn exports_dir(&self, user: &User) -> PathBuf {
        self.user_dir(user).join("exports")
    }

    pub fn imports_dir(&self, user: &User) -> PathBuf {
        self.user_dir(user).join("imports")
    }

    /// Ensure the exports directory exists and holds no loose files left
    /// over from an interrupted export.
    pub async fn prepare_exports(&self, user: &User) -> Result<PathBuf> {
        let dir = self.exports_dir(user);
        fs::create_dir_all(&dir).await?;

        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let loose = matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("csv") | Some("json")
            );
            if loose && entry.file_type().await?.is_file() {
                fs::remove_file(&path).await?;
                tracing::debug!("Removed stale export file: {:?}", path);
            }
        }

        Ok(dir)
    }

    /// Recreate an empty imports directory so files from a previous import
    /// are never read again.
    pub async fn prepare_imports(&self, user: &User) -> Result<PathBuf> {
        let dir = self.imports_dir(user);

        if fs::try_exists(&dir).await? {
            fs::remove_dir_all(&dir).await?;
        }
        fs::create_dir_all(&dir).await?;

        Ok(dir)
    }

    /// Names of the regular files directly inside a directory, sorted
    pub async fn list_files(&self, dir: &Path) -> Result<Vec<String>> {
        let mut names = Vec::new();

        let mut entries = fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }

        names.sort();
        Ok(names)
    }
}
