//! Application state and initialization
//!
//! This module manages the central application state and lifecycle.
//! All services are initialized here and made available through AppState.

use crate::config::{ServerConfig, DEFAULT_MAX_UPLOAD_BYTES};
use crate::database::{create_pool, Repository};
use crate::error::Result;
use crate::services::{AccountsService, ArchiveService, TrackersService};
use crate::storage::Workspace;
use std::path::PathBuf;

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState {
    pub repo: Repository,
    pub accounts: AccountsService,
    pub trackers: TrackersService,
    pub archive: ArchiveService,
    pub workspace: Workspace,
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Wire every service to one repository and workspace root
    pub async fn new(repo: Repository, workspace_root: PathBuf) -> Result<Self> {
        let workspace = Workspace::new(workspace_root);
        workspace.initialize().await?;

        Ok(Self {
            accounts: AccountsService::new(repo.clone()),
            trackers: TrackersService::new(repo.clone()),
            archive: ArchiveService::new(repo.clone(), workspace.clone()),
            repo,
            workspace,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        })
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }
}

/// Application setup - called once on startup
pub async fn setup(config: &ServerConfig) -> Result<AppState> {
    tracing::info!("Initializing application");
    tracing::info!("Data directory: {:?}", config.data_dir);

    std::fs::create_dir_all(&config.data_dir)?;

    let pool = create_pool(&config.database_path()).await?;
    let state = AppState::new(Repository::new(pool), config.workspace_root())
        .await?
        .with_max_upload_bytes(config.max_upload_bytes);

    tracing::info!("Application initialized successfully");

    Ok(state)
}
