//! Application configuration
//!
//! Central location for validation boundaries, archive layout names,
//! and the runtime server configuration parsed from the command line.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

// ===== Account Limits =====

/// Usernames must be longer than this many characters
pub const MIN_USERNAME_EXCLUSIVE: usize = 2;
/// Usernames must be shorter than this many characters
pub const MAX_USERNAME_EXCLUSIVE: usize = 20;
/// Passwords must be longer than this many characters
pub const MIN_PASSWORD_EXCLUSIVE: usize = 8;
/// Passwords must be shorter than this many characters
pub const MAX_PASSWORD_EXCLUSIVE: usize = 255;

// ===== Tracker Limits =====

/// Maximum tracker name length in characters
pub const MAX_TRACKER_NAME_LENGTH: usize = 50;

/// Qualitative trackers need more choices than this
pub const MIN_CHOICES_EXCLUSIVE: usize = 2;
/// Qualitative trackers need fewer choices than this
pub const MAX_CHOICES_EXCLUSIVE: usize = 10;

// ===== Log Limits =====

/// Maximum note length in characters
pub const MAX_NOTE_LENGTH: usize = 255;

/// Canonical stored timestamp layout (ISO-8601, second resolution)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

// ===== Archive Layout =====

/// Header line of every exported CSV. The spaces are part of the format.
pub const CSV_HEADER: &str = "timestamp, value, note";

/// Metadata entry inside an archive
pub const METADATA_ENTRY: &str = "metadata.json";

/// Name of the packaged export inside the exports workspace
pub const EXPORT_ARCHIVE_NAME: &str = "out.zip";

/// Name the uploaded archive is saved under in the imports workspace
pub const IMPORT_ARCHIVE_NAME: &str = "in.zip";

/// Directory under the data directory holding per-user workspaces
pub const USER_DATA_DIR: &str = "user_data";

// ===== Server Defaults =====

/// Default upload limit for archive imports (25 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Default session inactivity expiry in hours
pub const DEFAULT_SESSION_EXPIRY_HOURS: i64 = 24 * 7;

/// Runtime server configuration
#[derive(Debug, Clone, Parser)]
#[command(name = "trackit", version, about = "Personal data tracker server")]
pub struct ServerConfig {
    /// Address the HTTP server listens on
    #[arg(long, env = "TRACKIT_BIND", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// Directory holding the database and user workspaces
    #[arg(long, env = "TRACKIT_DATA_DIR", default_value = "instance")]
    pub data_dir: PathBuf,

    /// Largest accepted archive upload in bytes
    #[arg(long, env = "TRACKIT_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,

    /// Hours of inactivity before a session expires
    #[arg(long, env = "TRACKIT_SESSION_EXPIRY_HOURS", default_value_t = DEFAULT_SESSION_EXPIRY_HOURS)]
    pub session_expiry_hours: i64,
}

impl ServerConfig {
    /// SQLite database location
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("database.sqlite3")
    }

    /// Root of the per-user workspaces
    pub fn workspace_root(&self) -> PathBuf {
        self.data_dir.join(USER_DATA_DIR)
    }
}
