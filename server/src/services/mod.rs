//! Services module
//!
//! Business logic services that coordinate between HTTP handlers and the
//! repository.

pub mod accounts;
pub mod archive;
pub mod trackers;

pub use accounts::AccountsService;
pub use archive::{ArchiveService, ExportedArchive, ImportSummary};
pub use trackers::TrackersService;
