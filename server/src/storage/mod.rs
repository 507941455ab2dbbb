//! Storage module
//!
//! Filesystem scratch space used by archive import and export.

pub mod workspace;

pub use workspace::Workspace;
