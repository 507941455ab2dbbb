//! Database models
//!
//! Rust structs representing database entities.
//! All models use serde for serialization in JSON views.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// A registered account
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Stored tracker type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum TrackerType {
    Quantitative,
    Qualitative,
}

impl TrackerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackerType::Quantitative => "Quantitative",
            TrackerType::Qualitative => "Qualitative",
        }
    }

    /// Parse a type tag, rejecting anything but the two known names
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "Quantitative" => Some(TrackerType::Quantitative),
            "Qualitative" => Some(TrackerType::Qualitative),
            _ => None,
        }
    }
}

impl fmt::Display for TrackerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, typed time series owned by one user
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Tracker {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub tracker_type: TrackerType,
    /// Comma-separated choices for qualitative trackers
    pub settings: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Tracker {
    /// Typed view of the type tag and settings
    pub fn kind(&self) -> TrackerKind {
        match self.tracker_type {
            TrackerType::Quantitative => TrackerKind::Quantitative,
            TrackerType::Qualitative => TrackerKind::Qualitative {
                choices: split_choices(self.settings.as_deref().unwrap_or_default()),
            },
        }
    }
}

/// Tracker type with its per-variant settings payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerKind {
    Quantitative,
    Qualitative { choices: Vec<String> },
}

impl TrackerKind {
    pub fn tracker_type(&self) -> TrackerType {
        match self {
            TrackerKind::Quantitative => TrackerType::Quantitative,
            TrackerKind::Qualitative { .. } => TrackerType::Qualitative,
        }
    }

    /// Settings column value for this kind
    pub fn settings(&self) -> Option<String> {
        match self {
            TrackerKind::Quantitative => None,
            TrackerKind::Qualitative { choices } => Some(choices.join(",")),
        }
    }
}

/// Split a settings string into trimmed choices
pub fn split_choices(settings: &str) -> Vec<String> {
    settings.split(',').map(|c| c.trim().to_string()).collect()
}

/// One timestamped data point of a tracker
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Log {
    pub id: i64,
    pub tracker_id: i64,
    /// ISO-8601 with a `T` separator
    pub timestamp: String,
    pub value: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Create or update tracker request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTracker {
    pub name: String,
    pub tracker_type: TrackerType,
    pub settings: Option<String>,
}

/// Create or update log request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLog {
    pub timestamp: String,
    pub value: String,
    pub note: Option<String>,
}

/// Tracker and logs decoded from an archive, ready to be stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedTracker {
    pub tracker: NewTracker,
    pub logs: Vec<NewLog>,
}
