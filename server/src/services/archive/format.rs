//! Archive entry format
//!
//! An archive holds one `{name}_{id}.csv` entry per tracker and a single
//! `metadata.json` keyed by tracker id:
//!
//! ```text
//! timestamp, value, note          <- header, spaces included
//! 2024-01-01T08:00:00,70.5,       <- one line per log, no quoting
//! ```
//!
//! ```json
//! {"12": {"type": "Qualitative", "settings": "low,mid,high", "name": "Mood"}}
//! ```
//!
//! The tracker id is always the digits after the last `_` of the entry
//! name, so names may contain underscores. The `name` metadata key is
//! optional on read; archives without it fall back to the entry name.

use crate::config::CSV_HEADER;
use crate::database::{ImportedTracker, Log, NewLog, NewTracker, Tracker, TrackerType};
use crate::error::ArchiveError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-tracker metadata record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerMetadata {
    #[serde(rename = "type")]
    pub tracker_type: TrackerType,
    pub settings: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl TrackerMetadata {
    pub fn for_tracker(tracker: &Tracker) -> Self {
        Self {
            tracker_type: tracker.tracker_type,
            settings: tracker.settings.clone(),
            name: Some(tracker.name.clone()),
        }
    }
}

/// Metadata document, keyed by the tracker id as a string
pub type Metadata = BTreeMap<String, TrackerMetadata>;

pub fn is_csv_entry(entry: &str) -> bool {
    entry.ends_with(".csv")
}

/// Entry name of a tracker's CSV file
pub fn entry_name(tracker: &Tracker) -> String {
    format!("{}_{}.csv", sanitize_name(&tracker.name), tracker.id)
}

/// Replace characters that cannot live in a single archive entry name
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '-',
            c if c.is_control() => '-',
            c => c,
        })
        .collect()
}

/// Split `{name}_{id}.csv` into the name and the id key
pub fn parse_entry_name(entry: &str) -> Result<(String, String), ArchiveError> {
    let bad = || ArchiveError::BadEntryName(entry.to_string());

    let stem = entry.strip_suffix(".csv").ok_or_else(bad)?;
    let (name, id) = stem.rsplit_once('_').ok_or_else(bad)?;

    if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
        return Err(bad());
    }

    Ok((name.to_string(), id.to_string()))
}

/// Render a tracker's logs as CSV text
pub fn encode_csv(logs: &[Log]) -> String {
    let mut out = String::with_capacity(CSV_HEADER.len() + 1 + logs.len() * 32);
    out.push_str(CSV_HEADER);
    out.push('\n');

    for log in logs {
        out.push_str(&log.timestamp);
        out.push(',');
        out.push_str(&log.value);
        out.push(',');
        out.push_str(log.note.as_deref().unwrap_or_default());
        out.push('\n');
    }

    out
}

/// Parse CSV text back into logs.
///
/// The first line is the header and is skipped. Timestamps and values never
/// contain commas, so a row splits on its first two commas and anything
/// after the second belongs to the note.
pub fn decode_csv(entry: &str, body: &str) -> Result<Vec<NewLog>, ArchiveError> {
    let mut lines = body.lines();

    if let Some(header) = lines.next() {
        if header.trim() != CSV_HEADER {
            tracing::warn!("Unexpected CSV header in {}: {:?}", entry, header);
        }
    }

    lines
        .enumerate()
        .map(|(index, line)| {
            let mut fields = line.splitn(3, ',');
            match (fields.next(), fields.next(), fields.next()) {
                (Some(timestamp), Some(value), Some(note)) => Ok(NewLog {
                    timestamp: timestamp.to_string(),
                    value: value.to_string(),
                    note: Some(note.to_string()).filter(|n| !n.is_empty()),
                }),
                _ => Err(ArchiveError::BadRow {
                    entry: entry.to_string(),
                    line: index + 2,
                }),
            }
        })
        .collect()
}

pub fn encode_metadata(metadata: &Metadata) -> serde_json::Result<String> {
    serde_json::to_string(metadata)
}

pub fn decode_metadata(text: &str) -> Result<Metadata, ArchiveError> {
    serde_json::from_str(text).map_err(|e| ArchiveError::InvalidMetadata(e.to_string()))
}

/// Join one CSV entry with its metadata record
pub fn decode_tracker(
    entry: &str,
    body: &str,
    metadata: &Metadata,
) -> Result<ImportedTracker, ArchiveError> {
    let (file_name, id) = parse_entry_name(entry)?;

    let record = metadata
        .get(&id)
        .ok_or(ArchiveError::MissingTrackerMetadata { id })?;

    let name = record.name.clone().unwrap_or(file_name);
    if name.is_empty() {
        return Err(ArchiveError::BadEntryName(entry.to_string()));
    }

    Ok(ImportedTracker {
        tracker: NewTracker {
            name,
            tracker_type: record.tracker_type,
            settings: record.settings.clone(),
        },
        logs: decode_csv(entry, body)?,
    })
}
