//! Form validation
//!
//! Typed parsers for the untyped forms submitted by clients. Each parser
//! returns the validated value or `AppError::Validation` carrying the
//! message shown to the user.

use crate::config::{
    MAX_CHOICES_EXCLUSIVE, MAX_NOTE_LENGTH, MAX_PASSWORD_EXCLUSIVE, MAX_TRACKER_NAME_LENGTH,
    MAX_USERNAME_EXCLUSIVE, MIN_CHOICES_EXCLUSIVE, MIN_PASSWORD_EXCLUSIVE, MIN_USERNAME_EXCLUSIVE,
    TIMESTAMP_FORMAT,
};
use crate::database::{split_choices, NewLog, NewTracker, TrackerKind, TrackerType};
use crate::error::{AppError, ArchiveError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;

/// Registration and login form
#[derive(Debug, Default, Deserialize)]
pub struct UserForm {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Tracker create/edit form
#[derive(Debug, Default, Deserialize)]
pub struct TrackerForm {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub tracker_type: Option<String>,
    pub settings: Option<String>,
}

/// Log create/edit form
#[derive(Debug, Default, Deserialize)]
pub struct LogForm {
    pub timestamp: Option<String>,
    pub value: Option<String>,
    pub note: Option<String>,
}

/// Validated username and password
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

fn invalid(message: impl Into<String>) -> AppError {
    AppError::Validation(message.into())
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|v| !v.is_empty())
}

pub fn validate_user(form: &UserForm) -> Result<Credentials> {
    let username = present(&form.username).ok_or_else(|| invalid("Username is required"))?;
    let password = present(&form.password).ok_or_else(|| invalid("Password is required"))?;

    let username_len = username.chars().count();
    if !(MIN_USERNAME_EXCLUSIVE < username_len && username_len < MAX_USERNAME_EXCLUSIVE) {
        return Err(invalid(format!(
            "Username must be between {} and {} characters long",
            MIN_USERNAME_EXCLUSIVE, MAX_USERNAME_EXCLUSIVE
        )));
    }

    // Usernames name the workspace directory
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(invalid(
            "Username may only contain letters, digits, '_', '-' and '.'",
        ));
    }

    let password_len = password.chars().count();
    if !(MIN_PASSWORD_EXCLUSIVE < password_len && password_len < MAX_PASSWORD_EXCLUSIVE) {
        return Err(invalid(format!(
            "Password must be between {} and {} characters long",
            MIN_PASSWORD_EXCLUSIVE, MAX_PASSWORD_EXCLUSIVE
        )));
    }

    Ok(Credentials {
        username: username.to_string(),
        password: password.to_string(),
    })
}

/// Parse the tracker form into a typed kind, then into a store request
pub fn validate_tracker(form: &TrackerForm) -> Result<NewTracker> {
    let name = present(&form.name)
        .map(str::trim)
        .filter(|n| !n.is_empty() && n.chars().count() <= MAX_TRACKER_NAME_LENGTH)
        .ok_or_else(|| invalid("Invalid name"))?;

    let tracker_type = present(&form.tracker_type)
        .and_then(TrackerType::parse)
        .ok_or_else(|| invalid("Invalid type"))?;

    let kind = match tracker_type {
        TrackerType::Quantitative => TrackerKind::Quantitative,
        TrackerType::Qualitative => TrackerKind::Qualitative {
            choices: parse_choices(form.settings.as_deref().unwrap_or_default())?,
        },
    };

    Ok(NewTracker {
        name: name.to_string(),
        tracker_type: kind.tracker_type(),
        settings: kind.settings(),
    })
}

fn parse_choices(settings: &str) -> Result<Vec<String>> {
    let choices = if settings.trim().is_empty() {
        Vec::new()
    } else {
        split_choices(settings)
    };

    let count = choices.len();
    if !(MIN_CHOICES_EXCLUSIVE < count && count < MAX_CHOICES_EXCLUSIVE) {
        return Err(invalid(format!(
            "Need at least {} choices, and at most {} choices, but received {}",
            MIN_CHOICES_EXCLUSIVE + 1,
            MAX_CHOICES_EXCLUSIVE - 1,
            count
        )));
    }

    if choices.iter().any(String::is_empty) {
        return Err(invalid("Choices cannot be blank"));
    }

    Ok(choices)
}

/// Validate a log entry against the kind of the tracker it belongs to
pub fn validate_log(kind: &TrackerKind, form: &LogForm) -> Result<NewLog> {
    let timestamp = present(&form.timestamp)
        .and_then(normalize_timestamp)
        .ok_or_else(|| invalid("Invalid timestamp"))?;

    let value = form.value.as_deref().unwrap_or_default().trim();
    match kind {
        TrackerKind::Qualitative { choices } => {
            if !choices.iter().any(|c| c == value) {
                return Err(invalid(format!("Expected one of: {}", choices.join(","))));
            }
        }
        TrackerKind::Quantitative => {
            if !is_number(value) {
                return Err(invalid("Expected numerical value for this tracker"));
            }
        }
    }

    let note = form.note.as_deref().unwrap_or_default();
    if note.chars().count() > MAX_NOTE_LENGTH {
        return Err(invalid(format!(
            "Note cannot be longer than {} characters",
            MAX_NOTE_LENGTH
        )));
    }
    // One log per CSV line in archives
    if note.contains(['\n', '\r']) {
        return Err(invalid("Note cannot contain line breaks"));
    }

    Ok(NewLog {
        timestamp,
        value: value.to_string(),
        note: Some(note.to_string()).filter(|n| !n.is_empty()),
    })
}

/// Finite decimal number check for quantitative values
pub fn is_number(value: &str) -> bool {
    value.parse::<f64>().map(f64::is_finite).unwrap_or(false)
}

/// Parse an ISO-8601 date or date-time and render it as
/// `YYYY-MM-DDTHH:MM:SS`. A space separator is accepted in place of `T`.
pub fn normalize_timestamp(raw: &str) -> Option<String> {
    let raw = raw.trim().replacen(' ', "T", 1);

    if let Ok(with_offset) = DateTime::parse_from_rfc3339(&raw) {
        return Some(with_offset.naive_local().format(TIMESTAMP_FORMAT).to_string());
    }

    let parsed = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;

    Some(parsed.format(TIMESTAMP_FORMAT).to_string())
}

/// Reject uploads that are not named like a zip archive
pub fn ensure_zip_filename(filename: &str) -> std::result::Result<(), ArchiveError> {
    if filename.ends_with(".zip") {
        Ok(())
    } else {
        Err(ArchiveError::NotZip {
            filename: filename.to_string(),
        })
    }
}
