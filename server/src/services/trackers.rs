//! Trackers service
//!
//! Tracker and log lifecycle for one user, plus the aggregates shown on
//! the tracker list and profile views.

use crate::database::{Log, Repository, Tracker, TrackerKind, User};
use crate::error::Result;
use crate::validation::{validate_log, validate_tracker, LogForm, TrackerForm};
use serde::Serialize;

/// Shown when a user has no logs yet
pub const NEVER_ACCESSED: &str = "Never";

/// Tracker list with the most recent activity
#[derive(Debug, Clone, Serialize)]
pub struct TrackerOverview {
    pub trackers: Vec<Tracker>,
    pub last_accessed: String,
}

/// Account summary
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub username: String,
    pub tracker_count: i64,
    pub log_count: i64,
}

/// One scatter point; numbers for quantitative trackers, choices otherwise
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub timestamp: String,
    pub value: serde_json::Value,
}

/// Service for managing trackers and their logs
#[derive(Clone)]
pub struct TrackersService {
    repo: Repository,
}

impl TrackersService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Create a tracker from a submitted form
    pub async fn create_tracker(&self, user_id: i64, form: &TrackerForm) -> Result<Tracker> {
        let req = validate_tracker(form)?;

        tracing::info!("Creating tracker: {} ({})", req.name, req.tracker_type);
        self.repo.create_tracker(user_id, &req).await
    }

    pub async fn get_tracker(&self, user_id: i64, id: i64) -> Result<Tracker> {
        self.repo.get_tracker(user_id, id).await
    }

    pub async fn list_trackers(&self, user_id: i64) -> Result<Vec<Tracker>> {
        self.repo.list_trackers(user_id).await
    }

    pub async fn update_tracker(&self, user_id: i64, id: i64, form: &TrackerForm) -> Result<Tracker> {
        // Ownership is checked before the form so unknown ids read as not found
        self.repo.get_tracker(user_id, id).await?;
        let req = validate_tracker(form)?;

        tracing::debug!("Updating tracker: {}", id);
        self.repo.update_tracker(user_id, id, &req).await
    }

    pub async fn delete_tracker(&self, user_id: i64, id: i64) -> Result<()> {
        tracing::info!("Deleting tracker: {}", id);
        self.repo.delete_tracker(user_id, id).await
    }

    /// Validate and append a log to one of the user's trackers
    pub async fn add_log(&self, user_id: i64, tracker_id: i64, form: &LogForm) -> Result<Log> {
        let tracker = self.repo.get_tracker(user_id, tracker_id).await?;
        let req = validate_log(&tracker.kind(), form)?;

        self.repo.create_log(tracker.id, &req).await
    }

    pub async fn get_log(&self, user_id: i64, tracker_id: i64, log_id: i64) -> Result<Log> {
        let tracker = self.repo.get_tracker(user_id, tracker_id).await?;
        self.repo.get_log(tracker.id, log_id).await
    }

    /// A tracker together with its logs in creation order
    pub async fn tracker_with_logs(&self, user_id: i64, tracker_id: i64) -> Result<(Tracker, Vec<Log>)> {
        let tracker = self.repo.get_tracker(user_id, tracker_id).await?;
        let logs = self.repo.list_logs(tracker.id).await?;
        Ok((tracker, logs))
    }

    pub async fn update_log(
        &self,
        user_id: i64,
        tracker_id: i64,
        log_id: i64,
        form: &LogForm,
    ) -> Result<Log> {
        let tracker = self.repo.get_tracker(user_id, tracker_id).await?;
        self.repo.get_log(tracker.id, log_id).await?;
        let req = validate_log(&tracker.kind(), form)?;

        tracing::debug!("Updating log: {}", log_id);
        self.repo.update_log(tracker.id, log_id, &req).await
    }

    pub async fn delete_log(&self, user_id: i64, tracker_id: i64, log_id: i64) -> Result<()> {
        let tracker = self.repo.get_tracker(user_id, tracker_id).await?;
        self.repo.delete_log(tracker.id, log_id).await
    }

    /// Trackers plus the timestamp of the most recent log
    pub async fn overview(&self, user_id: i64) -> Result<TrackerOverview> {
        let trackers = self.repo.list_trackers(user_id).await?;
        let last_accessed = self
            .repo
            .latest_log_timestamp(user_id)
            .await?
            .unwrap_or_else(|| NEVER_ACCESSED.to_string());

        Ok(TrackerOverview {
            trackers,
            last_accessed,
        })
    }

    pub async fn profile(&self, user: &User) -> Result<Profile> {
        Ok(Profile {
            username: user.username.clone(),
            tracker_count: self.repo.count_trackers(user.id).await?,
            log_count: self.repo.count_logs(user.id).await?,
        })
    }
}

/// Scatter series of a tracker's logs.
///
/// Imported logs are not validated, so quantitative values that do not
/// parse are left out of the series.
pub fn series(tracker: &Tracker, logs: &[Log]) -> Vec<SeriesPoint> {
    let kind = tracker.kind();

    logs.iter()
        .filter_map(|log| {
            let value = match &kind {
                TrackerKind::Quantitative => {
                    let number = log.value.trim().parse::<f64>().ok()?;
                    serde_json::Number::from_f64(number).map(serde_json::Value::Number)?
                }
                TrackerKind::Qualitative { .. } => serde_json::Value::String(log.value.clone()),
            };

            Some(SeriesPoint {
                timestamp: log.timestamp.clone(),
                value,
            })
        })
        .collect()
}
