//! Log CRUD routes

use super::{page, recover, settle};
use crate::app::AppState;
use crate::error::Result;
use crate::services::trackers::series;
use crate::session::CurrentUser;
use crate::validation::LogForm;
use axum::extract::{Path, State};
use axum::response::Response;
use axum::{Extension, Form};
use serde_json::json;
use tower_sessions::Session;

/// Tracker logs with the scatter series and a default timestamp for new
/// entries
pub async fn list(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    session: Session,
    Path(tracker_id): Path<i64>,
) -> Result<Response> {
    match state.trackers.tracker_with_logs(user.id, tracker_id).await {
        Ok((tracker, logs)) => {
            let points = series(&tracker, &logs);
            let now = chrono::Local::now().format("%Y-%m-%dT%H:%M").to_string();
            page(
                &session,
                json!({ "tracker": tracker, "logs": logs, "series": points, "now": now }),
            )
            .await
        }
        Err(err) => recover(&session, err, "/trackers").await,
    }
}

pub async fn create(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    session: Session,
    Path(tracker_id): Path<i64>,
    Form(form): Form<LogForm>,
) -> Result<Response> {
    let result = state.trackers.add_log(user.id, tracker_id, &form).await;
    let logs_url = format!("/trackers/{}/logs", tracker_id);
    settle(&session, result, "Log added successfully", &logs_url, &logs_url).await
}

pub async fn show(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    session: Session,
    Path((tracker_id, log_id)): Path<(i64, i64)>,
) -> Result<Response> {
    match state.trackers.get_log(user.id, tracker_id, log_id).await {
        Ok(log) => page(&session, json!({ "log": log })).await,
        Err(err) => recover(&session, err, "/trackers").await,
    }
}

pub async fn update(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    session: Session,
    Path((tracker_id, log_id)): Path<(i64, i64)>,
    Form(form): Form<LogForm>,
) -> Result<Response> {
    let result = state
        .trackers
        .update_log(user.id, tracker_id, log_id, &form)
        .await;
    let log_url = format!("/trackers/{}/logs/{}", tracker_id, log_id);
    settle(&session, result, "Log updated successfully", &log_url, &log_url).await
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    session: Session,
    Path((tracker_id, log_id)): Path<(i64, i64)>,
) -> Result<Response> {
    let result = state.trackers.delete_log(user.id, tracker_id, log_id).await;
    let logs_url = format!("/trackers/{}/logs", tracker_id);
    settle(&session, result, "Log deleted successfully", &logs_url, &logs_url).await
}
