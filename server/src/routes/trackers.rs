//! Tracker CRUD routes

use super::{page, recover, settle};
use crate::app::AppState;
use crate::error::Result;
use crate::session::CurrentUser;
use crate::validation::TrackerForm;
use axum::extract::{Path, State};
use axum::response::Response;
use axum::{Extension, Form};
use serde_json::json;
use tower_sessions::Session;

pub async fn list(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    session: Session,
) -> Result<Response> {
    let overview = state.trackers.overview(user.id).await?;
    page(&session, overview).await
}

pub async fn create(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    session: Session,
    Form(form): Form<TrackerForm>,
) -> Result<Response> {
    let result = state.trackers.create_tracker(user.id, &form).await;
    settle(&session, result, "Tracker created", "/trackers", "/trackers").await
}

pub async fn show(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    session: Session,
    Path(tracker_id): Path<i64>,
) -> Result<Response> {
    match state.trackers.get_tracker(user.id, tracker_id).await {
        Ok(tracker) => page(&session, json!({ "tracker": tracker })).await,
        Err(err) => recover(&session, err, "/trackers").await,
    }
}

pub async fn update(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    session: Session,
    Path(tracker_id): Path<i64>,
    Form(form): Form<TrackerForm>,
) -> Result<Response> {
    let result = state.trackers.update_tracker(user.id, tracker_id, &form).await;
    let back_to = format!("/trackers/{}", tracker_id);
    settle(&session, result, "Tracker updated", "/trackers", &back_to).await
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    session: Session,
    Path(tracker_id): Path<i64>,
) -> Result<Response> {
    let result = state.trackers.delete_tracker(user.id, tracker_id).await;
    settle(&session, result, "Tracker deleted", "/trackers", "/trackers").await
}
