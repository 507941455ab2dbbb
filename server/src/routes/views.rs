//! Home and profile pages

use super::page;
use crate::app::AppState;
use crate::error::Result;
use crate::session::CurrentUser;
use axum::extract::State;
use axum::response::Response;
use axum::Extension;
use serde_json::json;
use tower_sessions::Session;

pub async fn index(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    session: Session,
) -> Result<Response> {
    page(&session, json!({ "user": user })).await
}

pub async fn profile(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    session: Session,
) -> Result<Response> {
    let profile = state.trackers.profile(&user).await?;
    page(&session, profile).await
}
