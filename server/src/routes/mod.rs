//! HTTP routes
//!
//! Views answer with JSON documents that include pending flash messages.
//! Mutations answer with a `303 See Other` redirect after queuing a flash:
//! a success notice, or the validation/not-found message of a recoverable
//! error. Anything else falls through to `AppError`'s generic response.
//!
//! - `auth`: login, registration and logout
//! - `views`: home and profile pages
//! - `trackers`: tracker CRUD
//! - `logs`: log CRUD and the scatter series
//! - `archive`: zip export and import

pub mod archive;
pub mod auth;
pub mod logs;
pub mod trackers;
pub mod views;

use crate::app::AppState;
use crate::error::{AppError, Result};
use crate::session::{push_flash, require_user, take_flashes, Flash, FlashLevel};
use axum::extract::DefaultBodyLimit;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{middleware, Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tower_sessions::Session;

/// Build the application router.
///
/// The caller adds the session layer, which must wrap every route.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/", get(views::index))
        .route("/logout", get(auth::logout))
        .route("/profile", get(views::profile))
        .route("/trackers", get(trackers::list).post(trackers::create))
        .route(
            "/trackers/{tracker_id}",
            get(trackers::show).post(trackers::update),
        )
        .route("/trackers/{tracker_id}/delete", get(trackers::delete))
        .route(
            "/trackers/{tracker_id}/logs",
            get(logs::list).post(logs::create),
        )
        .route(
            "/trackers/{tracker_id}/logs/{log_id}",
            get(logs::show).post(logs::update),
        )
        .route(
            "/trackers/{tracker_id}/logs/{log_id}/delete",
            get(logs::delete),
        )
        .route("/export", get(archive::export))
        .route("/import", get(archive::import_page).post(archive::import))
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_user));

    let public = Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register));

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// JSON view body: the page data plus consumed flash messages
#[derive(Serialize)]
pub struct Page<T: Serialize> {
    pub flashes: Vec<Flash>,
    #[serde(flatten)]
    pub data: T,
}

pub(crate) async fn page<T: Serialize>(session: &Session, data: T) -> Result<Response> {
    let flashes = take_flashes(session).await?;
    Ok(Json(Page { flashes, data }).into_response())
}

pub(crate) async fn redirect_with(
    session: &Session,
    level: FlashLevel,
    message: impl Into<String>,
    to: &str,
) -> Result<Response> {
    push_flash(session, level, message).await?;
    Ok(Redirect::to(to).into_response())
}

/// Redirect with a success flash, or recover from the error
pub(crate) async fn settle<T>(
    session: &Session,
    result: Result<T>,
    success: &str,
    success_to: &str,
    back_to: &str,
) -> Result<Response> {
    match result {
        Ok(_) => redirect_with(session, FlashLevel::Success, success, success_to).await,
        Err(err) => recover(session, err, back_to).await,
    }
}

/// Turn recoverable errors into a flash and a redirect.
///
/// Validation errors go back to the form, unknown trackers and logs go to
/// the tracker list, and every archive defect reads as one import failure.
pub(crate) async fn recover(session: &Session, err: AppError, back_to: &str) -> Result<Response> {
    match err {
        AppError::Validation(message) => {
            redirect_with(session, FlashLevel::Error, message, back_to).await
        }
        AppError::TrackerNotFound(_) | AppError::LogNotFound(_) => {
            redirect_with(session, FlashLevel::Error, err.to_string(), "/trackers").await
        }
        AppError::MalformedArchive(defect) => {
            tracing::warn!("Import rejected: {}", defect);
            redirect_with(session, FlashLevel::Error, "Import failed", back_to).await
        }
        other => Err(other),
    }
}
