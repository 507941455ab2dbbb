//! Zip export and import routes

use super::{page, recover, redirect_with};
use crate::app::AppState;
use crate::config::EXPORT_ARCHIVE_NAME;
use crate::error::Result;
use crate::session::{CurrentUser, FlashLevel};
use crate::validation::ensure_zip_filename;
use axum::extract::{Multipart, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Extension;
use serde_json::json;
use tower_sessions::Session;

const UPLOAD_FIELD: &str = "file";
const INVALID_FILE: &str = "Invalid file";

/// Download every tracker of the signed-in user as `out.zip`
pub async fn export(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Response> {
    let exported = state.archive.export_data(&user).await?;
    let body = tokio::fs::read(&exported.path).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", EXPORT_ARCHIVE_NAME),
            ),
            (header::ETAG, format!("\"{}\"", exported.checksum)),
        ],
        body,
    )
        .into_response())
}

pub async fn import_page(session: Session) -> Result<Response> {
    page(&session, json!({ "accept": ".zip" })).await
}

/// Import an uploaded archive as new trackers
pub async fn import(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    session: Session,
    mut multipart: Multipart,
) -> Result<Response> {
    let upload = loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some(UPLOAD_FIELD) => {
                let filename = field.file_name().unwrap_or_default().to_string();
                match field.bytes().await {
                    Ok(data) => break Some((filename, data)),
                    Err(e) => {
                        tracing::warn!("Upload could not be read: {}", e);
                        break None;
                    }
                }
            }
            Ok(Some(_)) => continue,
            Ok(None) => break None,
            Err(e) => {
                tracing::warn!("Malformed multipart body: {}", e);
                break None;
            }
        }
    };

    let Some((filename, data)) = upload else {
        return redirect_with(&session, FlashLevel::Error, INVALID_FILE, "/import").await;
    };

    if let Err(defect) = ensure_zip_filename(&filename) {
        tracing::warn!("Upload rejected: {}", defect);
        return redirect_with(&session, FlashLevel::Error, INVALID_FILE, "/import").await;
    }

    match state.archive.import_data(&user, &filename, &data).await {
        Ok(summary) => {
            tracing::info!(
                "Imported {} trackers and {} logs for user {}",
                summary.trackers,
                summary.logs,
                user.id
            );
            redirect_with(
                &session,
                FlashLevel::Success,
                "Data imported successfully",
                "/trackers",
            )
            .await
        }
        Err(err) => recover(&session, err, "/import").await,
    }
}
