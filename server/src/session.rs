//! Session handling
//!
//! The signed-in user id lives in the session under `user_id`. The
//! `require_user` middleware resolves it once per request and hands
//! handlers a read-only `CurrentUser` extension. Flash messages are
//! one-shot notices stored in the session until the next view reads them.

use crate::app::AppState;
use crate::database::User;
use crate::error::{AppError, Result};
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

/// Key for storing the user id in the session
pub const SESSION_USER_ID_KEY: &str = "user_id";

const FLASH_KEY: &str = "flashes";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Error,
}

/// A one-shot status message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

/// The signed-in user, injected by `require_user`
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Queue a flash message for the next view
pub async fn push_flash(session: &Session, level: FlashLevel, message: impl Into<String>) -> Result<()> {
    let mut flashes: Vec<Flash> = session.get(FLASH_KEY).await?.unwrap_or_default();
    flashes.push(Flash {
        level,
        message: message.into(),
    });
    session.insert(FLASH_KEY, flashes).await?;
    Ok(())
}

/// Remove and return every pending flash message
pub async fn take_flashes(session: &Session) -> Result<Vec<Flash>> {
    Ok(session.remove::<Vec<Flash>>(FLASH_KEY).await?.unwrap_or_default())
}

/// Bind the session to a user, issuing a fresh session id
pub async fn sign_in(session: &Session, user: &User) -> Result<()> {
    session.cycle_id().await?;
    session.insert(SESSION_USER_ID_KEY, user.id).await?;
    Ok(())
}

pub async fn sign_out(session: &Session) -> Result<()> {
    session.flush().await?;
    Ok(())
}

/// Resolve the signed-in user or redirect to the login page
pub async fn require_user(
    State(state): State<AppState>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let user = match session.get::<i64>(SESSION_USER_ID_KEY).await? {
        Some(id) => match state.accounts.get_user(id).await {
            Ok(user) => Some(user),
            Err(AppError::UserNotFound(_)) => {
                tracing::warn!("Session refers to missing user: {}", id);
                None
            }
            Err(e) => return Err(e),
        },
        None => None,
    };

    let Some(user) = user else {
        push_flash(&session, FlashLevel::Error, "You must be logged in").await?;
        return Ok(Redirect::to("/login").into_response());
    };

    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}
