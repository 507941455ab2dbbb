//! Login, registration and logout

use super::{page, recover};
use crate::app::AppState;
use crate::error::Result;
use crate::session::{sign_in, sign_out};
use crate::validation::UserForm;
use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use serde_json::json;
use tower_sessions::Session;

pub async fn login_page(session: Session) -> Result<Response> {
    page(&session, json!({ "form": "login" })).await
}

pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<UserForm>,
) -> Result<Response> {
    match state.accounts.login(&form).await {
        Ok(user) => {
            sign_in(&session, &user).await?;
            Ok(Redirect::to("/").into_response())
        }
        Err(err) => recover(&session, err, "/login").await,
    }
}

pub async fn register_page(session: Session) -> Result<Response> {
    page(&session, json!({ "form": "register" })).await
}

pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<UserForm>,
) -> Result<Response> {
    match state.accounts.register(&form).await {
        Ok(user) => {
            sign_in(&session, &user).await?;
            Ok(Redirect::to("/").into_response())
        }
        Err(err) => recover(&session, err, "/register").await,
    }
}

pub async fn logout(session: Session) -> Result<Response> {
    sign_out(&session).await?;
    Ok(Redirect::to("/").into_response())
}
