//! Registration and session endpoints.

use api_types::user::{RegisterUser, UserView};
use axum::{Extension, Json, extract::State, http::StatusCode};
use engine::{RegisterUserCmd, User};

use crate::{ServerError, server::ServerState, views};

pub async fn register(
    State(state): State<ServerState>,
    Json(payload): Json<RegisterUser>,
) -> Result<(StatusCode, Json<UserView>), ServerError> {
    let user = state
        .engine
        .register_user(RegisterUserCmd {
            username: payload.username,
            email: payload.email,
            password: payload.password,
            first_name: payload.first_name,
            last_name: payload.last_name,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(views::user(user))))
}

/// Credentials are checked by the auth layer; this only echoes the user.
pub async fn login(Extension(user): Extension<User>) -> Json<UserView> {
    tracing::info!(user = %user.username, "user logged in");
    Json(views::user(user))
}

pub async fn logout(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
) -> StatusCode {
    state.sessions.clear(&user.username).await;
    tracing::info!(user = %user.username, "user logged out");
    StatusCode::NO_CONTENT
}
