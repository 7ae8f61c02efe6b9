use api_types::{
    profile::{Deposit, DepositResponse, ProfileResponse, ProfileUpdate},
    user::UserView,
};
use axum::{Extension, Json, extract::State};
use engine::User;

use crate::{ServerError, server::ServerState, views};

pub async fn get(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
) -> Result<Json<ProfileResponse>, ServerError> {
    let overview = state.engine.profile(&user.username).await?;
    Ok(Json(ProfileResponse {
        user: views::user(overview.user),
        balance_minor: overview.profile.balance.cents(),
        history: overview.history.into_iter().map(views::borrowing).collect(),
    }))
}

pub async fn update(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<ProfileUpdate>,
) -> Result<Json<UserView>, ServerError> {
    let update = engine::ProfileUpdate {
        email: payload.email,
        first_name: payload.first_name,
        last_name: payload.last_name,
    };
    if update.is_empty() {
        return Err(ServerError::Generic(
            "provide at least one of email, first_name or last_name".to_string(),
        ));
    }

    let user = state.engine.update_profile(&user.username, update).await?;
    Ok(Json(views::user(user)))
}

pub async fn deposit(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<Deposit>,
) -> Result<Json<DepositResponse>, ServerError> {
    let profile = state.engine.deposit(&user.username, &payload.amount).await?;
    Ok(Json(DepositResponse {
        balance_minor: profile.balance.cents(),
    }))
}
