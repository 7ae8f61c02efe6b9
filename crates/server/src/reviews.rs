use api_types::review::{ReviewNew, ReviewView};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::User;

use crate::{ServerError, server::ServerState, views};

pub async fn review_new(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(book_id): Path<i32>,
    Json(payload): Json<ReviewNew>,
) -> Result<(StatusCode, Json<ReviewView>), ServerError> {
    let review = state
        .engine
        .submit_review(book_id, &user.username, &payload.content)
        .await?;
    Ok((StatusCode::CREATED, Json(views::review(review))))
}
