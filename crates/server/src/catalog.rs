//! Catalog browsing endpoints.

use api_types::catalog::{BookDetailsResponse, CatalogParams, CatalogResponse, CategoryView};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use engine::{CatalogQuery, User};

use crate::{
    ServerError,
    server::{Caller, ServerState},
    views,
};

pub async fn list(
    Extension(Caller(caller)): Extension<Caller>,
    State(state): State<ServerState>,
    Query(params): Query<CatalogParams>,
) -> Result<Json<CatalogResponse>, ServerError> {
    let query = CatalogQuery {
        title: params.q,
        category_id: params.category,
    };
    let books = state.engine.books(&query).await?;
    let categories = state.engine.categories().await?;

    let (acquired_book_ids, last_viewed_book_id) = match caller {
        Some(user) => (
            state.engine.acquired_book_ids(&user.username).await?,
            state.sessions.last_viewed(&user.username).await,
        ),
        None => (Vec::new(), None),
    };

    Ok(Json(CatalogResponse {
        books: books.into_iter().map(views::book).collect(),
        categories: categories.into_iter().map(views::category).collect(),
        acquired_book_ids,
        last_viewed_book_id,
    }))
}

pub async fn categories(
    State(state): State<ServerState>,
) -> Result<Json<Vec<CategoryView>>, ServerError> {
    let categories = state.engine.categories().await?;
    Ok(Json(categories.into_iter().map(views::category).collect()))
}

pub async fn details(
    State(state): State<ServerState>,
    Path(book_id): Path<i32>,
) -> Result<Json<BookDetailsResponse>, ServerError> {
    let details = state.engine.book_details(book_id).await?;
    Ok(Json(BookDetailsResponse {
        book: views::book(details.book),
        category: views::category(details.category),
        reviews: details.reviews.into_iter().map(views::review).collect(),
    }))
}

/// "See more": remember the book as the caller's last viewed one.
pub async fn select(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(book_id): Path<i32>,
) -> Result<StatusCode, ServerError> {
    state.engine.book(book_id).await?;
    state
        .sessions
        .set_last_viewed(&user.username, book_id)
        .await;
    Ok(StatusCode::NO_CONTENT)
}
