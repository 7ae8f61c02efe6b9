//! Borrow, buy and return endpoints.

use api_types::lending::{BorrowRequest, BorrowResponse, BuyResponse, ReturnResponse};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{BorrowCmd, User};

use crate::{ServerError, server::ServerState, views};

pub async fn borrow(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(book_id): Path<i32>,
    Json(payload): Json<BorrowRequest>,
) -> Result<(StatusCode, Json<BorrowResponse>), ServerError> {
    let cmd = BorrowCmd::new(book_id, &user.username)
        .name(payload.name)
        .email(payload.email)
        .return_date(payload.return_date);
    let receipt = state.engine.borrow(cmd).await?;
    let requested_return_date = receipt
        .requested_return_date
        .ok_or_else(|| ServerError::Generic("missing return date".to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(BorrowResponse {
            borrowing: views::borrowing(receipt.borrowing),
            balance_minor: receipt.balance.cents(),
            book_quantity: receipt.book_quantity,
            requested_return_date,
        }),
    ))
}

pub async fn buy(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(book_id): Path<i32>,
) -> Result<(StatusCode, Json<BuyResponse>), ServerError> {
    let purchase = state.engine.buy(book_id, &user.username).await?;
    let receipt = purchase.receipt;

    Ok((
        StatusCode::CREATED,
        Json(BuyResponse {
            borrowing: views::borrowing(receipt.borrowing),
            balance_minor: receipt.balance.cents(),
            book_quantity: receipt.book_quantity,
            notification_sent: purchase.notification_sent,
        }),
    ))
}

pub async fn return_book(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(history_id): Path<i32>,
) -> Result<Json<ReturnResponse>, ServerError> {
    let receipt = state.engine.return_book(history_id, &user.username).await?;
    Ok(Json(ReturnResponse {
        borrowing: views::borrowing(receipt.borrowing),
        balance_minor: receipt.balance.cents(),
        book_quantity: receipt.book_quantity,
    }))
}
